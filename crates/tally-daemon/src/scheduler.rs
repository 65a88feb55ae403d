// crates/tally-daemon/src/scheduler.rs
//
// Block scheduler for the Tally daemon.
//
// In block mode the runtime clock reads block height. The scheduler sleeps
// `block_time_secs` of wall time per block and advances the shared
// `ManualClock` by one.

use std::time::Duration;

use tally_core::clock::ManualClock;
use tally_core::traits::Clock;

/// Scheduler that produces blocks at a fixed wall-clock interval.
pub struct BlockScheduler {
    clock: ManualClock,
    block_time: Duration,
    /// Blocks between progress log lines.
    log_every: u64,
}

impl BlockScheduler {
    pub fn new(clock: ManualClock, block_time_secs: u64) -> Self {
        Self {
            clock,
            block_time: Duration::from_secs(block_time_secs.max(1)),
            log_every: 100,
        }
    }

    /// Run the scheduler loop until ctrl-c.
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        tracing::info!(
            "Block scheduler started (block_time={}s, height={})",
            self.block_time.as_secs(),
            self.clock.now()
        );

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Block scheduler received shutdown signal");
                    break;
                }
                _ = tokio::time::sleep(self.block_time) => {
                    self.advance_block();
                }
            }
        }

        Ok(())
    }

    /// Advance the block height by one and return it.
    pub fn advance_block(&mut self) -> u64 {
        let height = self.clock.advance(1);
        if height % self.log_every == 0 {
            tracing::info!("Block {}", height);
        } else {
            tracing::trace!("Block {}", height);
        }
        height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_block_moves_shared_clock() {
        let clock = ManualClock::new(10);
        let mut scheduler = BlockScheduler::new(clock.clone(), 12);
        assert_eq!(scheduler.advance_block(), 11);
        assert_eq!(scheduler.advance_block(), 12);
        assert_eq!(clock.now(), 12);
    }

    #[test]
    fn test_zero_block_time_is_clamped() {
        let scheduler = BlockScheduler::new(ManualClock::new(0), 0);
        assert_eq!(scheduler.block_time, Duration::from_secs(1));
    }
}
