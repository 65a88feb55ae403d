// crates/tally-rpc/src/handlers/token.rs
//
// Token handlers: Balance, Approve, Transfer, Mint.
//
// These operate on the in-memory token bank the contracts settle against.

use serde::{Deserialize, Serialize};

use tally_core::account::{AccountId, Asset};
use tally_core::error::TallyError;
use tally_economics::format_units;

use super::{caller_id, rpc_error, SharedRuntime};

// ---------------------------------------------------------------------------
// Balance
// ---------------------------------------------------------------------------

/// Request for an account's balances.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceRequest {
    pub account: String,
    /// Restrict to one asset; all registered assets when omitted.
    #[serde(default)]
    pub asset: Option<String>,
}

/// One asset balance, in base units and formatted as whole tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetBalance {
    pub asset: String,
    pub amount: u64,
    pub formatted: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub account: String,
    pub balances: Vec<AssetBalance>,
}

pub async fn handle_balance(
    request: BalanceRequest,
    runtime: &SharedRuntime,
) -> Result<BalanceResponse, String> {
    let account = AccountId::new(request.account);
    let rt = runtime.read().await;

    let assets: Vec<Asset> = match request.asset {
        Some(symbol) => {
            let asset = Asset::new(symbol);
            ensure_known(&rt, &asset)?;
            vec![asset]
        }
        None => rt.tokens().assets().cloned().collect(),
    };

    let balances = assets
        .into_iter()
        .map(|asset| {
            let amount = rt.balance_of(&asset, &account);
            AssetBalance {
                asset: asset.to_string(),
                amount,
                formatted: format_units(amount),
            }
        })
        .collect();

    Ok(BalanceResponse {
        account: account.to_string(),
        balances,
    })
}

fn ensure_known(rt: &tally_economics::Runtime, asset: &Asset) -> Result<(), String> {
    if rt.tokens().minter(asset).is_none() {
        return Err(rpc_error(TallyError::NotFound(format!("asset {}", asset))));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Approve
// ---------------------------------------------------------------------------

/// Request to set the allowance `spender` may pull from the caller.
///
/// Contract vaults (e.g. `vault:liquidity`) are the usual spenders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproveRequest {
    pub caller: String,
    pub asset: String,
    pub spender: String,
    pub amount: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproveResponse {
    pub owner: String,
    pub spender: String,
    pub allowance: u64,
}

pub async fn handle_approve(
    request: ApproveRequest,
    runtime: &SharedRuntime,
) -> Result<ApproveResponse, String> {
    let owner = caller_id(request.caller)?;
    let spender = AccountId::new(request.spender);
    let asset = Asset::new(request.asset);
    let mut rt = runtime.write().await;
    ensure_known(&rt, &asset)?;

    let allowance = rt
        .approve(&owner, &asset, &spender, request.amount)
        .map_err(rpc_error)?;

    Ok(ApproveResponse {
        owner: owner.to_string(),
        spender: spender.to_string(),
        allowance,
    })
}

// ---------------------------------------------------------------------------
// Transfer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
    pub caller: String,
    pub asset: String,
    pub to: String,
    pub amount: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferResponse {
    /// Sender balance after the transfer.
    pub from_balance: u64,
    /// Recipient balance after the transfer.
    pub to_balance: u64,
}

pub async fn handle_transfer(
    request: TransferRequest,
    runtime: &SharedRuntime,
) -> Result<TransferResponse, String> {
    let from = caller_id(request.caller)?;
    let to = AccountId::new(request.to);
    let asset = Asset::new(request.asset);
    let mut rt = runtime.write().await;

    rt.transfer(&from, &asset, &to, request.amount)
        .map_err(rpc_error)?;

    Ok(TransferResponse {
        from_balance: rt.balance_of(&asset, &from),
        to_balance: rt.balance_of(&asset, &to),
    })
}

// ---------------------------------------------------------------------------
// Mint
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MintRequest {
    /// Must be the owner; the stable asset cannot be minted this way.
    pub caller: String,
    pub asset: String,
    pub to: String,
    pub amount: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MintResponse {
    pub to_balance: u64,
    pub total_supply: u64,
}

pub async fn handle_mint(
    request: MintRequest,
    runtime: &SharedRuntime,
) -> Result<MintResponse, String> {
    let caller = caller_id(request.caller)?;
    let to = AccountId::new(request.to);
    let asset = Asset::new(request.asset);
    let mut rt = runtime.write().await;

    rt.owner_mint(&caller, &asset, &to, request.amount)
        .map_err(rpc_error)?;

    Ok(MintResponse {
        to_balance: rt.balance_of(&asset, &to),
        total_supply: rt.tokens().total_supply(&asset),
    })
}
