//! The operation catalog. Every transaction is a list of these; the
//! evaluation pipeline (`crate::eval`) evaluates then applies each one in
//! order, and the proposal system wraps a list of them for deferred,
//! multi-approval execution.

use crate::model::account::AccountId;
use crate::model::asset::AssetId;
use forge_auth::Authority;
use forge_core::{ObjectId, Timestamp};
use forge_crypto::PublicKey;
use forge_market::{Amount, Price};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountCreateOp {
    pub registrar: AccountId,
    pub name: String,
    pub owner: Authority,
    pub active: Authority,
    pub memo_key: PublicKey,
    pub voting_key: PublicKey,
    pub referrer: AccountId,
    /// Share of future network fees, in whole percent (0-100), rebated to
    /// `referrer`. Ignored when `referrer` equals `registrar` (self-referral).
    pub referrer_percent: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountUpdateOp {
    pub account: AccountId,
    pub owner: Option<Authority>,
    pub active: Option<Authority>,
    pub memo_key: Option<PublicKey>,
    pub vote_targets: Option<Vec<ObjectId>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferOp {
    pub from: AccountId,
    pub to: AccountId,
    pub amount: Amount,
    pub asset_id: AssetId,
    pub memo: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetCreateOp {
    pub issuer: AccountId,
    pub symbol: String,
    pub precision: u8,
    pub max_supply: Amount,
    pub core_exchange_rate: Price,
    pub market_fee_bps: u16,
    /// `Some` makes this a market-issued asset backed by the given asset.
    pub short_backing_asset: Option<AssetId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetIssueOp {
    pub issuer: AccountId,
    pub asset_id: AssetId,
    pub amount: Amount,
    pub issue_to: AccountId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetUpdateOp {
    pub issuer: AccountId,
    pub asset_id: AssetId,
    pub new_core_exchange_rate: Option<Price>,
    pub new_market_fee_bps: Option<u16>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetPublishFeedOp {
    pub publisher: AccountId,
    pub asset_id: AssetId,
    pub feed: forge_market::PriceFeed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitOrderCreateOp {
    pub seller: AccountId,
    pub amount_to_sell: Amount,
    pub sell_asset_id: AssetId,
    pub min_to_receive: Amount,
    pub receive_asset_id: AssetId,
    pub expiration: Timestamp,
    pub fill_or_kill: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitOrderCancelOp {
    pub seller: AccountId,
    pub order_id: ObjectId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortOrderCreateOp {
    pub seller: AccountId,
    pub collateral: Amount,
    pub collateral_asset_id: AssetId,
    pub max_debt: Amount,
    pub debt_asset_id: AssetId,
    pub expiration: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallOrderUpdateOp {
    pub borrower: AccountId,
    pub debt_asset_id: AssetId,
    pub delta_collateral: Amount,
    pub delta_debt: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForceSettlementCreateOp {
    pub owner: AccountId,
    pub amount: Amount,
    pub asset_id: AssetId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WitnessCreateOp {
    pub account: AccountId,
    pub signing_key: PublicKey,
    pub initial_secret_hash: [u8; 32],
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WitnessUpdateOp {
    pub witness: ObjectId,
    pub new_signing_key: Option<PublicKey>,
    pub new_url: Option<String>,
    pub proposed_parameters: Option<forge_core::GlobalParameters>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalCreateOp {
    pub proposer: AccountId,
    pub expiration: Timestamp,
    pub review_period_secs: Option<u32>,
    pub proposed_ops: Vec<Operation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalUpdateOp {
    pub proposal: ObjectId,
    pub active_approvals_to_add: Vec<AccountId>,
    pub active_approvals_to_remove: Vec<AccountId>,
    pub owner_approvals_to_add: Vec<AccountId>,
    pub owner_approvals_to_remove: Vec<AccountId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawPermissionCreateOp {
    pub withdraw_from: AccountId,
    pub authorized_account: AccountId,
    pub withdrawal_limit: Amount,
    pub withdrawal_limit_asset_id: AssetId,
    pub withdrawal_period_secs: u32,
    pub periods_until_expiration: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawPermissionClaimOp {
    pub withdraw_permission: ObjectId,
    pub withdraw_to: AccountId,
    pub amount: Amount,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum VestingPolicy {
    /// Withdrawable amount grows linearly from zero to `total` over
    /// `vesting_secs`.
    Linear { vesting_secs: u32 },
    /// Coin-days-destroyed based: withdrawable amount grows with
    /// accumulated (balance x seconds-held), capped at the full balance —
    /// enforced at a single clamp site (see `model::vesting`).
    CoinDaysDestroyed {
        vesting_secs: u32,
        min_withdraw_secs: u32,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VestingBalanceCreateOp {
    pub creator: AccountId,
    pub owner: AccountId,
    pub amount: Amount,
    pub asset_id: AssetId,
    pub policy: VestingPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VestingBalanceWithdrawOp {
    pub vesting_balance: ObjectId,
    pub owner: AccountId,
    pub amount: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyCreateOp {
    pub owner: AccountId,
    pub public_key: PublicKey,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortOrderCancelOp {
    pub seller: AccountId,
    pub order_id: ObjectId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalDeleteOp {
    pub proposal: ObjectId,
    /// Must match the proposal's `proposer`, or be one of its approving
    /// accounts withdrawing consent before full approval — the evaluator
    /// checks this against the stored proposal, not this field's label.
    pub proposal_author: AccountId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawPermissionDeleteOp {
    pub withdraw_permission: ObjectId,
    pub withdraw_from: AccountId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetFundFeePoolOp {
    pub from_account: AccountId,
    pub asset_id: AssetId,
    pub amount: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetGlobalSettleOp {
    pub issuer: AccountId,
    pub asset_id: AssetId,
    /// The issuer-supplied settlement price every debt position redeems
    /// at; must not be more favorable to debt holders than the current
    /// feed's call-limit price (checked by the evaluator).
    pub settle_price: Price,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Operation {
    AccountCreate(AccountCreateOp),
    AccountUpdate(AccountUpdateOp),
    Transfer(TransferOp),
    AssetCreate(AssetCreateOp),
    AssetIssue(AssetIssueOp),
    AssetUpdate(AssetUpdateOp),
    AssetPublishFeed(AssetPublishFeedOp),
    LimitOrderCreate(LimitOrderCreateOp),
    LimitOrderCancel(LimitOrderCancelOp),
    ShortOrderCreate(ShortOrderCreateOp),
    CallOrderUpdate(CallOrderUpdateOp),
    ForceSettlementCreate(ForceSettlementCreateOp),
    WitnessCreate(WitnessCreateOp),
    WitnessUpdate(WitnessUpdateOp),
    ProposalCreate(ProposalCreateOp),
    ProposalUpdate(ProposalUpdateOp),
    WithdrawPermissionCreate(WithdrawPermissionCreateOp),
    WithdrawPermissionClaim(WithdrawPermissionClaimOp),
    VestingBalanceCreate(VestingBalanceCreateOp),
    VestingBalanceWithdraw(VestingBalanceWithdrawOp),
    KeyCreate(KeyCreateOp),
    ShortOrderCancel(ShortOrderCancelOp),
    ProposalDelete(ProposalDeleteOp),
    WithdrawPermissionDelete(WithdrawPermissionDeleteOp),
    AssetFundFeePool(AssetFundFeePoolOp),
    AssetGlobalSettle(AssetGlobalSettleOp),
}

impl Operation {
    /// The account whose active authority (or owner, for the handful of
    /// owner-only ops) must sign for this operation to be authorized, and
    /// which authority class is required.
    pub fn required_authority(&self) -> (AccountId, forge_auth::AuthClass) {
        use forge_auth::AuthClass::{Active, Owner};
        match self {
            Operation::AccountCreate(op) => (op.registrar, Active),
            Operation::AccountUpdate(op) => {
                let class = if op.owner.is_some() { Owner } else { Active };
                (op.account, class)
            }
            Operation::Transfer(op) => (op.from, Active),
            Operation::AssetCreate(op) => (op.issuer, Active),
            Operation::AssetIssue(op) => (op.issuer, Active),
            Operation::AssetUpdate(op) => (op.issuer, Active),
            Operation::AssetPublishFeed(op) => (op.publisher, Active),
            Operation::LimitOrderCreate(op) => (op.seller, Active),
            Operation::LimitOrderCancel(op) => (op.seller, Active),
            Operation::ShortOrderCreate(op) => (op.seller, Active),
            Operation::CallOrderUpdate(op) => (op.borrower, Active),
            Operation::ForceSettlementCreate(op) => (op.owner, Active),
            Operation::WitnessCreate(op) => (op.account, Active),
            Operation::WitnessUpdate(_) => {
                // Resolved against the witness's account by the evaluator,
                // which has database access; placeholder id is replaced
                // there before the authority check runs.
                (AccountId::new(0), Active)
            }
            Operation::ProposalCreate(op) => (op.proposer, Active),
            Operation::ProposalUpdate(_) => (AccountId::new(0), Active),
            Operation::WithdrawPermissionCreate(op) => (op.withdraw_from, Active),
            Operation::WithdrawPermissionClaim(op) => (op.withdraw_to, Active),
            Operation::VestingBalanceCreate(op) => (op.creator, Active),
            Operation::VestingBalanceWithdraw(op) => (op.owner, Active),
            Operation::KeyCreate(op) => (op.owner, Active),
            Operation::ShortOrderCancel(op) => (op.seller, Active),
            Operation::ProposalDelete(op) => (op.proposal_author, Active),
            Operation::WithdrawPermissionDelete(op) => (op.withdraw_from, Active),
            Operation::AssetFundFeePool(op) => (op.from_account, Active),
            Operation::AssetGlobalSettle(op) => (op.issuer, Active),
        }
    }
}
