//! The entity catalog. Every type here implements `forge_core::Object` via
//! `define_object!` and is indexed by `crate::db::ObjectDatabase`.

pub mod account;
pub mod asset;
pub mod delegate;
pub mod global;
pub mod key;
pub mod market;
pub mod operation;
pub mod proposal;
pub mod vesting;
pub mod withdraw;

pub use account::{Account, AccountBalance, AccountBalanceId, AccountId};
pub use asset::{Asset, AssetId, AssetPermissions, BitassetData, BitassetDataId, DynamicAssetData, DynamicAssetDataId};
pub use delegate::{Witness, WitnessId};
pub use global::{DynamicGlobalData, DynamicGlobalDataId};
pub use key::{Key, KeyId};
pub use market::{CallOrder, CallOrderId, ForceSettlement, ForceSettlementId, LimitOrder, LimitOrderId, ShortOrder, ShortOrderId};
pub use operation::Operation;
pub use proposal::{Proposal, ProposalId};
pub use vesting::{VestingBalance, VestingBalanceId};
pub use withdraw::{WithdrawPermission, WithdrawPermissionId};
