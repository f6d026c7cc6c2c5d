//! Domain models for payout-service.

mod merchant;
mod payout_item;
mod voucher;

pub use merchant::{Merchant, COMMISSION_GRACE_DAYS};
pub use payout_item::{
    CreatePayoutItem, PayoutItem, PayoutItemStatus, PendingMerchantTotal, PendingPayoutItem,
};
pub use voucher::{ListVouchersFilter, Voucher, VoucherStatus};
