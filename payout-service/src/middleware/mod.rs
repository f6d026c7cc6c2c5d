mod merchant;

pub use merchant::{MerchantScope, MERCHANT_ID_HEADER};
