//! Shared domain models used by adapters, the resolver and sessions

pub mod amount;
pub mod asset;
pub mod chain;
pub mod secret_string;

pub use amount::{Amount, AmountParseError};
pub use asset::{AmountValidation, AmountValidationError, AssetConfig};
pub use chain::{chain_for_domain, circle_domain, parse_chain_id, Chain};
pub use secret_string::SecretString;
