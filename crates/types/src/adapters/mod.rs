//! Provider adapter contracts and normalized models

pub mod config;
pub mod errors;
pub mod models;
pub mod traits;

pub use config::{ProviderConfig, DEFAULT_PROVIDER_TIMEOUT_MS};
pub use errors::{AdapterError, MAX_BODY_SNIPPET};
pub use models::{
	CctpAttestation, CctpFee, FastBurnAllowance, GatewayAttestation, GatewayBalance,
	SignedBurnIntent, SwapQuote, SwapQuoteRequest, TransferStatus, UniswapPool, UniswapPosition,
	FAST_FINALITY_THRESHOLD, STANDARD_FINALITY_THRESHOLD,
};
pub use traits::{RouteProvider, SignatureRegistry, SwapQuoteProvider};

/// Result types for adapter operations
pub type AdapterResult<T> = Result<T, AdapterError>;
