//! USDC Router Types
//!
//! Shared models and traits for the USDC cross-chain router.
//! This crate contains all domain models organized by business entity.

pub mod actions;
pub mod adapters;
pub mod cache;
pub mod errors;
pub mod models;
pub mod routes;
pub mod sessions;
pub mod simulation;
pub mod storage;
pub mod wallet;

// Re-export chrono and serde_json for convenience
pub use chrono;
pub use serde_json;

pub use models::{
	Amount, AmountParseError, AmountValidation, AmountValidationError, AssetConfig, Chain,
	SecretString,
};

pub use errors::{classify, classify_message, retry_delay_ms, BridgeError, ErrorKind};

pub use routes::{Route, RouteQuery, RouteRequest, RouteSet, RouteStep, TxRequest};

pub use cache::{CacheEvent, CacheEventKind, CacheKeyBuilder, CacheRow, FetchTicket};

pub use actions::{create_action, Action, ActionDefinition, ActionError, ActionType};

pub use sessions::{
	Execution, Finalization, Session, SessionError, SessionParams, SessionResult, SessionStatus,
	TransactionReceipt,
};

pub use simulation::{
	ForkMetadata, ForkTarget, GasTotals, SimulatedEvent, SimulationError, SimulationOutcome,
	SimulationResult, SimulationSummary, SummaryStatus, TxPayload,
};

pub use adapters::{
	AdapterError, AdapterResult, ProviderConfig, RouteProvider, SignatureRegistry,
	SwapQuoteProvider,
};

pub use storage::{SessionStorage, StorageError, StorageResult};

pub use wallet::{Eip1193Provider, WalletError};
