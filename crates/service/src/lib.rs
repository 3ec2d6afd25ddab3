//! USDC Router Service
//!
//! Route resolution, fork simulation and session orchestration on top of the
//! provider adapters and the keyed cache.

pub mod payload;
pub mod retry;
pub mod route_resolver;
pub mod session;
pub mod simulation;

pub use payload::{ActionResolver, PayloadError, StaticActionResolver};
pub use retry::{retry_classified, RetryPolicy};
pub use route_resolver::{ResolveError, ResolveOptions, RouteResolver};
pub use session::{SessionOrchestrator, SessionUpdate};
pub use simulation::{ForkBackend, JsonRpcForkBackend, SimulationEngine};
