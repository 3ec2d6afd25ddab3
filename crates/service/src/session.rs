//! Session orchestration
//!
//! Drives a session from Draft through Submitted to Finalized. Simulation runs
//! any number of times while the session is a draft; submission is refused
//! unless the latest simulation succeeded against the current actions and
//! params and is recent enough.

use alloy_primitives::{Address, B256};
use chrono::Utc;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use usdc_adapters::SignatureResolver;
use usdc_types::sessions::session_from_share_link;
use usdc_types::wallet::{self, Eip1193Provider};
use usdc_types::{
	classify, classify_message, Action, BridgeError, ErrorKind, Execution, Finalization, Session,
	SessionError, SessionParams, SessionResult, SessionStatus, SessionStorage, SimulationOutcome,
	SimulationSummary, TransactionReceipt, TxPayload, TxRequest,
};

use crate::payload::{simulation_payload, ActionResolver};
use crate::simulation::SimulationEngine;

pub const DEFAULT_SIMULATION_MAX_AGE_SECS: u64 = 300;

/// Fields to replace on a draft; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct SessionUpdate {
	pub name: Option<String>,
	pub actions: Option<Vec<Action>>,
	pub params: Option<SessionParams>,
}

/// Removes the session from the in-flight set when the submit ends
struct SubmitGuard {
	in_flight: Arc<DashMap<String, ()>>,
	session_id: String,
}

impl Drop for SubmitGuard {
	fn drop(&mut self) {
		self.in_flight.remove(&self.session_id);
	}
}

pub struct SessionOrchestrator {
	storage: Arc<dyn SessionStorage>,
	resolver: Arc<dyn ActionResolver>,
	engine: SimulationEngine,
	/// RPC endpoint per chain id, used to build simulation requests
	rpc_urls: HashMap<u64, String>,
	signatures: SignatureResolver,
	max_simulation_age: chrono::Duration,
	submitting: Arc<DashMap<String, ()>>,
}

impl SessionOrchestrator {
	pub fn new(
		storage: Arc<dyn SessionStorage>,
		resolver: Arc<dyn ActionResolver>,
		engine: SimulationEngine,
		rpc_urls: HashMap<u64, String>,
	) -> Self {
		Self {
			storage,
			resolver,
			engine,
			rpc_urls,
			signatures: SignatureResolver::default(),
			max_simulation_age: chrono::Duration::seconds(DEFAULT_SIMULATION_MAX_AGE_SECS as i64),
			submitting: Arc::new(DashMap::new()),
		}
	}

	/// Registries used to name custom errors and events in simulation results
	pub fn with_signatures(mut self, signatures: SignatureResolver) -> Self {
		self.signatures = signatures;
		self
	}

	pub fn with_max_simulation_age_secs(mut self, secs: u64) -> Self {
		self.max_simulation_age = chrono::Duration::seconds(secs as i64);
		self
	}

	pub async fn create(
		&self,
		name: Option<String>,
		actions: Vec<Action>,
		params: SessionParams,
	) -> SessionResult<Session> {
		let mut session = Session::new(name, actions, params);
		session.persisted = true;
		self.storage.create_session(session.clone()).await?;
		info!("Created session {} with {} actions", session.id, session.actions.len());
		Ok(session)
	}

	/// Open a share link as an unsaved draft; malformed links give the default session
	pub fn open_shared(&self, link: &str) -> Session {
		session_from_share_link(link)
	}

	/// Persist a session opened from a share link
	pub async fn commit(&self, mut session: Session) -> SessionResult<Session> {
		if session.persisted {
			return Ok(session);
		}
		session.persisted = true;
		session.touch();
		self.storage.create_session(session.clone()).await?;
		info!("Committed shared session {}", session.id);
		Ok(session)
	}

	pub async fn get(&self, session_id: &str) -> SessionResult<Session> {
		self.storage
			.get_session(session_id)
			.await?
			.ok_or_else(|| SessionError::NotFound(session_id.to_string()))
	}

	pub async fn list(&self, status: Option<SessionStatus>) -> SessionResult<Vec<Session>> {
		Ok(self.storage.list_sessions(status).await?)
	}

	/// Edit a draft. The stored simulation is kept but becomes stale.
	pub async fn update(&self, session_id: &str, update: SessionUpdate) -> SessionResult<Session> {
		let mut session = self.get(session_id).await?;
		if !session.is_draft() {
			return Err(SessionError::InvalidTransition {
				from: session.status,
				to: SessionStatus::Draft,
			});
		}

		if let Some(name) = update.name {
			session.name = Some(name);
		}
		if let Some(actions) = update.actions {
			session.actions = actions;
		}
		if let Some(params) = update.params {
			session.params = params;
		}
		session.touch();
		self.storage.update_session(session.clone()).await?;
		debug!("Updated session {}", session_id);
		Ok(session)
	}

	pub async fn delete(&self, session_id: &str) -> SessionResult<bool> {
		let removed = self.storage.delete_session(session_id).await?;
		if removed {
			info!("Deleted session {}", session_id);
		}
		Ok(removed)
	}

	async fn resolve_transactions(&self, session: &Session) -> SessionResult<Vec<TxRequest>> {
		if session.actions.is_empty() {
			return Err(SessionError::EmptySession(session.id.clone()));
		}
		let mut txs = Vec::new();
		for action in &session.actions {
			let resolved = self
				.resolver
				.resolve(action, &session.params)
				.await
				.map_err(|e| SessionError::Resolve(e.to_string()))?;
			txs.extend(resolved);
		}
		Ok(txs)
	}

	fn payloads(&self, txs: &[TxRequest], from: Address) -> SessionResult<Vec<TxPayload>> {
		txs.iter()
			.map(|tx| {
				let rpc_url = self.rpc_urls.get(&tx.chain_id).ok_or_else(|| {
					BridgeError::new(ErrorKind::ChainNotSupported)
						.with_message(format!("No RPC endpoint configured for chain {}", tx.chain_id))
				})?;
				Ok(simulation_payload(tx, from, rpc_url))
			})
			.collect()
	}

	async fn record_failure(&self, session: &mut Session, err: BridgeError) -> SessionResult<()> {
		session.last_error = Some(err);
		session.touch();
		if session.persisted {
			self.storage.update_session(session.clone()).await?;
		}
		Ok(())
	}

	/// Simulate the session's current actions and store the summary.
	///
	/// A revert is a completed simulation: the summary is stored and returned and
	/// the classified revert becomes `last_error`. Failures to build or run the
	/// simulation drop any earlier summary and are classified, stored and returned
	/// as errors. The status stays Draft either way.
	pub async fn simulate(&self, session_id: &str) -> SessionResult<SimulationSummary> {
		let mut session = self.get(session_id).await?;
		self.simulate_session(&mut session).await
	}

	/// Same as [`simulate`](Self::simulate) for a session held by the caller (e.g. an unsaved share link)
	pub async fn simulate_session(&self, session: &mut Session) -> SessionResult<SimulationSummary> {
		if !session.is_draft() {
			return Err(SessionError::InvalidTransition {
				from: session.status,
				to: SessionStatus::Draft,
			});
		}
		let owner = session
			.params
			.owner
			.ok_or_else(|| SessionError::Resolve("session has no owner".to_string()))?;

		let params_hash = session.fingerprint();
		let prepared = match self.resolve_transactions(session).await {
			Ok(txs) => self.payloads(&txs, owner),
			Err(e) => Err(e),
		};
		let payloads = match prepared {
			Ok(payloads) => payloads,
			Err(e) => {
				let classified = match &e {
					SessionError::Classified(err) => err.clone(),
					SessionError::Resolve(message) => classify_message(message),
					_ => return Err(e),
				};
				warn!("Could not prepare session {} for simulation: {}", session.id, e);
				session.simulation = None;
				self.record_failure(session, classified).await?;
				return Err(e);
			},
		};
		debug!(
			"Simulating session {} ({} transactions)",
			session.id,
			payloads.len()
		);

		let mut outcome = match self.engine.simulate(&payloads).await {
			Ok(outcome) => outcome,
			Err(e) => {
				let classified = classify(&e);
				warn!("Simulation of session {} failed: {}", session.id, e);
				// The last run failed, so no earlier result may clear submission
				session.simulation = None;
				self.record_failure(session, classified.clone()).await?;
				return Err(classified.into());
			},
		};
		self.annotate(&mut outcome).await;

		let summary = SimulationSummary::from_outcome(outcome, params_hash);
		session.last_error = if summary.is_success() {
			None
		} else {
			let reason = summary
				.revert_reason
				.clone()
				.unwrap_or_else(|| "execution reverted".to_string());
			Some(BridgeError::new(ErrorKind::ExecutionReverted).with_original(reason))
		};
		session.simulation = Some(summary.clone());
		session.touch();
		if session.persisted {
			self.storage.update_session(session.clone()).await?;
		}

		info!(
			"Session {} simulated: {:?}, {} gas over {} steps",
			session.id, summary.status, summary.gas_used, summary.step_count
		);
		Ok(summary)
	}

	/// Name undecoded custom errors and event topics from the signature registries
	async fn annotate(&self, outcome: &mut SimulationOutcome) {
		if self.signatures.is_empty() {
			return;
		}

		let steps = match outcome {
			SimulationOutcome::Batch { steps } => steps.as_mut_slice(),
			SimulationOutcome::Single(result) => std::slice::from_mut(result),
		};

		let mut known_events: HashMap<B256, Option<String>> = HashMap::new();
		for step in steps.iter_mut() {
			if step.revert_reason.is_none() {
				if let Some(selector) = &step.error_selector {
					match self.signatures.lookup_function(selector).await {
						Ok(names) if !names.is_empty() => {
							step.revert_reason = Some(names.join(" | "))
						},
						Ok(_) => {},
						Err(e) => warn!("Could not resolve error selector {}: {}", selector, e),
					}
				}
			}

			for event in step.events.iter_mut() {
				let Some(topic) = event.topics.first().copied() else {
					continue;
				};
				if !known_events.contains_key(&topic) {
					let name = match self.signatures.lookup_event(&topic.to_string()).await {
						Ok(names) => names.into_iter().next(),
						Err(e) => {
							warn!("Could not resolve event topic {}: {}", topic, e);
							None
						},
					};
					known_events.insert(topic, name);
				}
				event.signature = known_events.get(&topic).cloned().flatten();
			}
		}
	}

	fn check_ready(&self, session: &Session) -> SessionResult<()> {
		if !session.is_draft() {
			return Err(SessionError::InvalidTransition {
				from: session.status,
				to: SessionStatus::Submitted,
			});
		}
		let simulation = session
			.simulation
			.as_ref()
			.ok_or_else(|| SessionError::SimulationRequired(session.id.clone()))?;
		if session.simulation_is_stale() {
			return Err(SessionError::SimulationStale(session.id.clone()));
		}
		if !simulation.is_success() {
			return Err(SessionError::SimulationFailed {
				session_id: session.id.clone(),
				reason: simulation
					.revert_reason
					.clone()
					.unwrap_or_else(|| format!("{:?}", simulation.status)),
			});
		}
		if Utc::now() - simulation.simulated_at > self.max_simulation_age {
			return Err(SessionError::SimulationStale(session.id.clone()));
		}
		Ok(())
	}

	/// Sign and broadcast the session's transactions through the wallet.
	///
	/// Waits as long as the wallet does. A rejection before anything was sent
	/// keeps the session a draft; a failure after some transactions went out
	/// marks it submitted with `execution.incomplete` set. Wallet errors are
	/// never retried.
	pub async fn submit(
		&self,
		session_id: &str,
		wallet: &dyn Eip1193Provider,
	) -> SessionResult<Session> {
		if self.submitting.insert(session_id.to_string(), ()).is_some() {
			return Err(SessionError::SubmitInProgress(session_id.to_string()));
		}
		let _guard = SubmitGuard {
			in_flight: Arc::clone(&self.submitting),
			session_id: session_id.to_string(),
		};

		let mut session = self.get(session_id).await?;
		self.check_ready(&session)?;
		let txs = self.resolve_transactions(&session).await?;

		let from = match self.sender(&session, wallet).await {
			Ok(from) => from,
			Err(err) => {
				self.record_failure(&mut session, err.clone()).await?;
				return Err(err.into());
			},
		};

		let mut hashes = Vec::with_capacity(txs.len());
		let mut wallet_chain = None;
		let mut failure = None;
		for tx in &txs {
			if let Err(err) = self.ensure_chain(wallet, &mut wallet_chain, tx.chain_id).await {
				failure = Some(err);
				break;
			}
			match wallet::send_transaction(wallet, from, tx).await {
				Ok(hash) => {
					debug!("Session {} broadcast {} on chain {}", session.id, hash, tx.chain_id);
					hashes.push(hash);
				},
				Err(e) => {
					failure = Some(classify(&e));
					break;
				},
			}
		}

		if hashes.is_empty() {
			let err = failure.unwrap_or_else(|| BridgeError::new(ErrorKind::Unknown));
			if err.is_user_rejection() {
				info!("User rejected submission of session {}", session.id);
			} else {
				warn!("Submission of session {} failed: {}", session.id, err);
			}
			self.record_failure(&mut session, err.clone()).await?;
			return Err(err.into());
		}

		let incomplete = failure.is_some();
		if let Some(err) = &failure {
			warn!(
				"Session {} submitted partially ({} of {} transactions): {}",
				session.id,
				hashes.len(),
				txs.len(),
				err
			);
		}
		session.execution = Some(Execution {
			submitted_at: Utc::now(),
			tx_hash: hashes.first().copied(),
			chain_id: txs.first().map(|tx| tx.chain_id),
			tx_hashes: hashes,
			incomplete,
		});
		session.last_error = failure;
		session.advance(SessionStatus::Submitted)?;
		self.storage.update_session(session.clone()).await?;
		info!("Session {} submitted", session.id);
		Ok(session)
	}

	async fn sender(
		&self,
		session: &Session,
		wallet: &dyn Eip1193Provider,
	) -> Result<Address, BridgeError> {
		let accounts = wallet::request_accounts(wallet)
			.await
			.map_err(|e| classify(&e))?;
		match session.params.owner {
			Some(owner) if accounts.contains(&owner) => Ok(owner),
			Some(owner) => Err(BridgeError::new(ErrorKind::WalletDisconnected)
				.with_message(format!("Wallet is not connected with {}", owner))),
			None => accounts
				.first()
				.copied()
				.ok_or_else(|| BridgeError::new(ErrorKind::WalletDisconnected)),
		}
	}

	async fn ensure_chain(
		&self,
		wallet: &dyn Eip1193Provider,
		known: &mut Option<u64>,
		required: u64,
	) -> Result<(), BridgeError> {
		if *known != Some(required) {
			*known = Some(wallet::chain_id(wallet).await.map_err(|e| classify(&e))?);
		}
		match *known {
			Some(current) if current == required => Ok(()),
			Some(current) => Err(BridgeError::new(ErrorKind::WrongChain).with_message(format!(
				"Wallet is on chain {}, switch to chain {}",
				current, required
			))),
			None => Err(BridgeError::new(ErrorKind::WalletDisconnected)),
		}
	}

	/// Record confirmation of a submitted session
	pub async fn finalize(
		&self,
		session_id: &str,
		receipt: Option<TransactionReceipt>,
	) -> SessionResult<Session> {
		let mut session = self.get(session_id).await?;
		session.advance(SessionStatus::Finalized)?;
		if receipt.as_ref().is_some_and(|r| !r.success) {
			session.last_error = Some(BridgeError::new(ErrorKind::ExecutionReverted));
		}
		session.finalization = Some(Finalization {
			at: Utc::now(),
			receipt,
		});
		self.storage.update_session(session.clone()).await?;
		info!("Session {} finalized", session.id);
		Ok(session)
	}
}
