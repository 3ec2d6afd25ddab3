//! Partitioning of a payload batch into fork groups

use usdc_types::{ForkTarget, TxPayload};

/// Payloads that run in order on one fork
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForkGroup {
	pub target: ForkTarget,
	/// Block the fork is opened at; taken from the group's first payload
	pub block_tag: String,
	/// Input index and payload, in input order
	pub members: Vec<(usize, TxPayload)>,
}

/// Group payloads by `{rpc_url, chain_id}`.
///
/// Groups are ordered by first appearance and each group keeps its payloads in
/// input order, so a group's steps can be replayed sequentially.
pub fn plan(payloads: &[TxPayload]) -> Vec<ForkGroup> {
	let mut groups: Vec<ForkGroup> = Vec::new();
	for (index, payload) in payloads.iter().enumerate() {
		let target = payload.fork_target();
		match groups.iter_mut().find(|group| group.target == target) {
			Some(group) => group.members.push((index, payload.clone())),
			None => groups.push(ForkGroup {
				target,
				block_tag: payload.block_tag().to_string(),
				members: vec![(index, payload.clone())],
			}),
		}
	}
	groups
}
