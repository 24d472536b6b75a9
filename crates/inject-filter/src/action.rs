use std::collections::HashMap;
use std::sync::Arc;

use crate::error::ConfigError;

pub const LOCAL_ANY: &str = "local.any";
pub const LOCAL_ERROR: &str = "local.error";
pub const LOCAL_GRPC_RESPONSE: &str = "local.grpc-response";

/// Whether a resolved [`Action`] forwards the request, aborts locally, or
/// defers the choice to the RPC response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
	Passthrough,
	Abort,
	Dynamic,
}

/// A resolved mutation plan, immutable after config load.
#[derive(Debug, Clone)]
pub struct Action {
	pub kind: ActionKind,

	pub upstream_inject_headers: Vec<String>,
	pub upstream_remove_headers: Vec<String>,
	pub upstream_remove_cookie_names: Vec<String>,
	pub upstream_inject_any: bool,

	pub downstream_inject_headers: Vec<String>,
	pub downstream_remove_headers: Vec<String>,
	pub downstream_inject_any: bool,

	pub use_rpc_response: bool,
	pub response_code: u16,
	pub response_headers: Vec<(String, String)>,
	pub response_body: String,
}

impl Action {
	/// The built-in `local.any` entry installed when config doesn't supply one.
	pub fn default_fail_closed() -> Self {
		Self {
			kind: ActionKind::Abort,
			upstream_inject_headers: Vec::new(),
			upstream_remove_headers: Vec::new(),
			upstream_remove_cookie_names: Vec::new(),
			upstream_inject_any: false,
			downstream_inject_headers: Vec::new(),
			downstream_remove_headers: Vec::new(),
			downstream_inject_any: false,
			use_rpc_response: false,
			response_code: 500,
			response_headers: Vec::new(),
			response_body: String::new(),
		}
	}

	/// Whether this action could ever inject a header in either direction,
	/// used by config validation to reject dead filters.
	pub fn can_inject_anything(&self) -> bool {
		self.upstream_inject_any
			|| self.downstream_inject_any
			|| !self.upstream_inject_headers.is_empty()
			|| !self.downstream_inject_headers.is_empty()
	}
}

/// Maps RPC `result` strings to resolved [`Action`]s, with the three
/// reserved `local.*` keys resolved per configuration.
#[derive(Debug, Clone)]
pub struct ActionTable {
	by_result: HashMap<String, Arc<Action>>,
}

impl ActionTable {
	/// `entries` is `(result_keys, action)` pairs as configured. Keys in the
	/// `local.` namespace are permitted only as one of the three reserved
	/// names.
	pub fn build(entries: Vec<(Vec<String>, Action)>) -> Result<Self, ConfigError> {
		let mut by_result = HashMap::new();
		for (keys, action) in entries {
			if keys.is_empty() {
				return Err(ConfigError::EmptyResultList);
			}
			let action = Arc::new(action);
			for key in keys {
				if key.starts_with("local.") && key != LOCAL_ANY && key != LOCAL_ERROR && key != LOCAL_GRPC_RESPONSE {
					return Err(ConfigError::ReservedResultKey(key));
				}
				by_result.insert(key, action.clone());
			}
		}
		by_result.entry(LOCAL_ANY.to_string()).or_insert_with(|| Arc::new(Action::default_fail_closed()));
		Ok(Self { by_result })
	}

	/// Resolves an RPC `result` token to an [`Action`] per the reserved-key
	/// precedence: `local.*` results always resolve to the error action;
	/// otherwise an exact match, then `local.grpc-response`, then `local.any`.
	pub fn match_result(&self, result: &str) -> Arc<Action> {
		if result.starts_with("local.") {
			return self.error_action();
		}
		if let Some(action) = self.by_result.get(result) {
			return action.clone();
		}
		if let Some(action) = self.by_result.get(LOCAL_GRPC_RESPONSE) {
			return action.clone();
		}
		self.any_action()
	}

	/// The action used when the RPC fails, times out, or cannot be
	/// dispatched. Falls back to `local.any` if `local.error` isn't configured.
	pub fn error_action(&self) -> Arc<Action> {
		self
			.by_result
			.get(LOCAL_ERROR)
			.cloned()
			.unwrap_or_else(|| self.any_action())
	}

	fn any_action(&self) -> Arc<Action> {
		self
			.by_result
			.get(LOCAL_ANY)
			.cloned()
			.expect("local.any is always installed by ActionTable::build")
	}

	pub fn can_inject_anything(&self) -> bool {
		self.by_result.values().any(|a| a.can_inject_anything())
	}

	/// Union of every configured action's upstream allow-list, sent to the
	/// RPC peer so it knows which headers the filter will accept.
	pub fn all_upstream_inject_names(&self) -> Vec<String> {
		let mut names: Vec<String> = self
			.by_result
			.values()
			.flat_map(|a| a.upstream_inject_headers.iter().cloned())
			.collect();
		names.sort();
		names.dedup();
		names
	}

	/// Union of every configured action's downstream allow-list.
	pub fn all_downstream_inject_names(&self) -> Vec<String> {
		let mut names: Vec<String> = self
			.by_result
			.values()
			.flat_map(|a| a.downstream_inject_headers.iter().cloned())
			.collect();
		names.sort();
		names.dedup();
		names
	}
}

#[cfg(test)]
#[path = "action_tests.rs"]
mod tests;
