use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

use crate::action::{Action, ActionKind, ActionTable};
use crate::error::ConfigError;
use crate::header_matcher::HeaderConstraint;

const COOKIE_PREFIX: &str = "cookie.";
const DEFAULT_TIMEOUT_MS: u64 = 120;
const DEFAULT_RESPONSE_CODE: u16 = 500;

fn default_timeout_ms() -> u64 {
	DEFAULT_TIMEOUT_MS
}

fn default_response_code() -> u16 {
	DEFAULT_RESPONSE_CODE
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
pub enum RawMatchKind {
	#[default]
	Presence,
	Literal,
	Regex,
}

#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(deny_unknown_fields)]
pub struct RawHeaderConstraint {
	pub name: String,
	#[serde(default)]
	pub kind: RawMatchKind,
	#[serde(default)]
	pub value: String,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
pub enum RawActionKind {
	#[default]
	Passthrough,
	Abort,
	Dynamic,
}

#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(deny_unknown_fields)]
pub struct RawKv {
	pub key: String,
	pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(deny_unknown_fields)]
pub struct RawAction {
	pub result: Vec<String>,
	#[serde(default)]
	pub action: RawActionKind,
	#[serde(default)]
	pub upstream_inject_headers: Vec<RawKv>,
	#[serde(default)]
	pub upstream_inject_any: bool,
	#[serde(default)]
	pub upstream_remove_headers: Vec<String>,
	#[serde(default)]
	pub downstream_inject_headers: Vec<RawKv>,
	#[serde(default)]
	pub downstream_inject_any: bool,
	#[serde(default)]
	pub downstream_remove_headers: Vec<String>,
	#[serde(default)]
	pub use_rpc_response: bool,
	#[serde(default = "default_response_code")]
	pub response_code: u16,
	#[serde(default)]
	pub response_headers: Vec<RawKv>,
	#[serde(default)]
	pub response_body: String,
}

/// Raw, directly-deserializable filter configuration. Mirrors the JSON
/// schema; validated and resolved into a [`FilterConfig`] once at load.
#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
	#[serde(default)]
	pub trigger_headers: Vec<RawHeaderConstraint>,
	#[serde(default)]
	pub antitrigger_headers: Vec<RawHeaderConstraint>,
	#[serde(default)]
	pub always_triggered: bool,
	#[serde(default)]
	pub include_headers: Vec<String>,
	#[serde(default)]
	pub include_all_headers: bool,
	#[serde(default)]
	pub params: HashMap<String, String>,
	pub cluster_name: String,
	#[serde(default = "default_timeout_ms")]
	pub timeout_ms: u64,
	#[serde(default)]
	pub actions: Vec<RawAction>,
}

/// Immutable per-filter-instance configuration, resolved from [`RawConfig`].
/// Shared (read-only) across all streams bound to this filter chain entry.
#[derive(Debug)]
pub struct FilterConfig {
	pub trigger_constraints: Vec<HeaderConstraint>,
	pub trigger_cookie_names: Vec<String>,
	pub antitrigger_constraints: Vec<HeaderConstraint>,
	pub always_triggered: bool,
	pub include_headers: Vec<String>,
	pub include_all_headers: bool,
	pub params: HashMap<String, String>,
	pub cluster_name: String,
	pub timeout: Duration,
	pub actions: ActionTable,
	pub upstream_inject_names: Vec<String>,
	pub downstream_inject_names: Vec<String>,
}

/// Splits a list of names into (plain header names, cookie names), where a
/// `cookie.<name>` entry denotes the second.
fn split_cookie_prefixed(names: &[String]) -> (Vec<String>, Vec<String>) {
	let mut plain = Vec::new();
	let mut cookies = Vec::new();
	for name in names {
		match name.strip_prefix(COOKIE_PREFIX) {
			Some(cookie_name) => cookies.push(cookie_name.to_string()),
			None => plain.push(name.clone()),
		}
	}
	(plain, cookies)
}

fn build_constraint(raw: &RawHeaderConstraint) -> Result<HeaderConstraint, ConfigError> {
	match raw.kind {
		RawMatchKind::Presence => Ok(HeaderConstraint::presence(raw.name.clone())),
		RawMatchKind::Literal => Ok(HeaderConstraint::literal(raw.name.clone(), raw.value.clone())),
		RawMatchKind::Regex => HeaderConstraint::regex(raw.name.clone(), &raw.value),
	}
}

fn build_action(raw: RawAction) -> Result<Action, ConfigError> {
	let (upstream_remove_headers, upstream_remove_cookie_names) = split_cookie_prefixed(&raw.upstream_remove_headers);

	Ok(Action {
		kind: match raw.action {
			RawActionKind::Passthrough => ActionKind::Passthrough,
			RawActionKind::Abort => ActionKind::Abort,
			RawActionKind::Dynamic => ActionKind::Dynamic,
		},
		upstream_inject_headers: raw.upstream_inject_headers.iter().map(|kv| kv.key.clone()).collect(),
		upstream_remove_headers,
		upstream_remove_cookie_names,
		upstream_inject_any: raw.upstream_inject_any,
		downstream_inject_headers: raw.downstream_inject_headers.iter().map(|kv| kv.key.clone()).collect(),
		downstream_remove_headers: raw.downstream_remove_headers,
		downstream_inject_any: raw.downstream_inject_any,
		use_rpc_response: raw.use_rpc_response,
		response_code: raw.response_code,
		response_headers: raw.response_headers.into_iter().map(|kv| (kv.key, kv.value)).collect(),
		response_body: raw.response_body,
	})
}

impl FilterConfig {
	/// Validates and resolves a [`RawConfig`] into an immutable
	/// [`FilterConfig`]. `cluster_exists` lets the caller supply cluster
	/// manager lookup without this crate depending on it directly.
	pub fn from_raw(raw: RawConfig, cluster_exists: impl Fn(&str) -> bool) -> Result<Self, ConfigError> {
		let (include_headers, include_cookie_names) = split_cookie_prefixed(&raw.include_headers);
		// Cookie includes ride along as ordinary include names prefixed back
		// with `cookie.` when building the RPC request; keep them joined here.
		let mut include_headers = include_headers;
		include_headers.extend(include_cookie_names.into_iter().map(|c| format!("{COOKIE_PREFIX}{c}")));

		let mut trigger_constraints = Vec::new();
		let mut trigger_cookie_names = Vec::new();
		for raw_constraint in &raw.trigger_headers {
			if let Some(cookie_name) = raw_constraint.name.strip_prefix(COOKIE_PREFIX) {
				trigger_cookie_names.push(cookie_name.to_string());
			} else {
				trigger_constraints.push(build_constraint(raw_constraint)?);
			}
		}

		let antitrigger_constraints = raw
			.antitrigger_headers
			.iter()
			.map(build_constraint)
			.collect::<Result<Vec<_>, _>>()?;

		if !raw.always_triggered && trigger_constraints.is_empty() && trigger_cookie_names.is_empty() {
			return Err(ConfigError::NoTrigger);
		}

		if raw.cluster_name.is_empty() {
			return Err(ConfigError::EmptyCluster);
		}
		if !cluster_exists(&raw.cluster_name) {
			return Err(ConfigError::UnknownCluster(raw.cluster_name));
		}

		if raw.timeout_ms < 1 {
			return Err(ConfigError::InvalidTimeout(raw.timeout_ms as i64));
		}

		let actions = raw
			.actions
			.into_iter()
			.map(|a| Ok((a.result.clone(), build_action(a)?)))
			.collect::<Result<Vec<_>, ConfigError>>()?;
		let actions = ActionTable::build(actions)?;

		if !actions.can_inject_anything() {
			return Err(ConfigError::NoPossibleInjection);
		}

		let upstream_inject_names = actions.all_upstream_inject_names();
		let downstream_inject_names = actions.all_downstream_inject_names();

		Ok(Self {
			trigger_constraints,
			trigger_cookie_names,
			antitrigger_constraints,
			always_triggered: raw.always_triggered,
			include_headers,
			include_all_headers: raw.include_all_headers,
			params: raw.params,
			cluster_name: raw.cluster_name,
			timeout: Duration::from_millis(raw.timeout_ms),
			actions,
			upstream_inject_names,
			downstream_inject_names,
		})
	}
}

/// Holds the live [`FilterConfig`] for a filter chain entry. Readers (one
/// per stream) take a cheap `Arc` snapshot; a config reload swaps in a new
/// one without blocking in-flight streams, which keep running against their
/// already-snapshotted config.
#[derive(Debug)]
pub struct ConfigHandle(arc_swap::ArcSwap<FilterConfig>);

impl ConfigHandle {
	pub fn new(config: FilterConfig) -> Self {
		Self(arc_swap::ArcSwap::new(std::sync::Arc::new(config)))
	}

	pub fn load(&self) -> std::sync::Arc<FilterConfig> {
		self.0.load_full()
	}

	pub fn store(&self, config: FilterConfig) {
		self.0.store(std::sync::Arc::new(config));
	}
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
