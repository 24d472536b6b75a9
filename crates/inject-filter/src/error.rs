use thiserror::Error;

/// Errors raised while validating a [`crate::config::RawConfig`] into a
/// [`crate::config::FilterConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("no trigger_headers, trigger cookies, or always_triggered: filter would never run")]
	NoTrigger,

	#[error("no action in the action table can inject any upstream or downstream header")]
	NoPossibleInjection,

	#[error("cluster_name is empty")]
	EmptyCluster,

	#[error("cluster '{0}' does not exist")]
	UnknownCluster(String),

	#[error("timeout_ms must be >= 1, got {0}")]
	InvalidTimeout(i64),

	#[error("invalid regex for header '{header}': {source}")]
	InvalidRegex {
		header: String,
		#[source]
		source: regex::Error,
	},

	#[error("action result list is empty")]
	EmptyResultList,

	#[error("result key '{0}' begins with the reserved 'local.' namespace")]
	ReservedResultKey(String),
}

/// Errors surfaced by the RPC client used to reach the enrichment service.
#[derive(Debug, Error)]
pub enum RpcError {
	#[error("dispatch failed: {0}")]
	Dispatch(#[from] tonic::transport::Error),

	#[error("rpc call failed: {0}")]
	Status(#[from] tonic::Status),

	#[error("rpc timed out after {0:?}")]
	Timeout(std::time::Duration),
}
