use super::*;

fn cluster_exists(name: &str) -> bool {
	name == "enrichment-cluster"
}

fn base_raw() -> RawConfig {
	serde_json::from_value(serde_json::json!({
		"trigger_headers": [{"name": "x-trigger"}],
		"cluster_name": "enrichment-cluster",
		"actions": [
			{"result": ["ok"], "upstream_inject_headers": [{"key": "x-jwt", "value": ""}]}
		]
	}))
	.unwrap()
}

#[test]
fn good_config_with_default_timeout() {
	let config = FilterConfig::from_raw(base_raw(), cluster_exists).unwrap();
	assert_eq!(config.timeout, std::time::Duration::from_millis(120));
}

#[test]
fn good_config_with_explicit_timeout() {
	let mut raw = base_raw();
	raw.timeout_ms = 50;
	let config = FilterConfig::from_raw(raw, cluster_exists).unwrap();
	assert_eq!(config.timeout, std::time::Duration::from_millis(50));
}

#[test]
fn bad_config_no_trigger() {
	let mut raw = base_raw();
	raw.trigger_headers.clear();
	let err = FilterConfig::from_raw(raw, cluster_exists);
	assert!(matches!(err, Err(ConfigError::NoTrigger)));
}

#[test]
fn always_triggered_needs_no_trigger_headers() {
	let mut raw = base_raw();
	raw.trigger_headers.clear();
	raw.always_triggered = true;
	assert!(FilterConfig::from_raw(raw, cluster_exists).is_ok());
}

#[test]
fn bad_config_unknown_cluster() {
	let mut raw = base_raw();
	raw.cluster_name = "does-not-exist".into();
	let err = FilterConfig::from_raw(raw, cluster_exists);
	assert!(matches!(err, Err(ConfigError::UnknownCluster(_))));
}

#[test]
fn bad_config_empty_cluster_name() {
	let mut raw = base_raw();
	raw.cluster_name = String::new();
	let err = FilterConfig::from_raw(raw, cluster_exists);
	assert!(matches!(err, Err(ConfigError::EmptyCluster)));
}

#[test]
fn bad_config_zero_timeout() {
	let mut raw = base_raw();
	raw.timeout_ms = 0;
	let err = FilterConfig::from_raw(raw, cluster_exists);
	assert!(matches!(err, Err(ConfigError::InvalidTimeout(_))));
}

#[test]
fn bad_config_no_possible_injection() {
	let mut raw = base_raw();
	raw.actions = vec![];
	let err = FilterConfig::from_raw(raw, cluster_exists);
	assert!(matches!(err, Err(ConfigError::NoPossibleInjection)));
}

#[test]
fn cookie_prefixed_trigger_becomes_a_cookie_name_not_a_header_constraint() {
	let mut raw = base_raw();
	raw.trigger_headers.push(RawHeaderConstraint {
		name: "cookie.sessionId".into(),
		kind: RawMatchKind::Presence,
		value: String::new(),
	});
	let config = FilterConfig::from_raw(raw, cluster_exists).unwrap();
	assert_eq!(config.trigger_cookie_names, vec!["sessionId".to_string()]);
	assert_eq!(config.trigger_constraints.len(), 1);
}

#[test]
fn cookie_prefixed_remove_header_splits_into_cookie_names() {
	let mut raw = base_raw();
	raw.actions[0].upstream_remove_headers = vec!["x-legacy".into(), "cookie.sessionId".into()];
	let config = FilterConfig::from_raw(raw, cluster_exists).unwrap();
	let action = config.actions.match_result("ok");
	assert_eq!(action.upstream_remove_headers, vec!["x-legacy".to_string()]);
	assert_eq!(action.upstream_remove_cookie_names, vec!["sessionId".to_string()]);
}

#[test]
fn unknown_top_level_key_is_rejected_by_deny_unknown_fields() {
	let result: Result<RawConfig, _> = serde_json::from_value(serde_json::json!({
		"trigger_headers": [{"name": "x-trigger"}],
		"cluster_name": "enrichment-cluster",
		"bogus_key": true,
	}));
	assert!(result.is_err());
}

#[test]
fn regex_constraint_is_compiled_at_load() {
	let mut raw = base_raw();
	raw.trigger_headers = vec![RawHeaderConstraint {
		name: "x-id".into(),
		kind: RawMatchKind::Regex,
		value: "[0-9]+".into(),
	}];
	let config = FilterConfig::from_raw(raw, cluster_exists).unwrap();
	assert_eq!(config.trigger_constraints.len(), 1);
}

#[test]
fn config_handle_reload_is_visible_to_new_loads() {
	let config = FilterConfig::from_raw(base_raw(), cluster_exists).unwrap();
	let handle = ConfigHandle::new(config);
	assert_eq!(handle.load().cluster_name, "enrichment-cluster");

	let mut raw = base_raw();
	raw.cluster_name = "enrichment-cluster".into();
	raw.timeout_ms = 999;
	let reloaded = FilterConfig::from_raw(raw, cluster_exists).unwrap();
	handle.store(reloaded);

	assert_eq!(handle.load().timeout, std::time::Duration::from_millis(999));
}

#[test]
fn invalid_regex_constraint_is_rejected() {
	let mut raw = base_raw();
	raw.trigger_headers = vec![RawHeaderConstraint {
		name: "x-id".into(),
		kind: RawMatchKind::Regex,
		value: "(unclosed".into(),
	}];
	let err = FilterConfig::from_raw(raw, cluster_exists);
	assert!(matches!(err, Err(ConfigError::InvalidRegex { .. })));
}
