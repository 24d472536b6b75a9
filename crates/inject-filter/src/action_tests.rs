use super::*;

fn passthrough() -> Action {
	Action {
		kind: ActionKind::Passthrough,
		upstream_inject_headers: vec!["x-jwt".into()],
		..Action::default_fail_closed()
	}
}

#[test]
fn exact_match_wins() {
	let table = ActionTable::build(vec![(vec!["ok".into()], passthrough())]).unwrap();
	let action = table.match_result("ok");
	assert_eq!(action.kind, ActionKind::Passthrough);
}

#[test]
fn unmatched_result_falls_back_to_grpc_response_then_any() {
	let table = ActionTable::build(vec![
		(vec!["ok".into()], passthrough()),
		(vec![LOCAL_GRPC_RESPONSE.into()], passthrough()),
	])
	.unwrap();
	assert_eq!(table.match_result("unexpected-token").kind, ActionKind::Passthrough);

	let table_no_catchall = ActionTable::build(vec![(vec!["ok".into()], passthrough())]).unwrap();
	assert_eq!(table_no_catchall.match_result("unexpected-token").kind, ActionKind::Abort);
}

#[test]
fn local_namespace_result_is_treated_as_error_regardless_of_table() {
	let table = ActionTable::build(vec![
		(vec!["ok".into()], passthrough()),
		(vec![LOCAL_ERROR.into()], passthrough()),
	])
	.unwrap();
	// local.* from the server can't spoof the reserved namespace, so it
	// resolves via error_action() even though "local.any" itself isn't the
	// literal string passed in.
	assert_eq!(table.match_result("local.any").kind, ActionKind::Passthrough);
	assert_eq!(table.match_result("local.whatever").kind, ActionKind::Passthrough);
}

#[test]
fn missing_local_any_installs_fail_closed_default() {
	let table = ActionTable::build(vec![(vec!["ok".into()], passthrough())]).unwrap();
	let any = table.match_result("not-configured");
	assert_eq!(any.kind, ActionKind::Abort);
	assert_eq!(any.response_code, 500);
	assert!(any.response_body.is_empty());
}

#[test]
fn error_action_falls_back_to_any_when_local_error_absent() {
	let table = ActionTable::build(vec![(vec!["ok".into()], passthrough())]).unwrap();
	assert_eq!(table.error_action().kind, ActionKind::Abort);
}

#[test]
fn error_action_uses_configured_local_error() {
	let table = ActionTable::build(vec![(vec![LOCAL_ERROR.into()], passthrough())]).unwrap();
	assert_eq!(table.error_action().kind, ActionKind::Passthrough);
}

#[test]
fn reserved_namespace_outside_the_three_known_keys_is_rejected() {
	let err = ActionTable::build(vec![(vec!["local.bogus".into()], passthrough())]);
	assert!(matches!(err, Err(ConfigError::ReservedResultKey(_))));
}

#[test]
fn empty_result_list_is_rejected() {
	let err = ActionTable::build(vec![(vec![], passthrough())]);
	assert!(matches!(err, Err(ConfigError::EmptyResultList)));
}

#[test]
fn can_inject_anything_reflects_configured_actions() {
	let table = ActionTable::build(vec![(vec!["ok".into()], passthrough())]).unwrap();
	assert!(table.can_inject_anything());

	let table_dead = ActionTable::build(vec![(vec!["ok".into()], Action::default_fail_closed())]).unwrap();
	assert!(!table_dead.can_inject_anything());
}
