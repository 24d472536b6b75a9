use http::{HeaderMap, HeaderValue};

use super::*;

fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
	let mut map = HeaderMap::new();
	for (k, v) in pairs {
		map.insert(
			http::HeaderName::from_bytes(k.as_bytes()).unwrap(),
			HeaderValue::from_str(v).unwrap(),
		);
	}
	map
}

#[test]
fn presence_matches_any_value() {
	let c = HeaderConstraint::presence("x-trace");
	assert!(matches(&headers(&[("x-trace", "")]), &c));
	assert!(matches(&headers(&[("x-trace", "anything")]), &c));
	assert!(!matches(&headers(&[("x-other", "v")]), &c));
}

#[test]
fn literal_is_byte_exact_and_case_sensitive_on_value() {
	let c = HeaderConstraint::literal("x-env", "prod");
	assert!(matches(&headers(&[("x-env", "prod")]), &c));
	assert!(!matches(&headers(&[("x-env", "Prod")]), &c));
	assert!(!matches(&headers(&[("x-env", "production")]), &c));
}

#[test]
fn header_name_lookup_is_case_insensitive() {
	let c = HeaderConstraint::literal("X-Env", "prod");
	assert!(matches(&headers(&[("x-env", "prod")]), &c));
}

#[test]
fn regex_requires_full_match() {
	let c = HeaderConstraint::regex("x-id", r"[0-9]+").unwrap();
	assert!(matches(&headers(&[("x-id", "12345")]), &c));
	assert!(!matches(&headers(&[("x-id", "12345abc")]), &c));
	assert!(!matches(&headers(&[("x-id", "abc12345")]), &c));
}

#[test]
fn invalid_regex_is_a_config_error() {
	let err = HeaderConstraint::regex("x-id", "(unclosed");
	assert!(err.is_err());
}

#[test]
fn matches_any_short_circuits_on_first_hit() {
	let constraints = vec![
		HeaderConstraint::literal("x-a", "1"),
		HeaderConstraint::literal("x-b", "2"),
	];
	assert!(matches_any(&headers(&[("x-b", "2")]), &constraints));
	assert!(!matches_any(&headers(&[("x-b", "3")]), &constraints));
}
