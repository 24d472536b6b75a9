use http::HeaderMap;
use regex::Regex;

use crate::error::ConfigError;

/// How a [`HeaderConstraint`] compares against an observed header value.
#[derive(Debug, Clone)]
pub enum MatchKind {
	/// Matches any value as long as the header is present.
	Presence,
	/// Byte-exact match against `expected`.
	Literal(String),
	/// Full-string match against a pre-compiled pattern.
	Regex(Regex),
}

/// A single trigger/antitrigger/include rule: does header `name` satisfy `kind`.
#[derive(Debug, Clone)]
pub struct HeaderConstraint {
	pub name: String,
	pub kind: MatchKind,
}

impl HeaderConstraint {
	pub fn presence(name: impl Into<String>) -> Self {
		Self { name: name.into(), kind: MatchKind::Presence }
	}

	pub fn literal(name: impl Into<String>, expected: impl Into<String>) -> Self {
		Self { name: name.into(), kind: MatchKind::Literal(expected.into()) }
	}

	pub fn regex(name: impl Into<String>, pattern: &str) -> Result<Self, ConfigError> {
		let name = name.into();
		let re = Regex::new(&format!("^(?:{pattern})$")).map_err(|source| ConfigError::InvalidRegex {
			header: name.clone(),
			source,
		})?;
		Ok(Self { name, kind: MatchKind::Regex(re) })
	}

	/// Tests a single observed value against this constraint.
	pub fn matches_value(&self, value: &str) -> bool {
		match &self.kind {
			MatchKind::Presence => true,
			MatchKind::Literal(expected) => expected == value,
			MatchKind::Regex(re) => re.is_match(value),
		}
	}
}

/// Looks up `constraint.name` in `headers` (case-insensitive) and tests the
/// first value found, if any.
pub fn matches(headers: &HeaderMap, constraint: &HeaderConstraint) -> bool {
	headers
		.get(constraint.name.as_str())
		.and_then(|v| v.to_str().ok())
		.is_some_and(|v| constraint.matches_value(v))
}

/// True if any constraint in `constraints` matches `headers`.
pub fn matches_any(headers: &HeaderMap, constraints: &[HeaderConstraint]) -> bool {
	constraints.iter().any(|c| matches(headers, c))
}

#[cfg(test)]
#[path = "header_matcher_tests.rs"]
mod tests;
