//! Claim maps shared by ID tokens, user-info responses, and token response extras.

// self
use crate::_prelude::*;

/// Claim name to JSON value mapping.
pub type ClaimSet = BTreeMap<String, Value>;

/// Subject claim name.
pub const SUB: &str = "sub";
/// Nonce claim name.
pub const NONCE: &str = "nonce";
/// Issued-at claim name.
pub const IAT: &str = "iat";
/// Expiry claim name.
pub const EXP: &str = "exp";

/// Returns the claim as a trimmed, non-empty string.
pub fn claim_str<'a>(claims: &'a ClaimSet, name: &str) -> Option<&'a str> {
	claims.get(name).and_then(Value::as_str).map(str::trim).filter(|value| !value.is_empty())
}

/// Returns the claim as a list of strings; a single string counts as a one-element list.
pub fn claim_string_list(claims: &ClaimSet, name: &str) -> Vec<String> {
	match claims.get(name) {
		Some(Value::String(text)) => vec![text.clone()],
		Some(Value::Array(items)) =>
			items.iter().filter_map(Value::as_str).map(ToOwned::to_owned).collect(),
		_ => Vec::new(),
	}
}

/// Returns a NumericDate claim as an instant.
pub fn claim_instant(claims: &ClaimSet, name: &str) -> Option<OffsetDateTime> {
	let seconds = match claims.get(name)? {
		Value::Number(number) => number.as_i64().or_else(|| number.as_f64().map(|f| f as i64))?,
		_ => return None,
	};

	OffsetDateTime::from_unix_timestamp(seconds).ok()
}
