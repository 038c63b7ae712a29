//! Verified OpenID Connect ID token.

// self
use crate::{
	_prelude::*,
	auth::{ClaimSet, claims},
	jwt::Jwt,
};

/// ID token whose signature and standard claims were verified.
///
/// The only way to obtain one is from a [`Jwt`] returned by a verifier, so holding an `IdToken`
/// implies the raw value passed verification.
#[derive(Clone)]
pub struct IdToken {
	value: String,
	issued_at: OffsetDateTime,
	expires_at: OffsetDateTime,
	claims: ClaimSet,
}
impl IdToken {
	/// Raw compact-serialized token.
	pub fn value(&self) -> &str {
		&self.value
	}

	/// `iat` claim.
	pub fn issued_at(&self) -> OffsetDateTime {
		self.issued_at
	}

	/// `exp` claim.
	pub fn expires_at(&self) -> OffsetDateTime {
		self.expires_at
	}

	/// All claims carried by the token.
	pub fn claims(&self) -> &ClaimSet {
		&self.claims
	}

	/// `sub` claim, when present.
	pub fn subject(&self) -> Option<&str> {
		claims::claim_str(&self.claims, claims::SUB)
	}

	/// `nonce` claim, when present.
	pub fn nonce(&self) -> Option<&str> {
		claims::claim_str(&self.claims, claims::NONCE)
	}

	/// String claim by name.
	pub fn claim_str(&self, name: &str) -> Option<&str> {
		claims::claim_str(&self.claims, name)
	}
}
impl From<Jwt> for IdToken {
	fn from(jwt: Jwt) -> Self {
		Self {
			value: jwt.value,
			issued_at: jwt.issued_at,
			expires_at: jwt.expires_at,
			claims: jwt.claims,
		}
	}
}
impl Debug for IdToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("IdToken")
			.field("value", &"<redacted>")
			.field("subject", &self.subject())
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}
