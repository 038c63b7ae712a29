//! Verifier using a single pre-shared key.

// crates.io
use jsonwebtoken::DecodingKey;
// self
use crate::{
	_prelude::*,
	jwt::{IdTokenVerifierFactory, JwtVerifier, VerificationPolicy, VerifyFuture},
	registration::ClientRegistration,
};

/// Produces verifiers that check every registration's tokens with one fixed key.
///
/// Useful for providers signing ID tokens with the client secret (`HS256`) and for tests.
#[derive(Clone)]
pub struct StaticKeyVerifierFactory {
	key: DecodingKey,
}
impl StaticKeyVerifierFactory {
	/// Uses `key` for every registration.
	pub fn new(key: DecodingKey) -> Self {
		Self { key }
	}

	/// Uses a shared HMAC secret.
	pub fn from_secret(secret: &[u8]) -> Self {
		Self::new(DecodingKey::from_secret(secret))
	}
}
impl IdTokenVerifierFactory for StaticKeyVerifierFactory {
	fn create_verifier(&self, registration: &ClientRegistration) -> Arc<dyn JwtVerifier> {
		Arc::new(StaticKeyVerifier {
			key: self.key.clone(),
			policy: VerificationPolicy::for_registration(registration),
		})
	}
}
impl Debug for StaticKeyVerifierFactory {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("StaticKeyVerifierFactory(..)")
	}
}

struct StaticKeyVerifier {
	key: DecodingKey,
	policy: VerificationPolicy,
}
impl JwtVerifier for StaticKeyVerifier {
	fn verify<'a>(&'a self, token: &'a str) -> VerifyFuture<'a> {
		Box::pin(async move {
			let header = jsonwebtoken::decode_header(token)?;

			self.policy.check_algorithm(header.alg)?;
			self.policy.verify(token, &self.key)
		})
	}
}
