//! ID token verification.
//!
//! The authentication manager only sees two seams: [`IdTokenVerifierFactory`] produces a
//! [`JwtVerifier`] per registration, and the verifier turns a raw compact JWT into a verified
//! [`Jwt`]. [`JwksVerifierFactory`] backs verifiers with the provider's JWK set;
//! [`StaticKeyVerifierFactory`] uses one pre-shared key.

pub mod jwks;
pub mod static_key;

pub use jwks::*;
pub use static_key::*;

// crates.io
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
// self
use crate::{
	_prelude::*,
	auth::{ClaimSet, claims},
	registration::ClientRegistration,
};

/// Boxed future returned by [`JwtVerifier::verify`].
pub type VerifyFuture<'a> = Pin<Box<dyn Future<Output = Result<Jwt, JwtError>> + 'a + Send>>;

/// Reasons a token fails verification.
///
/// The display text is what ends up in the `invalid_id_token` description.
#[derive(Debug, ThisError)]
pub enum JwtError {
	/// Structure, signature, expiry, audience, or issuer check failed.
	#[error("{0}")]
	Decode(#[from] jsonwebtoken::errors::Error),
	/// Header names a different algorithm than the registration expects.
	#[error("Unexpected signing algorithm {found:?}, expected {expected:?}.")]
	UnexpectedAlgorithm {
		/// Algorithm the registration expects.
		expected: Algorithm,
		/// Algorithm named in the header.
		found: Algorithm,
	},
	/// No key in the key set carries the header's `kid`.
	#[error("No signing key found for kid `{kid}`.")]
	KeyNotFound {
		/// Key identifier from the header.
		kid: String,
	},
	/// The header has no `kid` and the key set holds more than one key.
	#[error("Token has no kid and the key set holds {keys} keys.")]
	AmbiguousKey {
		/// Number of keys published.
		keys: usize,
	},
	/// The key set could not be retrieved.
	#[error("Signing key set is unavailable: {source}")]
	KeySetUnavailable {
		/// Retrieval failure.
		#[source]
		source: Box<Error>,
	},
	/// A claim every ID token must carry is absent.
	#[error("Missing required claim `{claim}`.")]
	MissingClaim {
		/// Claim name.
		claim: &'static str,
	},
	/// `iat` lies further in the future than the clock skew allows.
	#[error("Token was issued in the future.")]
	IssuedInFuture,
}

/// Verifies a raw compact-serialized token.
pub trait JwtVerifier
where
	Self: Send + Sync,
{
	/// Verifies `token` and returns its claims.
	fn verify<'a>(&'a self, token: &'a str) -> VerifyFuture<'a>;
}

/// Produces the verifier used for a registration's ID tokens.
pub trait IdTokenVerifierFactory
where
	Self: Send + Sync,
{
	/// Returns a verifier bound to `registration` (audience, issuer, algorithm, key source).
	fn create_verifier(&self, registration: &ClientRegistration) -> Arc<dyn JwtVerifier>;
}
impl<F> IdTokenVerifierFactory for F
where
	F: Fn(&ClientRegistration) -> Arc<dyn JwtVerifier> + Send + Sync,
{
	fn create_verifier(&self, registration: &ClientRegistration) -> Arc<dyn JwtVerifier> {
		self(registration)
	}
}

/// Verified token.
#[derive(Clone, PartialEq)]
pub struct Jwt {
	/// Raw compact-serialized value.
	pub value: String,
	/// `iat` claim.
	pub issued_at: OffsetDateTime,
	/// `exp` claim.
	pub expires_at: OffsetDateTime,
	/// Every claim of the payload.
	pub claims: ClaimSet,
}
impl Jwt {
	/// Assembles a token from already verified claims; `iat` and `exp` are required.
	pub fn from_claims(value: impl Into<String>, payload: ClaimSet) -> Result<Self, JwtError> {
		let issued_at = claims::claim_instant(&payload, claims::IAT)
			.ok_or(JwtError::MissingClaim { claim: claims::IAT })?;
		let expires_at = claims::claim_instant(&payload, claims::EXP)
			.ok_or(JwtError::MissingClaim { claim: claims::EXP })?;

		Ok(Self { value: value.into(), issued_at, expires_at, claims: payload })
	}
}
impl Debug for Jwt {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Jwt")
			.field("value", &"<redacted>")
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.field("claims", &self.claims.keys().collect::<Vec<_>>())
			.finish()
	}
}

/// Checks bound to one registration: algorithm, audience, issuer, and clock skew.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationPolicy {
	/// Expected signing algorithm.
	pub algorithm: Algorithm,
	/// Expected audience (the client identifier).
	pub audience: String,
	/// Expected issuer, if configured.
	pub issuer: Option<String>,
	/// Tolerance for `exp` and `iat`.
	pub clock_skew: Duration,
}
impl VerificationPolicy {
	/// Derives the policy from a registration.
	pub fn for_registration(registration: &ClientRegistration) -> Self {
		Self {
			algorithm: registration.id_token_signing_alg,
			audience: registration.client_id.clone(),
			issuer: registration.issuer.clone(),
			clock_skew: registration.clock_skew,
		}
	}

	/// Rejects headers naming an unexpected algorithm.
	pub fn check_algorithm(&self, found: Algorithm) -> Result<(), JwtError> {
		if found == self.algorithm {
			Ok(())
		} else {
			Err(JwtError::UnexpectedAlgorithm { expected: self.algorithm, found })
		}
	}

	/// Verifies `token` with `key` against this policy.
	pub fn verify(&self, token: &str, key: &DecodingKey) -> Result<Jwt, JwtError> {
		let data = jsonwebtoken::decode::<ClaimSet>(token, key, &self.validation())?;
		let jwt = Jwt::from_claims(token, data.claims)?;

		if jwt.issued_at > OffsetDateTime::now_utc() + self.clock_skew {
			return Err(JwtError::IssuedInFuture);
		}

		Ok(jwt)
	}

	fn validation(&self) -> Validation {
		let mut validation = Validation::new(self.algorithm);

		validation.set_audience(&[self.audience.as_str()]);
		validation.leeway = u64::try_from(self.clock_skew.whole_seconds()).unwrap_or_default();

		if let Some(issuer) = &self.issuer {
			validation.set_issuer(&[issuer.as_str()]);
			validation.set_required_spec_claims(&["exp", "sub", "aud", "iss"]);
		} else {
			validation.set_required_spec_claims(&["exp", "sub", "aud"]);
		}

		validation
	}
}
