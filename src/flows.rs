//! Login flows: building the authorization redirect and authenticating its result.

pub mod authorization;

mod authentication;

pub use authorization::*;

// self
use crate::{
	_prelude::*,
	auth::{AuthoritiesMapper, IdentityAuthoritiesMapper},
	error::ConfigError,
	jwt::IdTokenVerifierFactory,
	oauth::TokenExchangeClient,
	userinfo::UserProfileLoader,
};

/// How the ID token `nonce` claim is treated.
///
/// There is no default; every deployment has to pick one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoncePolicy {
	/// Never compare the nonce.
	///
	/// Only for deployments where a request-rewriting intermediary sits between the client and
	/// the provider and breaks nonce round-tripping. The attempt stays exposed to ID token
	/// replay and injection; `state` is still checked. Do not select this in any other topology.
	Skip,
	/// Compare the `nonce` claim with the nonce sent in the authorization request, when one was
	/// sent, and fail with [`Error::InvalidNonce`] on mismatch.
	Enforce,
}

/// Authenticates completed authorization-code logins against an OpenID Connect provider.
///
/// All collaborators are fixed at construction and shared read-only, so one manager serves any
/// number of concurrent attempts. See [`OidcAuthenticationManager::authenticate`] for the steps.
#[derive(Clone)]
pub struct OidcAuthenticationManager {
	token_client: Arc<dyn TokenExchangeClient>,
	verifier_factory: Arc<dyn IdTokenVerifierFactory>,
	user_loader: Arc<dyn UserProfileLoader>,
	authorities_mapper: Arc<dyn AuthoritiesMapper>,
	nonce_policy: NoncePolicy,
}
impl OidcAuthenticationManager {
	/// Starts a builder from the two collaborators that have no sensible default.
	pub fn builder(
		token_client: Arc<dyn TokenExchangeClient>,
		user_loader: Arc<dyn UserProfileLoader>,
	) -> OidcAuthenticationManagerBuilder {
		OidcAuthenticationManagerBuilder {
			token_client,
			user_loader,
			verifier_factory: None,
			authorities_mapper: Arc::new(IdentityAuthoritiesMapper),
			nonce_policy: None,
		}
	}

	/// Nonce policy in effect.
	pub fn nonce_policy(&self) -> NoncePolicy {
		self.nonce_policy
	}
}
impl Debug for OidcAuthenticationManager {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OidcAuthenticationManager")
			.field("nonce_policy", &self.nonce_policy)
			.finish_non_exhaustive()
	}
}

/// Assembles an immutable [`OidcAuthenticationManager`].
pub struct OidcAuthenticationManagerBuilder {
	token_client: Arc<dyn TokenExchangeClient>,
	user_loader: Arc<dyn UserProfileLoader>,
	verifier_factory: Option<Arc<dyn IdTokenVerifierFactory>>,
	authorities_mapper: Arc<dyn AuthoritiesMapper>,
	nonce_policy: Option<NoncePolicy>,
}
impl OidcAuthenticationManagerBuilder {
	/// Sets the factory producing per-registration ID token verifiers (required).
	pub fn verifier_factory(mut self, factory: Arc<dyn IdTokenVerifierFactory>) -> Self {
		self.verifier_factory = Some(factory);

		self
	}

	/// Replaces the identity authority mapper.
	pub fn authorities_mapper(mut self, mapper: Arc<dyn AuthoritiesMapper>) -> Self {
		self.authorities_mapper = mapper;

		self
	}

	/// Chooses the nonce policy (required).
	pub fn nonce_policy(mut self, policy: NoncePolicy) -> Self {
		self.nonce_policy = Some(policy);

		self
	}

	/// Validates the wiring and freezes the manager.
	pub fn build(self) -> Result<OidcAuthenticationManager, ConfigError> {
		let verifier_factory = self.verifier_factory.ok_or(ConfigError::MissingVerifierFactory)?;
		let nonce_policy = self.nonce_policy.ok_or(ConfigError::MissingNoncePolicy)?;

		Ok(OidcAuthenticationManager {
			token_client: self.token_client,
			verifier_factory,
			user_loader: self.user_loader,
			authorities_mapper: self.authorities_mapper,
			nonce_policy,
		})
	}
}
impl Debug for OidcAuthenticationManagerBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OidcAuthenticationManagerBuilder")
			.field("verifier_factory_set", &self.verifier_factory.is_some())
			.field("nonce_policy", &self.nonce_policy)
			.finish_non_exhaustive()
	}
}
