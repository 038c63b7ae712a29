//! Client registrations: the static per-provider configuration an authentication runs against.
//!
//! A [`ClientRegistration`] is validated once by [`ClientRegistrationBuilder::build`] and shared
//! immutably afterwards. [`RegistrationRepository`] resolves registrations by identifier.

pub mod builder;
pub mod repository;

pub use builder::*;
pub use repository::*;

// crates.io
use jsonwebtoken::Algorithm;
// self
use crate::{
	_prelude::*,
	auth::{RegistrationId, ScopeSet, TokenSecret},
};

/// Default tolerance applied to `exp`/`iat` checks.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::seconds(60);
/// Default claim used as the principal name.
pub const DEFAULT_USER_NAME_ATTRIBUTE: &str = "sub";

/// Client authentication used against the token endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	#[default]
	/// HTTP Basic with `client_id`/`client_secret`.
	ClientSecretBasic,
	/// Form POST body parameters for `client_id`/`client_secret`.
	ClientSecretPost,
	/// Public client; only `client_id` is sent.
	None,
}
impl ClientAuthMethod {
	/// Returns true when the method transmits a client secret.
	pub fn requires_secret(self) -> bool {
		!matches!(self, Self::None)
	}
}

/// Provider endpoints used by a registration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationEndpoints {
	/// Authorization endpoint the browser is redirected to.
	pub authorization: Url,
	/// Token endpoint the code is exchanged at.
	pub token: Url,
	/// JWK set endpoint publishing the ID token signing keys.
	pub jwk_set: Url,
	/// Optional user-info endpoint.
	pub user_info: Option<Url>,
}

/// Immutable client registration.
#[derive(Clone, Debug, PartialEq)]
pub struct ClientRegistration {
	/// Registration identifier.
	pub id: RegistrationId,
	/// OAuth 2.0 client identifier; also the expected ID token audience.
	pub client_id: String,
	/// Client secret for confidential clients.
	pub client_secret: Option<TokenSecret>,
	/// Token endpoint authentication method.
	pub client_auth_method: ClientAuthMethod,
	/// Redirect URI registered with the provider.
	pub redirect_uri: Url,
	/// Provider endpoints.
	pub endpoints: RegistrationEndpoints,
	/// Expected `iss` claim; issuer is not checked when unset.
	pub issuer: Option<String>,
	/// Scopes requested by default when initiating a login.
	pub scopes: ScopeSet,
	/// Algorithm the provider signs ID tokens with.
	pub id_token_signing_alg: Algorithm,
	/// Tolerance applied to time-based claim checks.
	pub clock_skew: Duration,
	/// Claim used as the principal name.
	pub user_name_attribute: String,
}
impl ClientRegistration {
	/// Creates a builder for the provided identifier.
	pub fn builder(id: RegistrationId) -> ClientRegistrationBuilder {
		ClientRegistrationBuilder::new(id)
	}
}

pub(crate) fn is_loopback(url: &Url) -> bool {
	match url.host() {
		Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
		Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
		None => false,
	}
}
