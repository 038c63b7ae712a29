//! TOML configuration for the login layer.
//!
//! ```toml
//! nonce_policy = "skip"
//!
//! [registrations.linkedin]
//! client_id = "client-123"
//! client_secret = "shh"
//! redirect_uri = "https://app.example.com/login/oauth2/code/linkedin"
//! authorization_uri = "https://www.linkedin.com/oauth/v2/authorization"
//! token_uri = "https://www.linkedin.com/oauth/v2/accessToken"
//! jwk_set_uri = "https://www.linkedin.com/oauth/openid/jwks"
//! user_info_uri = "https://api.linkedin.com/v2/userinfo"
//! issuer = "https://www.linkedin.com/oauth"
//! scopes = ["openid", "profile", "email"]
//! ```

// std
use std::path::Path;
// crates.io
use jsonwebtoken::Algorithm;
// self
use crate::{
	_prelude::*,
	auth::{RegistrationId, ScopeSet},
	error::ConfigError,
	flows::NoncePolicy,
	registration::{ClientAuthMethod, ClientRegistration, InMemoryRegistrationRepository},
};

/// Root configuration document.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginConfig {
	/// Nonce handling; there is no default and the key must be present.
	pub nonce_policy: NoncePolicy,
	/// Registrations keyed by identifier.
	#[serde(default)]
	pub registrations: BTreeMap<String, RegistrationConfig>,
}
impl LoginConfig {
	/// Parses a TOML document.
	pub fn from_toml_str(document: &str) -> Result<Self, ConfigError> {
		Ok(toml::from_str(document)?)
	}

	/// Reads and parses a TOML file.
	pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		Self::from_toml_str(&std::fs::read_to_string(path)?)
	}

	/// Validates every registration and loads them into a repository.
	pub fn repository(&self) -> Result<InMemoryRegistrationRepository, ConfigError> {
		let registrations = self
			.registrations
			.iter()
			.map(|(id, registration)| registration.to_registration(id))
			.collect::<Result<Vec<_>, _>>()?;

		Ok(InMemoryRegistrationRepository::new(registrations))
	}
}
impl FromStr for LoginConfig {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::from_toml_str(s)
	}
}

/// One `[registrations.<id>]` table.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistrationConfig {
	/// OAuth 2.0 client identifier.
	pub client_id: String,
	/// Client secret for confidential clients.
	#[serde(default)]
	pub client_secret: Option<String>,
	/// Token endpoint authentication method.
	#[serde(default)]
	pub client_auth_method: ClientAuthMethod,
	/// Redirect URI registered with the provider.
	pub redirect_uri: Url,
	/// Authorization endpoint.
	pub authorization_uri: Url,
	/// Token endpoint.
	pub token_uri: Url,
	/// JWK set endpoint.
	pub jwk_set_uri: Url,
	/// User-info endpoint.
	#[serde(default)]
	pub user_info_uri: Option<Url>,
	/// Expected ID token issuer.
	#[serde(default)]
	pub issuer: Option<String>,
	/// Default scopes.
	#[serde(default)]
	pub scopes: Vec<String>,
	/// ID token signing algorithm (`RS256` when absent).
	#[serde(default)]
	pub id_token_signing_alg: Option<Algorithm>,
	/// Clock skew in seconds (60 when absent).
	#[serde(default)]
	pub clock_skew_seconds: Option<i64>,
	/// Claim used as the principal name (`sub` when absent).
	#[serde(default)]
	pub user_name_attribute: Option<String>,
}
impl RegistrationConfig {
	fn to_registration(&self, id: &str) -> Result<ClientRegistration, ConfigError> {
		let mut builder = ClientRegistration::builder(RegistrationId::new(id)?)
			.client_id(&self.client_id)
			.client_auth_method(self.client_auth_method)
			.redirect_uri(self.redirect_uri.clone())
			.authorization_endpoint(self.authorization_uri.clone())
			.token_endpoint(self.token_uri.clone())
			.jwk_set_endpoint(self.jwk_set_uri.clone())
			.scopes(ScopeSet::new(self.scopes.iter().cloned())?);

		if let Some(secret) = &self.client_secret {
			builder = builder.client_secret(secret);
		}
		if let Some(user_info) = &self.user_info_uri {
			builder = builder.user_info_endpoint(user_info.clone());
		}
		if let Some(issuer) = &self.issuer {
			builder = builder.issuer(issuer);
		}
		if let Some(alg) = self.id_token_signing_alg {
			builder = builder.id_token_signing_alg(alg);
		}
		if let Some(seconds) = self.clock_skew_seconds {
			builder = builder.clock_skew(Duration::seconds(seconds));
		}
		if let Some(attribute) = &self.user_name_attribute {
			builder = builder.user_name_attribute(attribute);
		}

		builder
			.build()
			.map_err(|source| ConfigError::InvalidRegistration { id: id.to_owned(), source })
	}
}
