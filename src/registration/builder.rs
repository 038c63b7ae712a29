//! Validating builder for [`ClientRegistration`] values.

// crates.io
use jsonwebtoken::Algorithm;
// self
use crate::{
	_prelude::*,
	auth::{RegistrationId, ScopeSet, TokenSecret},
	registration::{
		ClientAuthMethod, ClientRegistration, DEFAULT_CLOCK_SKEW, DEFAULT_USER_NAME_ATTRIBUTE,
		RegistrationEndpoints, is_loopback,
	},
};

/// Errors raised while validating a registration.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum RegistrationError {
	/// Client identifier missing or blank.
	#[error("Missing client identifier.")]
	MissingClientId,
	/// Confidential auth method configured without a secret.
	#[error("Client authentication method {method:?} requires a client secret.")]
	MissingClientSecret {
		/// Configured method.
		method: ClientAuthMethod,
	},
	/// Redirect URI missing.
	#[error("Missing redirect URI.")]
	MissingRedirectUri,
	/// Authorization endpoint missing.
	#[error("Missing authorization endpoint.")]
	MissingAuthorizationEndpoint,
	/// Token endpoint missing.
	#[error("Missing token endpoint.")]
	MissingTokenEndpoint,
	/// JWK set endpoint missing; ID tokens cannot be verified without it.
	#[error("Missing JWK set endpoint.")]
	MissingJwkSetEndpoint,
	/// Provider endpoints must use HTTPS unless they point at a loopback host.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Clock skew must not be negative.
	#[error("Clock skew cannot be negative.")]
	NegativeClockSkew,
	/// User-name attribute missing or blank.
	#[error("User name attribute cannot be blank.")]
	BlankUserNameAttribute,
}

/// Builder for [`ClientRegistration`] values.
#[derive(Debug)]
pub struct ClientRegistrationBuilder {
	id: RegistrationId,
	client_id: Option<String>,
	client_secret: Option<TokenSecret>,
	client_auth_method: ClientAuthMethod,
	redirect_uri: Option<Url>,
	authorization_endpoint: Option<Url>,
	token_endpoint: Option<Url>,
	jwk_set_endpoint: Option<Url>,
	user_info_endpoint: Option<Url>,
	issuer: Option<String>,
	scopes: ScopeSet,
	id_token_signing_alg: Algorithm,
	clock_skew: Duration,
	user_name_attribute: String,
}
impl ClientRegistrationBuilder {
	/// Creates a builder seeded with the provided identifier.
	pub fn new(id: RegistrationId) -> Self {
		Self {
			id,
			client_id: None,
			client_secret: None,
			client_auth_method: ClientAuthMethod::default(),
			redirect_uri: None,
			authorization_endpoint: None,
			token_endpoint: None,
			jwk_set_endpoint: None,
			user_info_endpoint: None,
			issuer: None,
			scopes: ScopeSet::default(),
			id_token_signing_alg: Algorithm::RS256,
			clock_skew: DEFAULT_CLOCK_SKEW,
			user_name_attribute: DEFAULT_USER_NAME_ATTRIBUTE.into(),
		}
	}

	/// Sets the client identifier.
	pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
		self.client_id = Some(client_id.into());

		self
	}

	/// Sets the client secret.
	pub fn client_secret(mut self, secret: impl Into<String>) -> Self {
		self.client_secret = Some(TokenSecret::new(secret));

		self
	}

	/// Overrides the token endpoint authentication method.
	pub fn client_auth_method(mut self, method: ClientAuthMethod) -> Self {
		self.client_auth_method = method;

		self
	}

	/// Sets the redirect URI.
	pub fn redirect_uri(mut self, url: Url) -> Self {
		self.redirect_uri = Some(url);

		self
	}

	/// Sets the authorization endpoint.
	pub fn authorization_endpoint(mut self, url: Url) -> Self {
		self.authorization_endpoint = Some(url);

		self
	}

	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Sets the JWK set endpoint.
	pub fn jwk_set_endpoint(mut self, url: Url) -> Self {
		self.jwk_set_endpoint = Some(url);

		self
	}

	/// Sets the optional user-info endpoint.
	pub fn user_info_endpoint(mut self, url: Url) -> Self {
		self.user_info_endpoint = Some(url);

		self
	}

	/// Sets the expected issuer.
	pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
		self.issuer = Some(issuer.into());

		self
	}

	/// Sets the default scopes.
	pub fn scopes(mut self, scopes: ScopeSet) -> Self {
		self.scopes = scopes;

		self
	}

	/// Overrides the expected ID token signing algorithm (RS256 by default).
	pub fn id_token_signing_alg(mut self, alg: Algorithm) -> Self {
		self.id_token_signing_alg = alg;

		self
	}

	/// Overrides the clock skew tolerance.
	pub fn clock_skew(mut self, skew: Duration) -> Self {
		self.clock_skew = skew;

		self
	}

	/// Overrides the claim used as the principal name.
	pub fn user_name_attribute(mut self, attribute: impl Into<String>) -> Self {
		self.user_name_attribute = attribute.into();

		self
	}

	/// Consumes the builder and validates the resulting registration.
	pub fn build(self) -> Result<ClientRegistration, RegistrationError> {
		let client_id = self
			.client_id
			.filter(|id| !id.trim().is_empty())
			.ok_or(RegistrationError::MissingClientId)?;
		let redirect_uri = self.redirect_uri.ok_or(RegistrationError::MissingRedirectUri)?;
		let authorization = self
			.authorization_endpoint
			.ok_or(RegistrationError::MissingAuthorizationEndpoint)?;
		let token = self.token_endpoint.ok_or(RegistrationError::MissingTokenEndpoint)?;
		let jwk_set = self.jwk_set_endpoint.ok_or(RegistrationError::MissingJwkSetEndpoint)?;
		let registration = ClientRegistration {
			id: self.id,
			client_id,
			client_secret: self.client_secret,
			client_auth_method: self.client_auth_method,
			redirect_uri,
			endpoints: RegistrationEndpoints {
				authorization,
				token,
				jwk_set,
				user_info: self.user_info_endpoint,
			},
			issuer: self.issuer,
			scopes: self.scopes,
			id_token_signing_alg: self.id_token_signing_alg,
			clock_skew: self.clock_skew,
			user_name_attribute: self.user_name_attribute,
		};

		registration.validate()?;

		Ok(registration)
	}
}

impl ClientRegistration {
	fn validate(&self) -> Result<(), RegistrationError> {
		if self.client_auth_method.requires_secret()
			&& self.client_secret.as_ref().is_none_or(TokenSecret::is_blank)
		{
			return Err(RegistrationError::MissingClientSecret { method: self.client_auth_method });
		}
		if self.clock_skew.is_negative() {
			return Err(RegistrationError::NegativeClockSkew);
		}
		if self.user_name_attribute.trim().is_empty() {
			return Err(RegistrationError::BlankUserNameAttribute);
		}

		validate_endpoint("authorization", &self.endpoints.authorization)?;
		validate_endpoint("token", &self.endpoints.token)?;
		validate_endpoint("JWK set", &self.endpoints.jwk_set)?;

		if let Some(user_info) = self.endpoints.user_info.as_ref() {
			validate_endpoint("user-info", user_info)?;
		}

		Ok(())
	}
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), RegistrationError> {
	match url.scheme() {
		"https" => Ok(()),
		"http" if is_loopback(url) => Ok(()),
		_ => Err(RegistrationError::InsecureEndpoint { endpoint: name, url: url.to_string() }),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn url(value: &str) -> Url {
		Url::parse(value).expect("URL fixture should parse.")
	}

	fn builder() -> ClientRegistrationBuilder {
		ClientRegistration::builder(
			RegistrationId::new("linkedin").expect("Registration identifier should be valid."),
		)
		.client_id("client-123")
		.client_secret("shh")
		.redirect_uri(url("https://app.example.com/login/oauth2/code/linkedin"))
		.authorization_endpoint(url("https://idp.example.com/authorize"))
		.token_endpoint(url("https://idp.example.com/token"))
		.jwk_set_endpoint(url("https://idp.example.com/jwks"))
	}

	#[test]
	fn defaults_are_applied() {
		let registration = builder().build().expect("Complete registration should build.");

		assert_eq!(registration.id_token_signing_alg, Algorithm::RS256);
		assert_eq!(registration.clock_skew, DEFAULT_CLOCK_SKEW);
		assert_eq!(registration.user_name_attribute, "sub");
		assert_eq!(registration.client_auth_method, ClientAuthMethod::ClientSecretBasic);
		assert!(registration.endpoints.user_info.is_none());
	}

	#[test]
	fn missing_pieces_are_reported() {
		let no_jwks = ClientRegistration::builder(
			RegistrationId::new("x").expect("Registration identifier should be valid."),
		)
		.client_id("c")
		.client_auth_method(ClientAuthMethod::None)
		.redirect_uri(url("https://app.example.com/cb"))
		.authorization_endpoint(url("https://idp.example.com/authorize"))
		.token_endpoint(url("https://idp.example.com/token"))
		.build();

		assert_eq!(no_jwks, Err(RegistrationError::MissingJwkSetEndpoint));
		assert_eq!(
			builder().client_id(" ").build(),
			Err(RegistrationError::MissingClientId)
		);
	}

	#[test]
	fn confidential_clients_need_a_secret() {
		let err = ClientRegistration::builder(
			RegistrationId::new("x").expect("Registration identifier should be valid."),
		)
		.client_id("c")
		.client_auth_method(ClientAuthMethod::ClientSecretPost)
		.redirect_uri(url("https://app.example.com/cb"))
		.authorization_endpoint(url("https://idp.example.com/authorize"))
		.token_endpoint(url("https://idp.example.com/token"))
		.jwk_set_endpoint(url("https://idp.example.com/jwks"))
		.build()
		.expect_err("Client secret post without a secret must fail.");

		assert_eq!(
			err,
			RegistrationError::MissingClientSecret { method: ClientAuthMethod::ClientSecretPost }
		);
	}

	#[test]
	fn http_is_only_allowed_for_loopback_hosts() {
		let err = builder()
			.token_endpoint(url("http://idp.example.com/token"))
			.build()
			.expect_err("Plain HTTP to a remote host must fail.");

		assert!(matches!(err, RegistrationError::InsecureEndpoint { endpoint: "token", .. }));

		builder()
			.token_endpoint(url("http://127.0.0.1:8080/token"))
			.user_info_endpoint(url("http://localhost:8080/userinfo"))
			.build()
			.expect("Loopback HTTP endpoints should be accepted.");
	}

	#[test]
	fn negative_clock_skew_is_rejected() {
		assert_eq!(
			builder().clock_skew(Duration::seconds(-1)).build(),
			Err(RegistrationError::NegativeClockSkew)
		);
	}
}
