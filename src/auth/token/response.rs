//! Token endpoint response for an authorization-code exchange.

// self
use crate::{
	_prelude::*,
	auth::{
		ClaimSet, claims,
		token::{access::AccessToken, secret::TokenSecret},
	},
};

/// Parameter carrying the raw ID token in an OIDC token response.
pub const ID_TOKEN_PARAMETER: &str = "id_token";

/// Successful token endpoint response.
#[derive(Clone, Debug)]
pub struct AccessTokenResponse {
	/// Access token and its metadata.
	pub access_token: AccessToken,
	/// Refresh token, when issued. It is passed through and never persisted.
	pub refresh_token: Option<TokenSecret>,
	/// Every non-standard response parameter, including `id_token`.
	pub additional_parameters: ClaimSet,
}
impl AccessTokenResponse {
	/// Creates a response without a refresh token or additional parameters.
	pub fn new(access_token: AccessToken) -> Self {
		Self { access_token, refresh_token: None, additional_parameters: ClaimSet::new() }
	}

	/// Attaches a refresh token.
	pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
		self.refresh_token = Some(TokenSecret::new(token));

		self
	}

	/// Adds an additional response parameter.
	pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
		self.additional_parameters.insert(name.into(), value.into());

		self
	}

	/// Returns the raw ID token when the provider returned a non-empty string under `id_token`.
	pub fn id_token(&self) -> Option<&str> {
		claims::claim_str(&self.additional_parameters, ID_TOKEN_PARAMETER)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::auth::ScopeSet;

	fn access_token() -> AccessToken {
		AccessToken::builder(ScopeSet::default())
			.value("at")
			.build()
			.expect("Access token fixture should build.")
	}

	#[test]
	fn id_token_requires_a_non_empty_string() {
		let missing = AccessTokenResponse::new(access_token());
		let numeric = AccessTokenResponse::new(access_token()).with_parameter(ID_TOKEN_PARAMETER, 7);
		let blank = AccessTokenResponse::new(access_token()).with_parameter(ID_TOKEN_PARAMETER, "");
		let present =
			AccessTokenResponse::new(access_token()).with_parameter(ID_TOKEN_PARAMETER, "a.b.c");

		assert_eq!(missing.id_token(), None);
		assert_eq!(numeric.id_token(), None);
		assert_eq!(blank.id_token(), None);
		assert_eq!(present.id_token(), Some("a.b.c"));
	}
}
