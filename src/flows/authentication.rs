//! Authorization-code authentication: from the provider redirect to an authenticated principal.
//!
//! The steps run strictly in order and stop at the first failure. Nothing is persisted, so
//! dropping the future abandons the attempt without side effects beyond requests already sent.

// self
use crate::{
	_prelude::*,
	auth::{AccessTokenResponse, AuthenticatedPrincipal, IdToken},
	flows::{AuthorizationCodeAttempt, AuthorizationExchange, NoncePolicy, OidcAuthenticationManager},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	registration::ClientRegistration,
	userinfo::UserRequest,
};

impl OidcAuthenticationManager {
	/// Authenticates one login attempt.
	///
	/// Returns `Ok(None)` when the request did not ask for the `openid` scope, meaning another
	/// login strategy should handle it. Otherwise:
	///
	/// 1. a provider error on the redirect is returned verbatim as [`Error::Provider`];
	/// 2. a `state` mismatch fails with [`Error::InvalidState`] before any network call;
	/// 3. the code is redeemed at the token endpoint;
	/// 4. the `id_token` parameter must be present and must verify, else
	///    [`Error::InvalidIdToken`];
	/// 5. the nonce is compared only under [`NoncePolicy::Enforce`];
	/// 6. the user profile is loaded and its authorities are mapped.
	pub async fn authenticate(
		&self,
		attempt: AuthorizationCodeAttempt,
	) -> Result<Option<AuthenticatedPrincipal>> {
		const KIND: FlowKind = FlowKind::Authentication;

		if !attempt.exchange.request.scope.is_openid() {
			obs::observe(KIND, FlowOutcome::Declined, "openid scope not requested");

			return Ok(None);
		}

		let span = FlowSpan::new(KIND, "authenticate", &attempt.registration.id);

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.authenticate_oidc(attempt)).await;

		match &result {
			Ok(_) => obs::observe(KIND, FlowOutcome::Success, "authenticated"),
			Err(err) => obs::observe(KIND, FlowOutcome::Failure, &err.code()),
		}

		result.map(Some)
	}

	async fn authenticate_oidc(
		&self,
		attempt: AuthorizationCodeAttempt,
	) -> Result<AuthenticatedPrincipal> {
		let AuthorizationCodeAttempt { registration, exchange } = attempt;

		if let Some(err) = exchange.response.provider_error() {
			return Err(Error::Provider(err.clone()));
		}
		if !exchange.state_matches() {
			return Err(Error::InvalidState);
		}

		let token_response = self.token_client.exchange(&registration, &exchange).await?;
		let raw_id_token = token_response.id_token().ok_or_else(|| Error::InvalidIdToken {
			description: format!(
				"Missing (required) ID Token in Token Response for Client Registration: {}",
				registration.id
			),
		})?;
		let id_token = self.verify_id_token(&registration, raw_id_token).await?;

		self.check_nonce(&exchange, &id_token)?;

		let profile = self
			.user_loader
			.load(UserRequest {
				registration: &registration,
				access_token: &token_response.access_token,
				id_token: &id_token,
				additional_parameters: &token_response.additional_parameters,
			})
			.await?;
		let authorities = self.authorities_mapper.map_authorities(&profile.authorities);
		let AccessTokenResponse { access_token, refresh_token, .. } = token_response;

		Ok(AuthenticatedPrincipal {
			registration,
			exchange,
			id_token,
			profile,
			authorities,
			access_token,
			refresh_token,
		})
	}

	async fn verify_id_token(
		&self,
		registration: &ClientRegistration,
		raw: &str,
	) -> Result<IdToken> {
		let verifier = self.verifier_factory.create_verifier(registration);
		let jwt = verifier
			.verify(raw)
			.await
			.map_err(|err| Error::InvalidIdToken { description: err.to_string() })?;

		Ok(IdToken::from(jwt))
	}

	fn check_nonce(&self, exchange: &AuthorizationExchange, id_token: &IdToken) -> Result<()> {
		match (self.nonce_policy, exchange.request.nonce.as_deref()) {
			(NoncePolicy::Enforce, Some(expected)) if id_token.nonce() != Some(expected) =>
				Err(Error::InvalidNonce),
			_ => Ok(()),
		}
	}
}
