#![allow(dead_code)]

// std
use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};
// crates.io
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{Value, json};
use time::OffsetDateTime;
use url::Url;
// self
#[cfg(feature = "reqwest")]
use oidc_login::{
	downstream::ReqwestJobSearchClient,
	http::ReqwestHttpClient,
	jwt::ReqwestJwksVerifierFactory,
	oauth::{ReqwestTokenClient, ReqwestTransportErrorMapper},
	reqwest::Client as ReqwestClient,
	userinfo::ReqwestUserProfileLoader,
};
use oidc_login::{
	auth::{AccessToken, AccessTokenResponse, AuthoritySet, RegistrationId, ScopeSet, UserProfile},
	error::{Error, OAuth2Error},
	flows::{AuthorizationCodeAttempt, AuthorizationExchange, AuthorizationRequest, AuthorizationResponse},
	oauth::{ExchangeFuture, TokenExchangeClient},
	registration::ClientRegistration,
	userinfo::{LoadFuture, UserProfileLoader, UserRequest},
};

pub const REGISTRATION_ID: &str = "mock-idp";
pub const CLIENT_ID: &str = "client-it";
pub const CLIENT_SECRET: &str = "secret-it";
pub const ISSUER: &str = "https://idp.example.com";
pub const SUBJECT: &str = "user-42";
pub const KID: &str = "k1";
pub const HS256_SECRET: &[u8] = b"oidc-login-hs256-test-secret-0000000000";
/// Base64url form of [`HS256_SECRET`], as published in the JWK set.
pub const HS256_SECRET_B64: &str = "b2lkYy1sb2dpbi1oczI1Ni10ZXN0LXNlY3JldC0wMDAwMDAwMDAw";

pub fn url(value: &str) -> Url {
	Url::parse(value).expect("Test URL should parse.")
}

/// Registration whose endpoints live under `base` (a loopback mock server or a fake host).
pub fn registration(base: &str) -> ClientRegistration {
	ClientRegistration::builder(
		RegistrationId::new(REGISTRATION_ID).expect("Registration identifier should be valid."),
	)
	.client_id(CLIENT_ID)
	.client_secret(CLIENT_SECRET)
	.redirect_uri(url("https://app.example.com/login/oauth2/code/mock-idp"))
	.authorization_endpoint(url(&format!("{base}/authorize")))
	.token_endpoint(url(&format!("{base}/token")))
	.jwk_set_endpoint(url(&format!("{base}/jwks")))
	.user_info_endpoint(url(&format!("{base}/userinfo")))
	.issuer(ISSUER)
	.scopes(scopes(&["openid", "profile", "email"]))
	.id_token_signing_alg(Algorithm::HS256)
	.build()
	.expect("Test registration should build.")
}

pub fn scopes(values: &[&str]) -> ScopeSet {
	ScopeSet::new(values.iter().copied()).expect("Test scopes should be valid.")
}

/// Standard ID token claims for [`SUBJECT`], merged with `overrides`.
pub fn id_token_claims(overrides: Value) -> Value {
	let now = OffsetDateTime::now_utc().unix_timestamp();
	let mut claims = json!({
		"iss": ISSUER,
		"aud": CLIENT_ID,
		"sub": SUBJECT,
		"iat": now,
		"exp": now + 600,
		"email": "user42@example.com",
	});

	if let (Some(base), Some(extra)) = (claims.as_object_mut(), overrides.as_object()) {
		base.extend(extra.clone());
	}

	claims
}

/// Signs `claims` with the shared HS256 secret and `kid` in the header.
pub fn sign_with(claims: &Value, kid: Option<&str>, secret: &[u8]) -> String {
	let mut header = Header::new(Algorithm::HS256);

	header.kid = kid.map(str::to_owned);

	jsonwebtoken::encode(&header, claims, &EncodingKey::from_secret(secret))
		.expect("Test ID token should encode.")
}

pub fn sign(claims: &Value) -> String {
	sign_with(claims, Some(KID), HS256_SECRET)
}

/// JWK set publishing the shared secret under `kid`.
pub fn jwk_set_body(kid: &str) -> String {
	json!({
		"keys": [{ "kty": "oct", "kid": kid, "alg": "HS256", "k": HS256_SECRET_B64 }]
	})
	.to_string()
}

pub fn access_token(value: &str, scope: &[&str]) -> AccessToken {
	AccessToken::builder(scopes(scope))
		.value(value)
		.expires_in(time::Duration::hours(1))
		.build()
		.expect("Test access token should build.")
}

/// Token response carrying `id_token` when provided.
pub fn token_response(id_token: Option<String>) -> AccessTokenResponse {
	let response = AccessTokenResponse::new(access_token("access-42", &["openid", "profile"]))
		.with_refresh_token("refresh-42");

	match id_token {
		Some(id_token) => response.with_parameter("id_token", id_token),
		None => response,
	}
}

/// Attempt whose request asked for `scope` with `request_state` (and `nonce`, if any).
pub fn attempt(
	registration: &Arc<ClientRegistration>,
	scope: &[&str],
	request_state: &str,
	nonce: Option<&str>,
	response: AuthorizationResponse,
) -> AuthorizationCodeAttempt {
	let mut request =
		AuthorizationRequest::new(scopes(scope), request_state, registration.redirect_uri.clone());

	if let Some(nonce) = nonce {
		request = request.with_nonce(nonce);
	}

	AuthorizationCodeAttempt::new(
		Arc::clone(registration),
		AuthorizationExchange::new(request, response),
	)
}

/// Reqwest transport that accepts the self-signed certificates served by `httpmock`.
#[cfg(feature = "reqwest")]
pub fn test_reqwest_http_client() -> ReqwestHttpClient {
	let client = ReqwestClient::builder()
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.build()
		.expect("Failed to build insecure Reqwest client for tests.");

	ReqwestHttpClient::with_client(client)
}

#[cfg(feature = "reqwest")]
pub fn test_token_client() -> ReqwestTokenClient {
	ReqwestTokenClient::with_http_client(test_reqwest_http_client(), ReqwestTransportErrorMapper)
}

#[cfg(feature = "reqwest")]
pub fn test_jwks_verifier_factory() -> ReqwestJwksVerifierFactory {
	ReqwestJwksVerifierFactory::with_http_client(
		test_reqwest_http_client(),
		ReqwestTransportErrorMapper,
	)
}

#[cfg(feature = "reqwest")]
pub fn test_user_profile_loader() -> ReqwestUserProfileLoader {
	ReqwestUserProfileLoader::with_http_client(test_reqwest_http_client(), ReqwestTransportErrorMapper)
}

#[cfg(feature = "reqwest")]
pub fn test_job_search_client(base_url: Url) -> ReqwestJobSearchClient {
	ReqwestJobSearchClient::with_http_client(
		base_url,
		test_reqwest_http_client(),
		ReqwestTransportErrorMapper,
	)
}

/// Token exchange stub that counts its invocations.
pub struct StubTokenClient {
	calls: AtomicUsize,
	outcome: Result<AccessTokenResponse, OAuth2Error>,
}
impl StubTokenClient {
	pub fn returning(response: AccessTokenResponse) -> Arc<Self> {
		Arc::new(Self { calls: AtomicUsize::new(0), outcome: Ok(response) })
	}

	pub fn failing(error: OAuth2Error) -> Arc<Self> {
		Arc::new(Self { calls: AtomicUsize::new(0), outcome: Err(error) })
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl TokenExchangeClient for StubTokenClient {
	fn exchange<'a>(
		&'a self,
		_registration: &'a ClientRegistration,
		_exchange: &'a AuthorizationExchange,
	) -> ExchangeFuture<'a> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let outcome = self.outcome.clone().map_err(Error::Provider);

		Box::pin(async move { outcome })
	}
}

/// Profile loader stub granting fixed authorities and counting its invocations.
pub struct StubUserLoader {
	calls: AtomicUsize,
	authorities: Vec<&'static str>,
}
impl StubUserLoader {
	pub fn granting(authorities: &[&'static str]) -> Arc<Self> {
		Arc::new(Self { calls: AtomicUsize::new(0), authorities: authorities.to_vec() })
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl UserProfileLoader for StubUserLoader {
	fn load<'a>(&'a self, request: UserRequest<'a>) -> LoadFuture<'a> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let profile = UserProfile {
			name: request.id_token.subject().unwrap_or_default().to_owned(),
			claims: request.id_token.claims().clone(),
			authorities: self.authorities.iter().copied().collect::<AuthoritySet>(),
		};

		Box::pin(async move { Ok(profile) })
	}
}
