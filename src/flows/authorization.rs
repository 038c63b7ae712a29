//! Authorization request/response types and the redirect round trip that precedes authentication.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};
// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, TokenSecret},
	error::OAuth2Error,
	registration::ClientRegistration,
};

const STATE_LEN: usize = 32;
const NONCE_LEN: usize = 32;
const PKCE_VERIFIER_LEN: usize = 64;

/// Errors raised while parsing an authorization redirect.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum AuthorizationResponseError {
	/// The redirect carried neither `code` nor `error`.
	#[error("Authorization redirect carries neither a code nor an error.")]
	MissingCode,
}

/// Supported PKCE challenge methods.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PkceCodeChallengeMethod {
	/// SHA-256 based PKCE (RFC 7636 S256).
	S256,
}
impl PkceCodeChallengeMethod {
	/// Returns the RFC 7636 identifier for the challenge method.
	pub fn as_str(self) -> &'static str {
		match self {
			PkceCodeChallengeMethod::S256 => "S256",
		}
	}
}

/// PKCE verifier and its derived challenge.
#[derive(Clone, PartialEq, Eq)]
pub struct PkcePair {
	verifier: TokenSecret,
	challenge: String,
	method: PkceCodeChallengeMethod,
}
impl PkcePair {
	/// Generates a random verifier and its S256 challenge.
	pub fn generate() -> Self {
		Self::from_verifier(random_string(PKCE_VERIFIER_LEN))
	}

	/// Rebuilds the pair from a verifier kept in the caller's session.
	pub fn from_verifier(verifier: impl Into<String>) -> Self {
		let verifier = TokenSecret::new(verifier);
		let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.expose().as_bytes()));

		Self { verifier, challenge, method: PkceCodeChallengeMethod::S256 }
	}

	/// Secret verifier sent with the code exchange.
	pub fn verifier(&self) -> &str {
		self.verifier.expose()
	}

	/// Challenge sent with the authorization request.
	pub fn challenge(&self) -> &str {
		&self.challenge
	}

	/// Challenge method.
	pub fn method(&self) -> PkceCodeChallengeMethod {
		self.method
	}
}
impl Debug for PkcePair {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PkcePair")
			.field("verifier", &self.verifier)
			.field("challenge", &self.challenge)
			.field("method", &self.method)
			.finish()
	}
}

/// Parameters of the authorization request that started a login.
#[derive(Clone, Debug, PartialEq)]
pub struct AuthorizationRequest {
	/// Redirect URI the provider sends the user back to.
	pub redirect_uri: Url,
	/// Requested scopes; `openid` makes the login an OIDC authentication.
	pub scope: ScopeSet,
	/// Anti-forgery value that must round-trip through the redirect.
	pub state: String,
	/// Replay-protection value bound into the ID token.
	pub nonce: Option<String>,
	/// PKCE pair, when the login uses PKCE.
	pub pkce: Option<PkcePair>,
}
impl AuthorizationRequest {
	/// Creates a request without nonce or PKCE.
	pub fn new(scope: ScopeSet, state: impl Into<String>, redirect_uri: Url) -> Self {
		Self { redirect_uri, scope, state: state.into(), nonce: None, pkce: None }
	}

	/// Starts a login for `registration` with a fresh state, nonce, and S256 PKCE pair.
	pub fn start(registration: &ClientRegistration) -> Self {
		Self::new(
			registration.scopes.clone(),
			random_string(STATE_LEN),
			registration.redirect_uri.clone(),
		)
		.with_nonce(random_string(NONCE_LEN))
		.with_pkce(PkcePair::generate())
	}

	/// Attaches a nonce.
	pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
		self.nonce = Some(nonce.into());

		self
	}

	/// Attaches a PKCE pair.
	pub fn with_pkce(mut self, pkce: PkcePair) -> Self {
		self.pkce = Some(pkce);

		self
	}

	/// Builds the URL the user agent is redirected to.
	pub fn authorization_url(&self, registration: &ClientRegistration) -> Url {
		let mut url = registration.endpoints.authorization.clone();
		let mut pairs = url.query_pairs_mut();

		pairs.append_pair("response_type", "code");
		pairs.append_pair("client_id", &registration.client_id);
		pairs.append_pair("redirect_uri", self.redirect_uri.as_str());

		if !self.scope.is_empty() {
			pairs.append_pair("scope", &self.scope.normalized());
		}

		pairs.append_pair("state", &self.state);

		if let Some(nonce) = &self.nonce {
			pairs.append_pair("nonce", nonce);
		}
		if let Some(pkce) = &self.pkce {
			pairs.append_pair("code_challenge", pkce.challenge());
			pairs.append_pair("code_challenge_method", pkce.method().as_str());
		}

		drop(pairs);

		url
	}
}

#[derive(Clone, PartialEq)]
enum AuthorizationResult {
	Code(TokenSecret),
	Error(OAuth2Error),
}

/// Parameters the provider returned on the redirect.
#[derive(Clone, PartialEq)]
pub struct AuthorizationResponse {
	/// Returned `state`, if any.
	pub state: Option<String>,
	result: AuthorizationResult,
}
impl AuthorizationResponse {
	/// Successful redirect carrying an authorization code.
	pub fn success(code: impl Into<String>, state: Option<String>) -> Self {
		Self { state, result: AuthorizationResult::Code(TokenSecret::new(code)) }
	}

	/// Error redirect.
	pub fn error(error: OAuth2Error, state: Option<String>) -> Self {
		Self { state, result: AuthorizationResult::Error(error) }
	}

	/// Parses the query of a redirect URL; an `error` parameter takes precedence over `code`.
	pub fn from_redirect(url: &Url) -> Result<Self, AuthorizationResponseError> {
		let mut code = None;
		let mut state = None;
		let mut error = None;
		let mut description = None;
		let mut uri = None;

		for (key, value) in url.query_pairs() {
			let slot = match key.as_ref() {
				"code" => &mut code,
				"state" => &mut state,
				"error" => &mut error,
				"error_description" => &mut description,
				"error_uri" => &mut uri,
				_ => continue,
			};

			slot.get_or_insert_with(|| value.into_owned());
		}

		if let Some(error_code) = error {
			return Ok(Self::error(OAuth2Error { code: error_code, description, uri }, state));
		}

		code.map(|code| Self::success(code, state)).ok_or(AuthorizationResponseError::MissingCode)
	}

	/// Authorization code, when the provider granted one.
	pub fn code(&self) -> Option<&str> {
		match &self.result {
			AuthorizationResult::Code(code) => Some(code.expose()),
			AuthorizationResult::Error(_) => None,
		}
	}

	/// Provider error, when the authorization was refused.
	pub fn provider_error(&self) -> Option<&OAuth2Error> {
		match &self.result {
			AuthorizationResult::Code(_) => None,
			AuthorizationResult::Error(err) => Some(err),
		}
	}
}
impl Debug for AuthorizationResponse {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let mut debug = f.debug_struct("AuthorizationResponse");

		debug.field("state", &self.state);

		match &self.result {
			AuthorizationResult::Code(code) => debug.field("code", code),
			AuthorizationResult::Error(err) => debug.field("error", err),
		};

		debug.finish()
	}
}

/// Request and response of one authorization round trip.
#[derive(Clone, Debug, PartialEq)]
pub struct AuthorizationExchange {
	/// Request that started the login.
	pub request: AuthorizationRequest,
	/// Response the provider redirected back with.
	pub response: AuthorizationResponse,
}
impl AuthorizationExchange {
	/// Pairs a request with its response.
	pub fn new(request: AuthorizationRequest, response: AuthorizationResponse) -> Self {
		Self { request, response }
	}

	/// Returns true when the echoed `state` equals the one sent.
	pub fn state_matches(&self) -> bool {
		self.response.state.as_deref() == Some(self.request.state.as_str())
	}
}

/// Unauthenticated login attempt handed to the authentication manager.
///
/// The manager takes it by value, so an attempt can be authenticated once only.
#[derive(Debug)]
pub struct AuthorizationCodeAttempt {
	/// Registration the login was started for.
	pub registration: Arc<ClientRegistration>,
	/// Authorization round trip.
	pub exchange: AuthorizationExchange,
}
impl AuthorizationCodeAttempt {
	/// Creates an attempt.
	pub fn new(registration: Arc<ClientRegistration>, exchange: AuthorizationExchange) -> Self {
		Self { registration, exchange }
	}
}

fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::auth::RegistrationId;

	fn registration() -> ClientRegistration {
		let url = |value: &str| Url::parse(value).expect("URL fixture should parse.");

		ClientRegistration::builder(
			RegistrationId::new("idp").expect("Registration identifier should be valid."),
		)
		.client_id("client-123")
		.client_secret("secret")
		.redirect_uri(url("https://app.example.com/cb"))
		.authorization_endpoint(url("https://idp.example.com/authorize?prompt=login"))
		.token_endpoint(url("https://idp.example.com/token"))
		.jwk_set_endpoint(url("https://idp.example.com/jwks"))
		.scopes(ScopeSet::new(["openid", "email"]).expect("Scope fixture should be valid."))
		.build()
		.expect("Registration fixture should build.")
	}

	#[test]
	fn pkce_challenge_matches_rfc_7636_example() {
		let pair = PkcePair::from_verifier("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk");

		assert_eq!(pair.challenge(), "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
		assert!(!format!("{pair:?}").contains("dBjftJeZ4CVP"));
	}

	#[test]
	fn start_generates_fresh_values() {
		let registration = registration();
		let first = AuthorizationRequest::start(&registration);
		let second = AuthorizationRequest::start(&registration);

		assert_eq!(first.state.len(), STATE_LEN);
		assert_ne!(first.state, second.state);
		assert_ne!(first.nonce, second.nonce);
		assert!(first.scope.is_openid());
		assert_eq!(first.redirect_uri, registration.redirect_uri);
	}

	#[test]
	fn authorization_url_carries_every_parameter() {
		let registration = registration();
		let request = AuthorizationRequest::start(&registration);
		let url = request.authorization_url(&registration);
		let pairs: HashMap<String, String> = url.query_pairs().into_owned().collect();
		let pkce = request.pkce.as_ref().expect("Started requests should carry PKCE.");

		assert_eq!(pairs["prompt"], "login");
		assert_eq!(pairs["response_type"], "code");
		assert_eq!(pairs["client_id"], "client-123");
		assert_eq!(pairs["redirect_uri"], "https://app.example.com/cb");
		assert_eq!(pairs["scope"], "email openid");
		assert_eq!(pairs["state"], request.state);
		assert_eq!(Some(&pairs["nonce"]), request.nonce.as_ref());
		assert_eq!(pairs["code_challenge"], pkce.challenge());
		assert_eq!(pairs["code_challenge_method"], "S256");
	}

	#[test]
	fn redirect_parsing_prefers_errors() {
		let success = AuthorizationResponse::from_redirect(
			&Url::parse("https://app.example.com/cb?code=abc&state=xyz")
				.expect("Redirect fixture should parse."),
		)
		.expect("Code redirects should parse.");

		assert_eq!(success.code(), Some("abc"));
		assert_eq!(success.state.as_deref(), Some("xyz"));
		assert!(!format!("{success:?}").contains("abc"));

		let failure = AuthorizationResponse::from_redirect(
			&Url::parse(
				"https://app.example.com/cb?error=access_denied&error_description=User+cancelled&code=abc",
			)
			.expect("Redirect fixture should parse."),
		)
		.expect("Error redirects should parse.");
		let error = failure.provider_error().expect("Error redirect should expose the error.");

		assert_eq!(error.code, "access_denied");
		assert_eq!(error.description.as_deref(), Some("User cancelled"));
		assert_eq!(failure.code(), None);
		assert_eq!(failure.state, None);

		assert_eq!(
			AuthorizationResponse::from_redirect(
				&Url::parse("https://app.example.com/cb?state=xyz")
					.expect("Redirect fixture should parse."),
			),
			Err(AuthorizationResponseError::MissingCode)
		);
	}

	#[test]
	fn state_comparison_requires_an_exact_echo() {
		let request = AuthorizationRequest::new(
			ScopeSet::default(),
			"s-1",
			Url::parse("https://app.example.com/cb").expect("Redirect fixture should parse."),
		);
		let matching = AuthorizationExchange::new(
			request.clone(),
			AuthorizationResponse::success("c", Some("s-1".into())),
		);
		let missing = AuthorizationExchange::new(request.clone(), AuthorizationResponse::success("c", None));
		let different =
			AuthorizationExchange::new(request, AuthorizationResponse::success("c", Some("S-1".into())));

		assert!(matching.state_matches());
		assert!(!missing.state_matches());
		assert!(!different.state_matches());
	}
}
