//! Login-level error types shared across flows, verifiers, and collaborators.

// std
use std::borrow::Cow;
// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical authentication failure exposed by public APIs.
///
/// Every variant maps onto a short machine-readable code via [`Error::code`]; none of them carry
/// token material that has not been verified.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration or wiring problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Temporary upstream failure; retry with backoff.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Provider returned an OAuth error, either on the redirect or from the token endpoint.
	#[error("Provider returned an OAuth error: {0}.")]
	Provider(OAuth2Error),
	/// The `state` echoed by the provider does not match the one sent with the request.
	#[error("Authorization response state does not match the authorization request.")]
	InvalidState,
	/// The `nonce` claim does not match the request nonce (only under an enforcing policy).
	#[error("ID Token nonce does not match the authorization request.")]
	InvalidNonce,
	/// ID token missing from the token response or rejected by the verifier.
	#[error("Invalid ID Token: {description}")]
	InvalidIdToken {
		/// Verifier- or manager-supplied description.
		description: String,
	},
	/// Token endpoint answered with a payload that cannot back an authentication.
	#[error("Invalid token response: {reason}")]
	InvalidTokenResponse {
		/// Human-readable reason.
		reason: String,
	},
	/// Downstream resource API refused the request (client-side status).
	#[error("Resource API rejected the request with HTTP {status}.")]
	ResourceRejected {
		/// HTTP status code.
		status: u16,
	},
	/// User-info endpoint answered with a payload that cannot back an authentication.
	#[error("Invalid user info response: {reason}")]
	InvalidUserInfo {
		/// Human-readable reason.
		reason: String,
	},
}
impl Error {
	/// Short machine-readable code identifying the failure.
	pub fn code(&self) -> Cow<'_, str> {
		match self {
			Self::Config(_) => Cow::Borrowed("invalid_configuration"),
			Self::Transient(err) => Cow::Borrowed(err.endpoint().failure_code()),
			Self::Transport(_) => Cow::Borrowed("server_error"),
			Self::Provider(err) => Cow::Borrowed(err.code.as_str()),
			Self::InvalidState => Cow::Borrowed("invalid_state_parameter"),
			Self::InvalidNonce => Cow::Borrowed("invalid_nonce"),
			Self::InvalidIdToken { .. } => Cow::Borrowed("invalid_id_token"),
			Self::InvalidTokenResponse { .. } => Cow::Borrowed("invalid_token_response"),
			Self::InvalidUserInfo { .. } => Cow::Borrowed("invalid_user_info_response"),
			Self::ResourceRejected { .. } => Cow::Borrowed("resource_rejected"),
		}
	}

	/// Renders the failure as an OAuth error (code + description) for the surrounding layer.
	pub fn oauth2_error(&self) -> OAuth2Error {
		match self {
			Self::Provider(err) => err.clone(),
			Self::InvalidIdToken { description } =>
				OAuth2Error::new(self.code()).with_description(description.clone()),
			other => OAuth2Error::new(other.code()).with_description(other.to_string()),
		}
	}

	/// Returns true when a caller may retry the whole attempt with a fresh exchange.
	pub fn is_retryable(&self) -> bool {
		match self {
			Self::Transient(_) | Self::Transport(_) => true,
			Self::Provider(err) =>
				err.code.eq_ignore_ascii_case("temporarily_unavailable")
					|| err.code.eq_ignore_ascii_case("server_error"),
			_ => false,
		}
	}
}

/// OAuth 2.0 error triple (`error`, `error_description`, `error_uri`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuth2Error {
	/// Machine-readable error code.
	#[serde(rename = "error")]
	pub code: String,
	/// Optional human-readable description.
	#[serde(rename = "error_description", default, skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	/// Optional URI pointing at documentation for the error.
	#[serde(rename = "error_uri", default, skip_serializing_if = "Option::is_none")]
	pub uri: Option<String>,
}
impl OAuth2Error {
	/// Creates an error carrying only a code.
	pub fn new(code: impl Into<String>) -> Self {
		Self { code: code.into(), description: None, uri: None }
	}

	/// Adds the human-readable description.
	pub fn with_description(mut self, description: impl Into<String>) -> Self {
		self.description = Some(description.into());

		self
	}

	/// Adds the documentation URI.
	pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
		self.uri = Some(uri.into());

		self
	}
}
impl Display for OAuth2Error {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "[{}]", self.code)?;

		if let Some(description) = &self.description {
			write!(f, " {description}")?;
		}

		Ok(())
	}
}

/// Configuration and wiring failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Registration contains an invalid URL.
	#[error("Registration contains an invalid URL.")]
	InvalidRegistrationUrl {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// Downstream resource URL cannot be built.
	#[error("Resource URL is invalid.")]
	InvalidResourceUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Registration failed validation.
	#[error("Registration `{id}` is invalid.")]
	InvalidRegistration {
		/// Registration identifier as written in the configuration.
		id: String,
		/// Validation failure.
		#[source]
		source: crate::registration::RegistrationError,
	},
	/// Registration identifier failed validation.
	#[error(transparent)]
	InvalidIdentifier(#[from] crate::auth::IdentifierError),
	/// Configured scopes cannot be normalized.
	#[error("Configured scopes are invalid.")]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
	/// No registration is known under the requested identifier.
	#[error("No client registration is known under `{id}`.")]
	UnknownRegistration {
		/// Requested registration identifier.
		id: String,
	},
	/// Configuration file could not be read.
	#[error("Configuration file could not be read.")]
	Io(#[from] std::io::Error),
	/// Configuration document could not be parsed.
	#[error("Configuration document could not be parsed.")]
	Parse(#[from] toml::de::Error),

	/// The manager was assembled without an ID token verifier factory.
	#[error("An ID token verifier factory must be configured before authenticating.")]
	MissingVerifierFactory,
	/// The manager was assembled without an explicit nonce policy.
	#[error("A nonce policy must be chosen explicitly.")]
	MissingNoncePolicy,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Remote endpoints contacted while authenticating.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Endpoint {
	/// OAuth 2.0 token endpoint.
	Token,
	/// OIDC user-info endpoint.
	UserInfo,
	/// JWK set endpoint publishing signing keys.
	KeySet,
	/// Downstream resource API called with the access token.
	Resource,
}
impl Endpoint {
	/// Returns a stable label suitable for messages and metrics.
	pub const fn as_str(self) -> &'static str {
		match self {
			Endpoint::Token => "token",
			Endpoint::UserInfo => "user-info",
			Endpoint::KeySet => "JWK set",
			Endpoint::Resource => "resource",
		}
	}

	const fn failure_code(self) -> &'static str {
		match self {
			Endpoint::Token => "invalid_token_response",
			Endpoint::UserInfo => "invalid_user_info_response",
			Endpoint::KeySet => "invalid_id_token",
			Endpoint::Resource => "server_error",
		}
	}
}
impl Display for Endpoint {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Temporary failure variants (safe to retry).
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Endpoint returned an unexpected but non-fatal response.
	#[error("The {endpoint} endpoint returned an unexpected response: {message}.")]
	Endpoint {
		/// Endpoint that failed.
		endpoint: Endpoint,
		/// Provider- or crate-supplied message summarizing the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Endpoint responded with malformed JSON that could not be parsed.
	#[error("The {endpoint} endpoint returned malformed JSON.")]
	ResponseParse {
		/// Endpoint that failed.
		endpoint: Endpoint,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}
impl TransientError {
	/// Endpoint the failure originated from.
	pub fn endpoint(&self) -> Endpoint {
		match self {
			Self::Endpoint { endpoint, .. } | Self::ResponseParse { endpoint, .. } => *endpoint,
		}
	}

	/// HTTP status code, when available.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Endpoint { status, .. } | Self::ResponseParse { status, .. } => *status,
		}
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the provider.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the provider.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
