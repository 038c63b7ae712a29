//! Token endpoint client for the authorization-code grant.
//!
//! [`TokenExchangeClient`] is the seam the authentication manager calls; the default
//! [`AuthorizationCodeTokenClient`] drives the `oauth2` crate over any [`TokenHttpClient`] and
//! keeps every non-standard response parameter (notably `id_token`).

pub use oauth2;

// std
use std::borrow::Cow;
// crates.io
use oauth2::{
	AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, EndpointNotSet, EndpointSet,
	ExtraTokenFields, HttpClientError, PkceCodeVerifier, RedirectUrl, RequestTokenError,
	StandardRevocableToken, StandardTokenResponse, TokenResponse, TokenUrl,
	basic::{
		BasicErrorResponse, BasicRequestTokenError, BasicRevocationErrorResponse,
		BasicTokenIntrospectionResponse, BasicTokenType,
	},
};
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, AccessTokenResponse, ClaimSet, ScopeSet},
	error::{ConfigError, Endpoint, OAuth2Error, TransientError, TransportError},
	flows::AuthorizationExchange,
	http::{ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	registration::{ClientAuthMethod, ClientRegistration},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

/// Boxed future returned by [`TokenExchangeClient::exchange`].
pub type ExchangeFuture<'a> = Pin<Box<dyn Future<Output = Result<AccessTokenResponse>> + 'a + Send>>;

/// Token client specialized for the crate's default reqwest transport.
#[cfg(feature = "reqwest")]
pub type ReqwestTokenClient =
	AuthorizationCodeTokenClient<ReqwestHttpClient, ReqwestTransportErrorMapper>;

type OidcTokenResponse = StandardTokenResponse<AdditionalParameters, BasicTokenType>;
type OidcClient<HasAuthUrl = EndpointSet, HasTokenUrl = EndpointSet> = oauth2::Client<
	BasicErrorResponse,
	OidcTokenResponse,
	BasicTokenIntrospectionResponse,
	StandardRevocableToken,
	BasicRevocationErrorResponse,
	HasAuthUrl,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	HasTokenUrl,
>;

/// Exchanges an authorization code for tokens.
pub trait TokenExchangeClient
where
	Self: Send + Sync,
{
	/// Redeems the code carried by `exchange` at the registration's token endpoint.
	///
	/// Provider OAuth errors surface as [`Error::Provider`]; transport failures keep their
	/// transport classification.
	fn exchange<'a>(
		&'a self,
		registration: &'a ClientRegistration,
		exchange: &'a AuthorizationExchange,
	) -> ExchangeFuture<'a>;
}

/// Maps HTTP transport failures into crate [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] raised while calling `endpoint`.
	fn map_transport_error(
		&self,
		endpoint: Endpoint,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		endpoint: Endpoint,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(endpoint, meta, *inner),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			HttpClientError::Other(message) => transient(
				endpoint,
				format!("HTTP client error: {message}"),
				meta,
			),
			_ => transient(endpoint, "HTTP client error".into(), meta),
		}
	}
}

/// Token response parameters beyond the RFC 6749 set.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AdditionalParameters {
	#[serde(flatten)]
	values: ClaimSet,
}
impl ExtraTokenFields for AdditionalParameters {}

/// Default [`TokenExchangeClient`] built on the `oauth2` crate.
pub struct AuthorizationCodeTokenClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	http_client: Arc<C>,
	error_mapper: Arc<M>,
}
impl<C, M> AuthorizationCodeTokenClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a client that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(http_client: impl Into<Arc<C>>, mapper: impl Into<Arc<M>>) -> Self {
		Self { http_client: http_client.into(), error_mapper: mapper.into() }
	}

	async fn redeem(
		&self,
		registration: &ClientRegistration,
		exchange: &AuthorizationExchange,
	) -> Result<AccessTokenResponse> {
		let code = exchange.response.code().ok_or_else(|| {
			Error::Provider(
				OAuth2Error::new("invalid_request")
					.with_description("Authorization response carries no code."),
			)
		})?;
		let oauth_client = oauth_client(registration)?;
		let redirect_url = RedirectUrl::new(exchange.request.redirect_uri.to_string())
			.map_err(|source| ConfigError::InvalidRegistrationUrl { source })?;
		let mut request = oauth_client
			.exchange_code(AuthorizationCode::new(code.to_owned()))
			.set_redirect_uri(Cow::Owned(redirect_url));

		if let Some(pkce) = &exchange.request.pkce {
			request = request.set_pkce_verifier(PkceCodeVerifier::new(pkce.verifier().to_owned()));
		}

		let meta = ResponseMetadataSlot::default();
		let instrumented = self.http_client.with_metadata(meta.clone());
		let response = request
			.request_async(&instrumented)
			.await
			.map_err(|err| map_request_error(meta.take(), err, self.error_mapper.as_ref()))?;

		map_token_response(&exchange.request.scope, response)
	}
}
#[cfg(feature = "reqwest")]
impl AuthorizationCodeTokenClient<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a client backed by a default reqwest transport.
	pub fn new() -> Self {
		Self::with_http_client(ReqwestHttpClient::default(), ReqwestTransportErrorMapper)
	}
}
#[cfg(feature = "reqwest")]
impl Default for AuthorizationCodeTokenClient<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	fn default() -> Self {
		Self::new()
	}
}
impl<C, M> TokenExchangeClient for AuthorizationCodeTokenClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn exchange<'a>(
		&'a self,
		registration: &'a ClientRegistration,
		exchange: &'a AuthorizationExchange,
	) -> ExchangeFuture<'a> {
		let span = FlowSpan::new(FlowKind::TokenExchange, "exchange", &registration.id);

		Box::pin(span.instrument(async move {
			obs::record_flow_outcome(FlowKind::TokenExchange, FlowOutcome::Attempt);

			let result = self.redeem(registration, exchange).await;

			match &result {
				Ok(_) => obs::observe(FlowKind::TokenExchange, FlowOutcome::Success, "issued"),
				Err(err) => obs::observe(FlowKind::TokenExchange, FlowOutcome::Failure, &err.code()),
			}

			result
		}))
	}
}
impl<C, M> Debug for AuthorizationCodeTokenClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("AuthorizationCodeTokenClient(..)")
	}
}

fn oauth_client(registration: &ClientRegistration) -> Result<OidcClient> {
	let auth_url = AuthUrl::new(registration.endpoints.authorization.to_string())
		.map_err(|source| ConfigError::InvalidRegistrationUrl { source })?;
	let token_url = TokenUrl::new(registration.endpoints.token.to_string())
		.map_err(|source| ConfigError::InvalidRegistrationUrl { source })?;
	let mut client =
		OidcClient::<EndpointNotSet, EndpointNotSet>::new(ClientId::new(registration.client_id.clone()))
		.set_auth_uri(auth_url)
		.set_token_uri(token_url);

	if let Some(secret) = registration
		.client_secret
		.as_ref()
		.filter(|_| registration.client_auth_method.requires_secret())
	{
		client = client.set_client_secret(ClientSecret::new(secret.expose().to_owned()));
	}
	if matches!(registration.client_auth_method, ClientAuthMethod::ClientSecretPost) {
		client = client.set_auth_type(AuthType::RequestBody);
	}

	Ok(client)
}

fn map_token_response(
	requested_scope: &ScopeSet,
	response: OidcTokenResponse,
) -> Result<AccessTokenResponse> {
	let scope = match response.scopes() {
		Some(scopes) => ScopeSet::new(scopes.iter().map(|scope| scope.as_str()))
			.map_err(|err| invalid_token_response(format!("Returned scope is invalid: {err}")))?,
		None => requested_scope.clone(),
	};
	let token_type = match response.token_type() {
		BasicTokenType::Bearer => "Bearer".to_owned(),
		other => other.as_ref().to_owned(),
	};
	let mut builder = AccessToken::builder(scope)
		.value(response.access_token().secret().to_owned())
		.token_type(token_type)
		.issued_at(OffsetDateTime::now_utc());

	if let Some(expires_in) = response.expires_in() {
		let seconds = i64::try_from(expires_in.as_secs())
			.map_err(|_| invalid_token_response("expires_in is out of range".into()))?;

		if seconds <= 0 {
			return Err(invalid_token_response("expires_in must be positive".into()));
		}

		builder = builder.expires_in(Duration::seconds(seconds));
	}

	let access_token =
		builder.build().map_err(|err| invalid_token_response(err.to_string()))?;

	Ok(AccessTokenResponse {
		access_token,
		refresh_token: response.refresh_token().map(|token| token.secret().as_str().into()),
		additional_parameters: response.extra_fields().values.clone(),
	})
}

fn map_request_error<E, M>(
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<E>>,
	mapper: &M,
) -> Error
where
	E: 'static + Send + Sync + StdError,
	M: ?Sized + TransportErrorMapper<E>,
{
	let meta = meta.as_ref();

	match err {
		RequestTokenError::ServerResponse(response) => Error::Provider(OAuth2Error {
			code: response.error().as_ref().to_owned(),
			description: response.error_description().cloned(),
			uri: response.error_uri().cloned(),
		}),
		RequestTokenError::Request(error) =>
			mapper.map_transport_error(Endpoint::Token, meta, error),
		RequestTokenError::Parse(source, _body) => TransientError::ResponseParse {
			endpoint: Endpoint::Token,
			source,
			status: meta.and_then(|meta| meta.status),
		}
		.into(),
		RequestTokenError::Other(message) => transient(Endpoint::Token, message, meta),
	}
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(endpoint: Endpoint, meta: Option<&ResponseMetadata>, err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}
	if err.is_timeout() {
		return transient(endpoint, "request timed out".into(), meta);
	}

	TransportError::from(err).into()
}

fn transient(endpoint: Endpoint, message: String, meta: Option<&ResponseMetadata>) -> Error {
	TransientError::Endpoint {
		endpoint,
		message,
		status: meta.and_then(|meta| meta.status),
		retry_after: meta.and_then(|meta| meta.retry_after),
	}
	.into()
}

fn invalid_token_response(reason: String) -> Error {
	Error::InvalidTokenResponse { reason }
}
