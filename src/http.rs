//! HTTP transport shared by the token exchange, JWK set, user-info, and downstream calls.
//!
//! [`TokenHttpClient`] is the only dependency the crate has on an HTTP stack. Each outbound call
//! obtains a short-lived [`AsyncHttpClient`] handle bound to a fresh [`ResponseMetadataSlot`], so
//! failures can be classified with the status code and `Retry-After` hint of that exact call.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
use oauth2::{
	AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse,
	http::{
		Method, Request, StatusCode,
		header::{ACCEPT, HeaderValue},
	},
};
#[cfg(feature = "reqwest")] use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::de::DeserializeOwned;
#[cfg(feature = "reqwest")] use time::format_description::well_known::Rfc2822;
// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	error::{ConfigError, Endpoint, TransientError},
	ext::{BearerSigner, RequestSignerExt},
	oauth::TransportErrorMapper,
};

/// Abstraction over HTTP transports that publish response metadata for error mapping.
///
/// Implementations must be `Send + Sync + 'static` so they can be shared behind an `Arc` by the
/// manager and every collaborator. The handles they return must own whatever state the request
/// needs so the request futures stay `Send`.
pub trait TokenHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// [`AsyncHttpClient`] handle tied to a [`ResponseMetadataSlot`].
	type Handle: for<'c> AsyncHttpClient<
			'c,
			Error = HttpClientError<Self::TransportError>,
			Future: 'c + Send,
		>
		+ 'static
		+ Send
		+ Sync;

	/// Builds an [`AsyncHttpClient`] handle that records outcomes in `slot`.
	///
	/// # Metadata Contract
	///
	/// - Call [`ResponseMetadataSlot::take`] before submitting the request.
	/// - Once a response provides a status, save it with [`ResponseMetadataSlot::store`].
	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle;
}

/// Metadata captured from the most recent HTTP response.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadata {
	/// HTTP status code, if a response arrived.
	pub status: Option<u16>,
	/// Retry-After hint expressed as a relative duration.
	pub retry_after: Option<Duration>,
}

/// Thread-safe slot sharing [`ResponseMetadata`] between the transport and the error mapper.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadataSlot(Arc<Mutex<Option<ResponseMetadata>>>);
impl ResponseMetadataSlot {
	/// Stores new metadata for the current request.
	pub fn store(&self, meta: ResponseMetadata) {
		*self.0.lock() = Some(meta);
	}

	/// Returns the captured metadata, if any, consuming it from the slot.
	pub fn take(&self) -> Option<ResponseMetadata> {
		self.0.lock().take()
	}
}

/// Reqwest-backed [`TokenHttpClient`].
///
/// Token endpoints answer directly, so a custom [`ReqwestClient`] should disable redirect
/// following before it is wrapped.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl TokenHttpClient for ReqwestHttpClient {
	type Handle = InstrumentedHandle;
	type TransportError = ReqwestError;

	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
		InstrumentedHandle(Arc::new(InstrumentedHttpClient { client: self.0.clone(), slot }))
	}
}

#[cfg(feature = "reqwest")]
struct InstrumentedHttpClient {
	client: ReqwestClient,
	slot: ResponseMetadataSlot,
}

/// Handle returned by [`ReqwestHttpClient`] that records response metadata.
#[cfg(feature = "reqwest")]
#[derive(Clone)]
pub struct InstrumentedHandle(Arc<InstrumentedHttpClient>);
#[cfg(feature = "reqwest")]
impl<'c> AsyncHttpClient<'c> for InstrumentedHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let inner = Arc::clone(&self.0);

		Box::pin(async move {
			inner.slot.take();

			let response = inner
				.client
				.execute(request.try_into().map_err(Box::new)?)
				.await
				.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();

			inner.slot.store(ResponseMetadata {
				status: Some(status.as_u16()),
				retry_after: parse_retry_after(&headers),
			});

			let mut converted =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*converted.status_mut() = status;
			*converted.headers_mut() = headers;

			Ok(converted)
		})
	}
}

/// Performs a `GET` against `url`, optionally authenticated with `token`, and returns the raw
/// response together with the captured metadata.
///
/// Transport failures are classified by `mapper`; HTTP status handling is left to the caller.
pub(crate) async fn get<C, M>(
	http_client: &C,
	mapper: &M,
	endpoint: Endpoint,
	url: &Url,
	token: Option<&AccessToken>,
) -> Result<(HttpResponse, Option<ResponseMetadata>)>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	let mut request = Request::builder()
		.method(Method::GET)
		.uri(url.as_str())
		.header(ACCEPT, HeaderValue::from_static("application/json"))
		.body(Vec::new())
		.map_err(ConfigError::from)?;

	if let Some(token) = token {
		request = BearerSigner.attach_token(request, token)?;
	}

	let slot = ResponseMetadataSlot::default();
	let handle = http_client.with_metadata(slot.clone());

	match handle.call(request).await {
		Ok(response) => Ok((response, slot.take())),
		Err(err) => Err(mapper.map_transport_error(endpoint, slot.take().as_ref(), err)),
	}
}

/// Classifies a non-success status: throttling and server errors are transient, anything else is
/// returned as `None` so the caller can pick an endpoint-specific error.
pub(crate) fn transient_status_error(
	endpoint: Endpoint,
	status: StatusCode,
	meta: Option<&ResponseMetadata>,
) -> Option<Error> {
	if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
		return Some(
			TransientError::Endpoint {
				endpoint,
				message: format!("HTTP {}", status.as_u16()),
				status: Some(status.as_u16()),
				retry_after: meta.and_then(|meta| meta.retry_after),
			}
			.into(),
		);
	}

	None
}

/// Deserializes a JSON body, keeping the path of the first failing field.
pub(crate) fn parse_json<T>(endpoint: Endpoint, response: &HttpResponse) -> Result<T>
where
	T: DeserializeOwned,
{
	let deserializer = &mut serde_json::Deserializer::from_slice(response.body());

	serde_path_to_error::deserialize(deserializer).map_err(|source| {
		TransientError::ResponseParse {
			endpoint,
			source,
			status: Some(response.status().as_u16()),
		}
		.into()
	})
}

#[cfg(feature = "reqwest")]
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let raw = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<i64>() {
		return Some(Duration::seconds(secs));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}
