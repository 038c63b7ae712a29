//! Downstream job-search API called on behalf of an authenticated user.
//!
//! The client only knows what the login layer needs to demonstrate: a bearer-authenticated
//! `GET {base}/jobs?q=..&country=..` returning postings, of which the ones that are not
//! "easy apply" yield a direct application link.

// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	error::{ConfigError, Endpoint},
	http::{self, TokenHttpClient},
	oauth::TransportErrorMapper,
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper};

/// Job-search client specialized for the crate's default reqwest transport.
#[cfg(feature = "reqwest")]
pub type ReqwestJobSearchClient = JobSearchClient<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// One posting returned by the job-search API; unknown fields are ignored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPosting {
	/// Provider identifier, when present.
	#[serde(default)]
	pub id: Option<String>,
	/// Where the user applies.
	pub apply_url: String,
	/// Whether the posting is handled by the provider's in-site application.
	#[serde(default)]
	pub easy_apply: bool,
}

/// Apply URLs of the postings that are not "easy apply", in response order.
pub fn direct_apply_links(postings: &[JobPosting]) -> Vec<String> {
	postings
		.iter()
		.filter(|posting| !posting.easy_apply)
		.map(|posting| posting.apply_url.clone())
		.collect()
}

/// Bearer-authenticated client for the job-search API.
pub struct JobSearchClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	http_client: Arc<C>,
	error_mapper: Arc<M>,
	base_url: Url,
}
impl<C, M> JobSearchClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a client rooted at `base_url` that reuses the caller-provided transport + mapper
	/// pair.
	pub fn with_http_client(
		base_url: Url,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		let mut base_url = base_url;

		if !base_url.path().ends_with('/') {
			let path = format!("{}/", base_url.path());

			base_url.set_path(&path);
		}

		Self { http_client: http_client.into(), error_mapper: mapper.into(), base_url }
	}

	/// Base URL every request is resolved against.
	pub fn base_url(&self) -> &Url {
		&self.base_url
	}

	/// Searches postings matching `query` in `country`.
	pub async fn search(
		&self,
		access_token: &AccessToken,
		query: &str,
		country: &str,
	) -> Result<Vec<JobPosting>> {
		let mut url =
			self.base_url.join("jobs").map_err(|source| ConfigError::InvalidResourceUrl { source })?;

		url.query_pairs_mut().append_pair("q", query).append_pair("country", country);

		let (response, meta) = http::get(
			self.http_client.as_ref(),
			self.error_mapper.as_ref(),
			Endpoint::Resource,
			&url,
			Some(access_token),
		)
		.await?;
		let status = response.status();

		if !status.is_success() {
			return Err(http::transient_status_error(Endpoint::Resource, status, meta.as_ref())
				.unwrap_or(Error::ResourceRejected { status: status.as_u16() }));
		}

		http::parse_json(Endpoint::Resource, &response)
	}

	/// Searches postings and keeps the direct application links.
	pub async fn search_direct_apply_links(
		&self,
		access_token: &AccessToken,
		query: &str,
		country: &str,
	) -> Result<Vec<String>> {
		let postings = self.search(access_token, query, country).await?;

		Ok(direct_apply_links(&postings))
	}
}
#[cfg(feature = "reqwest")]
impl JobSearchClient<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a client rooted at `base_url` backed by a default reqwest transport.
	pub fn new(base_url: Url) -> Self {
		Self::with_http_client(base_url, ReqwestHttpClient::default(), ReqwestTransportErrorMapper)
	}
}
impl<C, M> Debug for JobSearchClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("JobSearchClient").field("base_url", &self.base_url.as_str()).finish()
	}
}
