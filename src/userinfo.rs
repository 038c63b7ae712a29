//! User profile loading.
//!
//! [`UserProfileLoader`] is the seam the authentication manager calls after the ID token was
//! verified. [`OidcUserProfileLoader`] is the standard OIDC behavior: claims come from the ID
//! token, optionally enriched by the user-info endpoint, and every granted scope becomes a
//! `SCOPE_<scope>` authority next to [`OIDC_USER_AUTHORITY`].

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, Authority, AuthoritySet, ClaimSet, IdToken, UserProfile, claims},
	error::Endpoint,
	http::{self, TokenHttpClient},
	oauth::TransportErrorMapper,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	registration::ClientRegistration,
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper};

/// Authority granted to every OIDC-authenticated user.
pub const OIDC_USER_AUTHORITY: &str = "OIDC_USER";
/// Prefix of the per-scope authorities.
pub const SCOPE_AUTHORITY_PREFIX: &str = "SCOPE_";
/// Scopes whose presence makes the user-info endpoint worth calling.
pub const USER_INFO_SCOPES: [&str; 4] = ["profile", "email", "address", "phone"];

/// Boxed future returned by [`UserProfileLoader::load`].
pub type LoadFuture<'a> = Pin<Box<dyn Future<Output = Result<UserProfile>> + 'a + Send>>;

/// Loader specialized for the crate's default reqwest transport.
#[cfg(feature = "reqwest")]
pub type ReqwestUserProfileLoader =
	OidcUserProfileLoader<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Everything known about the user once the ID token is verified.
#[derive(Clone, Copy, Debug)]
pub struct UserRequest<'a> {
	/// Registration the user authenticated against.
	pub registration: &'a ClientRegistration,
	/// Access token returned by the token endpoint.
	pub access_token: &'a AccessToken,
	/// Verified ID token.
	pub id_token: &'a IdToken,
	/// Non-standard token response parameters.
	pub additional_parameters: &'a ClaimSet,
}

/// Loads the profile of an authenticated user.
pub trait UserProfileLoader
where
	Self: Send + Sync,
{
	/// Builds the profile (claims, name, raw authorities) for `request`.
	fn load<'a>(&'a self, request: UserRequest<'a>) -> LoadFuture<'a>;
}

/// Standard OIDC profile loader.
pub struct OidcUserProfileLoader<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	http_client: Arc<C>,
	error_mapper: Arc<M>,
}
impl<C, M> OidcUserProfileLoader<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a loader that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(http_client: impl Into<Arc<C>>, mapper: impl Into<Arc<M>>) -> Self {
		Self { http_client: http_client.into(), error_mapper: mapper.into() }
	}

	async fn load_profile(&self, request: UserRequest<'_>) -> Result<UserProfile> {
		let registration = request.registration;
		let mut merged = request.id_token.claims().clone();

		if let Some(endpoint) = user_info_endpoint(&request) {
			let user_info = self.fetch_user_info(registration, endpoint, request.access_token).await?;
			let subject = claims::claim_str(&user_info, claims::SUB)
				.ok_or_else(|| invalid_user_info("Response carries no `sub` claim.".into()))?;

			if Some(subject) != request.id_token.subject() {
				return Err(invalid_user_info(
					"The `sub` claim does not match the ID token subject.".into(),
				));
			}

			merged.extend(user_info);
		}

		let name = claims::claim_str(&merged, &registration.user_name_attribute)
			.ok_or_else(|| {
				invalid_user_info(format!(
					"Missing required user name attribute `{}`.",
					registration.user_name_attribute
				))
			})?
			.to_owned();

		Ok(UserProfile { name, claims: merged, authorities: granted_authorities(request.access_token) })
	}

	async fn fetch_user_info(
		&self,
		registration: &ClientRegistration,
		endpoint: &Url,
		access_token: &AccessToken,
	) -> Result<ClaimSet> {
		let span = FlowSpan::new(FlowKind::UserInfo, "fetch", &registration.id);

		span.instrument(async {
			obs::record_flow_outcome(FlowKind::UserInfo, FlowOutcome::Attempt);

			let result = self.request_user_info(endpoint, access_token).await;

			match &result {
				Ok(_) => obs::observe(FlowKind::UserInfo, FlowOutcome::Success, "loaded"),
				Err(err) => obs::observe(FlowKind::UserInfo, FlowOutcome::Failure, &err.code()),
			}

			result
		})
		.await
	}

	async fn request_user_info(&self, endpoint: &Url, access_token: &AccessToken) -> Result<ClaimSet> {
		let (response, meta) = http::get(
			self.http_client.as_ref(),
			self.error_mapper.as_ref(),
			Endpoint::UserInfo,
			endpoint,
			Some(access_token),
		)
		.await?;
		let status = response.status();

		if !status.is_success() {
			return Err(http::transient_status_error(Endpoint::UserInfo, status, meta.as_ref())
				.unwrap_or_else(|| {
					invalid_user_info(format!("Endpoint answered with HTTP {}.", status.as_u16()))
				}));
		}

		serde_json::from_slice(response.body())
			.map_err(|err| invalid_user_info(format!("Response is not a JSON object: {err}.")))
	}
}
#[cfg(feature = "reqwest")]
impl OidcUserProfileLoader<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a loader backed by a default reqwest transport.
	pub fn new() -> Self {
		Self::with_http_client(ReqwestHttpClient::default(), ReqwestTransportErrorMapper)
	}
}
#[cfg(feature = "reqwest")]
impl Default for OidcUserProfileLoader<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	fn default() -> Self {
		Self::new()
	}
}
impl<C, M> UserProfileLoader for OidcUserProfileLoader<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn load<'a>(&'a self, request: UserRequest<'a>) -> LoadFuture<'a> {
		Box::pin(self.load_profile(request))
	}
}
impl<C, M> Debug for OidcUserProfileLoader<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("OidcUserProfileLoader(..)")
	}
}

/// `OIDC_USER` plus one `SCOPE_<scope>` authority per granted scope.
pub fn granted_authorities(access_token: &AccessToken) -> AuthoritySet {
	let mut authorities = AuthoritySet::new();

	authorities.insert(OIDC_USER_AUTHORITY);
	authorities.extend(
		access_token.scope.iter().map(|scope| Authority::new(format!("{SCOPE_AUTHORITY_PREFIX}{scope}"))),
	);

	authorities
}

fn user_info_endpoint<'a>(request: &UserRequest<'a>) -> Option<&'a Url> {
	let scope = &request.access_token.scope;

	request
		.registration
		.endpoints
		.user_info
		.as_ref()
		.filter(|_| scope.is_empty() || scope.contains_any(USER_INFO_SCOPES))
}

fn invalid_user_info(reason: String) -> Error {
	Error::InvalidUserInfo { reason }
}
