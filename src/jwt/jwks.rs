//! Verifiers backed by a provider's published JWK set.
//!
//! Key sets are cached per registration for [`DEFAULT_KEY_SET_TTL`] (configurable). A token whose
//! `kid` is missing from the cached set triggers one forced refetch, which covers key rotation.
//! Forced refetches are rate limited by [`DEFAULT_MIN_REFRESH_INTERVAL`], so a token carrying an
//! unknown `kid` cannot turn every login into an extra key set request. Concurrent refreshes
//! are collapsed behind a single async lock so a burst of logins costs one request.

// crates.io
use jsonwebtoken::{
	DecodingKey,
	jwk::{Jwk, JwkSet},
};
// self
use crate::{
	_prelude::*,
	auth::RegistrationId,
	error::{Endpoint, TransientError},
	http::{self, TokenHttpClient},
	jwt::{IdTokenVerifierFactory, Jwt, JwtError, JwtVerifier, VerificationPolicy, VerifyFuture},
	oauth::TransportErrorMapper,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	registration::ClientRegistration,
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper};

/// How long a fetched key set is reused before it is fetched again.
pub const DEFAULT_KEY_SET_TTL: Duration = Duration::minutes(5);
/// Minimum age of the cached key set before an unknown `kid` may force a refetch.
pub const DEFAULT_MIN_REFRESH_INTERVAL: Duration = Duration::seconds(30);

/// Factory specialized for the crate's default reqwest transport.
#[cfg(feature = "reqwest")]
pub type ReqwestJwksVerifierFactory =
	JwksVerifierFactory<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Creates one [`JwksVerifier`] per registration and reuses it across authentications.
pub struct JwksVerifierFactory<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	http_client: Arc<C>,
	error_mapper: Arc<M>,
	ttl: Duration,
	min_refresh_interval: Duration,
	verifiers: Mutex<HashMap<RegistrationId, Arc<JwksVerifier<C, M>>>>,
}
impl<C, M> JwksVerifierFactory<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a factory that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(http_client: impl Into<Arc<C>>, mapper: impl Into<Arc<M>>) -> Self {
		Self {
			http_client: http_client.into(),
			error_mapper: mapper.into(),
			ttl: DEFAULT_KEY_SET_TTL,
			min_refresh_interval: DEFAULT_MIN_REFRESH_INTERVAL,
			verifiers: Default::default(),
		}
	}

	/// Overrides the key set cache lifetime.
	pub fn with_ttl(mut self, ttl: Duration) -> Self {
		self.ttl = ttl;

		self
	}

	/// Overrides how long a fetched key set shields the endpoint from forced refetches.
	///
	/// [`Duration::ZERO`] refetches on every unknown `kid`.
	pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
		self.min_refresh_interval = interval;

		self
	}
}
#[cfg(feature = "reqwest")]
impl JwksVerifierFactory<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a factory backed by a default reqwest transport.
	pub fn new() -> Self {
		Self::with_http_client(ReqwestHttpClient::default(), ReqwestTransportErrorMapper)
	}
}
#[cfg(feature = "reqwest")]
impl Default for JwksVerifierFactory<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	fn default() -> Self {
		Self::new()
	}
}
impl<C, M> IdTokenVerifierFactory for JwksVerifierFactory<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn create_verifier(&self, registration: &ClientRegistration) -> Arc<dyn JwtVerifier> {
		let policy = VerificationPolicy::for_registration(registration);
		let mut verifiers = self.verifiers.lock();

		if let Some(existing) = verifiers.get(&registration.id).filter(|verifier| {
			verifier.policy == policy && verifier.jwk_set_uri == registration.endpoints.jwk_set
		}) {
			return existing.clone();
		}

		let verifier = Arc::new(JwksVerifier {
			http_client: Arc::clone(&self.http_client),
			error_mapper: Arc::clone(&self.error_mapper),
			registration: registration.id.clone(),
			jwk_set_uri: registration.endpoints.jwk_set.clone(),
			policy,
			ttl: self.ttl,
			min_refresh_interval: self.min_refresh_interval,
			cache: RwLock::new(None),
			refresh_guard: AsyncMutex::new(()),
		});

		verifiers.insert(registration.id.clone(), Arc::clone(&verifier));

		verifier
	}
}
impl<C, M> Debug for JwksVerifierFactory<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("JwksVerifierFactory")
			.field("ttl", &self.ttl)
			.field("min_refresh_interval", &self.min_refresh_interval)
			.field("registrations", &self.verifiers.lock().len())
			.finish()
	}
}

/// Verifier bound to one registration and its JWK set endpoint.
pub struct JwksVerifier<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	http_client: Arc<C>,
	error_mapper: Arc<M>,
	registration: RegistrationId,
	jwk_set_uri: Url,
	policy: VerificationPolicy,
	ttl: Duration,
	min_refresh_interval: Duration,
	cache: RwLock<Option<CachedKeySet>>,
	refresh_guard: AsyncMutex<()>,
}
impl<C, M> JwksVerifier<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Returns the checks this verifier applies.
	pub fn policy(&self) -> &VerificationPolicy {
		&self.policy
	}

	async fn verify_token(&self, token: &str) -> Result<Jwt, JwtError> {
		let header = jsonwebtoken::decode_header(token)?;

		self.policy.check_algorithm(header.alg)?;

		let kid = header.kid.as_deref();
		let mut keys = self.key_set(false).await.map_err(key_set_unavailable)?;

		if kid.is_some_and(|kid| keys.find(kid).is_none()) {
			keys = self.key_set(true).await.map_err(key_set_unavailable)?;
		}

		let key = DecodingKey::from_jwk(select_key(&keys, kid)?)?;

		self.policy.verify(token, &key)
	}

	async fn key_set(&self, force: bool) -> Result<Arc<JwkSet>> {
		let seen = self.generation();

		if let Some(keys) = self.reusable(seen, force) {
			return Ok(keys);
		}

		let _refresh = self.refresh_guard.lock().await;

		// A concurrent caller may have refreshed while this one waited for the lock.
		if let Some(keys) = self.reusable(seen, force) {
			return Ok(keys);
		}

		let keys = Arc::new(self.fetch().await?);
		let mut cache = self.cache.write();
		let generation = cache.as_ref().map_or(0, |cached| cached.generation) + 1;

		*cache = Some(CachedKeySet {
			keys: Arc::clone(&keys),
			fetched_at: OffsetDateTime::now_utc(),
			generation,
		});

		Ok(keys)
	}

	fn generation(&self) -> Option<u64> {
		self.cache.read().as_ref().map(|cached| cached.generation)
	}

	fn reusable(&self, seen: Option<u64>, force: bool) -> Option<Arc<JwkSet>> {
		let cache = self.cache.read();
		let cached = cache.as_ref()?;
		let refreshed = seen != Some(cached.generation);
		let age = OffsetDateTime::now_utc() - cached.fetched_at;
		let fresh = age < self.ttl;
		let cooling = age < self.min_refresh_interval;

		(refreshed || fresh && (cooling || !force)).then(|| Arc::clone(&cached.keys))
	}

	async fn fetch(&self) -> Result<JwkSet> {
		let span = FlowSpan::new(FlowKind::KeySetRefresh, "fetch", &self.registration);

		span.instrument(async {
			obs::record_flow_outcome(FlowKind::KeySetRefresh, FlowOutcome::Attempt);

			let result = self.fetch_once().await;

			match &result {
				Ok(keys) => obs::observe(
					FlowKind::KeySetRefresh,
					FlowOutcome::Success,
					&format!("{} keys", keys.keys.len()),
				),
				Err(err) => obs::observe(FlowKind::KeySetRefresh, FlowOutcome::Failure, &err.code()),
			}

			result
		})
		.await
	}

	async fn fetch_once(&self) -> Result<JwkSet> {
		let (response, meta) = http::get(
			self.http_client.as_ref(),
			self.error_mapper.as_ref(),
			Endpoint::KeySet,
			&self.jwk_set_uri,
			None,
		)
		.await?;
		let status = response.status();

		if !status.is_success() {
			return Err(http::transient_status_error(Endpoint::KeySet, status, meta.as_ref())
				.unwrap_or_else(|| {
					TransientError::Endpoint {
						endpoint: Endpoint::KeySet,
						message: format!("HTTP {}", status.as_u16()),
						status: Some(status.as_u16()),
						retry_after: None,
					}
					.into()
				}));
		}

		http::parse_json(Endpoint::KeySet, &response)
	}
}
impl<C, M> JwtVerifier for JwksVerifier<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn verify<'a>(&'a self, token: &'a str) -> VerifyFuture<'a> {
		Box::pin(self.verify_token(token))
	}
}
impl<C, M> Debug for JwksVerifier<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("JwksVerifier")
			.field("registration", &self.registration)
			.field("jwk_set_uri", &self.jwk_set_uri.as_str())
			.field("policy", &self.policy)
			.field("ttl", &self.ttl)
			.finish()
	}
}

struct CachedKeySet {
	keys: Arc<JwkSet>,
	fetched_at: OffsetDateTime,
	generation: u64,
}

fn select_key<'k>(keys: &'k JwkSet, kid: Option<&str>) -> Result<&'k Jwk, JwtError> {
	match kid {
		Some(kid) => keys.find(kid).ok_or_else(|| JwtError::KeyNotFound { kid: kid.to_owned() }),
		None => match keys.keys.as_slice() {
			[only] => Ok(only),
			all => Err(JwtError::AmbiguousKey { keys: all.len() }),
		},
	}
}

fn key_set_unavailable(err: Error) -> JwtError {
	JwtError::KeySetUnavailable { source: Box::new(err) }
}
