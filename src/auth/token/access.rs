//! Access token issued by the token endpoint for the authenticated user.

// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, token::secret::TokenSecret},
};

/// Lifecycle status of an access token at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStatus {
	/// Issued-at lies in the future.
	Pending,
	/// Token is usable.
	Active,
	/// Expiry has passed.
	Expired,
}

/// Errors produced by [`AccessTokenBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum AccessTokenBuilderError {
	/// No token value was provided.
	#[error("Access token value is required.")]
	MissingValue,
	/// The token value was empty.
	#[error("Access token value cannot be blank.")]
	BlankValue,
	/// Both an absolute and a relative expiry were supplied.
	#[error("Expiry must be supplied via either expires_at or expires_in, not both.")]
	ConflictingExpiry,
}

/// Access token plus the metadata the token endpoint returned alongside it.
#[derive(Clone, Serialize, Deserialize)]
pub struct AccessToken {
	/// Bearer value; callers must avoid logging it.
	pub secret: TokenSecret,
	/// Token type as reported by the provider (usually `Bearer`).
	pub token_type: String,
	/// Local instant the token response was received.
	pub issued_at: OffsetDateTime,
	/// Expiry derived from `expires_in`; `None` when the provider omitted it.
	pub expires_at: Option<OffsetDateTime>,
	/// Scopes granted to the token.
	pub scope: ScopeSet,
}
impl AccessToken {
	/// Returns a builder for the given scopes.
	pub fn builder(scope: ScopeSet) -> AccessTokenBuilder {
		AccessTokenBuilder::new(scope)
	}

	/// Computes the lifecycle status at a given instant.
	pub fn status_at(&self, instant: OffsetDateTime) -> TokenStatus {
		if instant < self.issued_at {
			return TokenStatus::Pending;
		}
		if self.expires_at.is_some_and(|expiry| instant >= expiry) {
			return TokenStatus::Expired;
		}

		TokenStatus::Active
	}

	/// Returns `true` if the token has expired at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.status_at(instant), TokenStatus::Expired)
	}

	/// Returns `true` if the token is expired relative to the current clock.
	pub fn is_expired(&self) -> bool {
		self.is_expired_at(OffsetDateTime::now_utc())
	}

	/// Renders the `Authorization` header value.
	pub fn authorization_header(&self) -> String {
		format!("Bearer {}", self.secret.expose())
	}
}
impl Debug for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccessToken")
			.field("secret", &self.secret)
			.field("token_type", &self.token_type)
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.field("scope", &self.scope)
			.finish()
	}
}

/// Builder for [`AccessToken`].
#[derive(Clone, Debug)]
pub struct AccessTokenBuilder {
	scope: ScopeSet,
	secret: Option<TokenSecret>,
	token_type: Option<String>,
	issued_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
}
impl AccessTokenBuilder {
	fn new(scope: ScopeSet) -> Self {
		Self {
			scope,
			secret: None,
			token_type: None,
			issued_at: None,
			expires_at: None,
			expires_in: None,
		}
	}

	/// Provides the token value.
	pub fn value(mut self, token: impl Into<String>) -> Self {
		self.secret = Some(TokenSecret::new(token));

		self
	}

	/// Sets the token type; defaults to `Bearer`.
	pub fn token_type(mut self, token_type: impl Into<String>) -> Self {
		self.token_type = Some(token_type.into());

		self
	}

	/// Sets the issued-at instant; defaults to now.
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets an absolute expiry instant.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets a relative expiry measured from the issued-at instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Consumes the builder and produces an [`AccessToken`].
	pub fn build(self) -> Result<AccessToken, AccessTokenBuilderError> {
		let secret = self.secret.ok_or(AccessTokenBuilderError::MissingValue)?;

		if secret.is_blank() {
			return Err(AccessTokenBuilderError::BlankValue);
		}

		let issued_at = self.issued_at.unwrap_or_else(OffsetDateTime::now_utc);
		let expires_at = match (self.expires_at, self.expires_in) {
			(Some(_), Some(_)) => return Err(AccessTokenBuilderError::ConflictingExpiry),
			(Some(instant), None) => Some(instant),
			(None, Some(delta)) => Some(issued_at + delta),
			(None, None) => None,
		};

		Ok(AccessToken {
			secret,
			token_type: self.token_type.unwrap_or_else(|| "Bearer".into()),
			issued_at,
			expires_at,
			scope: self.scope,
		})
	}
}
