//! Loaded user profile and the authenticated principal handed to the caller.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, AuthoritySet, ClaimSet, IdToken, TokenSecret, claims},
	flows::AuthorizationExchange,
	registration::ClientRegistration,
};

/// User profile assembled by a [`crate::userinfo::UserProfileLoader`].
#[derive(Clone, Debug, PartialEq)]
pub struct UserProfile {
	/// Principal name resolved from the registration's user-name attribute.
	pub name: String,
	/// Merged user claims.
	pub claims: ClaimSet,
	/// Authorities granted before mapping.
	pub authorities: AuthoritySet,
}
impl UserProfile {
	/// String claim by name.
	pub fn claim_str(&self, name: &str) -> Option<&str> {
		claims::claim_str(&self.claims, name)
	}
}

/// Outcome of a successful authentication.
#[derive(Clone)]
pub struct AuthenticatedPrincipal {
	/// Registration the user authenticated against.
	pub registration: Arc<ClientRegistration>,
	/// Authorization exchange consumed by the authentication.
	pub exchange: AuthorizationExchange,
	/// Verified ID token.
	pub id_token: IdToken,
	/// Profile returned by the user profile loader.
	pub profile: UserProfile,
	/// Authorities after mapping; these are the ones to authorize with.
	pub authorities: AuthoritySet,
	/// Access token usable against downstream APIs.
	pub access_token: AccessToken,
	/// Refresh token, if the provider issued one.
	pub refresh_token: Option<TokenSecret>,
}
impl AuthenticatedPrincipal {
	/// Principal name.
	pub fn name(&self) -> &str {
		&self.profile.name
	}

	/// Returns true when the mapped authorities contain `authority`.
	pub fn has_authority(&self, authority: &str) -> bool {
		self.authorities.contains(authority)
	}
}
impl Debug for AuthenticatedPrincipal {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthenticatedPrincipal")
			.field("registration", &self.registration.id)
			.field("name", &self.profile.name)
			.field("authorities", &self.authorities)
			.field("id_token", &self.id_token)
			.field("access_token", &self.access_token)
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.finish()
	}
}
