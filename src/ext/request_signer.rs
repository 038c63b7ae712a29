//! Request signing contracts that attach the authenticated user's access token to arbitrary HTTP
//! clients.

// crates.io
use oauth2::{
	HttpRequest,
	http::header::{AUTHORIZATION, HeaderValue},
};
// self
use crate::{auth::AccessToken, error::ConfigError};

/// Attaches an [`AccessToken`] to an outbound request without constraining the client type.
pub trait RequestSignerExt<Request, Error>
where
	Self: Send + Sync,
{
	/// Consumes the request and returns it with authorization state derived from `token`.
	fn attach_token(&self, request: Request, token: &AccessToken) -> Result<Request, Error>;
}

/// Sets `Authorization: Bearer <token>` on an [`HttpRequest`].
#[derive(Clone, Copy, Debug, Default)]
pub struct BearerSigner;
impl RequestSignerExt<HttpRequest, ConfigError> for BearerSigner {
	fn attach_token(
		&self,
		mut request: HttpRequest,
		token: &AccessToken,
	) -> Result<HttpRequest, ConfigError> {
		let mut value = HeaderValue::from_str(&token.authorization_header())
			.map_err(|err| ConfigError::from(oauth2::http::Error::from(err)))?;

		value.set_sensitive(true);
		request.headers_mut().insert(AUTHORIZATION, value);

		Ok(request)
	}
}
