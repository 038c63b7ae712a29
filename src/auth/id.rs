//! Registration identifiers.
//!
//! A registration id names a provider in configuration (`[registrations.<id>]`) and in the
//! redirect path (`/login/oauth2/code/<id>`), so it is restricted to characters that survive
//! both unquoted: ASCII letters, digits, `-`, `_`, and `.`, starting with a letter or digit.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

/// Longest accepted registration id.
pub const REGISTRATION_ID_MAX_LEN: usize = 64;

/// Error returned when a registration id is rejected.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum IdentifierError {
	/// The id was empty.
	#[error("Registration id cannot be empty.")]
	Empty,
	/// The id does not start with an ASCII letter or digit.
	#[error("Registration id must start with an ASCII letter or digit, found {found:?}.")]
	InvalidStart {
		/// Offending first character.
		found: char,
	},
	/// The id contains a character outside the allowed set.
	#[error("Registration id contains {found:?} at byte {position}.")]
	InvalidCharacter {
		/// Offending character.
		found: char,
		/// Byte offset of the character.
		position: usize,
	},
	/// The id is longer than [`REGISTRATION_ID_MAX_LEN`].
	#[error("Registration id exceeds {max} characters.")]
	TooLong {
		/// Maximum permitted length.
		max: usize,
	},
}

/// Identifier under which a client registration is looked up.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RegistrationId(String);
impl RegistrationId {
	/// Validates `value` as a registration id.
	pub fn new(value: impl Into<String>) -> Result<Self, IdentifierError> {
		let value = value.into();

		check(&value)?;

		Ok(Self(value))
	}

	/// Identifier as a string slice.
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Redirect path segment conventionally used for this registration.
	pub fn redirect_path(&self) -> String {
		format!("/login/oauth2/code/{}", self.0)
	}
}
impl Deref for RegistrationId {
	type Target = str;

	fn deref(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for RegistrationId {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl Borrow<str> for RegistrationId {
	fn borrow(&self) -> &str {
		&self.0
	}
}
impl TryFrom<String> for RegistrationId {
	type Error = IdentifierError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}
impl From<RegistrationId> for String {
	fn from(value: RegistrationId) -> Self {
		value.0
	}
}
impl FromStr for RegistrationId {
	type Err = IdentifierError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}
impl Debug for RegistrationId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "RegistrationId({})", self.0)
	}
}
impl Display for RegistrationId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

fn check(value: &str) -> Result<(), IdentifierError> {
	let mut chars = value.char_indices();
	let Some((_, first)) = chars.next() else {
		return Err(IdentifierError::Empty);
	};

	if !first.is_ascii_alphanumeric() {
		return Err(IdentifierError::InvalidStart { found: first });
	}
	if let Some((position, found)) =
		chars.find(|(_, c)| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
	{
		return Err(IdentifierError::InvalidCharacter { found, position });
	}
	// Only ASCII remains, so bytes equal characters.
	if value.len() > REGISTRATION_ID_MAX_LEN {
		return Err(IdentifierError::TooLong { max: REGISTRATION_ID_MAX_LEN });
	}

	Ok(())
}
