//! Granted authorities and the pluggable mapper applied after the user profile is loaded.

// std
use std::borrow::Borrow;
// self
use crate::_prelude::*;

/// A single granted authority (role, scope grant, or any application-defined permission).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Authority(String);
impl Authority {
	/// Wraps an authority name.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the authority name.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl From<&str> for Authority {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}
impl From<String> for Authority {
	fn from(value: String) -> Self {
		Self(value)
	}
}
impl AsRef<str> for Authority {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl Borrow<str> for Authority {
	fn borrow(&self) -> &str {
		&self.0
	}
}
impl Debug for Authority {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Authority({})", self.0)
	}
}
impl Display for Authority {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

/// Ordered, deduplicated set of authorities.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthoritySet(BTreeSet<Authority>);
impl AuthoritySet {
	/// Creates an empty set.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds an authority, returning whether it was newly inserted.
	pub fn insert(&mut self, authority: impl Into<Authority>) -> bool {
		self.0.insert(authority.into())
	}

	/// Returns true if the authority is part of the set.
	pub fn contains(&self, authority: &str) -> bool {
		self.0.contains(authority)
	}

	/// Number of authorities.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns true if no authority is granted.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Iterator over authorities in lexical order.
	pub fn iter(&self) -> impl Iterator<Item = &Authority> {
		self.0.iter()
	}
}
impl<A> FromIterator<A> for AuthoritySet
where
	A: Into<Authority>,
{
	fn from_iter<I: IntoIterator<Item = A>>(iter: I) -> Self {
		Self(iter.into_iter().map(Into::into).collect())
	}
}
impl<A> Extend<A> for AuthoritySet
where
	A: Into<Authority>,
{
	fn extend<I: IntoIterator<Item = A>>(&mut self, iter: I) {
		self.0.extend(iter.into_iter().map(Into::into));
	}
}
impl IntoIterator for AuthoritySet {
	type IntoIter = std::collections::btree_set::IntoIter<Authority>;
	type Item = Authority;

	fn into_iter(self) -> Self::IntoIter {
		self.0.into_iter()
	}
}
impl<'a> IntoIterator for &'a AuthoritySet {
	type IntoIter = std::collections::btree_set::Iter<'a, Authority>;
	type Item = &'a Authority;

	fn into_iter(self) -> Self::IntoIter {
		self.0.iter()
	}
}

/// Translates provider-derived authorities into the application's vocabulary.
///
/// Implementations must be total and free of side effects. Dropping entries is only acceptable
/// when that is the mapper's documented purpose.
pub trait AuthoritiesMapper
where
	Self: Send + Sync,
{
	/// Maps the loaded authorities.
	fn map_authorities(&self, authorities: &AuthoritySet) -> AuthoritySet;
}
impl<F> AuthoritiesMapper for F
where
	F: Fn(&AuthoritySet) -> AuthoritySet + Send + Sync,
{
	fn map_authorities(&self, authorities: &AuthoritySet) -> AuthoritySet {
		self(authorities)
	}
}

/// Default mapper returning its input unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityAuthoritiesMapper;
impl AuthoritiesMapper for IdentityAuthoritiesMapper {
	fn map_authorities(&self, authorities: &AuthoritySet) -> AuthoritySet {
		authorities.clone()
	}
}

/// Prefixes every authority (e.g. `ROLE_`), optionally upper-casing it and adding a default.
#[derive(Clone, Debug)]
pub struct PrefixAuthoritiesMapper {
	prefix: String,
	uppercase: bool,
	default_authority: Option<Authority>,
}
impl PrefixAuthoritiesMapper {
	/// Creates a mapper that prepends `prefix` unless an authority already starts with it.
	pub fn new(prefix: impl Into<String>) -> Self {
		Self { prefix: prefix.into(), uppercase: false, default_authority: None }
	}

	/// Upper-cases authorities after prefixing.
	pub fn uppercase(mut self) -> Self {
		self.uppercase = true;

		self
	}

	/// Always grants the provided authority in addition to the mapped ones.
	pub fn with_default_authority(mut self, authority: impl Into<Authority>) -> Self {
		self.default_authority = Some(authority.into());

		self
	}

	fn map_one(&self, authority: &Authority) -> Authority {
		let name = if authority.as_str().starts_with(&self.prefix) {
			authority.as_str().to_owned()
		} else {
			format!("{}{}", self.prefix, authority)
		};

		if self.uppercase { Authority::new(name.to_uppercase()) } else { Authority::new(name) }
	}
}
impl AuthoritiesMapper for PrefixAuthoritiesMapper {
	fn map_authorities(&self, authorities: &AuthoritySet) -> AuthoritySet {
		let mut mapped: AuthoritySet =
			authorities.iter().map(|authority| self.map_one(authority)).collect();

		if let Some(default) = &self.default_authority {
			mapped.insert(default.clone());
		}

		mapped
	}
}
