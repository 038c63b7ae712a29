//! Lookup of client registrations by identifier.

// self
use crate::{
	_prelude::*,
	auth::RegistrationId,
	error::ConfigError,
	registration::ClientRegistration,
};

/// Resolves client registrations by identifier.
pub trait RegistrationRepository
where
	Self: Send + Sync,
{
	/// Returns the registration stored under `id`.
	fn find(&self, id: &str) -> Option<Arc<ClientRegistration>>;

	/// Returns the registration stored under `id` or a configuration error.
	fn require(&self, id: &str) -> Result<Arc<ClientRegistration>, ConfigError> {
		self.find(id).ok_or_else(|| ConfigError::UnknownRegistration { id: id.to_owned() })
	}
}

/// Registration repository loaded once at startup.
#[derive(Clone, Debug, Default)]
pub struct InMemoryRegistrationRepository {
	registrations: HashMap<RegistrationId, Arc<ClientRegistration>>,
}
impl InMemoryRegistrationRepository {
	/// Creates a repository from the provided registrations; later duplicates replace earlier ones.
	pub fn new<I>(registrations: I) -> Self
	where
		I: IntoIterator<Item = ClientRegistration>,
	{
		Self {
			registrations: registrations
				.into_iter()
				.map(|registration| (registration.id.clone(), Arc::new(registration)))
				.collect(),
		}
	}

	/// Number of registrations.
	pub fn len(&self) -> usize {
		self.registrations.len()
	}

	/// Returns true when no registration is configured.
	pub fn is_empty(&self) -> bool {
		self.registrations.is_empty()
	}

	/// Iterator over registration identifiers.
	pub fn ids(&self) -> impl Iterator<Item = &RegistrationId> {
		self.registrations.keys()
	}
}
impl RegistrationRepository for InMemoryRegistrationRepository {
	fn find(&self, id: &str) -> Option<Arc<ClientRegistration>> {
		self.registrations.get(id).cloned()
	}
}
