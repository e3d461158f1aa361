//! Thread-safe in-memory [`CredentialStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	store::{CredentialStore, StoreFuture, StoredParam},
};

type ParamMap = Arc<RwLock<HashMap<String, StoredParam>>>;

/// Thread-safe parameter store that keeps values in-process for tests and demos.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(ParamMap);
impl MemoryStore {
	/// Inserts a plain-text parameter, as an operator provisioning the namespace would.
	pub fn seed(&self, key: &str, value: impl Into<String>) {
		self.0.write().insert(key.to_owned(), StoredParam { value: value.into(), secret: false });
	}

	/// Returns the stored value for a key, if present.
	pub fn value_of(&self, key: &str) -> Option<String> {
		self.0.read().get(key).map(|param| param.value.clone())
	}

	/// Returns the secrecy mark the last writer requested for a key, if present.
	pub fn secret_mark(&self, key: &str) -> Option<bool> {
		self.0.read().get(key).map(|param| param.secret)
	}

	fn snapshot_now(map: &ParamMap) -> HashMap<String, String> {
		map.read().iter().map(|(key, param)| (key.clone(), param.value.clone())).collect()
	}

	fn set_now(map: &ParamMap, key: String, value: String, secret: bool) {
		map.write().insert(key, StoredParam { value, secret });
	}
}
impl CredentialStore for MemoryStore {
	fn get_params(&self) -> StoreFuture<'_, HashMap<String, String>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::snapshot_now(&map)) })
	}

	fn set_param<'a>(&'a self, key: &'a str, value: String, secret: bool) -> StoreFuture<'a, ()> {
		let map = self.0.clone();
		let key = key.to_owned();

		Box::pin(async move {
			Self::set_now(&map, key, value, secret);

			Ok(())
		})
	}
}
