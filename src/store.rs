//! Credential-store contract and built-in parameter store backends.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::_prelude::*;

/// Future type returned by [`CredentialStore`] implementations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Contract for the external secure parameter store holding durable credentials.
///
/// Implementations are expected to keep all parameters under one fixed
/// namespace and to decrypt secret-typed values transparently on read. Writes
/// to distinct keys must be safe to issue concurrently; the refresher fans out
/// its three persistence writes without ordering them.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Returns every known key/value pair in the namespace.
	fn get_params(&self) -> StoreFuture<'_, HashMap<String, String>>;

	/// Upserts one parameter, encrypting it at rest when `secret` is set.
	fn set_param<'a>(&'a self, key: &'a str, value: String, secret: bool) -> StoreFuture<'a, ()>;
}

/// Well-known parameter names shared between the keeper and the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParamKey {
	/// Provider application identifier, operator-provisioned.
	ClientId,
	/// Provider application secret, operator-provisioned.
	ClientSecret,
	/// Bearer token issued by the last exchange.
	AccessToken,
	/// Rotating refresh token issued by the last exchange.
	RefreshToken,
	/// Access-token expiry, Unix seconds rendered as a decimal string.
	ExpiryTime,
}
impl ParamKey {
	/// Returns the parameter name used inside the store namespace.
	pub const fn name(self) -> &'static str {
		match self {
			ParamKey::ClientId => "clientId",
			ParamKey::ClientSecret => "clientSecret",
			ParamKey::AccessToken => "accessToken",
			ParamKey::RefreshToken => "refreshToken",
			ParamKey::ExpiryTime => "expiryTime",
		}
	}

	/// Returns whether the parameter must be encrypted at rest.
	pub const fn is_secret(self) -> bool {
		matches!(
			self,
			ParamKey::ClientSecret | ParamKey::AccessToken | ParamKey::RefreshToken
		)
	}
}
impl Display for ParamKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.name())
	}
}

/// Parameter value plus the secrecy mark its writer requested.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredParam {
	/// Raw parameter value.
	pub value: String,
	/// Whether the writer asked for encrypted-at-rest storage.
	pub secret: bool,
}

/// Error type produced by [`CredentialStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
