//! Credential data model: the authoritative token state and exchange products.

pub mod secret;

pub use secret::TokenSecret;

// self
use crate::{_prelude::*, error::ConfigError, store::ParamKey};

/// Returns the current Unix timestamp in seconds, as used by expiry comparisons.
pub fn unix_now() -> i64 {
	OffsetDateTime::now_utc().unix_timestamp()
}

/// Authoritative in-process token state loaded from the credential store.
///
/// The rotating triple (access token, refresh token, expiry) is only ever
/// replaced as a whole via [`CredentialSet::apply`]; the previous refresh token
/// becomes invalid upstream the moment a rotation succeeds.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialSet {
	/// Provider application identifier.
	pub client_id: String,
	/// Provider application secret.
	pub client_secret: String,
	/// Bearer token currently on file, absent until first issued.
	pub access_token: Option<TokenSecret>,
	/// Rotating refresh token, absent until the initial authorization ran.
	pub refresh_token: Option<TokenSecret>,
	/// Exclusive upper bound of access-token validity, Unix seconds; `0` when unknown.
	pub expiry_time: i64,
}
impl CredentialSet {
	/// Builds a credential set from a store parameter snapshot.
	///
	/// `clientId` and `clientSecret` are required; the token parameters may be
	/// absent on a store that has never been authorized. A missing or
	/// unparseable `expiryTime` degrades to `0` so the next access forces a
	/// refresh instead of failing the load.
	pub fn from_params(params: &HashMap<String, String>) -> Result<Self, ConfigError> {
		let client_id = Self::required(params, ParamKey::ClientId)?;
		let client_secret = Self::required(params, ParamKey::ClientSecret)?;
		let access_token = Self::optional(params, ParamKey::AccessToken).map(TokenSecret::new);
		let refresh_token = Self::optional(params, ParamKey::RefreshToken).map(TokenSecret::new);
		let expiry_time = Self::optional(params, ParamKey::ExpiryTime)
			.and_then(|raw| raw.parse::<i64>().ok())
			.unwrap_or(0);

		Ok(Self { client_id, client_secret, access_token, refresh_token, expiry_time })
	}

	/// Returns the bearer token while it is still valid at `now`.
	///
	/// Validity requires `expiry_time` to be strictly greater than `now`; a
	/// token expiring at exactly the current second is treated as expired.
	pub fn bearer_at(&self, now: i64) -> Option<&TokenSecret> {
		if self.expiry_time > now { self.access_token.as_ref() } else { None }
	}

	/// Replaces the rotating triple with a freshly exchanged result.
	pub fn apply(&mut self, tokens: &RefreshResult) {
		self.access_token = Some(tokens.access_token.clone());
		self.refresh_token = Some(tokens.refresh_token.clone());
		self.expiry_time = tokens.expires_at;
	}

	fn required(params: &HashMap<String, String>, key: ParamKey) -> Result<String, ConfigError> {
		Self::optional(params, key).ok_or(ConfigError::MissingParam { key: key.name() })
	}

	fn optional(params: &HashMap<String, String>, key: ParamKey) -> Option<String> {
		params.get(key.name()).filter(|value| !value.is_empty()).cloned()
	}
}
impl Debug for CredentialSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialSet")
			.field("client_id", &self.client_id)
			.field("client_secret", &"<redacted>")
			.field("access_token", &self.access_token)
			.field("refresh_token", &self.refresh_token)
			.field("expiry_time", &self.expiry_time)
			.finish()
	}
}

/// Transient product of a successful token exchange.
///
/// Consumed immediately to update the in-memory [`CredentialSet`] and to drive
/// the persistence fan-out; never stored as-is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefreshResult {
	/// Freshly issued bearer token.
	pub access_token: TokenSecret,
	/// Freshly rotated refresh token; the previous one is now invalid upstream.
	pub refresh_token: TokenSecret,
	/// Absolute expiry of the new access token, Unix seconds.
	pub expires_at: i64,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn params(entries: &[(&str, &str)]) -> HashMap<String, String> {
		entries.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect()
	}

	fn full_params() -> HashMap<String, String> {
		params(&[
			("clientId", "app-1"),
			("clientSecret", "hush"),
			("accessToken", "AT1"),
			("refreshToken", "RT1"),
			("expiryTime", "1000"),
		])
	}

	#[test]
	fn from_params_reads_full_snapshot() {
		let set = CredentialSet::from_params(&full_params())
			.expect("Full snapshot should build a credential set.");

		assert_eq!(set.client_id, "app-1");
		assert_eq!(set.client_secret, "hush");
		assert_eq!(set.access_token.as_ref().map(TokenSecret::expose), Some("AT1"));
		assert_eq!(set.refresh_token.as_ref().map(TokenSecret::expose), Some("RT1"));
		assert_eq!(set.expiry_time, 1_000);
	}

	#[test]
	fn from_params_requires_client_credentials() {
		let err = CredentialSet::from_params(&params(&[("clientSecret", "hush")]))
			.expect_err("Missing clientId should fail the load.");

		assert!(matches!(err, ConfigError::MissingParam { key: "clientId" }));

		let err = CredentialSet::from_params(&params(&[("clientId", "app-1")]))
			.expect_err("Missing clientSecret should fail the load.");

		assert!(matches!(err, ConfigError::MissingParam { key: "clientSecret" }));
	}

	#[test]
	fn from_params_tolerates_absent_or_garbled_tokens() {
		let set = CredentialSet::from_params(&params(&[
			("clientId", "app-1"),
			("clientSecret", "hush"),
			("expiryTime", "not-a-number"),
		]))
		.expect("Token parameters should be optional on first load.");

		assert!(set.access_token.is_none());
		assert!(set.refresh_token.is_none());
		assert_eq!(set.expiry_time, 0);
	}

	#[test]
	fn bearer_validity_is_strict() {
		let set = CredentialSet::from_params(&full_params())
			.expect("Full snapshot should build a credential set.");

		assert!(set.bearer_at(999).is_some());
		assert!(set.bearer_at(1_000).is_none());
		assert!(set.bearer_at(1_001).is_none());
	}

	#[test]
	fn apply_replaces_the_rotating_triple_as_a_whole() {
		let mut set = CredentialSet::from_params(&full_params())
			.expect("Full snapshot should build a credential set.");

		set.apply(&RefreshResult {
			access_token: TokenSecret::new("AT2"),
			refresh_token: TokenSecret::new("RT2"),
			expires_at: 2_000,
		});

		assert_eq!(set.access_token.as_ref().map(TokenSecret::expose), Some("AT2"));
		assert_eq!(set.refresh_token.as_ref().map(TokenSecret::expose), Some("RT2"));
		assert_eq!(set.expiry_time, 2_000);
		assert_eq!(set.client_id, "app-1");
	}

	#[test]
	fn debug_redacts_client_secret() {
		let set = CredentialSet::from_params(&full_params())
			.expect("Full snapshot should build a credential set.");
		let rendered = format!("{set:?}");

		assert!(rendered.contains("<redacted>"));
		assert!(!rendered.contains("hush"));
		assert!(!rendered.contains("AT1"));
	}
}
