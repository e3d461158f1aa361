//! Process-local token cache fronting the refresher.
//!
//! [`TokenCache`] serves a currently-valid access token to any caller, hiding
//! whether that required a network refresh. The credential slot sits behind a
//! single async mutex: concurrent callers serialize, each re-checks expiry
//! after acquiring the lock, and at most one refresh is in flight per process.
//! Two racing refreshes would each consume the single-use refresh token and
//! strand the loser with a rotation the provider no longer honors.

// self
use crate::{
	_prelude::*,
	credential::{self, CredentialSet},
	error::ConfigError,
	http::TokenHttpClient,
	refresh::TokenRefresher,
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, oauth::OAuthEndpoint, store::CredentialStore};

/// In-process cache holding at most one credential set.
///
/// Owned explicitly and shared by handle (`Arc<TokenCache<_>>`) rather than
/// living in a process-wide singleton, so tests can isolate instances.
pub struct TokenCache<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Refresher consulted whenever the cached token is stale.
	pub refresher: TokenRefresher<C>,
	slot: AsyncMutex<Option<CredentialSet>>,
}
impl<C> TokenCache<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Creates an empty cache fronting the provided refresher.
	pub fn new(refresher: TokenRefresher<C>) -> Self {
		Self { refresher, slot: AsyncMutex::new(None) }
	}

	/// Returns a currently-valid access token, refreshing it first if needed.
	///
	/// The hot path (cached token still valid) performs zero network or store
	/// calls. On the first call the credential set is loaded from the store;
	/// `clientId` and `clientSecret` must be present there. A failed exchange
	/// leaves the cached set untouched so a later call retries cleanly. When
	/// the exchange succeeds but one of the persistence writes fails, the
	/// refreshed tokens are committed to the cache first and the storage error
	/// is then returned; the immediate next call serves the new token from the
	/// hot path without another exchange, while durable state stays behind
	/// until a later refresh persists cleanly.
	pub async fn get_token(&self) -> Result<String> {
		let mut slot = self.slot.lock().await;
		let set = match slot.take() {
			Some(set) => slot.insert(set),
			None => slot.insert(self.load_credentials().await?),
		};
		let now = credential::unix_now();

		if let Some(token) = set.bearer_at(now) {
			return Ok(token.expose().to_owned());
		}

		let refresh_token = set
			.refresh_token
			.as_ref()
			.ok_or(ConfigError::MissingRefreshToken)?
			.expose()
			.to_owned();
		let outcome =
			self.refresher.refresh(&set.client_id, &set.client_secret, &refresh_token).await?;

		set.apply(&outcome.tokens);

		match outcome.persist_error {
			None => Ok(outcome.tokens.access_token.expose().to_owned()),
			Some(err) => Err(err.into()),
		}
	}

	/// Exchanges a one-time authorization code and commits the result.
	///
	/// Client credentials are read fresh from the store, so this works against
	/// a namespace that has never held tokens. As with [`TokenCache::get_token`],
	/// the exchanged tokens are committed to the cache before any persistence
	/// failure is reported.
	pub async fn authorize(&self, code: &str) -> Result<()> {
		let mut slot = self.slot.lock().await;
		let mut set = self.load_credentials().await?;
		let outcome =
			self.refresher.authorize(&set.client_id, &set.client_secret, code).await?;

		set.apply(&outcome.tokens);
		*slot = Some(set);

		match outcome.persist_error {
			None => Ok(()),
			Some(err) => Err(err.into()),
		}
	}

	async fn load_credentials(&self) -> Result<CredentialSet> {
		let params = self.refresher.store.get_params().await?;

		Ok(CredentialSet::from_params(&params)?)
	}
}
#[cfg(feature = "reqwest")]
impl TokenCache<ReqwestHttpClient> {
	/// Creates a cache for the hosted Strava API backed by a fresh reqwest transport.
	pub fn strava(store: Arc<dyn CredentialStore>) -> Result<Self> {
		let endpoint = OAuthEndpoint::strava(ReqwestHttpClient::default())?;

		Ok(Self::new(TokenRefresher::new(endpoint, store)))
	}
}
impl<C> Debug for TokenCache<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenCache").field("refresher", &self.refresher).finish()
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicU64, Ordering};
	// self
	use super::*;
	use crate::{
		http::{HttpFuture, RawExchangeResponse},
		oauth::OAuthEndpoint,
		store::{MemoryStore, ParamKey},
	};

	/// Transport stub that replays one canned response and counts requests.
	struct ScriptedHttpClient {
		hits: AtomicU64,
		status: u16,
		body: String,
	}
	impl ScriptedHttpClient {
		fn success(body: impl Into<String>) -> Self {
			Self { hits: AtomicU64::new(0), status: 200, body: body.into() }
		}

		fn rejection(status: u16, body: impl Into<String>) -> Self {
			Self { hits: AtomicU64::new(0), status, body: body.into() }
		}

		fn hits(&self) -> u64 {
			self.hits.load(Ordering::SeqCst)
		}
	}
	impl TokenHttpClient for ScriptedHttpClient {
		fn post<'a>(&'a self, _: &'a Url) -> HttpFuture<'a, RawExchangeResponse> {
			self.hits.fetch_add(1, Ordering::SeqCst);

			Box::pin(async move {
				Ok(RawExchangeResponse { status: self.status, body: self.body.clone() })
			})
		}
	}

	fn seeded_store(expiry_time: i64) -> Arc<MemoryStore> {
		let store = MemoryStore::default();

		store.seed(ParamKey::ClientId.name(), "app-1");
		store.seed(ParamKey::ClientSecret.name(), "hush");
		store.seed(ParamKey::AccessToken.name(), "AT1");
		store.seed(ParamKey::RefreshToken.name(), "RT1");
		store.seed(ParamKey::ExpiryTime.name(), expiry_time.to_string());

		Arc::new(store)
	}

	fn build_cache(
		client: Arc<ScriptedHttpClient>,
		store: Arc<MemoryStore>,
	) -> TokenCache<ScriptedHttpClient> {
		let endpoint = OAuthEndpoint::from_url_str("https://id.example.com/token", client)
			.expect("Endpoint fixture URL should be valid.");

		TokenCache::new(TokenRefresher::new(endpoint, store))
	}

	fn rotation_body(expires_at: i64) -> String {
		format!(
			"{{\"access_token\":\"AT2\",\"refresh_token\":\"RT2\",\"expires_at\":{expires_at}}}"
		)
	}

	#[tokio::test]
	async fn valid_stored_token_is_served_without_any_exchange() {
		let client = Arc::new(ScriptedHttpClient::success("unused"));
		let cache = build_cache(client.clone(), seeded_store(credential::unix_now() + 3_600));

		for _ in 0..3 {
			let token =
				cache.get_token().await.expect("Valid stored tokens should serve from cache.");

			assert_eq!(token, "AT1");
		}

		assert_eq!(client.hits(), 0);
	}

	#[tokio::test]
	async fn expired_token_triggers_exactly_one_exchange() {
		let now = credential::unix_now();
		let client = Arc::new(ScriptedHttpClient::success(rotation_body(now + 3_600)));
		let cache = build_cache(client.clone(), seeded_store(now - 500));
		let token = cache.get_token().await.expect("Expired tokens should refresh.");

		assert_eq!(token, "AT2");

		// The rotated token now serves from the hot path.
		let token = cache.get_token().await.expect("Rotated tokens should serve from cache.");

		assert_eq!(token, "AT2");
		assert_eq!(client.hits(), 1);
	}

	#[tokio::test]
	async fn token_expiring_this_second_counts_as_expired() {
		let now = credential::unix_now();
		let client = Arc::new(ScriptedHttpClient::success(rotation_body(now + 3_600)));
		let cache = build_cache(client.clone(), seeded_store(now));
		let token = cache.get_token().await.expect("Boundary expiry should refresh.");

		assert_eq!(token, "AT2");
		assert_eq!(client.hits(), 1);
	}

	#[tokio::test]
	async fn concurrent_callers_share_a_single_refresh() {
		let now = credential::unix_now();
		let client = Arc::new(ScriptedHttpClient::success(rotation_body(now + 3_600)));
		let cache = Arc::new(build_cache(client.clone(), seeded_store(now - 1)));
		let (a, b, c) =
			tokio::join!(cache.get_token(), cache.get_token(), cache.get_token());
		let a = a.expect("First concurrent caller should succeed.");
		let b = b.expect("Second concurrent caller should succeed.");
		let c = c.expect("Third concurrent caller should succeed.");

		assert_eq!(a, "AT2");
		assert_eq!(b, "AT2");
		assert_eq!(c, "AT2");
		assert_eq!(client.hits(), 1);
	}

	#[tokio::test]
	async fn rejected_exchange_leaves_the_cached_set_untouched() {
		let now = credential::unix_now();
		let client = Arc::new(ScriptedHttpClient::rejection(401, "invalid_grant"));
		let store = seeded_store(now - 500);
		let cache = build_cache(client.clone(), store.clone());
		let err = cache.get_token().await.expect_err("Rejected exchanges should fail.");

		assert!(matches!(
			err,
			Error::UpstreamRejected { status: 401, ref body } if body == "invalid_grant"
		));
		// No partial mutation: a later call retries the refresh from scratch.
		cache.get_token().await.expect_err("Retries against a failing endpoint should fail too.");

		assert_eq!(client.hits(), 2);
		assert_eq!(store.value_of(ParamKey::RefreshToken.name()), Some("RT1".into()));
	}

	#[tokio::test]
	async fn refresh_persists_the_rotated_triple() {
		let now = credential::unix_now();
		let client = Arc::new(ScriptedHttpClient::success(rotation_body(now + 3_600)));
		let store = seeded_store(now - 500);
		let cache = build_cache(client, store.clone());

		cache.get_token().await.expect("Expired tokens should refresh.");

		assert_eq!(store.value_of(ParamKey::AccessToken.name()), Some("AT2".into()));
		assert_eq!(store.value_of(ParamKey::RefreshToken.name()), Some("RT2".into()));
		assert_eq!(
			store.value_of(ParamKey::ExpiryTime.name()),
			Some((now + 3_600).to_string())
		);
		assert_eq!(store.secret_mark(ParamKey::AccessToken.name()), Some(true));
		assert_eq!(store.secret_mark(ParamKey::RefreshToken.name()), Some(true));
		assert_eq!(store.secret_mark(ParamKey::ExpiryTime.name()), Some(false));
	}

	#[tokio::test]
	async fn missing_refresh_token_is_a_config_error() {
		let store = MemoryStore::default();

		store.seed(ParamKey::ClientId.name(), "app-1");
		store.seed(ParamKey::ClientSecret.name(), "hush");

		let client = Arc::new(ScriptedHttpClient::success("unused"));
		let cache = build_cache(client.clone(), Arc::new(store));
		let err = cache.get_token().await.expect_err("Unauthorized namespaces cannot refresh.");

		assert!(matches!(err, Error::Config(ConfigError::MissingRefreshToken)));
		assert_eq!(client.hits(), 0);
	}

	#[tokio::test]
	async fn missing_client_credentials_fail_the_initial_load() {
		let store = MemoryStore::default();

		store.seed(ParamKey::ClientSecret.name(), "hush");

		let client = Arc::new(ScriptedHttpClient::success("unused"));
		let cache = build_cache(client, Arc::new(store));
		let err = cache.get_token().await.expect_err("Unprovisioned namespaces cannot load.");

		assert!(matches!(err, Error::Config(ConfigError::MissingParam { key: "clientId" })));
	}
}
