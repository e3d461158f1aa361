//! Token refresher: exchange orchestration and the persistence fan-out.
//!
//! [`TokenRefresher`] performs one `grant_type=refresh_token` (or
//! `authorization_code`) exchange and then persists the issued triple to the
//! credential store as three concurrent writes. The writes target disjoint keys
//! with no cross-key invariant, so they run unordered; the refresher waits for
//! all three and reports the first failure in key order. A failed write never
//! invalidates the freshly exchanged tokens: the caller keeps them as the
//! in-memory truth and durable state catches up on a later refresh.

mod metrics;

pub use metrics::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	credential::RefreshResult,
	http::TokenHttpClient,
	oauth::{OAuthEndpoint, TokenGrant},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	store::{CredentialStore, ParamKey, StoreError, StoreFuture},
};

/// Product of a successful token exchange plus the persistence fan-out verdict.
#[derive(Debug)]
pub struct RefreshOutcome {
	/// Freshly issued credential triple; the in-memory truth regardless of
	/// whether persistence succeeded.
	pub tokens: RefreshResult,
	/// First persistence failure in key order, when any of the three writes failed.
	pub persist_error: Option<StoreError>,
}
impl RefreshOutcome {
	/// Returns `true` when all three persistence writes succeeded.
	pub fn fully_persisted(&self) -> bool {
		self.persist_error.is_none()
	}
}

/// Performs OAuth token exchanges and persists the results.
///
/// Each call is one independent, idempotent attempt: there is no retry and no
/// rollback. Retry policy belongs to the caller.
pub struct TokenRefresher<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Token-exchange endpoint used for every grant.
	pub endpoint: OAuthEndpoint<C>,
	/// Credential store receiving the persistence fan-out.
	pub store: Arc<dyn CredentialStore>,
	/// Shared counters for exchange outcomes.
	pub metrics: Arc<RefreshMetrics>,
}
impl<C> TokenRefresher<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Creates a refresher for the provided endpoint and store.
	pub fn new(endpoint: OAuthEndpoint<C>, store: Arc<dyn CredentialStore>) -> Self {
		Self { endpoint, store, metrics: Default::default() }
	}

	/// Exchanges the current refresh token for a new credential triple and
	/// persists it.
	///
	/// The supplied refresh token is single-use: once the exchange succeeds the
	/// provider invalidates it, so the caller must replace its whole credential
	/// set with the returned tokens before doing anything else.
	pub async fn refresh(
		&self,
		client_id: &str,
		client_secret: &str,
		refresh_token: &str,
	) -> Result<RefreshOutcome> {
		self.exchange_and_persist(FlowKind::Refresh, client_id, client_secret, TokenGrant::RefreshToken {
			refresh_token,
		})
		.await
	}

	/// Exchanges a one-time authorization code and persists the result.
	pub async fn authorize(
		&self,
		client_id: &str,
		client_secret: &str,
		code: &str,
	) -> Result<RefreshOutcome> {
		self.exchange_and_persist(FlowKind::Authorize, client_id, client_secret, TokenGrant::AuthorizationCode {
			code,
		})
		.await
	}

	async fn exchange_and_persist(
		&self,
		kind: FlowKind,
		client_id: &str,
		client_secret: &str,
		grant: TokenGrant<'_>,
	) -> Result<RefreshOutcome> {
		let span = FlowSpan::new(kind, "exchange_and_persist");

		obs::record_flow_outcome(kind, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				self.metrics.record_attempt();

				let tokens = match self.endpoint.exchange(client_id, client_secret, grant).await {
					Ok(tokens) => tokens,
					Err(err) => {
						self.metrics.record_failure();

						return Err(err);
					},
				};
				let persist_error = self.persist(&tokens).await;

				self.metrics.record_success();

				Ok(RefreshOutcome { tokens, persist_error })
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(kind, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(kind, FlowOutcome::Failure),
		}

		result
	}

	/// Fans the three parameter writes out concurrently and waits for all of
	/// them, returning the first failure in key order.
	async fn persist(&self, tokens: &RefreshResult) -> Option<StoreError> {
		let store = self.store.as_ref();
		let (access, refresh, expiry) = futures::join!(
			Self::put(store, ParamKey::AccessToken, tokens.access_token.expose().to_owned()),
			Self::put(store, ParamKey::RefreshToken, tokens.refresh_token.expose().to_owned()),
			Self::put(store, ParamKey::ExpiryTime, tokens.expires_at.to_string()),
		);

		[access, refresh, expiry].into_iter().find_map(Result::err)
	}

	fn put(store: &dyn CredentialStore, key: ParamKey, value: String) -> StoreFuture<'_, ()> {
		store.set_param(key.name(), value, key.is_secret())
	}
}
impl<C> Debug for TokenRefresher<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenRefresher").field("endpoint", &self.endpoint).finish()
	}
}
