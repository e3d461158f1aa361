//! Token-exchange endpoint: request construction and response classification.

// self
use crate::{
	_prelude::*,
	credential::{RefreshResult, TokenSecret},
	error::ConfigError,
	http::{RawExchangeResponse, TokenHttpClient},
};

/// Token endpoint used by the hosted Strava API.
pub const STRAVA_TOKEN_URL: &str = "https://www.strava.com/oauth/token";

/// Grant presented to the token endpoint alongside the client credentials.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenGrant<'a> {
	/// One-time authorization code obtained from the user-facing consent flow.
	AuthorizationCode {
		/// Code issued by the provider's authorize redirect.
		code: &'a str,
	},
	/// Rotating refresh token from the current credential set.
	RefreshToken {
		/// Most recently issued refresh token.
		refresh_token: &'a str,
	},
}
impl TokenGrant<'_> {
	/// Returns the wire value of the `grant_type` parameter.
	pub const fn grant_type(&self) -> &'static str {
		match self {
			TokenGrant::AuthorizationCode { .. } => "authorization_code",
			TokenGrant::RefreshToken { .. } => "refresh_token",
		}
	}

	fn credential_param(&self) -> (&'static str, &str) {
		match self {
			TokenGrant::AuthorizationCode { code } => ("code", code),
			TokenGrant::RefreshToken { refresh_token } => ("refresh_token", refresh_token),
		}
	}
}

/// Wire shape of a successful token-exchange response.
#[derive(Deserialize)]
struct WireTokenResponse {
	access_token: String,
	refresh_token: String,
	expires_at: i64,
}

/// OAuth token-exchange endpoint bound to a transport.
///
/// The endpoint performs exactly one POST per exchange; retry policy belongs to
/// the caller. Credentials travel as URL query parameters, which is the request
/// shape the hosted provider accepts for both supported grants.
pub struct OAuthEndpoint<C>
where
	C: ?Sized + TokenHttpClient,
{
	token_url: Url,
	http_client: Arc<C>,
}
impl<C> OAuthEndpoint<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Creates an endpoint for the provided token URL and transport.
	pub fn new(token_url: Url, http_client: impl Into<Arc<C>>) -> Self {
		Self { token_url, http_client: http_client.into() }
	}

	/// Creates an endpoint from a string URL, validating it first.
	pub fn from_url_str(
		token_url: &str,
		http_client: impl Into<Arc<C>>,
	) -> Result<Self, ConfigError> {
		let token_url =
			Url::parse(token_url).map_err(|source| ConfigError::InvalidEndpoint { source })?;

		Ok(Self::new(token_url, http_client))
	}

	/// Creates an endpoint for the hosted Strava API.
	pub fn strava(http_client: impl Into<Arc<C>>) -> Result<Self, ConfigError> {
		Self::from_url_str(STRAVA_TOKEN_URL, http_client)
	}

	/// Returns the configured token endpoint URL.
	pub fn token_url(&self) -> &Url {
		&self.token_url
	}

	/// Performs one token exchange, returning the freshly issued credential triple.
	pub async fn exchange(
		&self,
		client_id: &str,
		client_secret: &str,
		grant: TokenGrant<'_>,
	) -> Result<RefreshResult> {
		let url = self.exchange_url(client_id, client_secret, grant);
		let raw = self.http_client.post(&url).await?;

		parse_token_response(&raw)
	}

	fn exchange_url(&self, client_id: &str, client_secret: &str, grant: TokenGrant<'_>) -> Url {
		let mut url = self.token_url.clone();
		let (credential_key, credential_value) = grant.credential_param();

		url.query_pairs_mut()
			.append_pair("client_id", client_id)
			.append_pair("client_secret", client_secret)
			.append_pair("grant_type", grant.grant_type())
			.append_pair(credential_key, credential_value);

		url
	}
}
impl<C> Debug for OAuthEndpoint<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OAuthEndpoint").field("token_url", &self.token_url.as_str()).finish()
	}
}

/// Classifies a raw endpoint response into a [`RefreshResult`] or a typed failure.
///
/// Success is HTTP 200 exactly; everything else is an upstream rejection that
/// keeps the response body verbatim for diagnosis.
pub(crate) fn parse_token_response(raw: &RawExchangeResponse) -> Result<RefreshResult> {
	if raw.status != 200 {
		return Err(Error::UpstreamRejected { status: raw.status, body: raw.body.clone() });
	}

	let mut deserializer = serde_json::Deserializer::from_str(&raw.body);
	let wire: WireTokenResponse = serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| Error::MalformedResponse { source })?;

	Ok(RefreshResult {
		access_token: TokenSecret::new(wire.access_token),
		refresh_token: TokenSecret::new(wire.refresh_token),
		expires_at: wire.expires_at,
	})
}
