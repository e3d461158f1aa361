//! Transport primitives for OAuth token exchanges.
//!
//! The module exposes [`TokenHttpClient`] so downstream crates can integrate
//! custom HTTP clients. The trait hands back the raw status/body pair and
//! leaves classification (success, upstream rejection, malformed body) to the
//! endpoint layer, which keeps transports trivial to implement.

// std
use std::ops::Deref;
// self
use crate::_prelude::*;
#[cfg(feature = "reqwest")] use crate::error::TransportError;

/// Future type returned by [`TokenHttpClient`] implementations.
pub type HttpFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Raw status/body pair captured from the token endpoint before classification.
#[derive(Clone, Debug)]
pub struct RawExchangeResponse {
	/// HTTP status code returned by the endpoint.
	pub status: u16,
	/// Response body decoded as text.
	pub body: String,
}

/// Abstraction over HTTP transports capable of executing OAuth token exchanges.
///
/// The trait is the keeper's only dependency on an HTTP stack. Implementations
/// must be `Send + Sync + 'static` so they can be shared behind `Arc` across
/// concurrent callers, and the futures they return must be `Send` for the
/// lifetime of the in-flight request. Cancellation is signalled by mapping a
/// transport-level timeout or abort to [`Error::Cancelled`]; the keeper leaves
/// its cache state untouched when that error surfaces.
pub trait TokenHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Executes a POST against the prepared token endpoint URL, returning the
	/// raw status and body for classification by the caller.
	fn post<'a>(&'a self, url: &'a Url) -> HttpFuture<'a, RawExchangeResponse>;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
/// Token requests should not follow redirects, matching OAuth 2.0 guidance that token
/// endpoints return results directly instead of delegating to another URI; configure
/// any custom [`ReqwestClient`] accordingly. A client-level timeout doubles as the
/// caller's cancellation signal and surfaces as [`Error::Cancelled`].
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl TokenHttpClient for ReqwestHttpClient {
	fn post<'a>(&'a self, url: &'a Url) -> HttpFuture<'a, RawExchangeResponse> {
		Box::pin(async move {
			let response =
				self.0.post(url.clone()).send().await.map_err(map_reqwest_error)?;
			let status = response.status().as_u16();
			let body = response.text().await.map_err(map_reqwest_error)?;

			Ok(RawExchangeResponse { status, body })
		})
	}
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(e: ReqwestError) -> Error {
	if e.is_timeout() { Error::Cancelled } else { TransportError::from(e).into() }
}
