//! Keeper-level error types shared across the cache, refresher, and stores.

// self
use crate::_prelude::*;

/// Keeper-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical keeper error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Credential-store read or write failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Token endpoint returned a non-success status.
	#[error("Token endpoint rejected the request with status {status}: {body}.")]
	UpstreamRejected {
		/// HTTP status code returned by the endpoint.
		status: u16,
		/// Verbatim response body, retained for operator diagnosis.
		body: String,
	},
	/// Token endpoint returned a success status with an unparseable body.
	#[error("Token endpoint returned malformed JSON.")]
	MalformedResponse {
		/// Structured parsing failure carrying the JSON path that failed.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
	},
	/// Caller-initiated cancellation or timeout aborted an in-flight call.
	#[error("Operation was cancelled before the token endpoint call completed.")]
	Cancelled,
}

/// Configuration and validation failures raised by the keeper.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Credential-store snapshot is missing a required parameter.
	#[error("Credential store is missing the `{key}` parameter.")]
	MissingParam {
		/// Name of the absent parameter.
		key: &'static str,
	},
	/// Loaded credentials carry no refresh token to rotate.
	#[error("Stored credentials are missing a refresh token.")]
	MissingRefreshToken,
	/// Token endpoint URL cannot be parsed.
	#[error("Token endpoint URL is invalid.")]
	InvalidEndpoint {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the token endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the token endpoint.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
