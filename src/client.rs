//! Identity-client capability set consumed by the acquisition engine.
//!
//! The engine never talks to an identity provider directly. Any client type that can answer a
//! silent (cache-only) lookup and perform an explicit credential exchange implements
//! [`IdentityClient`]; public, confidential, and managed-identity clients all fit the same
//! shape. [`ServiceError`] carries the provider's error code and optional Retry-After hint so
//! the engine can tell transient outages apart from fatal failures.

#[cfg(feature = "reqwest")] pub mod password;
#[cfg(feature = "reqwest")] pub use password::*;

// self
use crate::{
	_prelude::*,
	auth::{AccountHint, Credential, ScopeSet, TokenResult},
	error::BoxError,
	http,
};

/// Boxed future returned by [`IdentityClient`] operations.
pub type ClientFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ClientError>> + 'a + Send>>;

/// Capability set required from an identity-provider client.
pub trait IdentityClient
where
	Self: Send + Sync,
{
	/// Looks up a token using only cached state; `None` when nothing is cached.
	///
	/// When `account` is `None`, any cached account may satisfy the lookup.
	fn acquire_token_silent<'a>(
		&'a self,
		scopes: &'a ScopeSet,
		account: Option<&'a AccountHint>,
	) -> ClientFuture<'a, Option<TokenResult>>;

	/// Exchanges a username and secret for a token over the network.
	fn acquire_token_by_credential<'a>(
		&'a self,
		scopes: &'a ScopeSet,
		username: &'a AccountHint,
		secret: &'a Credential,
	) -> ClientFuture<'a, TokenResult>;
}

/// Failure reported by an [`IdentityClient`].
#[derive(Debug, ThisError)]
pub enum ClientError {
	/// The identity provider answered with a service error.
	#[error(transparent)]
	Service(#[from] ServiceError),
	/// Any other failure (transport, serialization, client bug).
	#[error("Identity client failed: {source}")]
	Other {
		/// Underlying failure.
		#[source]
		source: BoxError,
	},
}
impl ClientError {
	/// Wraps a non-service failure.
	pub fn other(source: impl Into<BoxError>) -> Self {
		Self::Other { source: source.into() }
	}
}

/// Error response returned by the identity provider.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Identity provider returned `{code}`.")]
pub struct ServiceError {
	/// Provider error code (e.g. `invalid_grant`).
	pub code: String,
	/// Human-readable description, when supplied.
	pub description: Option<String>,
	/// HTTP status code, when known.
	pub status: Option<u16>,
	/// Provider-supplied Retry-After hint.
	pub retry_after: Option<Duration>,
}
impl ServiceError {
	/// Error code signalling that the provider cannot issue tokens right now.
	pub const TEMPORARILY_UNAVAILABLE: &'static str = "temporarily_unavailable";

	/// Creates an error with the provided code.
	pub fn new(code: impl Into<String>) -> Self {
		Self { code: code.into(), description: None, status: None, retry_after: None }
	}

	/// Creates a `temporarily_unavailable` error.
	pub fn temporarily_unavailable() -> Self {
		Self::new(Self::TEMPORARILY_UNAVAILABLE)
	}

	/// Adds a description.
	pub fn with_description(mut self, description: impl Into<String>) -> Self {
		self.description = Some(description.into());

		self
	}

	/// Adds the HTTP status code.
	pub fn with_status(mut self, status: u16) -> Self {
		self.status = Some(status);

		self
	}

	/// Adds a relative Retry-After hint.
	pub fn with_retry_after(mut self, delay: Duration) -> Self {
		self.retry_after = Some(delay);

		self
	}

	/// Parses a raw `Retry-After` header value (delta-seconds or HTTP date).
	///
	/// Unparseable or past values leave the hint unset.
	pub fn with_retry_after_header(mut self, raw: &str) -> Self {
		self.retry_after = http::parse_retry_after(raw);

		self
	}

	/// Returns true if the provider reported a transient outage.
	pub fn is_temporarily_unavailable(&self) -> bool {
		self.code == Self::TEMPORARILY_UNAVAILABLE
	}
}
