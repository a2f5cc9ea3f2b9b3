//! Token results handed back by identity clients, plus their builder.

// self
use crate::{
	_prelude::*,
	auth::{AccountHint, ScopeSet, token::secret::TokenSecret},
};

/// Errors produced by [`TokenResultBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum TokenResultBuilderError {
	/// Issued when no access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
	/// Issued when no expiry (absolute or relative) was configured.
	#[error("Expiry must be supplied via expires_on or expires_in.")]
	MissingExpiry,
}

/// Access token issued for a scope set.
///
/// Results are consumed immediately by the caller; caching belongs to the identity client.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenResult {
	/// Access token secret; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Instant after which the token must not be used.
	pub expires_on: OffsetDateTime,
	/// Scopes granted to the token.
	pub scope: ScopeSet,
	/// Account the token was issued for, when known.
	pub account: Option<AccountHint>,
}
impl TokenResult {
	/// Returns a builder for the provided granted scopes.
	pub fn builder(scope: ScopeSet) -> TokenResultBuilder {
		TokenResultBuilder::new(scope)
	}

	/// Returns `true` if the token has expired at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_on
	}

	/// Returns `true` if the token is expired relative to the current clock.
	pub fn is_expired(&self) -> bool {
		self.is_expired_at(OffsetDateTime::now_utc())
	}

	/// Remaining lifetime at the provided instant, clamped at zero.
	pub fn remaining_at(&self, instant: OffsetDateTime) -> Duration {
		let remaining = self.expires_on - instant;

		if remaining.is_negative() { Duration::ZERO } else { remaining }
	}
}
impl Debug for TokenResult {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenResult")
			.field("access_token", &"<redacted>")
			.field("expires_on", &self.expires_on)
			.field("scope", &self.scope)
			.field("account", &self.account)
			.finish()
	}
}

/// Builder for [`TokenResult`].
#[derive(Clone, Debug)]
pub struct TokenResultBuilder {
	scope: ScopeSet,
	access_token: Option<TokenSecret>,
	account: Option<AccountHint>,
	issued_at: Option<OffsetDateTime>,
	expires_on: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
}
impl TokenResultBuilder {
	fn new(scope: ScopeSet) -> Self {
		Self {
			scope,
			access_token: None,
			account: None,
			issued_at: None,
			expires_on: None,
			expires_in: None,
		}
	}

	/// Provides the access token value. An empty string is accepted.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(TokenSecret::new(token));

		self
	}

	/// Records the account the token belongs to.
	pub fn account(mut self, account: AccountHint) -> Self {
		self.account = Some(account);

		self
	}

	/// Sets the instant a relative expiry is measured from (defaults to now).
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets an absolute expiry instant.
	pub fn expires_on(mut self, instant: OffsetDateTime) -> Self {
		self.expires_on = Some(instant);

		self
	}

	/// Sets a relative expiry duration from the issued instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Consumes the builder and produces a [`TokenResult`].
	pub fn build(self) -> Result<TokenResult, TokenResultBuilderError> {
		let access_token = self.access_token.ok_or(TokenResultBuilderError::MissingAccessToken)?;
		let expires_on = match (self.expires_on, self.expires_in) {
			(Some(instant), _) => instant,
			(None, Some(delta)) => self.issued_at.unwrap_or_else(OffsetDateTime::now_utc) + delta,
			(None, None) => return Err(TokenResultBuilderError::MissingExpiry),
		};

		Ok(TokenResult { access_token, expires_on, scope: self.scope, account: self.account })
	}
}
