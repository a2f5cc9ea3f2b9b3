//! Per-request acquisition inputs.

// self
use crate::{
	_prelude::*,
	auth::{AccountHint, ScopeSet},
};

/// Scopes, account hint, and credential secret for a single acquisition.
///
/// Options are built per request and consumed by
/// [`acquire_token`](crate::acquire::TokenAcquisitionEngine::acquire_token);
/// the secret is zeroed when the options are dropped.
#[derive(Debug, Default)]
pub struct AcquisitionOptions {
	/// Scopes to request.
	pub scopes: ScopeSet,
	/// Account selecting the cached identity and supplying the username for explicit flows.
	pub account: Option<AccountHint>,
	/// Secret exchanged during explicit acquisition.
	pub password: Option<SecretString>,
}
impl AcquisitionOptions {
	/// Creates options for the provided scopes with no account or secret.
	pub fn new(scopes: ScopeSet) -> Self {
		Self { scopes, account: None, password: None }
	}

	/// Sets the account hint.
	pub fn with_account(mut self, account: AccountHint) -> Self {
		self.account = Some(account);

		self
	}

	/// Sets the secret used for explicit acquisition.
	pub fn with_password(mut self, password: impl Into<String>) -> Self {
		self.password = Some(SecretString::from(password.into()));

		self
	}
}
