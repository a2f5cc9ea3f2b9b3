//! Account hints narrowing which cached identity a token is acquired for.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

const ACCOUNT_HINT_MAX_LEN: usize = 256;

/// Error returned when account hint validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum AccountHintError {
	/// The hint was empty.
	#[error("Account hint cannot be empty.")]
	Empty,
	/// The hint contains whitespace characters.
	#[error("Account hint contains whitespace.")]
	ContainsWhitespace,
	/// The hint exceeded the allowed character count.
	#[error("Account hint exceeds {max} characters.")]
	TooLong {
		/// Maximum permitted character count.
		max: usize,
	},
}

/// Identifier (usually an email address or user principal name) selecting a cached identity.
///
/// Comparisons are exact; providers that treat usernames case-insensitively should normalize
/// before building the hint.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountHint(String);
impl AccountHint {
	/// Creates a new hint after validation.
	pub fn new(value: impl AsRef<str>) -> Result<Self, AccountHintError> {
		let view = value.as_ref();

		validate_view(view)?;

		Ok(Self(view.to_owned()))
	}
}
impl Deref for AccountHint {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl AsRef<str> for AccountHint {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl Borrow<str> for AccountHint {
	fn borrow(&self) -> &str {
		&self.0
	}
}
impl From<AccountHint> for String {
	fn from(value: AccountHint) -> Self {
		value.0
	}
}
impl TryFrom<String> for AccountHint {
	type Error = AccountHintError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		validate_view(&value)?;

		Ok(Self(value))
	}
}
impl Debug for AccountHint {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "AccountHint({})", self.0)
	}
}
impl Display for AccountHint {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
impl FromStr for AccountHint {
	type Err = AccountHintError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}

fn validate_view(view: &str) -> Result<(), AccountHintError> {
	if view.is_empty() {
		return Err(AccountHintError::Empty);
	}
	if view.chars().any(char::is_whitespace) {
		return Err(AccountHintError::ContainsWhitespace);
	}
	if view.chars().count() > ACCOUNT_HINT_MAX_LEN {
		return Err(AccountHintError::TooLong { max: ACCOUNT_HINT_MAX_LEN });
	}

	Ok(())
}
