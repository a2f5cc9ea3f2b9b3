//! Short-lived credential material handed to an identity client for one explicit exchange.

// self
use crate::_prelude::*;

/// Credential secret scoped to a single explicit-acquisition attempt.
///
/// The engine builds a fresh `Credential` for every attempt and drops it as soon as the
/// identity client returns; the copy is zeroed when dropped, including on cancellation.
pub struct Credential(SecretString);
impl Credential {
	/// Copies the configured secret into a scoped credential.
	///
	/// Absent or empty secrets are rejected with [`Error::InvalidRequest`].
	pub fn scoped(secret: Option<&SecretString>) -> Result<Self> {
		let secret = secret
			.map(|value| value.expose_secret())
			.filter(|value| !value.is_empty())
			.ok_or_else(|| Error::invalid_request("A non-empty password is required"))?;

		Ok(Self(SecretString::from(secret.to_owned())))
	}

	/// Returns the secret. Callers must not retain or log the returned string.
	pub fn expose(&self) -> &str {
		self.0.expose_secret()
	}
}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("Credential").field(&"<redacted>").finish()
	}
}
