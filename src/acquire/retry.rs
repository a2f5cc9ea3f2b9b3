//! Retry configuration and the suspension seam used between explicit attempts.

// self
use crate::{_prelude::*, error::ConfigError};

/// Boxed future returned by [`Sleeper::sleep`].
pub type SleepFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Suspends the current acquisition without blocking the thread.
///
/// Dropping the returned future must cancel the suspension.
pub trait Sleeper
where
	Self: Send + Sync,
{
	/// Returns a future that resolves after `delay`.
	fn sleep(&self, delay: Duration) -> SleepFuture;
}

/// [`Sleeper`] backed by `tokio::time::sleep`.
#[cfg(feature = "tokio")]
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioSleeper;
#[cfg(feature = "tokio")]
impl Sleeper for TokioSleeper {
	fn sleep(&self, delay: Duration) -> SleepFuture {
		let delay = std::time::Duration::try_from(delay).unwrap_or_default();

		Box::pin(tokio::time::sleep(delay))
	}
}

/// Bounds the explicit-acquisition retry loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
	/// Total explicit attempts, including the first one.
	pub max_attempts: u32,
	/// Delay used when the provider supplies no Retry-After hint.
	pub default_backoff: Duration,
	/// Upper bound applied to provider hints, when set.
	pub max_backoff: Option<Duration>,
}
impl RetryPolicy {
	/// Attempts allowed when no policy is configured.
	pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
	/// Backoff used when the provider omits Retry-After.
	pub const DEFAULT_BACKOFF: Duration = Duration::seconds(5);

	/// Creates a validated policy allowing `max_attempts` explicit attempts.
	pub fn new(max_attempts: u32) -> Result<Self, ConfigError> {
		let policy = Self { max_attempts, ..Self::default() };

		policy.validate()?;

		Ok(policy)
	}

	/// Overrides the fallback backoff.
	pub fn with_default_backoff(mut self, backoff: Duration) -> Self {
		self.default_backoff = backoff;

		self
	}

	/// Caps provider-supplied hints.
	pub fn with_max_backoff(mut self, cap: Duration) -> Self {
		self.max_backoff = Some(cap);

		self
	}

	/// Validates invariants for the policy.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.max_attempts == 0 {
			return Err(ConfigError::ZeroAttempts);
		}
		if self.default_backoff.is_negative() {
			return Err(ConfigError::NegativeBackoff { field: "default_backoff" });
		}
		if self.max_backoff.is_some_and(|cap| cap.is_negative()) {
			return Err(ConfigError::NegativeBackoff { field: "max_backoff" });
		}

		Ok(())
	}

	/// Resolves the suspension for a transient failure carrying `hint`.
	pub fn delay_for(&self, hint: Option<Duration>) -> Duration {
		let delay = hint.filter(|hint| !hint.is_negative()).unwrap_or(self.default_backoff);

		match self.max_backoff {
			Some(cap) if delay > cap => cap,
			_ => delay,
		}
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
			default_backoff: Self::DEFAULT_BACKOFF,
			max_backoff: None,
		}
	}
}
