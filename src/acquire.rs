//! Silent-then-explicit token acquisition with provider-hinted retries.
//!
//! [`TokenAcquisitionEngine::acquire_token`] first asks the identity client for a cached
//! token. A cached token that has not expired is returned without any explicit exchange.
//! Otherwise the engine performs the credential exchange, retrying up to
//! [`RetryPolicy::max_attempts`] times while the provider reports `temporarily_unavailable`
//! and suspending for the provider's Retry-After hint (or the policy's default backoff) between
//! attempts. Any other failure is fatal and surfaces immediately.
//!
//! Each call is independent: the engine holds no mutable state, so one instance can serve any
//! number of concurrent acquisitions. Dropping the returned future cancels a pending backoff.

pub mod options;
pub mod retry;

pub use options::*;
pub use retry::*;

// self
use crate::{
	_prelude::*,
	auth::{AccountHint, Credential, ScopeSet, TokenResult},
	client::{ClientError, IdentityClient},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Result of a completed acquisition.
#[derive(Debug)]
pub enum AcquireOutcome {
	/// A token was obtained, silently or explicitly.
	Acquired(TokenResult),
	/// The provider stayed temporarily unavailable for every permitted attempt.
	NoToken {
		/// Number of explicit attempts that were made.
		attempts: u32,
	},
}
impl AcquireOutcome {
	/// Returns the acquired token, if any.
	pub fn token(self) -> Option<TokenResult> {
		match self {
			AcquireOutcome::Acquired(token) => Some(token),
			AcquireOutcome::NoToken { .. } => None,
		}
	}

	/// Converts [`AcquireOutcome::NoToken`] into a general failure.
	pub fn into_result(self) -> Result<TokenResult> {
		match self {
			AcquireOutcome::Acquired(token) => Ok(token),
			AcquireOutcome::NoToken { attempts } => Err(Error::retries_exhausted(attempts)),
		}
	}
}

/// Classified outcome of one explicit attempt.
#[derive(Debug)]
enum AttemptOutcome {
	Success(TokenResult),
	TransientFailure(Option<Duration>),
	FatalFailure(Error),
}

/// Orchestrates silent and explicit acquisition against an [`IdentityClient`].
pub struct TokenAcquisitionEngine<C>
where
	C: ?Sized + IdentityClient,
{
	client: Arc<C>,
	retry: RetryPolicy,
	sleeper: Arc<dyn Sleeper>,
}
impl<C> TokenAcquisitionEngine<C>
where
	C: ?Sized + IdentityClient,
{
	/// Creates an engine with the default [`RetryPolicy`].
	pub fn new(client: impl Into<Arc<C>>, sleeper: Arc<dyn Sleeper>) -> Self {
		Self { client: client.into(), retry: RetryPolicy::default(), sleeper }
	}

	/// Replaces the retry policy after validating it.
	pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Result<Self> {
		retry.validate()?;

		self.retry = retry;

		Ok(self)
	}

	/// Returns the identity client.
	pub fn client(&self) -> &Arc<C> {
		&self.client
	}

	/// Returns the active retry policy.
	pub fn retry_policy(&self) -> &RetryPolicy {
		&self.retry
	}

	/// Produces a token for `options`, preferring cached state.
	///
	/// Returns [`AcquireOutcome::NoToken`] when every explicit attempt hit a transient provider
	/// failure. A missing account hint or secret is rejected with [`Error::InvalidRequest`]
	/// before any explicit attempt.
	pub async fn acquire_token(&self, options: AcquisitionOptions) -> Result<AcquireOutcome> {
		if let Some(token) = self.acquire_silent(&options.scopes, options.account.as_ref()).await?
		{
			return Ok(AcquireOutcome::Acquired(token));
		}

		self.acquire_explicit(&options).await
	}

	async fn acquire_silent(
		&self,
		scopes: &ScopeSet,
		account: Option<&AccountHint>,
	) -> Result<Option<TokenResult>> {
		const KIND: FlowKind = FlowKind::Silent;

		let span = FlowSpan::new(KIND, "acquire_silent");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				match self.client.acquire_token_silent(scopes, account).await {
					Ok(Some(token)) if !token.is_expired() => Ok(Some(token)),
					Ok(Some(_)) => {
						obs::trace_silent_miss("expired");

						Ok(None)
					},
					Ok(None) => {
						obs::trace_silent_miss("not_cached");

						Ok(None)
					},
					Err(ClientError::Service(_)) => {
						obs::trace_silent_miss("service_error");

						Ok(None)
					},
					Err(err) => Err(Error::unexpected(err)),
				}
			})
			.await;

		match &result {
			Ok(Some(_)) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Ok(None) => obs::record_flow_outcome(KIND, FlowOutcome::Miss),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	async fn acquire_explicit(&self, options: &AcquisitionOptions) -> Result<AcquireOutcome> {
		const KIND: FlowKind = FlowKind::Explicit;

		let span = FlowSpan::new(KIND, "acquire_explicit");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let username = options.account.as_ref().ok_or_else(|| {
					Error::invalid_request("An account hint is required for explicit acquisition")
				})?;

				// Reject absent or empty secrets before the first network attempt.
				drop(Credential::scoped(options.password.as_ref())?);

				let max_attempts = self.retry.max_attempts;

				for attempt in 1..=max_attempts {
					let outcome = {
						let credential = Credential::scoped(options.password.as_ref())?;

						self.attempt(&options.scopes, username, &credential).await
					};

					match outcome {
						AttemptOutcome::Success(token) =>
							return Ok(AcquireOutcome::Acquired(token)),
						AttemptOutcome::FatalFailure(err) => return Err(err),
						AttemptOutcome::TransientFailure(_) if attempt == max_attempts => break,
						AttemptOutcome::TransientFailure(hint) => {
							let delay = self.retry.delay_for(hint);

							obs::record_flow_outcome(KIND, FlowOutcome::Retry);
							obs::trace_retry(attempt, max_attempts, delay);

							self.sleeper.sleep(delay).await;
						},
					}
				}

				Ok(AcquireOutcome::NoToken { attempts: max_attempts })
			})
			.await;

		match &result {
			Ok(AcquireOutcome::Acquired(_)) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Ok(AcquireOutcome::NoToken { .. }) =>
				obs::record_flow_outcome(KIND, FlowOutcome::Exhausted),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	async fn attempt(
		&self,
		scopes: &ScopeSet,
		username: &AccountHint,
		credential: &Credential,
	) -> AttemptOutcome {
		match self.client.acquire_token_by_credential(scopes, username, credential).await {
			Ok(token) => AttemptOutcome::Success(token),
			Err(ClientError::Service(err)) if err.is_temporarily_unavailable() =>
				AttemptOutcome::TransientFailure(err.retry_after),
			Err(ClientError::Service(err)) =>
				AttemptOutcome::FatalFailure(Error::unexpected_provider(err)),
			Err(err) => AttemptOutcome::FatalFailure(Error::unexpected(err)),
		}
	}
}
#[cfg(feature = "tokio")]
impl<C> TokenAcquisitionEngine<C>
where
	C: ?Sized + IdentityClient,
{
	/// Creates an engine that suspends with [`TokioSleeper`].
	pub fn with_tokio(client: impl Into<Arc<C>>) -> Self {
		Self::new(client, Arc::new(TokioSleeper))
	}
}
impl<C> Clone for TokenAcquisitionEngine<C>
where
	C: ?Sized + IdentityClient,
{
	fn clone(&self) -> Self {
		Self { client: self.client.clone(), retry: self.retry, sleeper: self.sleeper.clone() }
	}
}
impl<C> Debug for TokenAcquisitionEngine<C>
where
	C: ?Sized + IdentityClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenAcquisitionEngine").field("retry", &self.retry).finish()
	}
}

pub(crate) fn default_sleeper() -> Result<Arc<dyn Sleeper>> {
	#[cfg(feature = "tokio")]
	{
		Ok(Arc::new(TokioSleeper))
	}
	#[cfg(not(feature = "tokio"))]
	{
		Err(crate::error::ConfigError::MissingSleeper.into())
	}
}
