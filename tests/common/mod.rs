//! Fixtures shared by the integration tests: a scripted identity client, sleepers that record
//! their delays, and a reqwest transport trusting the `httpmock` certificate.

#![allow(dead_code)]

// std
use std::{
	collections::VecDeque,
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
};
// crates.io
use parking_lot::Mutex;
use time::Duration;
// self
use oauth2_bearer::{
	acquire::{SleepFuture, Sleeper},
	auth::{AccountHint, Credential, ScopeSet, TokenResult},
	client::{ClientError, ClientFuture, IdentityClient, ServiceError},
	http::ReqwestHttpClient,
	reqwest::Client,
};

type SilentResponse = Result<Option<TokenResult>, ClientError>;
type ExplicitResponse = Result<TokenResult, ClientError>;

/// Identity client answering from queued responses.
///
/// An empty silent queue answers `Ok(None)`; an empty explicit queue fails the attempt.
#[derive(Default)]
pub struct ScriptedIdentityClient {
	silent: Mutex<VecDeque<SilentResponse>>,
	explicit: Mutex<VecDeque<ExplicitResponse>>,
	silent_calls: AtomicUsize,
	explicit_calls: AtomicUsize,
	usernames: Mutex<Vec<String>>,
	secrets: Mutex<Vec<String>>,
}
impl ScriptedIdentityClient {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub fn push_silent(&self, response: SilentResponse) -> &Self {
		self.silent.lock().push_back(response);

		self
	}

	pub fn push_explicit(&self, response: ExplicitResponse) -> &Self {
		self.explicit.lock().push_back(response);

		self
	}

	pub fn push_transient(&self, retry_after: Option<Duration>) -> &Self {
		let mut err = ServiceError::temporarily_unavailable().with_status(503);

		if let Some(delay) = retry_after {
			err = err.with_retry_after(delay);
		}

		self.push_explicit(Err(err.into()))
	}

	pub fn silent_calls(&self) -> usize {
		self.silent_calls.load(Ordering::SeqCst)
	}

	pub fn explicit_calls(&self) -> usize {
		self.explicit_calls.load(Ordering::SeqCst)
	}

	pub fn usernames(&self) -> Vec<String> {
		self.usernames.lock().clone()
	}

	pub fn secrets(&self) -> Vec<String> {
		self.secrets.lock().clone()
	}
}
impl IdentityClient for ScriptedIdentityClient {
	fn acquire_token_silent<'a>(
		&'a self,
		_scopes: &'a ScopeSet,
		_account: Option<&'a AccountHint>,
	) -> ClientFuture<'a, Option<TokenResult>> {
		self.silent_calls.fetch_add(1, Ordering::SeqCst);

		let response = self.silent.lock().pop_front().unwrap_or(Ok(None));

		Box::pin(async move { response })
	}

	fn acquire_token_by_credential<'a>(
		&'a self,
		_scopes: &'a ScopeSet,
		username: &'a AccountHint,
		secret: &'a Credential,
	) -> ClientFuture<'a, TokenResult> {
		self.explicit_calls.fetch_add(1, Ordering::SeqCst);
		self.usernames.lock().push(username.to_string());
		self.secrets.lock().push(secret.expose().to_owned());

		let response = self
			.explicit
			.lock()
			.pop_front()
			.unwrap_or_else(|| Err(ClientError::other("No scripted explicit response left.")));

		Box::pin(async move { response })
	}
}

/// Sleeper that records each requested delay and resumes immediately.
#[derive(Default)]
pub struct RecordingSleeper {
	delays: Mutex<Vec<Duration>>,
}
impl RecordingSleeper {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub fn delays(&self) -> Vec<Duration> {
		self.delays.lock().clone()
	}
}
impl Sleeper for RecordingSleeper {
	fn sleep(&self, delay: Duration) -> SleepFuture {
		self.delays.lock().push(delay);

		Box::pin(async {})
	}
}

/// Sleeper that records each requested delay and never resumes.
#[derive(Default)]
pub struct PendingSleeper {
	delays: Mutex<Vec<Duration>>,
}
impl PendingSleeper {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub fn delays(&self) -> Vec<Duration> {
		self.delays.lock().clone()
	}
}
impl Sleeper for PendingSleeper {
	fn sleep(&self, delay: Duration) -> SleepFuture {
		self.delays.lock().push(delay);

		Box::pin(std::future::pending())
	}
}

pub fn account() -> AccountHint {
	AccountHint::new("adele.vance@contoso.com").expect("Account hint fixture should be valid.")
}

pub fn token(value: &str, scopes: &ScopeSet, lifetime: Duration) -> TokenResult {
	TokenResult::builder(scopes.clone())
		.access_token(value)
		.account(account())
		.expires_in(lifetime)
		.build()
		.expect("Token fixture should build.")
}

/// Builds a reqwest transport that accepts the self-signed certificates produced by `httpmock`.
pub fn test_reqwest_http_client() -> ReqwestHttpClient {
	let client = Client::builder()
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.build()
		.expect("Failed to build insecure Reqwest client for tests.");

	ReqwestHttpClient::with_client(client)
}
