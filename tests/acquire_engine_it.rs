mod common;

// std
use std::sync::Arc;
// crates.io
use time::Duration;
// self
use common::{PendingSleeper, RecordingSleeper, ScriptedIdentityClient};
use oauth2_bearer::{
	acquire::{AcquireOutcome, AcquisitionOptions, RetryPolicy, TokenAcquisitionEngine},
	auth::ScopeSet,
	client::{ClientError, ServiceError},
	error::{Error, ErrorCode, GeneralFailure},
};

fn scopes() -> ScopeSet {
	ScopeSet::new(["User.Read"]).expect("Scope fixture should build.")
}

fn options() -> AcquisitionOptions {
	AcquisitionOptions::new(scopes()).with_account(common::account()).with_password("P@ssw0rd!")
}

fn engine(
	client: &Arc<ScriptedIdentityClient>,
	sleeper: &Arc<RecordingSleeper>,
) -> TokenAcquisitionEngine<ScriptedIdentityClient> {
	TokenAcquisitionEngine::new(client.clone(), sleeper.clone())
}

fn expect_token(outcome: AcquireOutcome) -> String {
	outcome.token().expect("A token should have been acquired.").access_token.expose().to_owned()
}

#[tokio::test]
async fn cached_token_skips_explicit_acquisition() {
	let client = ScriptedIdentityClient::new();
	let sleeper = RecordingSleeper::new();

	client.push_silent(Ok(Some(common::token("cached", &scopes(), Duration::minutes(30)))));

	let outcome = engine(&client, &sleeper)
		.acquire_token(options())
		.await
		.expect("Silent acquisition should succeed.");

	assert_eq!(expect_token(outcome), "cached");
	assert_eq!(client.silent_calls(), 1);
	assert_eq!(client.explicit_calls(), 0);
}

#[tokio::test]
async fn expired_cached_token_falls_back_to_explicit() {
	let client = ScriptedIdentityClient::new();
	let sleeper = RecordingSleeper::new();

	client
		.push_silent(Ok(Some(common::token("stale", &scopes(), Duration::minutes(-5)))))
		.push_explicit(Ok(common::token("fresh", &scopes(), Duration::hours(1))));

	let outcome = engine(&client, &sleeper)
		.acquire_token(options())
		.await
		.expect("Explicit fallback should succeed.");

	assert_eq!(expect_token(outcome), "fresh");
	assert_eq!(client.explicit_calls(), 1);
	assert_eq!(client.usernames(), vec!["adele.vance@contoso.com".to_owned()]);
	assert_eq!(client.secrets(), vec!["P@ssw0rd!".to_owned()]);
}

#[tokio::test]
async fn silent_service_error_counts_as_miss() {
	let client = ScriptedIdentityClient::new();
	let sleeper = RecordingSleeper::new();

	client
		.push_silent(Err(ServiceError::new("interaction_required").into()))
		.push_explicit(Ok(common::token("fresh", &scopes(), Duration::hours(1))));

	let outcome = engine(&client, &sleeper)
		.acquire_token(options())
		.await
		.expect("Service errors during silent lookup should fall through.");

	assert_eq!(expect_token(outcome), "fresh");
	assert_eq!(client.explicit_calls(), 1);
}

#[tokio::test]
async fn silent_client_failure_is_general_error() {
	let client = ScriptedIdentityClient::new();
	let sleeper = RecordingSleeper::new();

	client.push_silent(Err(ClientError::other("cache file is corrupt")));

	let err = engine(&client, &sleeper)
		.acquire_token(options())
		.await
		.expect_err("Non-service silent failures should surface.");

	assert_eq!(err.code(), ErrorCode::GeneralException);
	assert_eq!(err.general_failure(), Some(GeneralFailure::UnexpectedError));
	assert_eq!(client.explicit_calls(), 0);
}

#[tokio::test]
async fn transient_failures_retry_with_hinted_delays() {
	let client = ScriptedIdentityClient::new();
	let sleeper = RecordingSleeper::new();

	client
		.push_transient(Some(Duration::seconds(2)))
		.push_transient(None)
		.push_explicit(Ok(common::token("after-retries", &scopes(), Duration::hours(1))));

	let outcome = engine(&client, &sleeper)
		.acquire_token(options())
		.await
		.expect("Acquisition should succeed on the final attempt.");

	assert_eq!(expect_token(outcome), "after-retries");
	assert_eq!(client.explicit_calls(), 3);
	assert_eq!(sleeper.delays(), vec![Duration::seconds(2), RetryPolicy::DEFAULT_BACKOFF]);
}

#[tokio::test]
async fn exhausted_retries_yield_no_token() {
	let client = ScriptedIdentityClient::new();
	let sleeper = RecordingSleeper::new();

	for _ in 0..3 {
		client.push_transient(Some(Duration::seconds(1)));
	}

	let outcome = engine(&client, &sleeper)
		.acquire_token(options())
		.await
		.expect("Exhaustion is reported as an outcome.");

	assert!(matches!(outcome, AcquireOutcome::NoToken { attempts: 3 }));
	assert_eq!(client.explicit_calls(), 3);
	assert_eq!(sleeper.delays().len(), 2);
}

#[tokio::test]
async fn custom_policy_bounds_attempts_and_hints() {
	let client = ScriptedIdentityClient::new();
	let sleeper = RecordingSleeper::new();
	let policy = RetryPolicy::new(2)
		.expect("Two attempts is a valid policy.")
		.with_max_backoff(Duration::seconds(10));

	client.push_transient(Some(Duration::minutes(10))).push_transient(None);

	let outcome = engine(&client, &sleeper)
		.with_retry_policy(policy)
		.expect("Policy should validate.")
		.acquire_token(options())
		.await
		.expect("Exhaustion is reported as an outcome.");

	assert!(matches!(outcome, AcquireOutcome::NoToken { attempts: 2 }));
	assert_eq!(client.explicit_calls(), 2);
	assert_eq!(sleeper.delays(), vec![Duration::seconds(10)]);
}

#[tokio::test]
async fn fatal_provider_errors_are_not_retried() {
	let client = ScriptedIdentityClient::new();
	let sleeper = RecordingSleeper::new();

	client.push_explicit(Err(ServiceError::new("invalid_grant")
		.with_description("AADSTS50126: Invalid username or password.")
		.with_status(400)
		.into()));

	let err = engine(&client, &sleeper)
		.acquire_token(options())
		.await
		.expect_err("Invalid grants should fail immediately.");

	assert_eq!(err.code(), ErrorCode::GeneralException);
	assert_eq!(err.general_failure(), Some(GeneralFailure::UnexpectedProviderError));
	assert_eq!(client.explicit_calls(), 1);
	assert!(sleeper.delays().is_empty());
}

#[tokio::test]
async fn unexpected_client_failures_are_not_retried() {
	let client = ScriptedIdentityClient::new();
	let sleeper = RecordingSleeper::new();

	client.push_explicit(Err(ClientError::other("connection reset by peer")));

	let err = engine(&client, &sleeper)
		.acquire_token(options())
		.await
		.expect_err("Transport failures should fail immediately.");

	assert_eq!(err.general_failure(), Some(GeneralFailure::UnexpectedError));
	assert_eq!(client.explicit_calls(), 1);
	assert!(sleeper.delays().is_empty());
}

#[tokio::test]
async fn empty_password_is_rejected_before_any_attempt() {
	let client = ScriptedIdentityClient::new();
	let sleeper = RecordingSleeper::new();
	let options =
		AcquisitionOptions::new(scopes()).with_account(common::account()).with_password("");
	let err = engine(&client, &sleeper)
		.acquire_token(options)
		.await
		.expect_err("Empty passwords must be rejected.");

	assert!(matches!(err, Error::InvalidRequest { .. }));
	assert_eq!(client.silent_calls(), 1);
	assert_eq!(client.explicit_calls(), 0);
}

#[tokio::test]
async fn dropping_the_future_cancels_pending_backoff() {
	let client = ScriptedIdentityClient::new();
	let sleeper = PendingSleeper::new();
	let engine =
		TokenAcquisitionEngine::<ScriptedIdentityClient>::new(client.clone(), sleeper.clone());

	client.push_transient(Some(Duration::seconds(30)));

	let result = tokio::time::timeout(
		std::time::Duration::from_millis(50),
		engine.acquire_token(options()),
	)
	.await;

	assert!(result.is_err());
	assert_eq!(client.explicit_calls(), 1);
	assert_eq!(sleeper.delays(), vec![Duration::seconds(30)]);
}

#[tokio::test]
async fn concurrent_acquisitions_run_independently() {
	let client = ScriptedIdentityClient::new();
	let sleeper = RecordingSleeper::new();
	let engine = engine(&client, &sleeper);

	client
		.push_explicit(Ok(common::token("first", &scopes(), Duration::hours(1))))
		.push_explicit(Ok(common::token("second", &scopes(), Duration::hours(1))));

	let (first, second) =
		tokio::join!(engine.acquire_token(options()), engine.acquire_token(options()));

	first.expect("First concurrent acquisition should succeed.");
	second.expect("Second concurrent acquisition should succeed.");

	assert_eq!(client.silent_calls(), 2);
	assert_eq!(client.explicit_calls(), 2);
}
