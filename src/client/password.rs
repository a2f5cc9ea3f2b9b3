//! Reference [`IdentityClient`] performing the OAuth 2.0 resource-owner password grant.
//!
//! [`PasswordGrantClient`] exchanges a username and secret at a token endpoint through the
//! instrumented reqwest transport, and answers silent lookups from the tokens it issued
//! earlier in the same process. Provider error bodies become [`ServiceError`] values carrying
//! the HTTP status and Retry-After hint of the failing response. A 429 or 503 whose body cannot
//! be parsed is reported as `temporarily_unavailable` so the acquisition engine retries it.

// crates.io
use oauth2::{
	ClientId, ClientSecret, EndpointNotSet, EndpointSet, HttpClientError, RequestTokenError,
	ResourceOwnerPassword, ResourceOwnerUsername, Scope, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicRequestTokenError, BasicTokenResponse},
};
// self
use crate::{
	_prelude::*,
	auth::{AccountHint, Credential, ScopeSet, TokenResult},
	client::{ClientError, ClientFuture, IdentityClient, ServiceError},
	error::ConfigError,
	http::{ReqwestHttpClient, ResponseMetadata, ResponseMetadataSlot},
};

type ConfiguredBasicClient =
	BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Token endpoint and client registration used by [`PasswordGrantClient`].
#[derive(Clone)]
pub struct PasswordGrantConfig {
	/// HTTPS token endpoint.
	pub token_endpoint: Url,
	/// OAuth 2.0 client identifier.
	pub client_id: String,
	/// Client secret for confidential registrations.
	pub client_secret: Option<SecretString>,
}
impl PasswordGrantConfig {
	/// Starts building a configuration.
	pub fn builder() -> PasswordGrantConfigBuilder {
		PasswordGrantConfigBuilder::default()
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.client_id.trim().is_empty() {
			return Err(ConfigError::MissingClientId);
		}
		if self.token_endpoint.scheme() != "https" {
			return Err(ConfigError::InsecureEndpoint { url: self.token_endpoint.to_string() });
		}

		Ok(())
	}
}
impl Debug for PasswordGrantConfig {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PasswordGrantConfig")
			.field("token_endpoint", &self.token_endpoint.as_str())
			.field("client_id", &self.client_id)
			.field("client_secret_set", &self.client_secret.is_some())
			.finish()
	}
}

/// Builder for [`PasswordGrantConfig`] values.
#[derive(Debug, Default)]
pub struct PasswordGrantConfigBuilder {
	token_endpoint: Option<String>,
	client_id: Option<String>,
	client_secret: Option<SecretString>,
}
impl PasswordGrantConfigBuilder {
	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: impl Into<String>) -> Self {
		self.token_endpoint = Some(url.into());

		self
	}

	/// Sets the client identifier.
	pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
		self.client_id = Some(client_id.into());

		self
	}

	/// Sets the client secret.
	pub fn client_secret(mut self, secret: impl Into<String>) -> Self {
		self.client_secret = Some(SecretString::from(secret.into()));

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<PasswordGrantConfig, ConfigError> {
		let raw = self.token_endpoint.ok_or(ConfigError::MissingTokenEndpoint)?;
		let token_endpoint =
			Url::parse(&raw).map_err(|source| ConfigError::InvalidEndpoint { source })?;
		let config = PasswordGrantConfig {
			token_endpoint,
			client_id: self.client_id.unwrap_or_default(),
			client_secret: self.client_secret,
		};

		config.validate()?;

		Ok(config)
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct IssuedKey {
	account: AccountHint,
	requested: ScopeSet,
}

/// Password-grant client backed by reqwest and `oauth2`.
pub struct PasswordGrantClient {
	oauth_client: ConfiguredBasicClient,
	http_client: ReqwestHttpClient,
	issued: RwLock<HashMap<IssuedKey, TokenResult>>,
}
impl PasswordGrantClient {
	/// Creates a client with a default reqwest transport.
	pub fn new(config: PasswordGrantConfig) -> Result<Self> {
		Self::with_http_client(config, ReqwestHttpClient::default())
	}

	/// Creates a client that reuses the caller-provided transport.
	pub fn with_http_client(
		config: PasswordGrantConfig,
		http_client: ReqwestHttpClient,
	) -> Result<Self> {
		config.validate()?;

		let token_url = TokenUrl::new(config.token_endpoint.to_string())
			.map_err(|source| ConfigError::InvalidEndpoint { source })?;
		let mut oauth_client =
			BasicClient::new(ClientId::new(config.client_id)).set_token_uri(token_url);

		if let Some(secret) = config.client_secret {
			let secret = ClientSecret::new(secret.expose_secret().to_owned());

			oauth_client = oauth_client.set_client_secret(secret);
		}

		Ok(Self { oauth_client, http_client, issued: Default::default() })
	}

	/// Drops every token issued so far.
	pub fn clear_issued(&self) {
		self.issued.write().clear();
	}

	fn lookup_issued(
		&self,
		scopes: &ScopeSet,
		account: Option<&AccountHint>,
	) -> Option<TokenResult> {
		let now = OffsetDateTime::now_utc();
		let issued = self.issued.read();

		issued
			.iter()
			.filter(|(key, _)| account.is_none_or(|account| &key.account == account))
			.filter(|(key, _)| key.requested.covers(scopes))
			.map(|(_, token)| token)
			.filter(|token| !token.is_expired_at(now))
			.max_by_key(|token| token.expires_on)
			.cloned()
	}

	fn remember(&self, username: &AccountHint, requested: &ScopeSet, token: &TokenResult) {
		let now = OffsetDateTime::now_utc();
		let mut issued = self.issued.write();

		issued.retain(|_, cached| !cached.is_expired_at(now));
		issued.insert(
			IssuedKey { account: username.clone(), requested: requested.clone() },
			token.clone(),
		);
	}

	async fn exchange(
		&self,
		scopes: &ScopeSet,
		username: &AccountHint,
		secret: &Credential,
	) -> Result<TokenResult, ClientError> {
		let meta = ResponseMetadataSlot::default();
		let instrumented = self.http_client.instrumented(meta.clone());
		let resource_owner = ResourceOwnerUsername::new(username.to_string());
		let password = ResourceOwnerPassword::new(secret.expose().to_owned());
		let mut request = self.oauth_client.exchange_password(&resource_owner, &password);

		for scope in scopes.iter() {
			request = request.add_scope(Scope::new(scope.to_owned()));
		}

		let response = request
			.request_async(&instrumented)
			.await
			.map_err(|err| map_request_error(meta.take(), err))?;
		let token =
			map_token_response(scopes, username, response).map_err(ClientError::other)?;

		self.remember(username, scopes, &token);

		Ok(token)
	}
}
impl IdentityClient for PasswordGrantClient {
	fn acquire_token_silent<'a>(
		&'a self,
		scopes: &'a ScopeSet,
		account: Option<&'a AccountHint>,
	) -> ClientFuture<'a, Option<TokenResult>> {
		Box::pin(async move { Ok(self.lookup_issued(scopes, account)) })
	}

	fn acquire_token_by_credential<'a>(
		&'a self,
		scopes: &'a ScopeSet,
		username: &'a AccountHint,
		secret: &'a Credential,
	) -> ClientFuture<'a, TokenResult> {
		Box::pin(self.exchange(scopes, username, secret))
	}
}
impl Debug for PasswordGrantClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PasswordGrantClient")
			.field("client_id", &self.oauth_client.client_id().as_str())
			.field("issued", &self.issued.read().len())
			.finish()
	}
}

fn map_token_response(
	scopes: &ScopeSet,
	username: &AccountHint,
	response: BasicTokenResponse,
) -> Result<TokenResult, ConfigError> {
	let expires_in = response.expires_in().ok_or(ConfigError::MissingExpiresIn)?.as_secs();
	let expires_in = i64::try_from(expires_in).map_err(|_| ConfigError::ExpiresInOutOfRange)?;

	if expires_in <= 0 {
		return Err(ConfigError::NonPositiveExpiresIn);
	}

	let scope = match response.scopes() {
		Some(granted) if !granted.is_empty() =>
			ScopeSet::new(granted.iter().map(|scope| scope.as_ref()))?,
		_ => scopes.clone(),
	};

	Ok(TokenResult::builder(scope)
		.access_token(response.access_token().secret().to_owned())
		.account(username.clone())
		.issued_at(OffsetDateTime::now_utc())
		.expires_in(Duration::seconds(expires_in))
		.build()?)
}

fn map_request_error(
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<ReqwestError>>,
) -> ClientError {
	let meta = meta.unwrap_or_default();

	match err {
		RequestTokenError::ServerResponse(response) => map_server_response(response, meta).into(),
		RequestTokenError::Parse(source, _body) if is_throttled(meta.status) =>
			throttled(meta).with_description(source.to_string()).into(),
		RequestTokenError::Other(message) if is_throttled(meta.status) =>
			throttled(meta).with_description(message).into(),
		RequestTokenError::Parse(source, _body) => ClientError::other(source),
		RequestTokenError::Request(source) => ClientError::other(source),
		RequestTokenError::Other(message) => ClientError::other(format!(
			"Token endpoint returned an unexpected response: {message}."
		)),
	}
}

fn map_server_response(response: BasicErrorResponse, meta: ResponseMetadata) -> ServiceError {
	let mut err = ServiceError::new(response.error().as_ref());

	if let Some(description) = response.error_description() {
		err = err.with_description(description.clone());
	}
	if let Some(status) = meta.status {
		err = err.with_status(status);
	}
	if let Some(delay) = meta.retry_after {
		err = err.with_retry_after(delay);
	}

	err
}

fn throttled(meta: ResponseMetadata) -> ServiceError {
	let mut err = ServiceError::temporarily_unavailable();

	if let Some(status) = meta.status {
		err = err.with_status(status);
	}
	if let Some(delay) = meta.retry_after {
		err = err.with_retry_after(delay);
	}

	err
}

fn is_throttled(status: Option<u16>) -> bool {
	matches!(status, Some(429 | 503))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn config() -> PasswordGrantConfig {
		PasswordGrantConfig::builder()
			.token_endpoint("https://login.example.com/tenant/oauth2/v2.0/token")
			.client_id("client-password")
			.build()
			.expect("Password grant config fixture should build.")
	}

	#[test]
	fn builder_rejects_insecure_or_incomplete_configs() {
		let err = PasswordGrantConfig::builder()
			.token_endpoint("http://login.example.com/token")
			.client_id("client")
			.build()
			.expect_err("Plain HTTP endpoints must be rejected.");

		assert!(matches!(err, ConfigError::InsecureEndpoint { .. }));
		assert!(matches!(
			PasswordGrantConfig::builder().client_id("client").build(),
			Err(ConfigError::MissingTokenEndpoint)
		));
		assert!(matches!(
			PasswordGrantConfig::builder()
				.token_endpoint("https://login.example.com/token")
				.build(),
			Err(ConfigError::MissingClientId)
		));
		assert!(matches!(
			PasswordGrantConfig::builder().token_endpoint("not a url").client_id("client").build(),
			Err(ConfigError::InvalidEndpoint { .. })
		));
	}

	#[test]
	fn debug_redacts_client_secret() {
		let config = PasswordGrantConfig {
			client_secret: Some(SecretString::from("s3cr3t".to_owned())),
			..config()
		};
		let rendered = format!("{config:?}");

		assert!(!rendered.contains("s3cr3t"));
		assert!(rendered.contains("client_secret_set: true"));
	}

	#[test]
	fn throttled_statuses_are_transient() {
		assert!(is_throttled(Some(429)));
		assert!(is_throttled(Some(503)));
		assert!(!is_throttled(Some(500)));
		assert!(!is_throttled(None));

		let err = throttled(ResponseMetadata {
			status: Some(503),
			retry_after: Some(Duration::seconds(4)),
		});

		assert!(err.is_temporarily_unavailable());
		assert_eq!(err.status, Some(503));
		assert_eq!(err.retry_after, Some(Duration::seconds(4)));
	}

	#[test]
	fn issued_tokens_answer_silent_lookups() {
		let client = PasswordGrantClient::new(config()).expect("Client should build from config.");
		let scopes =
			ScopeSet::new(["User.Read", "Mail.Read"]).expect("Scope fixture should build.");
		let narrower = ScopeSet::new(["Mail.Read"]).expect("Scope fixture should build.");
		let adele = AccountHint::new("adele@contoso.com").expect("Hint fixture should be valid.");
		let megan = AccountHint::new("megan@contoso.com").expect("Hint fixture should be valid.");
		let token = TokenResult::builder(scopes.clone())
			.access_token("cached")
			.account(adele.clone())
			.expires_in(Duration::minutes(30))
			.build()
			.expect("Token fixture should build.");

		client.remember(&adele, &scopes, &token);

		assert!(client.lookup_issued(&narrower, Some(&adele)).is_some());
		assert!(client.lookup_issued(&scopes, None).is_some());
		assert!(client.lookup_issued(&scopes, Some(&megan)).is_none());
		assert!(client.lookup_issued(&ScopeSet::platform_default(), Some(&adele)).is_none());

		client.clear_issued();

		assert!(client.lookup_issued(&scopes, Some(&adele)).is_none());
	}

	#[test]
	fn issued_tokens_are_keyed_by_requested_scopes() {
		let client = PasswordGrantClient::new(config()).expect("Client should build from config.");
		let requested = ScopeSet::platform_default();
		let granted = ScopeSet::new(["https://graph.microsoft.com/User.Read"])
			.expect("Scope fixture should build.");
		let adele = AccountHint::new("adele@contoso.com").expect("Hint fixture should be valid.");
		let token = TokenResult::builder(granted.clone())
			.access_token("expanded")
			.account(adele.clone())
			.expires_in(Duration::minutes(30))
			.build()
			.expect("Token fixture should build.");

		client.remember(&adele, &requested, &token);

		let found = client
			.lookup_issued(&requested, Some(&adele))
			.expect("The requested scopes should find the issued token.");

		assert_eq!(found.scope, granted);
		assert!(client.lookup_issued(&granted, Some(&adele)).is_none());
	}

	#[test]
	fn expired_tokens_are_not_returned() {
		let client = PasswordGrantClient::new(config()).expect("Client should build from config.");
		let scopes = ScopeSet::new(["User.Read"]).expect("Scope fixture should build.");
		let adele = AccountHint::new("adele@contoso.com").expect("Hint fixture should be valid.");
		let token = TokenResult::builder(scopes.clone())
			.access_token("stale")
			.issued_at(OffsetDateTime::now_utc() - Duration::hours(2))
			.expires_in(Duration::hours(1))
			.build()
			.expect("Token fixture should build.");

		client.remember(&adele, &scopes, &token);

		assert!(client.lookup_issued(&scopes, Some(&adele)).is_none());
	}
}
