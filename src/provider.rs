//! Outbound request decoration.
//!
//! [`AuthenticationProvider`] is the single integration point: it resolves the scopes, account
//! hint, and secret for a request (per-request [`RequestAuthOptions`] win over the configured
//! defaults), asks the [`TokenAcquisitionEngine`] for a token, and writes
//! `Authorization: Bearer <token>` onto the request. Failed acquisitions leave the request
//! untouched and surface the classified [`Error`]. An empty token string acquired without error
//! is a no-op.

// crates.io
use oauth2::http::{Request as HttpRequest, header::AUTHORIZATION};
// self
use crate::{
	_prelude::*,
	acquire::{self, AcquisitionOptions, RetryPolicy, Sleeper, TokenAcquisitionEngine},
	auth::{AccountHint, ScopeSet, TokenResult},
	client::IdentityClient,
	error::ConfigError,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Request type that can carry a bearer `Authorization` header.
pub trait OutboundRequest {
	/// Mutable access to the request headers.
	fn headers_mut(&mut self) -> &mut HeaderMap;

	/// Per-request overrides attached to the request, if any.
	fn auth_options(&self) -> Option<&RequestAuthOptions> {
		None
	}
}
impl<B> OutboundRequest for HttpRequest<B> {
	fn headers_mut(&mut self) -> &mut HeaderMap {
		HttpRequest::headers_mut(self)
	}

	fn auth_options(&self) -> Option<&RequestAuthOptions> {
		self.extensions().get::<RequestAuthOptions>()
	}
}
/// `reqwest::Request` exposes no extensions, so overrides go through
/// [`AuthenticationProvider::authenticate_with`].
#[cfg(feature = "reqwest")]
impl OutboundRequest for reqwest::Request {
	fn headers_mut(&mut self) -> &mut HeaderMap {
		reqwest::Request::headers_mut(self)
	}
}

/// Per-request overrides, stored in the request's extensions.
///
/// Only `http::Request` extensions are read; pass overrides to
/// [`AuthenticationProvider::authenticate_with`] for other request types.
///
/// Unset fields fall back to the provider's configured defaults.
#[derive(Debug, Default)]
pub struct RequestAuthOptions {
	/// Scopes to request instead of the configured ones.
	pub scopes: Option<ScopeSet>,
	/// Account hint to use instead of the configured one.
	pub account: Option<AccountHint>,
	/// Secret to use instead of the configured one.
	pub password: Option<SecretString>,
}
impl RequestAuthOptions {
	/// Overrides the scopes.
	pub fn with_scopes(mut self, scopes: ScopeSet) -> Self {
		self.scopes = Some(scopes);

		self
	}

	/// Overrides the account hint.
	pub fn with_account(mut self, account: AccountHint) -> Self {
		self.account = Some(account);

		self
	}

	/// Overrides the secret.
	pub fn with_password(mut self, password: impl Into<String>) -> Self {
		self.password = Some(SecretString::from(password.into()));

		self
	}
}
impl Clone for RequestAuthOptions {
	fn clone(&self) -> Self {
		Self {
			scopes: self.scopes.clone(),
			account: self.account.clone(),
			password: self.password.as_ref().map(copy_secret),
		}
	}
}

/// Attaches bearer tokens to outbound requests.
///
/// One instance is meant to serve many concurrent requests; every call acquires independently.
pub struct AuthenticationProvider<C>
where
	C: ?Sized + IdentityClient,
{
	engine: TokenAcquisitionEngine<C>,
	scopes: ScopeSet,
	account: Option<AccountHint>,
	password: Option<SecretString>,
}
impl<C> AuthenticationProvider<C>
where
	C: ?Sized + IdentityClient,
{
	/// Starts building a provider.
	pub fn builder() -> AuthenticationProviderBuilder<C> {
		AuthenticationProviderBuilder::default()
	}

	/// Returns the acquisition engine.
	pub fn engine(&self) -> &TokenAcquisitionEngine<C> {
		&self.engine
	}

	/// Returns the configured default scopes.
	pub fn scopes(&self) -> &ScopeSet {
		&self.scopes
	}

	/// Acquires a token and writes it onto `request` as `Authorization: Bearer <token>`.
	///
	/// Overrides are read from the request through [`OutboundRequest::auth_options`].
	/// Retry exhaustion surfaces as [`Error::General`]; the request is only mutated on success.
	pub async fn authenticate<R>(&self, request: &mut R) -> Result<()>
	where
		R: ?Sized + OutboundRequest,
	{
		let options = self.resolve_options(request.auth_options());

		self.decorate(request, options).await
	}

	/// Same as [`authenticate`](Self::authenticate), with explicit overrides.
	///
	/// `overrides` win over anything attached to the request. Use this for request types that
	/// cannot carry [`RequestAuthOptions`], such as `reqwest::Request`.
	pub async fn authenticate_with<R>(
		&self,
		request: &mut R,
		overrides: Option<&RequestAuthOptions>,
	) -> Result<()>
	where
		R: ?Sized + OutboundRequest,
	{
		let options = self.resolve_options(overrides.or(request.auth_options()));

		self.decorate(request, options).await
	}

	/// Acquires a token without touching any request.
	///
	/// Useful when the caller needs the token itself, e.g. to decode its claims.
	pub async fn acquire_token(
		&self,
		overrides: Option<&RequestAuthOptions>,
	) -> Result<TokenResult> {
		self.engine.acquire_token(self.resolve_options(overrides)).await?.into_result()
	}

	async fn decorate<R>(&self, request: &mut R, options: AcquisitionOptions) -> Result<()>
	where
		R: ?Sized + OutboundRequest,
	{
		const KIND: FlowKind = FlowKind::Authenticate;

		let span = FlowSpan::new(KIND, "authenticate");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let token = self.engine.acquire_token(options).await?.into_result()?;

				if token.access_token.is_empty() {
					obs::trace_empty_token();

					return Ok(());
				}

				let value = token.access_token.bearer_header()?;

				request.headers_mut().insert(AUTHORIZATION, value);

				Ok(())
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	fn resolve_options(&self, overrides: Option<&RequestAuthOptions>) -> AcquisitionOptions {
		let scopes = overrides
			.and_then(|options| options.scopes.clone())
			.unwrap_or_else(|| self.scopes.clone());
		let account = overrides
			.and_then(|options| options.account.clone())
			.or_else(|| self.account.clone());
		let password = overrides
			.and_then(|options| options.password.as_ref())
			.or(self.password.as_ref())
			.map(copy_secret);

		AcquisitionOptions { scopes, account, password }
	}
}
impl<C> Debug for AuthenticationProvider<C>
where
	C: ?Sized + IdentityClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthenticationProvider")
			.field("engine", &self.engine)
			.field("scopes", &self.scopes)
			.field("account", &self.account)
			.field("password_set", &self.password.is_some())
			.finish()
	}
}

/// Builder for [`AuthenticationProvider`].
pub struct AuthenticationProviderBuilder<C>
where
	C: ?Sized + IdentityClient,
{
	client: Option<Arc<C>>,
	scopes: Option<ScopeSet>,
	account: Option<AccountHint>,
	password: Option<SecretString>,
	retry: RetryPolicy,
	sleeper: Option<Arc<dyn Sleeper>>,
}
impl<C> AuthenticationProviderBuilder<C>
where
	C: ?Sized + IdentityClient,
{
	/// Sets the identity client. Required.
	pub fn client(mut self, client: impl Into<Arc<C>>) -> Self {
		self.client = Some(client.into());

		self
	}

	/// Sets the default scopes (the platform default scope when unset).
	pub fn scopes(mut self, scopes: ScopeSet) -> Self {
		self.scopes = Some(scopes);

		self
	}

	/// Sets the default account hint.
	pub fn account(mut self, account: AccountHint) -> Self {
		self.account = Some(account);

		self
	}

	/// Sets the default secret.
	pub fn password(mut self, password: impl Into<String>) -> Self {
		self.password = Some(SecretString::from(password.into()));

		self
	}

	/// Overrides the retry policy.
	pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
		self.retry = retry;

		self
	}

	/// Overrides the sleeper used between retries.
	pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
		self.sleeper = Some(sleeper);

		self
	}

	/// Consumes the builder and validates the configuration.
	///
	/// A missing client is rejected with [`ConfigError::MissingClient`], which classifies as
	/// an invalid request.
	pub fn build(self) -> Result<AuthenticationProvider<C>> {
		let client = self.client.ok_or(ConfigError::MissingClient)?;
		let sleeper = match self.sleeper {
			Some(sleeper) => sleeper,
			None => acquire::default_sleeper()?,
		};
		let engine =
			TokenAcquisitionEngine::<C>::new(client, sleeper).with_retry_policy(self.retry)?;

		Ok(AuthenticationProvider {
			engine,
			scopes: self.scopes.unwrap_or_default(),
			account: self.account,
			password: self.password,
		})
	}
}
impl<C> Default for AuthenticationProviderBuilder<C>
where
	C: ?Sized + IdentityClient,
{
	fn default() -> Self {
		Self {
			client: None,
			scopes: None,
			account: None,
			password: None,
			retry: RetryPolicy::default(),
			sleeper: None,
		}
	}
}
impl<C> Debug for AuthenticationProviderBuilder<C>
where
	C: ?Sized + IdentityClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthenticationProviderBuilder")
			.field("client_set", &self.client.is_some())
			.field("scopes", &self.scopes)
			.field("account", &self.account)
			.field("retry", &self.retry)
			.finish()
	}
}

fn copy_secret(secret: &SecretString) -> SecretString {
	SecretString::from(secret.expose_secret().to_owned())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		auth::Credential,
		client::{ClientError, ClientFuture},
		error::ErrorCode,
	};

	struct StaticClient;
	impl IdentityClient for StaticClient {
		fn acquire_token_silent<'a>(
			&'a self,
			_scopes: &'a ScopeSet,
			_account: Option<&'a AccountHint>,
		) -> ClientFuture<'a, Option<TokenResult>> {
			Box::pin(async { Ok(None) })
		}

		fn acquire_token_by_credential<'a>(
			&'a self,
			scopes: &'a ScopeSet,
			username: &'a AccountHint,
			_secret: &'a Credential,
		) -> ClientFuture<'a, TokenResult> {
			Box::pin(async move {
				TokenResult::builder(scopes.clone())
					.access_token(format!("static-{username}"))
					.account(username.clone())
					.expires_in(Duration::hours(1))
					.build()
					.map_err(ClientError::other)
			})
		}
	}

	fn provider() -> AuthenticationProvider<StaticClient> {
		AuthenticationProvider::<StaticClient>::builder()
			.client(StaticClient)
			.account(AccountHint::new("adele@contoso.com").expect("Hint fixture should be valid."))
			.password("configured")
			.build()
			.expect("Provider fixture should build.")
	}

	#[test]
	fn builder_requires_client_and_defaults_scopes() {
		let err = AuthenticationProvider::<StaticClient>::builder()
			.build()
			.expect_err("Building without a client must fail.");

		assert_eq!(err.code(), ErrorCode::InvalidRequest);
		assert!(provider().scopes().is_platform_default());
	}

	#[test]
	fn builder_validates_retry_policy() {
		let err = AuthenticationProvider::<StaticClient>::builder()
			.client(StaticClient)
			.retry_policy(RetryPolicy { max_attempts: 0, ..RetryPolicy::default() })
			.build()
			.expect_err("Zero-attempt policies must be rejected.");

		assert!(matches!(err, Error::Config(ConfigError::ZeroAttempts)));
	}

	#[test]
	fn request_overrides_win_over_defaults() {
		let provider = provider();
		let scopes = ScopeSet::new(["Mail.Read"]).expect("Scope fixture should build.");
		let megan = AccountHint::new("megan@contoso.com").expect("Hint fixture should be valid.");
		let overrides = RequestAuthOptions::default()
			.with_scopes(scopes.clone())
			.with_account(megan.clone())
			.with_password("override");
		let resolved = provider.resolve_options(Some(&overrides));

		assert_eq!(resolved.scopes, scopes);
		assert_eq!(resolved.account, Some(megan));
		assert_eq!(
			resolved.password.as_ref().map(|secret| secret.expose_secret()),
			Some("override")
		);

		let resolved = provider.resolve_options(Some(&RequestAuthOptions::default()));

		assert!(resolved.scopes.is_platform_default());
		assert_eq!(resolved.account.as_deref(), Some("adele@contoso.com"));
		assert_eq!(
			resolved.password.as_ref().map(|secret| secret.expose_secret()),
			Some("configured")
		);
	}

	#[test]
	fn http_requests_expose_extension_overrides() {
		let mut request = HttpRequest::new(());

		assert!(OutboundRequest::auth_options(&request).is_none());

		request.extensions_mut().insert(RequestAuthOptions::default().with_password("override"));

		let options =
			OutboundRequest::auth_options(&request).expect("Extension overrides should be found.");

		assert!(options.password.is_some());
	}

	#[tokio::test]
	async fn authenticate_writes_bearer_header() {
		let provider = provider();
		let mut request = HttpRequest::new(());

		provider.authenticate(&mut request).await.expect("Authentication should succeed.");

		let header = request
			.headers()
			.get(AUTHORIZATION)
			.expect("Authorization header should be present.");

		assert_eq!(header, "Bearer static-adele@contoso.com");
		assert!(header.is_sensitive());
	}

	#[cfg(feature = "reqwest")]
	#[tokio::test]
	async fn reqwest_requests_take_explicit_overrides() {
		let provider = provider();
		let url = "https://graph.example.com/v1.0/me".parse().expect("URL fixture should parse.");
		let mut request = reqwest::Request::new(reqwest::Method::GET, url);
		let megan = AccountHint::new("megan@contoso.com").expect("Hint fixture should be valid.");

		assert!(OutboundRequest::auth_options(&request).is_none());

		provider
			.authenticate_with(&mut request, Some(&RequestAuthOptions::default().with_account(megan)))
			.await
			.expect("Authentication with overrides should succeed.");

		assert_eq!(
			request.headers().get(AUTHORIZATION).expect("Authorization header should be present."),
			"Bearer static-megan@contoso.com"
		);
	}
}
