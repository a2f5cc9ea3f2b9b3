//! Demonstrates attaching a bearer token to an outbound request with the reference
//! password-grant client, then reusing the issued token silently for a second request.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use oauth2_bearer::{
	auth::{AccountHint, ClaimsPayload, ScopeSet},
	client::{PasswordGrantClient, PasswordGrantConfig},
	http::ReqwestHttpClient,
	http_types::{Request, header::AUTHORIZATION},
	provider::AuthenticationProvider,
	reqwest::Client,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	// Token payload carries `aud`, `upn` and `scp`.
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"eyJhbGciOiJub25lIn0.eyJhdWQiOiJodHRwczovL2dyYXBoLm1pY3Jvc29mdC5jb20iLCJ1cG4iOiJhZGVsZS52YW5jZUBjb250b3NvLmNvbSIsInNjcCI6IlVzZXIuUmVhZCJ9.\",\"token_type\":\"bearer\",\"expires_in\":900}",
			);
		})
		.await;
	let config = PasswordGrantConfig::builder()
		.token_endpoint(server.url("/token"))
		.client_id("demo-client")
		.build()?;
	let http_client = ReqwestHttpClient::with_client(
		Client::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()?,
	);
	let client = Arc::new(PasswordGrantClient::with_http_client(config, http_client)?);
	let provider = AuthenticationProvider::<PasswordGrantClient>::builder()
		.client(client)
		.scopes(ScopeSet::new(["User.Read"])?)
		.account(AccountHint::new("adele.vance@contoso.com")?)
		.password("demo-password")
		.build()?;

	for path in ["/me", "/me/messages"] {
		let mut request =
			Request::builder().uri(format!("https://graph.microsoft.com/v1.0{path}")).body(())?;

		provider.authenticate(&mut request).await?;

		println!("{path} authorized: {}.", request.headers().contains_key(AUTHORIZATION));
	}

	let token = provider.acquire_token(None).await?;
	let claims = ClaimsPayload::from_jwt(token.access_token.expose())?;

	println!(
		"Token issued for {:?} with scopes {:?}.",
		claims.upn,
		claims.scopes().collect::<Vec<_>>()
	);

	token_mock.assert_async().await;

	Ok(())
}
