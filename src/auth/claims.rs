//! Typed view over the claims carried in an access token's payload.
//!
//! Decoding is structural only: signatures and expiry are not verified, so callers must
//! validate the token before trusting any claim for an authorization decision.

// crates.io
use base64::{
	Engine as _,
	alphabet::URL_SAFE,
	engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
// self
use crate::_prelude::*;

const JWT_PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
	&URL_SAFE,
	GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Errors raised while decoding a claims payload.
#[derive(Debug, ThisError)]
pub enum ClaimsError {
	/// The payload is not well-formed JSON, or a recognized claim has the wrong shape.
	#[error("Claims payload is malformed at `{}`.", .source.path())]
	Json {
		/// Structured parsing failure including the offending claim path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Non-whitespace input follows the payload object.
	#[error("Claims payload has trailing characters.")]
	TrailingCharacters {
		/// Underlying JSON failure.
		#[source]
		source: serde_json::Error,
	},
	/// The token is not a compact JWS (`header.payload.signature`).
	#[error("Token must have three dot-separated segments, found {segments}.")]
	Segments {
		/// Number of segments found.
		segments: usize,
	},
	/// The payload segment is not base64url.
	#[error("Token payload segment is not valid base64url.")]
	Base64 {
		/// Underlying decoding failure.
		#[source]
		source: base64::DecodeError,
	},
}

/// URI reference carried by `aud` and `iss`, kept exactly as the token states it.
///
/// Audiences may be absolute URIs or bare application identifiers, so any string is accepted.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UriReference(String);
impl UriReference {
	/// Wraps a raw URI reference.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the reference as written in the token.
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Parses the reference as an absolute URL; relative references yield `None`.
	pub fn to_url(&self) -> Option<Url> {
		Url::parse(&self.0).ok()
	}

	/// Returns true if the reference parses as an absolute URL.
	pub fn is_absolute(&self) -> bool {
		self.to_url().is_some()
	}
}
impl AsRef<str> for UriReference {
	fn as_ref(&self) -> &str {
		self.as_str()
	}
}
impl Debug for UriReference {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		Debug::fmt(&self.0, f)
	}
}
impl Display for UriReference {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

/// Claims decoded from a token payload. Every claim is optional.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimsPayload {
	/// Audience the token was issued for.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub aud: Option<UriReference>,
	/// Issuer that minted the token.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub iss: Option<UriReference>,
	/// Display name of the calling application.
	#[serde(rename = "app_displayname", default, skip_serializing_if = "Option::is_none")]
	pub app_display_name: Option<String>,
	/// Application (client) identifier.
	#[serde(rename = "appid", default, skip_serializing_if = "Option::is_none")]
	pub app_id: Option<Uuid>,
	/// Device identifier.
	#[serde(rename = "deviceid", default, skip_serializing_if = "Option::is_none")]
	pub device_id: Option<Uuid>,
	/// Family name of the principal.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub family_name: Option<String>,
	/// Given name of the principal.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub given_name: Option<String>,
	/// IP address the principal authenticated from.
	#[serde(rename = "ipaddr", default, skip_serializing_if = "Option::is_none")]
	pub ip_address: Option<String>,
	/// Display name of the principal.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	/// Object identifier of the principal.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub oid: Option<Uuid>,
	/// Space-delimited delegated scopes.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub scp: Option<String>,
	/// Tenant identifier.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub tid: Option<Uuid>,
	/// Legacy unique name of the principal.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub unique_name: Option<String>,
	/// User principal name.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub upn: Option<String>,
}
impl ClaimsPayload {
	/// Decodes an already base64-decoded JSON payload.
	///
	/// Unknown claims are ignored and missing claims stay unset; only malformed input fails.
	pub fn decode(raw: impl AsRef<[u8]>) -> Result<Self, ClaimsError> {
		let mut deserializer = serde_json::Deserializer::from_slice(raw.as_ref());
		let claims = serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| ClaimsError::Json { source })?;

		deserializer.end().map_err(|source| ClaimsError::TrailingCharacters { source })?;

		Ok(claims)
	}

	/// Splits a compact JWS, base64url-decodes its payload segment, and decodes the claims.
	pub fn from_jwt(token: &str) -> Result<Self, ClaimsError> {
		let segments = token.split('.').collect::<Vec<_>>();
		let [_, payload, _] = segments.as_slice() else {
			return Err(ClaimsError::Segments { segments: segments.len() });
		};
		let raw =
			JWT_PAYLOAD_ENGINE.decode(payload).map_err(|source| ClaimsError::Base64 { source })?;

		Self::decode(raw)
	}

	/// Iterates the delegated scopes listed in `scp`.
	pub fn scopes(&self) -> impl Iterator<Item = &str> {
		self.scp.as_deref().into_iter().flat_map(str::split_whitespace)
	}

	/// Returns true if `scp` lists the provided scope.
	pub fn has_scope(&self, scope: &str) -> bool {
		self.scopes().any(|candidate| candidate == scope)
	}
}
