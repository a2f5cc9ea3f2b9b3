//! Crate-level error taxonomy shared by the acquisition engine, providers, and claims decoding.

// self
use crate::{
	_prelude::*,
	auth::{AccountHintError, ClaimsError, ScopeValidationError, TokenResultBuilderError},
	client::ServiceError,
};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Stable classification code attached to every [`Error`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCode {
	/// Bad or missing construction or call arguments.
	InvalidRequest,
	/// Unexpected provider or internal failure.
	GeneralException,
	/// Malformed claims payload.
	ParsingError,
}
impl ErrorCode {
	/// Returns the stable label for the code.
	pub const fn as_str(self) -> &'static str {
		match self {
			ErrorCode::InvalidRequest => "invalidRequest",
			ErrorCode::GeneralException => "generalException",
			ErrorCode::ParsingError => "parsingError",
		}
	}
}
impl Display for ErrorCode {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Distinguishes the causes folded into [`ErrorCode::GeneralException`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GeneralFailure {
	/// The identity provider reported a non-transient service error.
	UnexpectedProviderError,
	/// The identity client failed outside of a provider service response.
	UnexpectedError,
	/// The provider stayed temporarily unavailable for every permitted attempt.
	RetriesExhausted {
		/// Number of explicit attempts that were made.
		attempts: u32,
	},
}
impl Display for GeneralFailure {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			GeneralFailure::UnexpectedProviderError =>
				f.write_str("Unexpected error returned from the identity provider."),
			GeneralFailure::UnexpectedError =>
				f.write_str("Unexpected error occurred while acquiring a token."),
			GeneralFailure::RetriesExhausted { attempts } => write!(
				f,
				"Identity provider remained temporarily unavailable after {attempts} attempts."
			),
		}
	}
}

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Token claims could not be decoded.
	#[error(transparent)]
	Parsing(#[from] ClaimsError),

	/// A call argument was missing or malformed.
	#[error("Invalid request: {reason}.")]
	InvalidRequest {
		/// Human-readable reason.
		reason: String,
	},
	/// Unexpected provider or internal failure.
	#[error("{failure}")]
	General {
		/// Failure cause.
		failure: GeneralFailure,
		/// Underlying error, when one exists.
		#[source]
		source: Option<BoxError>,
	},
}
impl Error {
	/// Builds an [`Error::InvalidRequest`] with the provided reason.
	pub fn invalid_request(reason: impl Into<String>) -> Self {
		Self::InvalidRequest { reason: reason.into() }
	}

	/// Wraps a non-transient provider service error.
	pub fn unexpected_provider(source: ServiceError) -> Self {
		Self::General {
			failure: GeneralFailure::UnexpectedProviderError,
			source: Some(Box::new(source)),
		}
	}

	/// Wraps any other failure raised while acquiring a token.
	pub fn unexpected(source: impl Into<BoxError>) -> Self {
		Self::General { failure: GeneralFailure::UnexpectedError, source: Some(source.into()) }
	}

	/// Reports that every explicit attempt hit a transient provider failure.
	pub fn retries_exhausted(attempts: u32) -> Self {
		Self::General { failure: GeneralFailure::RetriesExhausted { attempts }, source: None }
	}

	/// Returns the classification code for this error.
	pub fn code(&self) -> ErrorCode {
		match self {
			Error::Config(_) | Error::InvalidRequest { .. } => ErrorCode::InvalidRequest,
			Error::Parsing(_) => ErrorCode::ParsingError,
			Error::General { .. } => ErrorCode::GeneralException,
		}
	}

	/// Returns the general-failure cause, if this is a [`ErrorCode::GeneralException`].
	pub fn general_failure(&self) -> Option<GeneralFailure> {
		match self {
			Error::General { failure, .. } => Some(*failure),
			_ => None,
		}
	}
}

/// Configuration and validation failures raised while assembling providers and clients.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// No identity client was supplied.
	#[error("An identity client is required.")]
	MissingClient,
	/// No sleeper was supplied and no default runtime sleeper is compiled in.
	#[error("A sleeper is required to suspend between retries.")]
	MissingSleeper,
	/// Retry policy allows zero attempts.
	#[error("Retry policy must allow at least one attempt.")]
	ZeroAttempts,
	/// Retry policy carries a negative duration.
	#[error("Retry policy {field} must not be negative.")]
	NegativeBackoff {
		/// Offending field name.
		field: &'static str,
	},
	/// Requested scopes cannot be normalized.
	#[error("Requested scopes are invalid.")]
	InvalidScope(#[from] ScopeValidationError),
	/// Account hint failed validation.
	#[error("Account hint is invalid.")]
	InvalidAccount(#[from] AccountHintError),
	/// Token result builder validation failed.
	#[error("Unable to build token result.")]
	TokenBuild(#[from] TokenResultBuilderError),
	/// Client identifier is empty.
	#[error("Client identifier cannot be empty.")]
	MissingClientId,
	/// Token endpoint was not configured.
	#[error("Missing token endpoint.")]
	MissingTokenEndpoint,
	/// Token endpoint must use HTTPS.
	#[error("The token endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Token endpoint cannot be parsed.
	#[error("Token endpoint URL is invalid.")]
	InvalidEndpoint {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Token endpoint response omitted `expires_in`.
	#[error("Token endpoint response is missing expires_in.")]
	MissingExpiresIn,
	/// Token endpoint returned an excessively large `expires_in`.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
	/// Token endpoint returned a non-positive duration.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}
