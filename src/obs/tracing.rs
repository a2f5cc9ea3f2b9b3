// self
use crate::{_prelude::*, obs::FlowKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// A span builder used by acquisition flows.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Creates a new span tagged with the provided flow kind + stage.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("oauth2_bearer.flow", flow = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits a debug event when a silent lookup cannot be used.
pub fn trace_silent_miss(reason: &'static str) {
	#[cfg(feature = "tracing")]
	tracing::debug!(reason, "Silent token lookup missed; falling back to explicit acquisition.");

	#[cfg(not(feature = "tracing"))]
	let _ = reason;
}

/// Emits a warning before suspending for a provider-hinted retry.
pub fn trace_retry(attempt: u32, max_attempts: u32, delay: Duration) {
	let delay_ms = saturating_millis(delay);

	#[cfg(feature = "tracing")]
	tracing::warn!(
		attempt,
		max_attempts,
		delay_ms,
		"Identity provider is temporarily unavailable; retrying."
	);

	#[cfg(not(feature = "tracing"))]
	let _ = (attempt, max_attempts, delay_ms);
}

fn saturating_millis(delay: Duration) -> i64 {
	let millis = delay.whole_milliseconds();

	i64::try_from(millis).unwrap_or(if millis < 0 { i64::MIN } else { i64::MAX })
}

/// Emits a debug event when an acquired token is empty and the request stays unauthenticated.
pub fn trace_empty_token() {
	#[cfg(feature = "tracing")]
	tracing::debug!("Acquired token is empty; leaving the request unauthenticated.");
}
