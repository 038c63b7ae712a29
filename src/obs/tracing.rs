// self
use crate::{
	_prelude::*,
	obs::{FlowKind, FlowOutcome},
};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// Span wrapper used by login flows.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Creates a span tagged with the flow kind, the call site, and the registration identifier.
	pub fn new(kind: FlowKind, stage: &'static str, registration: &str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"oidc_login.flow",
				flow = kind.as_str(),
				stage,
				registration
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage, registration);

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

/// Emits an outcome event: `warn` for failures, `debug` otherwise.
pub fn log_flow_outcome(kind: FlowKind, outcome: FlowOutcome, detail: &str) {
	#[cfg(feature = "tracing")]
	{
		match outcome {
			FlowOutcome::Failure => tracing::warn!(
				flow = kind.as_str(),
				outcome = outcome.as_str(),
				code = detail,
				"Login flow failed."
			),
			_ => tracing::debug!(
				flow = kind.as_str(),
				outcome = outcome.as_str(),
				detail,
				"Login flow progressed."
			),
		}
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, outcome, detail);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn events_without_a_subscriber_are_noops() {
		log_flow_outcome(FlowKind::UserInfo, FlowOutcome::Failure, "invalid_user_info_response");
		log_flow_outcome(FlowKind::Authentication, FlowOutcome::Declined, "scope");
	}

	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = FlowSpan::new(FlowKind::TokenExchange, "instrument_wraps_future", "test");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}
}
