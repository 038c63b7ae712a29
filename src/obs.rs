//! Optional observability helpers for login flows.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to run flows inside spans named `oidc_login.flow` (fields `flow`, `stage`,
//!   `registration`) and to emit outcome events.
//! - Enable `metrics` to increment the `oidc_login_flow_total` counter for every
//!   attempt/decline/success/failure, labeled by `flow` + `outcome`.
//!
//! Secrets never reach either sink; failures are reported by error code only.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Flow kinds observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// End-to-end authentication performed by the manager.
	Authentication,
	/// Authorization code exchange at the token endpoint.
	TokenExchange,
	/// User-info retrieval.
	UserInfo,
	/// JWK set retrieval.
	KeySetRefresh,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Authentication => "authentication",
			FlowKind::TokenExchange => "token_exchange",
			FlowKind::UserInfo => "user_info",
			FlowKind::KeySetRefresh => "key_set_refresh",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a flow.
	Attempt,
	/// The flow did not apply (e.g. a non-OIDC authorization).
	Declined,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Declined => "declined",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Records an outcome in both the metrics and the tracing sink.
///
/// `detail` must never contain token material; pass an error code or a fixed reason.
pub fn observe(kind: FlowKind, outcome: FlowOutcome, detail: &str) {
	record_flow_outcome(kind, outcome);
	log_flow_outcome(kind, outcome, detail);
}
