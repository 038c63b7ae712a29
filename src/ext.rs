//! Extension contracts for attaching login-issued tokens to outbound requests.

pub mod request_signer;

pub use request_signer::*;
