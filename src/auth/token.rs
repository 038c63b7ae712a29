//! Token models returned by the token endpoint and produced by ID token verification.

pub mod access;
pub mod id_token;
pub mod response;
pub mod secret;
