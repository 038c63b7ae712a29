//! OpenID Connect login for Rust services.
//!
//! [`flows::OidcAuthenticationManager`] turns a completed authorization-code redirect into an
//! [`auth::AuthenticatedPrincipal`]: it redeems the code, verifies the ID token against the
//! provider's JWK set, loads the user profile, and maps granted authorities.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod config;
pub mod downstream;
pub mod error;
pub mod ext;
pub mod flows;
pub mod http;
pub mod jwt;
pub mod oauth;
pub mod obs;
pub mod registration;
pub mod userinfo;

mod _prelude {
	pub use std::{
		collections::{BTreeMap, BTreeSet, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		hash::{Hash, Hasher},
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::Value;
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use jsonwebtoken;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _, tokio as _};
