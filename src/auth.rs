//! Auth-domain identifiers, scopes, claims, authorities, and token models.

pub mod authority;
pub mod claims;
pub mod id;
pub mod principal;
pub mod scope;
pub mod token;

pub use authority::*;
pub use claims::ClaimSet;
pub use id::*;
pub use principal::*;
pub use scope::*;
pub use token::{access::*, id_token::*, response::*, secret::*};
