//! Auth-domain models: scope sets, account hints, token results, credentials, and claims.

pub mod account;
pub mod claims;
pub mod scope;
pub mod token;

pub use account::*;
pub use claims::*;
pub use scope::*;
pub use token::{credential::*, result::*, secret::*};
