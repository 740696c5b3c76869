//! `stockhouse-auth`: roles, actors and the single permission check.
//!
//! Decoupled from HTTP and storage: the API derives an [`Actor`] from verified
//! token claims and asks [`authorize`] before calling the ledger.

pub mod actor;
pub mod authorize;
pub mod claims;
pub mod roles;
pub mod user;

pub use actor::Actor;
pub use authorize::{Action, AuthzError, authorize};
pub use claims::{Hs256JwtValidator, JwtClaims, JwtError, JwtValidator, TokenValidationError, validate_claims};
pub use roles::Role;
pub use user::{NewUser, UserAccount, UserUpdate};
