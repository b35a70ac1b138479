//! Authentication and authorization
//!
//! Tokens are issued elsewhere; this module verifies them and checks permissions:
//! - [`JwtService`] - JWT verification
//! - [`CurrentUser`] - current user context (actor id recorded on log entries)
//! - [`require_auth`] - authentication middleware
//! - [`require_permission`] - permission middleware

pub mod extractor;
pub mod jwt;
pub mod middleware;
pub mod permissions;

pub use jwt::{Claims, CurrentUser, JwtConfig, JwtError, JwtService};
pub use middleware::{require_auth, require_permission};
