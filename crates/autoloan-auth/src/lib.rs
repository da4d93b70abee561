//! # AutoLoan Auth
//!
//! Identity claims and the token service.
//!
//! - [`claims`]: the identity claim carried by every token, and the user roles
//! - [`jwt`]: token issuance and verification, with key rotation
//!
//! Every token lives for exactly one hour. There is no refresh flow; a client
//! logs out by discarding its token.
//!
//! # Example
//!
//! ```ignore
//! use autoloan_auth::{UserRole, issue_token, verify_token};
//! use autoloan_config::JwtConfig;
//!
//! let config = JwtConfig::from_env()?;
//! let token = issue_token(user_id, UserRole::Applicant, &config)?;
//! let claims = verify_token(&token, &config)?;
//! ```

pub mod claims;
pub mod jwt;

pub use claims::{Claims, UnknownRole, UserRole};
pub use jwt::{AuthFailure, TokenIssueError, issue_token, issue_token_at, verify_token};
