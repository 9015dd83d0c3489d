//! Users as seen by the board service.
//!
//! Accounts live in the shared `users` table and are managed elsewhere; this
//! module resolves session tokens into users:
//! - session JWT issuing and validation
//! - the `RequireAuth` extractor
//! - storage abstraction for user lookup

pub mod session_auth;
pub mod storage;
pub mod token;

pub use session_auth::{RequireAuth, SessionAuthError};
pub use storage::{MockUserStorage, PgUserStorage, StoredUser, UserStorage, UserStorageError};
pub use token::{ISSUER, SessionClaims, generate_session_token};
