//! Identity and session management for the portal.
//! Keep the public surface thin and split implementation across sub-modules.

mod principal;
mod claims;
mod storage;
mod provider;
mod session;

pub use principal::{Identity, Position, Role};
pub use claims::TokenClaims;
pub use storage::{FileTokenStore, MemoryTokenStore, TokenStore, TOKEN_STORAGE_KEY};
pub use provider::{AuthProvider, Credentials, HttpAuthProvider, LoginResponse};
pub(crate) use provider::error_message;
pub use session::{SessionSnapshot, SessionStore, SESSION_EXPIRED_NOTICE};
