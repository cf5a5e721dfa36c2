//! Authentication: token persistence, expiry checks, and the session manager.

pub mod jwt;
pub mod session;
pub mod token;

pub use session::{SessionManager, SessionState};
pub use token::{StoredToken, TokenStore};
