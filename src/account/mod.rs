//! Account identity core: data model, persistence adapter, password hashing,
//! verification tokens, sessions, OAuth exchange, and the lifecycle controller
//! that ties them together.

pub mod error;
pub mod google;
pub mod models;
pub mod password;
pub mod pg;
pub mod service;
pub mod session;
pub mod store;
pub mod token;

pub use error::AuthError;
pub use models::{Account, AccountView, EmailVerification, IdentitySource, Role};
pub use service::{AccountService, Authenticated, Registered, VerifyOutcome};
pub use store::{AccountStore, InsertOutcome, MemoryStore};
