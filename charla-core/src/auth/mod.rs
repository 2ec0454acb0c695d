//! Login state for the chat client
//!
//! A single [`Session`] is validated against a static credential table,
//! persisted through a [`SessionStore`] and restored at startup.

pub mod credentials;
pub mod manager;
pub mod session;
pub mod store;

pub use credentials::{Authenticator, Credential, StaticAuthenticator, CREDENTIALS};
pub use manager::SessionManager;
pub use session::Session;
pub use store::{FileSessionStore, MemorySessionStore, SessionStore, SESSION_KEY};
