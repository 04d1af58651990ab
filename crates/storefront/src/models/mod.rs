//! Types stored in the visitor session.

pub mod session;

pub use session::{CurrentUser, keys as session_keys};
