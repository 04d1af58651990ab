//! Core types for Comptoir.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod price;
pub mod siret;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use price::Price;
pub use siret::{Siret, SiretError};
pub use status::*;
