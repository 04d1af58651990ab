//! Comptoir Core - Shared domain types.
//!
//! This crate provides the types shared by the Comptoir components:
//! - `storefront` - Public-facing storefront (building, HVAC and plumbing supplies)
//! - `integration-tests` - End-to-end tests against a mocked commerce backend
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O and no HTTP clients. The
//! commerce backend owns every entity; these types only make sure ids, emails,
//! prices, SIRET numbers and statuses cannot be mixed up on the storefront side.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, prices, emails, SIRET numbers and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
