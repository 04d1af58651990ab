//! Per-visitor state and account flows.
//!
//! # Services
//!
//! - `auth` - login, logout, registration, password and profile flows
//! - `cart` - session cart, pushed to the backend for logged-in customers
//! - `favorites` - cached favorites with optimistic toggles
//! - `search` - query normalization and search history

pub mod auth;
pub mod cart;
pub mod favorites;
pub mod search;
