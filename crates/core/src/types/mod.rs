//! Core types for Corner Shop.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod price;
pub mod status;
pub mod username;

pub use id::*;
pub use price::{CurrencyCode, Price};
pub use status::*;
pub use username::{Username, UsernameError};
