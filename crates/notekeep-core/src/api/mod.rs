//! REST API client module for the Notes service.
//!
//! This module provides the `ApiClient` for authenticating and for managing
//! notes, categories, and favorites.
//!
//! Every endpoint except login/register uses the session token as a bearer
//! credential.

pub mod client;
pub mod error;

pub use client::{ApiClient, AuthResponse};
pub use error::ApiError;
