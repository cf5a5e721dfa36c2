//! REST gateway to the AquaFeed backend.
//!
//! `ApiClient` owns the request-authorization contract: every outgoing
//! request is checked for a usable bearer token before dispatch, and a
//! locally-expired token short-circuits the call instead of burning a
//! round trip on a guaranteed 401.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
