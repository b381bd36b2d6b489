//! Middleware for request processing.
//!
//! # Authentication Flow
//!
//! 1. [`auth::require_auth`] builds a request snapshot and runs the pipeline
//! 2. On success the authenticated token is attached to the request
//! 3. Handlers read it through the [`auth::AuthContext`] extractor
//! 4. On failure the gate renders the rejection (or records it, when aborting
//!    is disabled)
//!
//! # Example
//!
//! ```ignore
//! use tokengate::middleware::auth::AuthContext;
//!
//! async fn hello(auth: AuthContext) -> impl IntoResponse {
//!     Json(json!({ "id": auth.identity() }))
//! }
//! ```

pub mod auth;
