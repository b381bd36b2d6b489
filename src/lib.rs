//! # Tokengate
//!
//! Request-scoped JSON-token authentication for axum services.
//!
//! The engine lives in the workspace crates; this crate adapts it to axum:
//!
//! ```text
//! crates/
//! ├── tokengate-core/     # Error taxonomy and the injectable clock
//! ├── tokengate-config/   # JwtConfig, lookup rules, cookie settings
//! ├── tokengate-cache/    # TtlCache trait, MemoryCache, RedisCache
//! └── tokengate-auth/     # Signer, locator, revocation, pipeline, flows
//! src/
//! ├── middleware/         # require_auth layer and the AuthContext extractor
//! ├── handlers.rs         # login / refresh_token / logout endpoints
//! ├── render.rs           # ResponseRenderer and the default JSON bodies
//! ├── request.rs          # RequestView from http request parts
//! ├── router.rs           # Route wiring
//! └── state.rs            # Gate: pipeline + renderer, shared as router state
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use axum::{Router, routing::get};
//! use tokengate::{Gate, router::init_router};
//!
//! let gate = Gate::from_env(|builder| builder.authenticator(MyUsers)).await?;
//! let app = init_router(gate, Router::new().route("/hello", get(hello)));
//! ```
//!
//! ### Environment Variables
//!
//! ```bash
//! JWT_SECRET=your-secure-secret-key
//! JWT_TIMEOUT_SECS=3600
//! JWT_MAX_REFRESH_SECS=3600
//! JWT_TOKEN_LOOKUP="header:Authorization, query:token, cookie:jwt"
//! CACHE_BACKEND=redis
//! REDIS_URL=redis://127.0.0.1:6379
//! ```
//!
//! ## Security Considerations
//!
//! - Verification pins the configured algorithm; tokens signed with any other
//!   algorithm are rejected
//! - Revocation lookups fail open: if the cache is unreachable, revoked tokens
//!   are accepted until their natural expiry and a warning is logged

pub mod error;
pub mod handlers;
pub mod logging;
pub mod middleware;
pub mod render;
pub mod request;
pub mod router;
pub mod state;

pub use state::Gate;

// Re-export workspace crates for convenience
pub use tokengate_auth;
pub use tokengate_cache;
pub use tokengate_config;
pub use tokengate_core;
