//! # Tokengate Config
//!
//! Configuration structures for the token engine, loaded from environment
//! variables or assembled with [`JwtConfigBuilder`]:
//!
//! - [`jwt`]: signing algorithm, key material, lifetimes and identity settings
//! - [`lookup`]: ordered token lookup rules (`header:Authorization,query:token`)
//! - [`cookie`]: optional cookie mirroring of issued tokens
//!
//! Every constructor validates eagerly: a configuration that builds is usable
//! for the lifetime of the process.
//!
//! # Example
//!
//! ```ignore
//! use tokengate_config::{JwtConfig, SigningAlgorithm};
//!
//! let config = JwtConfig::builder()
//!     .algorithm(SigningAlgorithm::HS256)
//!     .secret("change-me")
//!     .token_lookup("header:Authorization,cookie:jwt")
//!     .build()?;
//! ```

pub mod cookie;
pub mod jwt;
pub mod lookup;

pub use cookie::CookieConfig;
pub use jwt::{JwtConfig, JwtConfigBuilder, KeyMaterial, SigningAlgorithm};
pub use lookup::{LookupRule, LookupSource, TokenLookup};
