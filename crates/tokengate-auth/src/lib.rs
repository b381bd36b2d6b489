//! # Tokengate Auth
//!
//! The token lifecycle engine.
//!
//! This crate provides:
//!
//! - [`signer`]: symmetric / asymmetric signing and verification ([`Signer`])
//! - [`claims`]: the typed claim set ([`TokenClaims`])
//! - [`request`]: a transport-neutral view of a request ([`RequestView`])
//! - [`locator`]: ordered multi-source token extraction ([`TokenLocator`])
//! - [`revocation`]: the TTL-keyed blacklist ([`RevocationStore`])
//! - [`capabilities`]: collaborator traits with default implementations
//! - [`pipeline`]: per-request authentication ([`AuthPipeline`])
//! - [`flows`]: login, token generation, refresh and logout
//!
//! # Example
//!
//! ```ignore
//! use tokengate_auth::{AuthPipeline, RequestView};
//! use tokengate_config::JwtConfig;
//!
//! let pipeline = AuthPipeline::builder(JwtConfig::from_env()?).build()?;
//!
//! let issued = pipeline.generate(&serde_json::json!({ "identity": "admin" }))?;
//!
//! let request = RequestView::new()
//!     .with_header("Authorization", format!("Bearer {}", issued.token));
//! let authenticated = pipeline.authenticate(&request).await?;
//! ```

pub mod capabilities;
pub mod claims;
pub mod flows;
pub mod locator;
pub mod pipeline;
pub mod request;
pub mod revocation;
pub mod signer;

pub use capabilities::{
    AllowAll, Authenticator, Authorizator, ClaimIdentity, DefaultPayload, DisplayMessage,
    IdentityResolver, LoginCredentials, MessageFormatter, PayloadBuilder,
};
pub use claims::TokenClaims;
pub use flows::IssuedToken;
pub use locator::TokenLocator;
pub use pipeline::{AuthPipeline, AuthPipelineBuilder, Authenticated};
pub use request::RequestView;
pub use revocation::RevocationStore;
pub use signer::Signer;
