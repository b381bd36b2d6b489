//! # Tokengate Core
//!
//! Foundational types shared by every tokengate crate:
//!
//! - [`errors`]: the error taxonomy ([`ConfigError`], [`LocateError`], [`AuthError`])
//!   with HTTP status mapping
//! - [`clock`]: the [`Clock`] abstraction used for every temporal decision
//!
//! # Example
//!
//! ```ignore
//! use tokengate_core::{AuthError, Clock, SystemClock};
//!
//! let clock = SystemClock;
//! let now = clock.now();
//!
//! let err = AuthError::ExpiredToken;
//! assert_eq!(err.status().as_u16(), 401);
//! ```

pub mod clock;
pub mod errors;

pub use clock::{Clock, ManualClock, SystemClock};
pub use errors::{AuthError, ConfigError, LocateError};
