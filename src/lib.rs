//! # Token Steward Library
//!
//! Bearer-token lifecycle management for the identity-provider sync tool:
//! acquiring tokens through a trusted broker with direct client-credentials
//! fallback, caching them, validating them, and proactively renewing them
//! before expiry.
//!
//! Modules:
//! - `credentials` — encrypted-at-rest credential store
//! - `validator` — stateless bearer-token decode and checks
//! - `acquisition` — single-flight acquisition coordinator and exchanges
//! - `renewal` — proactive renewal loop with a health state machine
//! - `status` — read-only status projection for display/telemetry

pub mod acquisition;
pub mod config;
pub mod credentials;
pub mod error;
pub mod helpers;
pub mod observability;
pub mod renewal;
pub mod server;
pub mod status;
pub mod tests;
pub mod utils;
pub mod validator;

pub use crate::acquisition::coordinator::{AcquisitionConfig, TokenCoordinator};
pub use crate::acquisition::region::Region;
pub use crate::acquisition::token::CachedToken;
pub use crate::credentials::set::CredentialSet;
pub use crate::credentials::store::CredentialStore;
pub use crate::error::{AcquireError, Strategy, ValidationError};
pub use crate::renewal::manager::{RenewalManager, RenewalSettings};
pub use crate::validator::{TokenValidator, ValidatorConfig};
