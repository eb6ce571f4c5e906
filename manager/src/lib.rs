//! Certificate trust management for TLS clients.
//!
//! The manager decides whether a server certificate is acceptable:
//! - user decisions recorded in the [`TrustStore`] come first
//! - then the system trust roots, when enabled
//! - then, for interactive use, a single decision request per certificate
//!   coordinated by the [`DecisionCoordinator`] and answered by a
//!   [`DecisionProvider`]
//!
//! Trust decisions persist through a key store; distrust lasts for the
//! session.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod evaluator;
pub mod hostname;
pub mod manager;
pub mod provider;
pub mod settings;
pub mod shared;
pub mod system;
pub mod trust_store;

#[cfg(test)]
mod test_support;

pub use config::ManagerConfig;
pub use coordinator::{DecisionCoordinator, DecisionEvent, DEFAULT_PROVIDER_TIMEOUT};
pub use error::ManagerError;
pub use evaluator::{Basis, TrustEvaluator, Verdict};
pub use hostname::{HostnameMatcher, HostnameVerifier};
pub use manager::{TrustManager, DEFAULT_AUTH_TYPE};
pub use provider::{
    ChannelDecisionProvider, DecisionProvider, DecisionRequest, PolicyDecisionProvider,
};
pub use settings::{AppSettings, Settings};
pub use system::{RejectAllSystemTrust, SystemTrust};
pub use trust_store::TrustStore;
