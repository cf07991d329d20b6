//! # Identity Slots SDK
//!
//! Admission-control helper for an Ethereum-style transaction pool. It maps
//! an account to the identity level reported by an on-chain profile registry
//! and turns that level into a pending-transaction slot quota.
//!
//! ## Overview
//!
//! - **Level Store**: in-memory address → level cache behind a single lock,
//!   filled lazily on first lookup.
//! - **Registry Client**: read-only `GetProfileLevel(address)` calls against
//!   the registry contract, bounded by a timeout.
//! - **Refresh Loop**: background task that periodically re-validates every
//!   cached address and overwrites levels that changed.
//!
//! Lookups never fail: whenever the registry cannot be reached or returns
//! garbage, the account is treated as `Unknown` and gets the minimum quota.
//!
//! ## Example
//!
//! ```rust,no_run
//! use ethers::prelude::{Address, Http, Provider};
//! use identity_slots_sdk::{IdentityExtension, MiddlewareTransport, Settings};
//! use std::sync::Arc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let settings = Settings::new()?;
//! let provider = Arc::new(Provider::<Http>::try_from(settings.rpc.http_url.as_str())?);
//! let extension = IdentityExtension::new(&settings.identity, Arc::new(MiddlewareTransport::new(provider)))?;
//!
//! let slots = extension.account_slots(Address::zero()).await;
//! println!("quota: {}", slots);
//!
//! extension.stop().await;
//! # Ok(())
//! # }
//! ```

// Core Types
/// Identity tiers and the tier → slot quota table
pub mod identity_level;
/// Error taxonomy
pub mod error;

// Registry Access
/// Profile registry ABI
pub mod contracts;
/// Registry lookups over a pluggable transport
pub mod registry_client;

// Cache & Refresh
/// Address → level cache and quota resolver
pub mod level_store;
/// Transaction-pool facing extension with the background refresh loop
pub mod identity_extension;

// Infrastructure
/// Metrics and observability
pub mod metrics;
/// Configuration management
pub mod settings;

// Re-exports for convenience
pub use error::IdentityError;
pub use identity_extension::{AccountSlotsExtension, ExtensionState, IdentityExtension};
pub use identity_level::{AccountSlotsTable, IdentityLevel, ACCOUNT_SLOTS_DEFAULTS};
pub use level_store::{LevelStore, SweepStats};
pub use registry_client::{MiddlewareTransport, RegistryClient, RegistryTransport};
pub use settings::Settings;
