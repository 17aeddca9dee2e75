//! Runtime configuration.
//!
//! # Example Configuration
//!
//! ```toml
//! [reconciler]
//! # Extra delay before a scheduled refresh pass starts
//! refresh_debounce_ms = 0
//!
//! [bridge]
//! # Timeout for remote calls; 0 disables it
//! call_timeout_ms = 30000
//! thread_name = "tessera-bridge"
//!
//! # Initialization arguments per component type name
//! [components.Player]
//! args = [30]
//! ```
//!
//! Arguments given to `ApplicationBuilder::configure` or `initialize`
//! take precedence over the `[components]` table.

mod error;
mod loader;
mod types;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use types::{
    BridgeConfig, ComponentConfig, ReconcilerConfig, RuntimeConfig, DEFAULT_BRIDGE_THREAD_NAME,
    DEFAULT_CALL_TIMEOUT_MS,
};
