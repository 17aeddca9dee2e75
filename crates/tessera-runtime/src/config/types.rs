//! Configuration types.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

/// Default bridge call timeout in milliseconds.
pub const DEFAULT_CALL_TIMEOUT_MS: u64 = 30_000;

/// Default name of bridge host threads.
pub const DEFAULT_BRIDGE_THREAD_NAME: &str = "tessera-bridge";

/// Top-level runtime configuration.
///
/// Every field has a default, so any subset may appear in a file.
///
/// # Example
///
/// ```
/// use tessera_runtime::config::RuntimeConfig;
///
/// let config = RuntimeConfig::from_toml(r#"
/// [bridge]
/// call_timeout_ms = 0
///
/// [components.Player]
/// args = [30]
/// "#).expect("valid toml");
///
/// assert_eq!(config.bridge.call_timeout(), None);
/// assert_eq!(config.init_args("Player"), Some(&vec![serde_json::json!(30)]));
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Reconciler settings.
    pub reconciler: ReconcilerConfig,

    /// Bridge settings.
    pub bridge: BridgeConfig,

    /// Per component type settings, keyed by type name.
    pub components: BTreeMap<String, ComponentConfig>,
}

impl RuntimeConfig {
    /// Serializes to a TOML string.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Deserializes from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns error if deserialization fails.
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Initialization arguments configured for a type name.
    #[must_use]
    pub fn init_args(&self, type_name: &str) -> Option<&Vec<Value>> {
        self.components.get(type_name).map(|c| &c.args)
    }

    /// Merges another config into this one.
    ///
    /// Fields of `other` that differ from the default override this
    /// config; component entries are replaced per type name.
    pub fn merge(&mut self, other: &Self) {
        self.reconciler.merge(&other.reconciler);
        self.bridge.merge(&other.bridge);
        for (name, component) in &other.components {
            self.components.insert(name.clone(), component.clone());
        }
    }
}

/// Reconciler settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Extra delay before a scheduled refresh pass starts. `0` only
    /// yields to the scheduler.
    pub refresh_debounce_ms: u64,
}

impl ReconcilerConfig {
    /// Debounce delay, if any.
    #[must_use]
    pub fn refresh_debounce(&self) -> Option<Duration> {
        (self.refresh_debounce_ms > 0).then(|| Duration::from_millis(self.refresh_debounce_ms))
    }

    fn merge(&mut self, other: &Self) {
        if other.refresh_debounce_ms != Self::default().refresh_debounce_ms {
            self.refresh_debounce_ms = other.refresh_debounce_ms;
        }
    }
}

/// Bridge settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Timeout for remote calls and property reads. `0` disables it.
    pub call_timeout_ms: u64,

    /// Name given to host threads.
    pub thread_name: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: DEFAULT_CALL_TIMEOUT_MS,
            thread_name: DEFAULT_BRIDGE_THREAD_NAME.into(),
        }
    }
}

impl BridgeConfig {
    /// Call timeout, if enabled.
    #[must_use]
    pub fn call_timeout(&self) -> Option<Duration> {
        (self.call_timeout_ms > 0).then(|| Duration::from_millis(self.call_timeout_ms))
    }

    fn merge(&mut self, other: &Self) {
        let default = Self::default();

        if other.call_timeout_ms != default.call_timeout_ms {
            self.call_timeout_ms = other.call_timeout_ms;
        }
        if other.thread_name != default.thread_name {
            self.thread_name = other.thread_name.clone();
        }
    }
}

/// Settings for one component type.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentConfig {
    /// Arguments passed to `initialize`.
    pub args: Vec<Value>,
}
