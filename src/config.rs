//! Registry configuration.
//!
//! Loaded from multiple sources with priority:
//! 1. Default values (hardcoded)
//! 2. Optional config file
//! 3. Environment variables (highest priority)

use std::time::Duration;

use config::Config;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

fn default_namespace() -> String {
    "berth".to_string()
}

fn default_service_ttl_secs() -> u64 {
    30
}

/// Configuration parameters for the service registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Root namespace segment for all registry keys
    /// Registrations live under `/<namespace>/service/...`
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// TTL of registration leases in seconds
    /// Leases are renewed every `service_ttl_secs / 3` seconds
    #[serde(default = "default_service_ttl_secs")]
    pub service_ttl_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            service_ttl_secs: default_service_ttl_secs(),
        }
    }
}

impl RegistryConfig {
    /// Load configuration, merging an optional file under `BERTH__`
    /// environment overrides.
    ///
    /// # Arguments
    /// * `path` - Optional path to a TOML config file
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Environment variables (highest priority)
        builder = builder.add_source(
            Environment::with_prefix("BERTH")
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true),
        );

        let settings: Self = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate cross-field constraints not expressible in serde defaults.
    pub fn validate(&self) -> Result<()> {
        if self.namespace.is_empty() || self.namespace.contains('/') {
            return Err(ConfigError::Message(format!(
                "namespace must be a single non-empty path segment, got {:?}",
                self.namespace
            ))
            .into());
        }

        // Renewal runs at ttl/3; anything below 3s degenerates to a zero
        // interval.
        if self.service_ttl_secs < 3 {
            return Err(ConfigError::Message(format!(
                "service_ttl_secs must be >= 3, got {}",
                self.service_ttl_secs
            ))
            .into());
        }

        Ok(())
    }

    /// Lease TTL applied to registration keys.
    pub fn service_ttl(&self) -> Duration {
        Duration::from_secs(self.service_ttl_secs)
    }

    /// Cadence of the lease renewal loop, one third of the TTL.
    pub fn renew_interval(&self) -> Duration {
        self.service_ttl() / 3
    }
}
