//! Lift configuration and identity
//!
//! The MAC address only identifies the lift to the host (deduplication,
//! device registry); it is never sent to the module.

use crate::{LiftError, LiftResult, Orientation, RefreshConfig};
use nexus21_ipmodule::{IpModuleClient, TimeoutConfig, TransitionConfig, MANUFACTURER, MODEL};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Normalize a MAC address to lower-case, colon separated form.
///
/// Accepts `:`, `-` or `.` separators, or none at all.
pub fn format_mac(raw: &str) -> LiftResult<String> {
    let digits: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ':' | '-' | '.'))
        .collect();

    if digits.len() != 12 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(LiftError::InvalidMac(raw.to_string()));
    }

    let digits = digits.to_ascii_lowercase();
    let pairs: Vec<&str> = (0..12).step_by(2).map(|i| &digits[i..i + 2]).collect();
    Ok(pairs.join(":"))
}

/// Everything the host knows about one lift
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiftConfig {
    /// Display name
    pub name: String,
    /// IP address or host name of the IP Module
    pub host: String,
    /// MAC address, used as the unique identifier
    pub mac: String,
    #[serde(default)]
    pub orientation: Orientation,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub transition: TransitionConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
}

impl LiftConfig {
    pub fn new(name: impl Into<String>, host: impl Into<String>, mac: &str) -> LiftResult<Self> {
        Ok(Self {
            name: name.into(),
            host: host.into(),
            mac: format_mac(mac)?,
            orientation: Orientation::default(),
            timeouts: TimeoutConfig::default(),
            transition: TransitionConfig::default(),
            refresh: RefreshConfig::default(),
        })
    }

    /// Parse a JSON configuration entry and normalize its MAC address
    pub fn from_json(raw: &str) -> LiftResult<Self> {
        let mut config: LiftConfig =
            serde_json::from_str(raw).map_err(|e| LiftError::InvalidConfig(e.to_string()))?;
        if config.host.trim().is_empty() {
            return Err(LiftError::InvalidConfig("host must not be empty".to_string()));
        }
        config.mac = format_mac(&config.mac)?;
        Ok(config)
    }

    pub fn unique_id(&self) -> &str {
        &self.mac
    }

    pub fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            identifier: self.mac.clone(),
            manufacturer: MANUFACTURER.to_string(),
            model: MODEL.to_string(),
            name: self.name.clone(),
        }
    }

    /// Build a client for this lift. Pass the host's HTTP session to share
    /// its connection pool; otherwise a dedicated one is created.
    pub fn build_client(&self, http_client: Option<reqwest::Client>) -> LiftResult<Arc<IpModuleClient>> {
        let mut builder = IpModuleClient::builder(self.host.clone())
            .timeout_config(self.timeouts.clone())
            .transition_config(self.transition.clone());
        if let Some(http_client) = http_client {
            builder = builder.http_client(http_client);
        }

        builder
            .build()
            .map(Arc::new)
            .map_err(|e| LiftError::InvalidConfig(format!("cannot create client for {}: {}", self.host, e)))
    }
}

/// Registry entry describing the physical device
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub identifier: String,
    pub manufacturer: String,
    pub model: String,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_format_mac_variants() {
        assert_eq!(format_mac("AA:BB:CC:DD:EE:FF").unwrap(), "aa:bb:cc:dd:ee:ff");
        assert_eq!(format_mac("aa-bb-cc-dd-ee-ff").unwrap(), "aa:bb:cc:dd:ee:ff");
        assert_eq!(format_mac("aabb.ccdd.eeff").unwrap(), "aa:bb:cc:dd:ee:ff");
        assert_eq!(format_mac(" 001122334455 ").unwrap(), "00:11:22:33:44:55");
    }

    #[test]
    fn test_format_mac_rejects_garbage() {
        for raw in ["", "aa:bb:cc", "zz:bb:cc:dd:ee:ff", "aa:bb:cc:dd:ee:ff:00"] {
            assert!(matches!(format_mac(raw), Err(LiftError::InvalidMac(_))), "{}", raw);
        }
    }

    #[test]
    fn test_config_from_json_with_defaults() {
        let config = LiftConfig::from_json(
            r#"{"name": "Pool TV", "host": "192.168.0.39", "mac": "B8-27-EB-00-11-22"}"#,
        )
        .unwrap();

        assert_eq!(config.unique_id(), "b8:27:eb:00:11:22");
        assert_eq!(config.orientation, Orientation::Floor);
        assert_eq!(config.transition.timeout(), Duration::from_secs(30));
        assert_eq!(config.refresh, RefreshConfig::default());
    }

    #[test]
    fn test_config_from_json_overrides() {
        let config = LiftConfig::from_json(
            r#"{
                "name": "Bedroom",
                "host": "lift-2.local",
                "mac": "b827eb001123",
                "orientation": "ceiling",
                "transition": {"timeout_ms": 60000, "poll_interval_ms": 500}
            }"#,
        )
        .unwrap();

        assert_eq!(config.orientation, Orientation::Ceiling);
        assert_eq!(config.transition.poll_interval(), Duration::from_millis(500));
    }

    #[test]
    fn test_config_from_json_rejects_bad_entries() {
        assert!(matches!(
            LiftConfig::from_json(r#"{"name": "x", "host": "", "mac": "b827eb001123"}"#),
            Err(LiftError::InvalidConfig(_))
        ));
        assert!(matches!(
            LiftConfig::from_json(r#"{"name": "x", "host": "lift"}"#),
            Err(LiftError::InvalidConfig(_))
        ));
        assert!(matches!(
            LiftConfig::from_json(r#"{"name": "x", "host": "lift", "mac": "nope"}"#),
            Err(LiftError::InvalidMac(_))
        ));
    }

    #[test]
    fn test_device_info() {
        let config = LiftConfig::new("Pool TV", "192.168.0.39", "B8:27:EB:00:11:22").unwrap();
        let info = config.device_info();
        assert_eq!(info.identifier, "b8:27:eb:00:11:22");
        assert_eq!(info.manufacturer, "Nexus21");
        assert_eq!(info.model, "IP Module");
        assert_eq!(info.name, "Pool TV");
    }

    #[test]
    fn test_build_client_uses_config() {
        let mut config = LiftConfig::new("Pool TV", "192.168.0.39", "B8:27:EB:00:11:22").unwrap();
        config.transition = TransitionConfig::new(Duration::from_secs(45), Duration::from_secs(2));

        let client = config.build_client(Some(reqwest::Client::new())).unwrap();
        assert_eq!(client.host(), "192.168.0.39");
        assert_eq!(client.transition_config().timeout(), Duration::from_secs(45));
    }
}
