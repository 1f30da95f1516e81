use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{WatchError, WatchResult};

/// Configuration for a [`ChangeWatcher`](crate::ChangeWatcher).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// How long a file must stay quiet before its change is reported.
    #[serde(rename = "debounce_ms", with = "millis")]
    pub debounce: Duration,
    /// How often pending changes are checked for stability.
    #[serde(rename = "tick_ms", with = "millis")]
    pub tick: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(100),
            tick: Duration::from_millis(50),
        }
    }
}

impl WatchConfig {
    /// Reject settings the watch task cannot run with. A zero debounce is
    /// allowed and reports changes on the next tick.
    pub fn validate(&self) -> WatchResult<()> {
        if self.tick.is_zero() {
            return Err(WatchError::Config("tick_ms must be greater than zero".into()));
        }
        Ok(())
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = WatchConfig::default();
        assert_eq!(c.debounce, Duration::from_millis(100));
        assert_eq!(c.tick, Duration::from_millis(50));
    }

    #[test]
    fn parses_millisecond_fields() {
        let c: WatchConfig = serde_json::from_str(r#"{"debounce_ms": 250}"#).unwrap();
        assert_eq!(c.debounce, Duration::from_millis(250));
        assert_eq!(c.tick, Duration::from_millis(50));

        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["debounce_ms"], 250);
        assert_eq!(json["tick_ms"], 50);
    }

    #[test]
    fn zero_tick_is_rejected() {
        let c: WatchConfig = serde_json::from_str(r#"{"tick_ms": 0}"#).unwrap();
        assert!(matches!(c.validate(), Err(WatchError::Config(_))));

        let c: WatchConfig = serde_json::from_str(r#"{"debounce_ms": 0}"#).unwrap();
        c.validate().unwrap();
        WatchConfig::default().validate().unwrap();
    }
}
