#![forbid(unsafe_code)]

//! Policy-as-data configuration for field synchronization.
//!
//! [`SyncConfig`] can be built in code or loaded from TOML:
//!
//! ```toml
//! time_zone = { fixed_offset = 3600 }
//! invalid_input = "retain"
//! emit_input_events = true
//! codec_max_depth = 128
//! ```
//!
//! Every key is optional; missing keys take the [`Default`] values.

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::codec::{Codec, DEFAULT_MAX_DEPTH};

/// Errors from loading a [`SyncConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid sync config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("fixed offset {0}s is outside +/-24h")]
    InvalidOffset(i32),
}

/// Time zone used to display and parse local timestamps
/// (`datetime-local` controls).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeZoneSetting {
    /// The host's local time zone.
    #[default]
    Local,
    Utc,
    /// A fixed offset east of UTC, in seconds.
    FixedOffset(i32),
}

impl TimeZoneSetting {
    /// Format `instant` as wall-clock time in this zone.
    #[must_use]
    pub fn format(&self, instant: &DateTime<Utc>, fmt: &str) -> String {
        match self {
            Self::Local => instant.with_timezone(&Local).format(fmt).to_string(),
            Self::Utc => instant.format(fmt).to_string(),
            Self::FixedOffset(secs) => match FixedOffset::east_opt(*secs) {
                Some(offset) => instant.with_timezone(&offset).format(fmt).to_string(),
                None => instant.format(fmt).to_string(),
            },
        }
    }

    /// Interpret a wall-clock time in this zone.
    ///
    /// Ambiguous local times (DST fold) resolve to the earlier instant;
    /// nonexistent local times (DST gap) yield `None`.
    #[must_use]
    pub fn resolve(&self, naive: &NaiveDateTime) -> Option<DateTime<Utc>> {
        match self {
            Self::Local => Local
                .from_local_datetime(naive)
                .earliest()
                .map(|d| d.with_timezone(&Utc)),
            Self::Utc => Some(Utc.from_utc_datetime(naive)),
            Self::FixedOffset(secs) => FixedOffset::east_opt(*secs)?
                .from_local_datetime(naive)
                .single()
                .map(|d| d.with_timezone(&Utc)),
        }
    }
}

/// What a binding does when a user edit cannot be coerced to the field's
/// type (e.g. `"12abc"` in a number control).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidInputPolicy {
    /// Keep the previous field value; no dispatch happens.
    #[default]
    Retain,
    /// Dispatch `Value::Null` for the field.
    Clear,
}

/// Configuration shared by field bindings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    pub time_zone: TimeZoneSetting,
    pub invalid_input: InvalidInputPolicy,
    /// Emit a synthetic input notification after writing an element.
    pub emit_input_events: bool,
    pub codec_max_depth: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            time_zone: TimeZoneSetting::default(),
            invalid_input: InvalidInputPolicy::default(),
            emit_input_events: true,
            codec_max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl SyncConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        debug!(?config, "loaded sync config");
        Ok(config)
    }

    /// Check invariants that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let TimeZoneSetting::FixedOffset(secs) = self.time_zone {
            if FixedOffset::east_opt(secs).is_none() {
                return Err(ConfigError::InvalidOffset(secs));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn with_time_zone(mut self, time_zone: TimeZoneSetting) -> Self {
        self.time_zone = time_zone;
        self
    }

    #[must_use]
    pub fn with_invalid_input(mut self, policy: InvalidInputPolicy) -> Self {
        self.invalid_input = policy;
        self
    }

    #[must_use]
    pub fn with_input_events(mut self, emit: bool) -> Self {
        self.emit_input_events = emit;
        self
    }

    /// A codec honoring `codec_max_depth`.
    #[must_use]
    pub fn codec(&self) -> Codec {
        Codec::new().with_max_depth(self.codec_max_depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(
            SyncConfig::from_toml_str("").unwrap(),
            SyncConfig::default()
        );
    }

    #[test]
    fn full_toml() {
        let config = SyncConfig::from_toml_str(
            r#"
            time_zone = { fixed_offset = 3600 }
            invalid_input = "clear"
            emit_input_events = false
            codec_max_depth = 16
            "#,
        )
        .unwrap();
        assert_eq!(config.time_zone, TimeZoneSetting::FixedOffset(3600));
        assert_eq!(config.invalid_input, InvalidInputPolicy::Clear);
        assert!(!config.emit_input_events);
        assert_eq!(config.codec().max_depth(), 16);
    }

    #[test]
    fn unit_zone_spelling() {
        let config = SyncConfig::from_toml_str(r#"time_zone = "utc""#).unwrap();
        assert_eq!(config.time_zone, TimeZoneSetting::Utc);
    }

    #[test]
    fn rejects_unknown_keys_and_bad_offsets() {
        assert!(matches!(
            SyncConfig::from_toml_str("colour = 1"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            SyncConfig::from_toml_str("time_zone = { fixed_offset = 90000 }"),
            Err(ConfigError::InvalidOffset(90000))
        ));
    }

    #[test]
    fn fixed_offset_format_and_resolve() {
        let zone = TimeZoneSetting::FixedOffset(2 * 3600);
        let naive = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap();
        let instant = zone.resolve(&naive).unwrap();
        assert_eq!(instant.to_rfc3339(), "2024-05-01T10:30:00+00:00");
        assert_eq!(zone.format(&instant, "%H:%M"), "12:30");
    }
}
