use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{BotError, Result};

/// Fixed calendar format for event dates, e.g. "25/12/2025 20:00"
pub const EVENT_DATE_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Bot configuration
/// Loaded from the file passed with --config (or CONFIG_PATH), otherwise defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BotConfig {
    /// Named channels the bot posts to
    pub channels: ChannelNames,

    /// Category that private rooms are created under
    pub room_category: String,

    /// Roles allowed to run privileged commands
    pub admin_roles: Vec<String>,

    /// Zone in which event times are authored and compared
    pub canonical_timezone: String,

    /// Zones listed in event announcements, in display order
    pub regional_timezones: Vec<RegionalZone>,

    /// Minutes-before-event marks, checked in the listed order
    pub reminder_thresholds: Vec<i64>,

    pub reminder_tick_secs: u64,

    /// Strike total at which a member is banned
    pub strike_threshold: u32,

    /// Contact shown in ban announcements
    pub appeal_contact: String,

    /// Page size for member directory scans
    pub member_page_size: u64,

    /// Messages scanned in the activity channel when no activity message is set
    pub activity_scan_depth: u8,

    /// WARN/ERROR entries kept for the diagnostics command
    pub diagnostics_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChannelNames {
    pub announcements: String,
    pub events: String,
    pub activity: String,
}

impl Default for ChannelNames {
    fn default() -> Self {
        Self {
            announcements: "📢┇anuncios".to_string(),
            events: "🎉┇eventos".to_string(),
            activity: "📍┇actividad-semanal".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RegionalZone {
    /// Display label, e.g. "🇨🇴 Colombia"
    pub label: String,
    /// IANA zone name
    pub zone: String,
}

impl RegionalZone {
    fn new(label: &str, zone: &str) -> Self {
        Self {
            label: label.to_string(),
            zone: zone.to_string(),
        }
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            channels: ChannelNames::default(),
            room_category: "꧁𓆩💬 𝒞𝑜𝓂𝓊𝓃𝒾𝒹𝒶𝒹 𓆪꧂".to_string(),
            admin_roles: vec!["Admin".to_string(), "Owner".to_string()],
            canonical_timezone: "America/Bogota".to_string(),
            regional_timezones: vec![
                RegionalZone::new("🇨🇴 Colombia", "America/Bogota"),
                RegionalZone::new("🇲🇽 México", "America/Mexico_City"),
                RegionalZone::new("🇦🇷 Argentina", "America/Argentina/Buenos_Aires"),
                RegionalZone::new("🇨🇱 Chile", "America/Santiago"),
                RegionalZone::new("🇵🇪 Perú", "America/Lima"),
                RegionalZone::new("🇻🇪 Venezuela", "America/Caracas"),
                RegionalZone::new("🇪🇸 España (Madrid)", "Europe/Madrid"),
                RegionalZone::new("🇺🇸 EE.UU. (Este)", "America/New_York"),
                RegionalZone::new("🇧🇴 Bolivia", "America/La_Paz"),
                RegionalZone::new("🇺🇾 Uruguay", "America/Montevideo"),
                RegionalZone::new("🇵🇾 Paraguay", "America/Asuncion"),
                RegionalZone::new("🇪🇨 Ecuador", "America/Guayaquil"),
                RegionalZone::new("🇦🇩 Andorra", "Europe/Andorra"),
            ],
            reminder_thresholds: vec![60, 30, 10],
            reminder_tick_secs: 60,
            strike_threshold: 5,
            appeal_contact: "**elpollo_Asado26** or Zeal's official TikTok **@zeal.ticktocl** 💬📲"
                .to_string(),
            member_page_size: 1000,
            activity_scan_depth: 10,
            diagnostics_capacity: 200,
        }
    }
}

impl BotConfig {
    /// Load from a JSON file
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| BotError::ConfigLoad {
            path: path.to_string(),
            source: e,
        })?;

        let config: Self = serde_json::from_str(&content).map_err(|e| BotError::ConfigParse {
            path: path.to_string(),
            source: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.canonical_zone()?;
        for zone in &self.regional_timezones {
            parse_zone(&zone.zone)?;
        }

        if self.reminder_thresholds.is_empty() {
            return Err(BotError::ConfigValidation {
                message: "reminder_thresholds must not be empty".to_string(),
            });
        }
        if let Some(bad) = self.reminder_thresholds.iter().find(|t| **t <= 0) {
            return Err(BotError::ConfigValidation {
                message: format!("reminder threshold {} must be positive", bad),
            });
        }
        if self.reminder_tick_secs == 0 {
            return Err(BotError::ConfigValidation {
                message: "reminder_tick_secs must be positive".to_string(),
            });
        }
        if self.strike_threshold == 0 {
            return Err(BotError::ConfigValidation {
                message: "strike_threshold must be positive".to_string(),
            });
        }
        if self.admin_roles.is_empty() {
            return Err(BotError::ConfigValidation {
                message: "admin_roles must list at least one role".to_string(),
            });
        }
        if self.member_page_size == 0 || self.member_page_size > 1000 {
            return Err(BotError::ConfigValidation {
                message: "member_page_size must be between 1 and 1000".to_string(),
            });
        }

        Ok(())
    }

    pub fn canonical_zone(&self) -> Result<Tz> {
        parse_zone(&self.canonical_timezone)
    }

    /// Regional zones resolved to time zones, in display order
    pub fn regional_zones(&self) -> Result<Vec<(String, Tz)>> {
        self.regional_timezones
            .iter()
            .map(|z| Ok((z.label.clone(), parse_zone(&z.zone)?)))
            .collect()
    }
}

fn parse_zone(name: &str) -> Result<Tz> {
    name.parse::<Tz>().map_err(|_| BotError::ConfigValidation {
        message: format!("unknown time zone '{}'", name),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = BotConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.regional_zones().unwrap().len(), 13);
        assert_eq!(config.canonical_zone().unwrap(), chrono_tz::America::Bogota);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "strike_threshold": 3, "channels": {{ "events": "events" }} }}"#
        )
        .unwrap();

        let config = BotConfig::load_from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.strike_threshold, 3);
        assert_eq!(config.channels.events, "events");
        assert_eq!(config.channels.announcements, "📢┇anuncios");
        assert_eq!(config.reminder_thresholds, vec![60, 30, 10]);
    }

    #[test]
    fn test_rejects_unknown_zone() {
        let config = BotConfig {
            canonical_timezone: "Mars/Olympus".to_string(),
            ..BotConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(BotError::ConfigValidation { .. })
        ));
    }

    #[test]
    fn test_rejects_non_positive_threshold() {
        let config = BotConfig {
            reminder_thresholds: vec![60, 0],
            ..BotConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
