use std::env;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Weekday;
use chrono_tz::Tz;
use serde::Deserialize;
use uuid::Uuid;

use crate::calendar::CalendarSpec;
use crate::domain::ActiveAccounting;

const CONFIG_FILE: &str = "config.toml";

#[derive(Debug)]
pub enum ConfigError {
	Io(std::io::Error),
	TomlDecode(toml::de::Error),
	UnknownTimezone(String),
	UnknownWeekday(String),
	InvalidFirstWeekRule(u8),
}

impl Display for ConfigError {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			ConfigError::Io(err) => write!(f, "io error: {err}"),
			ConfigError::TomlDecode(err) => write!(f, "failed to parse config: {err}"),
			ConfigError::UnknownTimezone(name) => write!(f, "unknown timezone: {name}"),
			ConfigError::UnknownWeekday(name) => write!(f, "unknown weekday: {name}"),
			ConfigError::InvalidFirstWeekRule(days) => {
				write!(f, "min_days_in_first_week must be 1..=7, got {days}")
			}
		}
	}
}

impl std::error::Error for ConfigError {}

/// App configuration. Every field has a default, so a missing config file is
/// equivalent to an empty one.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
	/// IANA timezone name; unset means the system-local timezone.
	pub timezone: Option<String>,
	/// Weekday name, full or abbreviated ("sunday", "mon").
	pub week_start: String,
	pub min_days_in_first_week: u8,
	/// Switches the active session to symmetric range clamping.
	pub clamp_active_session: bool,
	/// The tracked topic. Unset means the single default topic.
	pub topic: Option<Uuid>,
}

impl Default for AppConfig {
	fn default() -> Self {
		Self {
			timezone: None,
			week_start: "sunday".to_string(),
			min_days_in_first_week: 1,
			clamp_active_session: false,
			topic: None,
		}
	}
}

impl AppConfig {
	pub fn calendar_spec(&self) -> Result<CalendarSpec, ConfigError> {
		let timezone = match &self.timezone {
			Some(name) => Some(
				name.parse::<Tz>()
					.map_err(|_| ConfigError::UnknownTimezone(name.clone()))?,
			),
			None => None,
		};

		let week_start = self
			.week_start
			.parse::<Weekday>()
			.map_err(|_| ConfigError::UnknownWeekday(self.week_start.clone()))?;

		if !(1..=7).contains(&self.min_days_in_first_week) {
			return Err(ConfigError::InvalidFirstWeekRule(self.min_days_in_first_week));
		}

		Ok(CalendarSpec {
			timezone,
			week_start,
			min_days_in_first_week: self.min_days_in_first_week,
		})
	}

	pub fn accounting(&self) -> ActiveAccounting {
		if self.clamp_active_session {
			ActiveAccounting::Clamped
		} else {
			ActiveAccounting::RawStart
		}
	}

	/// The configured topic id, or the fixed default topic.
	pub fn topic_id(&self) -> Uuid {
		self.topic.unwrap_or_else(Uuid::nil)
	}
}

pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
	let raw = match fs::read_to_string(path) {
		Ok(raw) => raw,
		Err(err) if err.kind() == ErrorKind::NotFound => return Ok(AppConfig::default()),
		Err(err) => return Err(ConfigError::Io(err)),
	};

	toml::from_str(&raw).map_err(ConfigError::TomlDecode)
}

pub fn config_path() -> PathBuf {
	if let Some(path) = env::var_os("GOALTRACK_CONFIG") {
		return PathBuf::from(path);
	}

	data_dir().join(CONFIG_FILE)
}

pub fn data_dir() -> PathBuf {
	if let Some(path) = env::var_os("GOALTRACK_DATA_DIR") {
		return PathBuf::from(path);
	}

	#[cfg(target_os = "windows")]
	{
		if let Some(path) = env::var_os("LOCALAPPDATA") {
			return PathBuf::from(path).join("goaltrack");
		}
	}

	if let Some(path) = env::var_os("XDG_DATA_HOME") {
		return PathBuf::from(path).join("goaltrack");
	}

	if let Some(path) = env::var_os("HOME") {
		return PathBuf::from(path)
			.join(".local")
			.join("share")
			.join("goaltrack");
	}

	PathBuf::from(".goaltrack")
}

#[cfg(test)]
mod tests {
	use std::fs;
	use std::path::PathBuf;

	use chrono::Weekday;
	use chrono_tz::Tz;
	use uuid::Uuid;

	use crate::domain::ActiveAccounting;

	use super::{load_config, AppConfig, ConfigError};

	fn temp_file(name: &str) -> PathBuf {
		let mut path = std::env::temp_dir();
		path.push(format!("{}_{}", name, std::process::id()));
		path
	}

	#[test]
	fn missing_config_uses_defaults() {
		let path = temp_file("goaltrack_config_missing.toml");
		let config = load_config(&path).expect("load should succeed");

		assert_eq!(config.topic_id(), Uuid::nil());
		assert_eq!(config.accounting(), ActiveAccounting::RawStart);

		let calendar = config.calendar_spec().expect("spec should build");
		assert_eq!(calendar.timezone, None);
		assert_eq!(calendar.week_start, Weekday::Sun);
		assert_eq!(calendar.min_days_in_first_week, 1);
	}

	#[test]
	fn parses_a_full_config() {
		let path = temp_file("goaltrack_config_full.toml");
		fs::write(
			&path,
			concat!(
				"timezone = \"America/New_York\"\n",
				"week_start = \"mon\"\n",
				"min_days_in_first_week = 4\n",
				"clamp_active_session = true\n",
				"topic = \"1c52e1a1-6a14-4c0e-8d9e-0a54a467e2e7\"\n",
			),
		)
		.expect("write should succeed");

		let config = load_config(&path).expect("load should succeed");
		let calendar = config.calendar_spec().expect("spec should build");
		assert_eq!(calendar.timezone, Some(Tz::America__New_York));
		assert_eq!(calendar.week_start, Weekday::Mon);
		assert_eq!(calendar.min_days_in_first_week, 4);
		assert_eq!(config.accounting(), ActiveAccounting::Clamped);
		assert_ne!(config.topic_id(), Uuid::nil());

		let _ = fs::remove_file(path);
	}

	#[test]
	fn rejects_unknown_names_and_rules() {
		let bad_timezone = AppConfig {
			timezone: Some("Mars/Olympus".to_string()),
			..AppConfig::default()
		};
		assert!(matches!(
			bad_timezone.calendar_spec(),
			Err(ConfigError::UnknownTimezone(_))
		));

		let bad_weekday = AppConfig {
			week_start: "someday".to_string(),
			..AppConfig::default()
		};
		assert!(matches!(
			bad_weekday.calendar_spec(),
			Err(ConfigError::UnknownWeekday(_))
		));

		let bad_rule = AppConfig {
			min_days_in_first_week: 0,
			..AppConfig::default()
		};
		assert!(matches!(
			bad_rule.calendar_spec(),
			Err(ConfigError::InvalidFirstWeekRule(0))
		));
	}
}
