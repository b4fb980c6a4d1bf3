use cadence_core::error::CoreError;
use cadence_core::recurrence::{
    MaterializationConfig, DEFAULT_GENERATE_MORE_COUNT, DEFAULT_HORIZON_DAYS, DEFAULT_MAX_INSTANCES,
    DEFAULT_REGENERATE_COUNT,
};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

use crate::timezone::{detect_system_timezone, normalize_timezone_input};

const CONFIG_FILE: &str = "cadence.toml";

/// Upper bound for `recurrence.horizon_days`, one hundred years.
const MAX_HORIZON_DAYS: i64 = 36_500;

#[derive(Deserialize, Debug)]
pub struct Config {
    #[serde(default = "default_database_path")]
    pub database_path: String,
    /// Name of the user the CLI acts as
    #[serde(default = "default_user")]
    pub user: String,
    /// IANA zone for day boundaries and calendar math; detected when unset
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub recurrence: RecurrenceConfig,
}

/// Materialization bounds, see `cadence_core::recurrence::MaterializationConfig`
#[derive(Deserialize, Debug)]
#[serde(default)]
pub struct RecurrenceConfig {
    pub default_max_instances: u32,
    pub horizon_days: i64,
    pub generate_more_count: u32,
    pub regenerate_count: u32,
}

impl Default for RecurrenceConfig {
    fn default() -> Self {
        Self {
            default_max_instances: DEFAULT_MAX_INSTANCES,
            horizon_days: DEFAULT_HORIZON_DAYS,
            generate_more_count: DEFAULT_GENERATE_MORE_COUNT,
            regenerate_count: DEFAULT_REGENERATE_COUNT,
        }
    }
}

impl RecurrenceConfig {
    fn validate(&self) -> Result<(), CoreError> {
        if !(1..=MAX_HORIZON_DAYS).contains(&self.horizon_days) {
            return Err(CoreError::InvalidInput(format!(
                "recurrence.horizon_days must be between 1 and {}, got {}",
                MAX_HORIZON_DAYS, self.horizon_days
            )));
        }
        let counts = [
            ("default_max_instances", self.default_max_instances),
            ("generate_more_count", self.generate_more_count),
            ("regenerate_count", self.regenerate_count),
        ];
        if let Some((key, _)) = counts.iter().find(|(_, count)| *count == 0) {
            return Err(CoreError::InvalidInput(format!("recurrence.{} must be at least 1", key)));
        }
        Ok(())
    }
}

fn default_database_path() -> String {
    "cadence.db".to_string()
}

fn default_user() -> String {
    std::env::var("USER")
        .ok()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| "default".to_string())
}

impl Config {
    pub fn new() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    fn figment() -> Figment {
        Figment::new()
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed("CADENCE_").split("__"))
    }

    pub fn timezone_name(&self) -> String {
        self.timezone.clone().unwrap_or_else(detect_system_timezone)
    }

    pub fn materialization(&self) -> Result<MaterializationConfig, CoreError> {
        self.recurrence.validate()?;
        Ok(MaterializationConfig {
            default_max_instances: self.recurrence.default_max_instances,
            horizon_days: self.recurrence.horizon_days,
            generate_more_count: self.recurrence.generate_more_count,
            regenerate_count: self.recurrence.regenerate_count,
            timezone: normalize_timezone_input(&self.timezone_name())?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults_without_sources() {
        Jail::expect_with(|_jail| {
            let config = Config::new()?;
            assert_eq!(config.database_path, "cadence.db");
            assert_eq!(config.recurrence.default_max_instances, DEFAULT_MAX_INSTANCES);
            assert_eq!(config.recurrence.horizon_days, DEFAULT_HORIZON_DAYS);
            Ok(())
        });
    }

    #[test]
    fn test_file_then_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file(
                CONFIG_FILE,
                r#"
                database_path = "from-file.db"
                user = "ada"
                timezone = "Europe/Berlin"

                [recurrence]
                horizon_days = 30
                "#,
            )?;
            jail.set_env("CADENCE_DATABASE_PATH", "from-env.db");
            jail.set_env("CADENCE_RECURRENCE__GENERATE_MORE_COUNT", "4");

            let config = Config::new()?;
            assert_eq!(config.database_path, "from-env.db");
            assert_eq!(config.user, "ada");
            assert_eq!(config.recurrence.horizon_days, 30);
            assert_eq!(config.recurrence.generate_more_count, 4);
            assert_eq!(config.recurrence.regenerate_count, DEFAULT_REGENERATE_COUNT);

            let materialization = config.materialization().expect("valid timezone");
            assert_eq!(materialization.timezone, chrono_tz::Europe::Berlin);
            Ok(())
        });
    }

    #[test]
    fn test_recurrence_bounds_rejected() {
        let rejected = [
            ("CADENCE_RECURRENCE__HORIZON_DAYS", "1000000000"),
            ("CADENCE_RECURRENCE__HORIZON_DAYS", "0"),
            ("CADENCE_RECURRENCE__HORIZON_DAYS", "-5"),
            ("CADENCE_RECURRENCE__DEFAULT_MAX_INSTANCES", "0"),
            ("CADENCE_RECURRENCE__GENERATE_MORE_COUNT", "0"),
            ("CADENCE_RECURRENCE__REGENERATE_COUNT", "0"),
        ];
        for (key, value) in rejected {
            Jail::expect_with(|jail| {
                jail.set_env("CADENCE_TIMEZONE", "UTC");
                jail.set_env(key, value);
                let config = Config::new()?;
                assert!(
                    matches!(config.materialization(), Err(CoreError::InvalidInput(_))),
                    "{key}={value} should be rejected"
                );
                Ok(())
            });
        }
    }

    #[test]
    fn test_recurrence_bounds_accepted() {
        Jail::expect_with(|jail| {
            jail.create_file(
                CONFIG_FILE,
                r#"
                timezone = "UTC"

                [recurrence]
                horizon_days = 36500
                default_max_instances = 1
                "#,
            )?;
            let config = Config::new()?;
            let materialization = config.materialization().expect("bounds are inclusive");
            assert_eq!(materialization.horizon_days, MAX_HORIZON_DAYS);
            assert_eq!(materialization.default_max_instances, 1);
            Ok(())
        });
    }

    #[test]
    fn test_invalid_timezone_rejected() {
        Jail::expect_with(|jail| {
            jail.set_env("CADENCE_TIMEZONE", "Mars/Olympus");
            let config = Config::new()?;
            assert!(matches!(config.materialization(), Err(CoreError::InvalidTimezone(_))));
            Ok(())
        });
    }
}
