#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

use std::env;
use std::path;
use std::time::Duration;

use anyhow::bail;
use anyhow::Result;
use clap::ArgMatches;
use clap::Command;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use strum::EnumIter;
use strum::EnumVariantNames;
use strum::IntoEnumIterator;
use tokio::fs;

use crate::domain::models::Language;

static CONFIG: Lazy<DashMap<String, String>> = Lazy::new(DashMap::new);

#[derive(Clone, Copy, Debug, Eq, PartialEq, EnumIter, EnumVariantNames, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ConfigKey {
    ApiKey,
    ConfigFile,
    GeminiUrl,
    HealthCheckTimeout,
    Language,
    Model,
    Port,
    RequestTimeout,
    ServerUrl,
    SessionId,
    Username,
}

pub struct Config {}

impl Config {
    pub fn get(key: ConfigKey) -> String {
        if let Some(val) = CONFIG.get(&key.to_string()) {
            return val.to_string();
        }

        return "".to_string();
    }

    pub fn set(key: ConfigKey, value: &str) {
        CONFIG.insert(key.to_string(), value.to_string());
    }

    /// Reads a millisecond setting, falling back to its default when the
    /// stored value isn't a number.
    pub fn get_duration(key: ConfigKey) -> Duration {
        let millis = Config::get(key)
            .parse::<u64>()
            .or_else(|_| return Config::default(key).parse::<u64>())
            .unwrap_or(1000);

        return Duration::from_millis(millis);
    }

    pub fn language() -> Language {
        return Language::parse(&Config::get(ConfigKey::Language)).unwrap_or_default();
    }

    pub fn default(key: ConfigKey) -> String {
        if key == ConfigKey::Username {
            let user = env::var("USER").unwrap_or_else(|_| return "".to_string());
            if user.is_empty() {
                return "guest".to_string();
            }

            return user;
        }

        if key == ConfigKey::ConfigFile {
            #[cfg(not(target_os = "macos"))]
            let config_dir = dirs::config_dir().unwrap_or_else(env::temp_dir);
            #[cfg(target_os = "macos")]
            let config_dir = dirs::home_dir()
                .map(|home| return home.join(".config"))
                .unwrap_or_else(env::temp_dir);

            return config_dir
                .join("guidechat/config.toml")
                .to_string_lossy()
                .to_string();
        }

        let default_language = Language::default().to_string();

        let res = match key {
            ConfigKey::ApiKey => "",
            ConfigKey::GeminiUrl => "https://generativelanguage.googleapis.com",
            ConfigKey::HealthCheckTimeout => "1000",
            ConfigKey::Language => &default_language,
            ConfigKey::Model => "models/gemini-1.5-flash",
            ConfigKey::Port => "3001",
            ConfigKey::RequestTimeout => "30000",
            ConfigKey::ServerUrl => "http://localhost:3001",

            // Special
            ConfigKey::ConfigFile => "",
            ConfigKey::SessionId => "",
            ConfigKey::Username => "",
        };

        return res.to_string();
    }

    pub async fn load(cmd: Command, clap_arg_matches: Vec<&ArgMatches>) -> Result<()> {
        for key in ConfigKey::iter() {
            Config::set(key, &Config::default(key))
        }

        let mut config_file = Config::default(ConfigKey::ConfigFile);
        for matches in clap_arg_matches.as_slice() {
            if let Ok(Some(arg_config_file)) =
                matches.try_get_one::<String>(&ConfigKey::ConfigFile.to_string())
            {
                config_file = arg_config_file.to_string();
            }
        }

        let config_path = path::PathBuf::from(config_file);
        if config_path.exists() {
            let toml_str = fs::read_to_string(&config_path).await?;
            let doc = toml_str.parse::<toml_edit::Document>()?;

            for key in ConfigKey::iter() {
                let val = match doc.get(&key.to_string()) {
                    Some(val) => val,
                    None => continue,
                };

                // Use clap value parsers to do validation.
                let mut possible_values = vec![];
                if let Some(arg) = cmd
                    .get_arguments()
                    .find(|e| return e.get_long() == Some(key.to_string().as_str()))
                {
                    possible_values = arg
                        .get_possible_values()
                        .iter()
                        .map(|e| return e.get_name().to_string())
                        .collect::<Vec<String>>();
                }

                if let Some(val_int) = val.as_integer() {
                    Config::set(key, &val_int.to_string());
                } else if let Some(val_str) = val.as_str() {
                    if val_str.is_empty() {
                        continue;
                    }
                    if !possible_values.is_empty()
                        && !possible_values.contains(&val_str.to_string())
                    {
                        bail!(
                            "config.toml has an invalid value for key '{key}': {val_str}\nPossible values are: {}",
                            possible_values.join(", ")
                        );
                    }
                    Config::set(key, val_str);
                } else {
                    bail!("config.toml has an invalid value type for key '{key}'");
                }
            }
        }

        for key in ConfigKey::iter() {
            for matches in clap_arg_matches.as_slice() {
                if let Ok(Some(val)) = matches.try_get_one::<String>(&key.to_string()) {
                    if val.is_empty() {
                        continue;
                    }
                    Config::set(key, val)
                }
            }
        }

        tracing::debug!(
            username = Config::get(ConfigKey::Username),
            server_url = Config::get(ConfigKey::ServerUrl),
            gemini_url = Config::get(ConfigKey::GeminiUrl),
            model = Config::get(ConfigKey::Model),
            port = Config::get(ConfigKey::Port),
            language = Config::get(ConfigKey::Language),
            "config"
        );

        return Ok(());
    }

    pub fn serialize_default(cmd: Command) -> String {
        let toml_str = ConfigKey::iter()
            .filter_map(|key| {
                if key == ConfigKey::SessionId || key == ConfigKey::ConfigFile {
                    return None;
                }

                if key == ConfigKey::Username {
                    return Some(
                        "# Your name, shown next to your own messages.\n# username = \"\""
                            .to_string(),
                    );
                }

                let key_str = key.to_string();
                let arg = cmd
                    .get_arguments()
                    .find(|e| return e.get_long() == Some(key_str.as_str()))?;

                let mut description = arg
                    .get_help()
                    .map(|help| return help.to_string())
                    .unwrap_or_default()
                    .split("[default:")
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .to_string();

                if !arg.get_possible_values().is_empty() {
                    let possible_values = arg
                        .get_possible_values()
                        .iter()
                        .map(|e| return e.get_name())
                        .collect::<Vec<_>>()
                        .join(", ");
                    description = format!("{description} [possible values: {possible_values}]");
                }

                let mut val = Config::default(key);
                if val.is_empty() {
                    val = format!("# {key} = \"\"");
                } else if val.parse::<i64>().is_ok() {
                    val = format!("{key} = {val}");
                } else {
                    val = format!("{key} = \"{val}\"");
                }

                return Some(format!("# {description}\n{val}"));
            })
            .collect::<Vec<String>>()
            .join("\n\n");

        return toml_str;
    }
}
