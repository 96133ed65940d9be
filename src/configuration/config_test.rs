use std::io::Write;
use std::time::Duration;

use anyhow::Result;
use once_cell::sync::Lazy;
use tokio::sync::Mutex;

use super::Config;
use super::ConfigKey;
use crate::application::cli;
use crate::domain::models::Language;

// Config is process wide, so tests that load it take turns.
static LOCK: Lazy<Mutex<()>> = Lazy::new(|| return Mutex::new(()));

fn write_config(contents: &str) -> Result<tempfile::NamedTempFile> {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
    file.write_all(contents.as_bytes())?;
    return Ok(file);
}

#[test]
fn it_serializes_to_valid_toml() {
    let res = Config::serialize_default(cli::build());
    let doc = res.parse::<toml_edit::Document>();
    assert!(doc.is_ok());

    let doc = doc.unwrap();
    assert_eq!(doc.get("port").and_then(|e| return e.as_integer()), Some(3001));
    assert_eq!(
        doc.get("server-url").and_then(|e| return e.as_str()),
        Some("http://localhost:3001")
    );
    assert!(doc.get("api-key").is_none());
    assert!(doc.get("session-id").is_none());
    assert!(res.contains("# api-key = \"\""));
    assert!(res.contains("[possible values: en, vi, fr]"));
    assert!(!res.contains("[default:"));
}

#[test]
fn it_has_millisecond_timeout_defaults() {
    assert_eq!(Config::default(ConfigKey::RequestTimeout), "30000");
    assert_eq!(Config::default(ConfigKey::HealthCheckTimeout), "1000");
    assert_eq!(Config::default(ConfigKey::Port), "3001");
    assert!(Config::default(ConfigKey::ConfigFile).ends_with("guidechat/config.toml"));
}

#[tokio::test]
async fn it_loads_config_from_file() -> Result<()> {
    let _guard = LOCK.lock().await;
    let file = write_config(
        "language = \"vi\"\nport = 8080\nmodel = \"models/gemini-pro\"\nserver-url = \"\"\n",
    )?;
    let path = file.path().to_string_lossy().to_string();

    let matches = cli::build().try_get_matches_from(vec!["guidechat", "chat", "-c", path.as_str()])?;
    Config::load(cli::build(), vec![&matches]).await?;

    assert_eq!(Config::get(ConfigKey::Language), "vi");
    assert_eq!(Config::language(), Language::Vi);
    assert_eq!(Config::get(ConfigKey::Port), "8080");
    assert_eq!(Config::get(ConfigKey::Model), "models/gemini-pro");
    assert_eq!(Config::get(ConfigKey::ServerUrl), "http://localhost:3001");

    return Ok(());
}

#[tokio::test]
async fn it_prefers_flags_over_the_file() -> Result<()> {
    let _guard = LOCK.lock().await;
    let file = write_config("language = \"vi\"\nport = 8080\n")?;
    let path = file.path().to_string_lossy().to_string();

    let matches = cli::build().try_get_matches_from(vec![
        "guidechat",
        "serve",
        "-c",
        path.as_str(),
        "--port",
        "9090",
    ])?;
    Config::load(cli::build(), vec![&matches]).await?;

    assert_eq!(Config::get(ConfigKey::Port), "9090");
    assert_eq!(Config::get(ConfigKey::Language), "vi");
    assert_eq!(Config::get_duration(ConfigKey::HealthCheckTimeout), Duration::from_secs(1));

    return Ok(());
}

#[tokio::test]
async fn it_fails_to_load_invalid_values() -> Result<()> {
    let _guard = LOCK.lock().await;
    let file = write_config("language = \"de\"\n")?;
    let path = file.path().to_string_lossy().to_string();

    let matches = cli::build().try_get_matches_from(vec!["guidechat", "chat", "-c", path.as_str()])?;
    let res = Config::load(cli::build(), vec![&matches]).await;

    assert!(res.is_err());
    assert!(res.unwrap_err().to_string().contains("en, vi, fr"));

    return Ok(());
}

#[tokio::test]
async fn it_fails_to_load_malformed_files() -> Result<()> {
    let _guard = LOCK.lock().await;
    let file = write_config("language = \n")?;
    let path = file.path().to_string_lossy().to_string();

    let matches = cli::build().try_get_matches_from(vec!["guidechat", "chat", "-c", path.as_str()])?;
    let res = Config::load(cli::build(), vec![&matches]).await;

    assert!(res.is_err());

    return Ok(());
}
