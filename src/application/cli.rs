#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;

use std::env;
use std::io;
use std::path;

use anyhow::bail;
use anyhow::Result;
use clap::builder::PossibleValuesParser;
use clap::builder::TypedValueParser;
use clap::value_parser;
use clap::Arg;
use clap::ArgAction;
use clap::ArgGroup;
use clap::ArgMatches;
use clap::Command;
use clap_complete::generate;
use clap_complete::Generator;
use clap_complete::Shell;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Select;
use strum::VariantNames;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use yansi::Paint;

use crate::application::repl::help_text;
use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::ChatSession;
use crate::domain::models::Language;
use crate::domain::services::Sessions;

/// What the process should run once the command line has been handled.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RunMode {
    Chat,
    Serve,
}

fn print_completions<G: Generator>(gen: G, cmd: &mut Command) {
    generate(gen, cmd, cmd.get_name().to_string(), &mut io::stdout());
}

pub fn format_session(session: &ChatSession) -> String {
    let mut res = format!(
        "- (ID: {}) {}, {}, Lang: {}",
        session.id,
        session.updated_at.format("%Y-%m-%d %H:%M"),
        session.name,
        session.language
    );

    if session.active {
        res = format!("{res} (active)");
    }

    return res;
}

async fn print_sessions_list() -> Result<()> {
    let sessions = Sessions::default()
        .list_all()
        .await?
        .iter()
        .map(|session| {
            return format_session(session);
        })
        .collect::<Vec<String>>();

    if sessions.is_empty() {
        println!("There are no sessions available. You should start your first one!");
    } else {
        println!("{}", sessions.join("\n"));
    }

    return Ok(());
}

async fn create_config_file() -> Result<()> {
    let config_file_path_str = Config::default(ConfigKey::ConfigFile);
    let config_file_path = path::PathBuf::from(&config_file_path_str);
    if config_file_path.exists() {
        bail!("Config file already exists at {config_file_path_str}");
    }

    if let Some(parent) = config_file_path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }

    let mut file = fs::File::create(&config_file_path).await?;
    file.write_all(Config::serialize_default(build()).as_bytes())
        .await?;

    println!("Created default config file at {config_file_path_str}");
    return Ok(());
}

async fn load_config_from_session(session_id: &str) -> Result<()> {
    let session = Sessions::default().load(session_id).await?;
    Config::set(ConfigKey::Language, &session.language.to_string());
    Config::set(ConfigKey::SessionId, &session.id);

    return Ok(());
}

async fn load_config_from_session_interactive() -> Result<bool> {
    let sessions = Sessions::default().list_all().await?;
    if sessions.is_empty() {
        println!("There are no sessions available. You should start your first one!");
        return Ok(false);
    }

    let session_options = sessions
        .iter()
        .map(|session| {
            return format_session(session);
        })
        .collect::<Vec<String>>();

    let idx = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Which session would you like to open?")
        .default(0)
        .items(&session_options)
        .interact_opt()?;

    match idx {
        Some(idx) => {
            load_config_from_session(&sessions[idx].id).await?;
            return Ok(true);
        }
        None => return Ok(false),
    }
}

fn subcommand_completions() -> Command {
    return Command::new("completions")
        .about("Generates shell completions.")
        .arg(
            clap::Arg::new("shell")
                .short('s')
                .long("shell")
                .help("Which shell to generate completions for.")
                .action(ArgAction::Set)
                .value_parser(value_parser!(Shell))
                .required(true),
        );
}

fn subcommand_config() -> Command {
    return Command::new("config")
        .about("Configuration file options.")
        .subcommand(
            Command::new("create").about("Saves the default config file to the configuration file path. This command will fail if the file exists already.")
        )
        .subcommand(
            Command::new("default").about("Outputs the default configuration file to stdout.")
        )
        .subcommand(
            Command::new("path").about("Returns the default path for the configuration file.")
        );
}

fn subcommand_sessions_delete() -> Command {
    return Command::new("delete")
        .about("Delete one or all sessions.")
        .arg(
            clap::Arg::new("session-id")
                .short('i')
                .long("id")
                .help("Session ID")
                .num_args(1),
        )
        .arg(
            clap::Arg::new("all")
                .long("all")
                .help("Delete all sessions.")
                .action(ArgAction::SetTrue),
        )
        .group(
            ArgGroup::new("delete-args")
                .args(["session-id", "all"])
                .required(true),
        );
}

fn subcommand_sessions() -> Command {
    return Command::new("sessions")
        .about("Manage past chat sessions.")
        .arg_required_else_help(true)
        .subcommand(Command::new("dir").about("Print the sessions cache directory path."))
        .subcommand(Command::new("list").about("List all previous sessions with their ids and languages."))
        .subcommand(
            Command::new("open")
                .about("Open a previous session by ID. Omit passing any session ID to load an interactive selection.")
                .arg(
                    clap::Arg::new(ConfigKey::SessionId.to_string())
                        .short('i')
                        .long("id")
                        .help("Session ID")
                        .required(false),
                ),
        )
        .subcommand(subcommand_sessions_delete());
}

fn arg_config_file() -> Arg {
    return Arg::new(ConfigKey::ConfigFile.to_string())
        .short('c')
        .long(ConfigKey::ConfigFile.to_string())
        .env("GUIDECHAT_CONFIG_FILE")
        .num_args(1)
        .help(format!(
            "Path to configuration file [default: {}]",
            Config::default(ConfigKey::ConfigFile)
        ))
        .global(true);
}

fn arg_api_key() -> Arg {
    return Arg::new(ConfigKey::ApiKey.to_string())
        .long(ConfigKey::ApiKey.to_string())
        .env("GEMINI_API_KEY")
        .hide_env_values(true)
        .num_args(1)
        .help("API key for the Gemini completion service. Required to run the proxy server.")
        .global(true);
}

fn arg_port() -> Arg {
    return Arg::new(ConfigKey::Port.to_string())
        .short('p')
        .long(ConfigKey::Port.to_string())
        .env("PORT")
        .num_args(1)
        .value_parser(value_parser!(u16).map(|port| return port.to_string()))
        .help(format!(
            "Port the proxy server listens on. [default: {}]",
            Config::default(ConfigKey::Port)
        ))
        .global(true);
}

fn arg_server_url() -> Arg {
    return Arg::new(ConfigKey::ServerUrl.to_string())
        .short('u')
        .long(ConfigKey::ServerUrl.to_string())
        .env("GUIDECHAT_SERVER_URL")
        .num_args(1)
        .help(format!(
            "Chat proxy server URL the terminal client talks to. [default: {}]",
            Config::default(ConfigKey::ServerUrl)
        ))
        .global(true);
}

fn arg_gemini_url() -> Arg {
    return Arg::new(ConfigKey::GeminiUrl.to_string())
        .long(ConfigKey::GeminiUrl.to_string())
        .env("GUIDECHAT_GEMINI_URL")
        .num_args(1)
        .help(format!(
            "Gemini API URL the proxy server forwards to. [default: {}]",
            Config::default(ConfigKey::GeminiUrl)
        ))
        .global(true);
}

fn arg_model() -> Arg {
    return Arg::new(ConfigKey::Model.to_string())
        .short('m')
        .long(ConfigKey::Model.to_string())
        .env("GUIDECHAT_MODEL")
        .num_args(1)
        .help(format!(
            "Gemini model used by the proxy server. [default: {}]",
            Config::default(ConfigKey::Model)
        ))
        .global(true);
}

fn arg_request_timeout() -> Arg {
    return Arg::new(ConfigKey::RequestTimeout.to_string())
        .long(ConfigKey::RequestTimeout.to_string())
        .env("GUIDECHAT_REQUEST_TIMEOUT")
        .num_args(1)
        .value_parser(value_parser!(u64).map(|millis| return millis.to_string()))
        .help(format!(
            "Time to wait in milliseconds for a single chat request before giving up on it. [default: {}]",
            Config::default(ConfigKey::RequestTimeout)
        ))
        .global(true);
}

fn arg_health_check_timeout() -> Arg {
    return Arg::new(ConfigKey::HealthCheckTimeout.to_string())
        .long(ConfigKey::HealthCheckTimeout.to_string())
        .env("GUIDECHAT_HEALTH_CHECK_TIMEOUT")
        .num_args(1)
        .value_parser(value_parser!(u64).map(|millis| return millis.to_string()))
        .help(format!(
            "Time to wait in milliseconds before timing out a health check. [default: {}]",
            Config::default(ConfigKey::HealthCheckTimeout)
        ))
        .global(true);
}

fn arg_language() -> Arg {
    return Arg::new(ConfigKey::Language.to_string())
        .short('l')
        .long(ConfigKey::Language.to_string())
        .env("GUIDECHAT_LANGUAGE")
        .num_args(1)
        .help(format!(
            "Language of the chat client's own messages. [default: {}]",
            Config::default(ConfigKey::Language)
        ))
        .value_parser(PossibleValuesParser::new(Language::VARIANTS))
        .global(true);
}

fn arg_username() -> Arg {
    return Arg::new(ConfigKey::Username.to_string())
        .long(ConfigKey::Username.to_string())
        .env("USER")
        .num_args(1)
        .help("Your name, shown next to your own messages and used to group your sessions.")
        .global(true);
}

pub fn build() -> Command {
    let commands_text = help_text()
        .split('\n')
        .map(|line| {
            if line.starts_with('-') {
                return format!("  {line}");
            }
            if line.starts_with("COMMANDS:") {
                return Paint::new(format!("CHAT {line}"))
                    .underline()
                    .bold()
                    .to_string();
            }
            return line.to_string();
        })
        .collect::<Vec<String>>()
        .join("\n");

    let about = format!(
        "{}\n\nVersion: {}\nCommit: {}",
        env!("CARGO_PKG_DESCRIPTION"),
        env!("CARGO_PKG_VERSION"),
        env!("VERGEN_GIT_DESCRIBE")
    );

    return Command::new("guidechat")
        .about(about)
        .author(env!("CARGO_PKG_AUTHORS"))
        .version(env!("CARGO_PKG_VERSION"))
        .after_help(commands_text)
        .arg_required_else_help(false)
        .subcommand(Command::new("chat").about("Start chatting with the travel guide in the terminal. This is the default."))
        .subcommand(Command::new("serve").about("Run the chat proxy server in front of the Gemini API."))
        .subcommand(subcommand_completions())
        .subcommand(subcommand_config())
        .subcommand(Command::new("manpages").about("Generates manpages and outputs to stdout."))
        .subcommand(subcommand_sessions())
        .arg(arg_config_file())
        .arg(arg_api_key())
        .arg(arg_port())
        .arg(arg_server_url())
        .arg(arg_gemini_url())
        .arg(arg_model())
        .arg(arg_request_timeout())
        .arg(arg_health_check_timeout())
        .arg(arg_language())
        .arg(arg_username());
}

async fn load(matches: &ArgMatches, subcmd_matches: Option<&ArgMatches>) -> Result<()> {
    let mut all_matches = vec![matches];
    if let Some(subcmd_matches) = subcmd_matches {
        all_matches.push(subcmd_matches);
    }

    return Config::load(build(), all_matches).await;
}

/// Handles one-shot subcommands. Returns the mode to run afterwards, if any.
pub async fn parse() -> Result<Option<RunMode>> {
    let matches = build().get_matches();

    match matches.subcommand() {
        Some(("chat", subcmd_matches)) => {
            load(&matches, Some(subcmd_matches)).await?;
            return Ok(Some(RunMode::Chat));
        }
        Some(("serve", subcmd_matches)) => {
            load(&matches, Some(subcmd_matches)).await?;
            return Ok(Some(RunMode::Serve));
        }
        Some(("completions", subcmd_matches)) => {
            if let Some(completions) = subcmd_matches.get_one::<Shell>("shell").copied() {
                let mut app = build();
                print_completions(completions, &mut app);
            }
            return Ok(None);
        }
        Some(("config", subcmd_matches)) => match subcmd_matches.subcommand() {
            Some(("create", _)) => {
                create_config_file().await?;
                return Ok(None);
            }
            Some(("default", _)) => {
                println!("{}", Config::serialize_default(build()));
                return Ok(None);
            }
            Some(("path", _)) => {
                println!("{}", Config::default(ConfigKey::ConfigFile));
                return Ok(None);
            }
            _ => {
                subcommand_config().print_long_help()?;
                return Ok(None);
            }
        },
        Some(("manpages", _)) => {
            clap_mangen::Man::new(build()).render(&mut io::stdout())?;
            return Ok(None);
        }
        Some(("sessions", subcmd_matches)) => match subcmd_matches.subcommand() {
            Some(("dir", _)) => {
                let dir = Sessions::default().cache_dir.to_string_lossy().to_string();
                println!("{dir}");
                return Ok(None);
            }
            Some(("list", _)) => {
                print_sessions_list().await?;
                return Ok(None);
            }
            Some(("open", open_matches)) => {
                load(&matches, Some(open_matches)).await?;
                if let Some(session_id) = open_matches.get_one::<String>("session-id") {
                    load_config_from_session(session_id).await?;
                } else if !load_config_from_session_interactive().await? {
                    return Ok(None);
                }
                return Ok(Some(RunMode::Chat));
            }
            Some(("delete", delete_matches)) => {
                if let Some(session_id) = delete_matches.get_one::<String>("session-id") {
                    Sessions::default().delete(session_id).await?;
                    println!("Deleted session {session_id}");
                } else if delete_matches.get_flag("all") {
                    Sessions::default().delete_all().await?;
                    println!("Deleted all sessions");
                } else {
                    subcommand_sessions_delete().print_long_help()?;
                }
                return Ok(None);
            }
            _ => {
                subcommand_sessions().print_long_help()?;
                return Ok(None);
            }
        },
        _ => {
            load(&matches, None).await?;
            return Ok(Some(RunMode::Chat));
        }
    }
}

/// Directory the JSON debug log is written to.
pub fn log_dir() -> path::PathBuf {
    if let Ok(dir) = env::var("GUIDECHAT_LOG_DIR") {
        return path::PathBuf::from(dir);
    }

    return dirs::cache_dir()
        .unwrap_or_else(env::temp_dir)
        .join("guidechat");
}
