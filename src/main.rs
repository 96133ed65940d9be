#![deny(clippy::implicit_return)]
#![allow(clippy::needless_return)]

mod application;
mod configuration;
mod domain;
mod infrastructure;

use std::env;
use std::process;

use anyhow::Error;
use tokio::task;
use yansi::Paint;

use crate::application::cli;
use crate::application::cli::RunMode;
use crate::application::repl;
use crate::application::server;
use crate::domain::services::clipboard::ClipboardService;

fn handle_error(err: Error) {
    eprintln!(
        "{}",
        Paint::red(format!(
            "Oh no! Guidechat has failed with the following app version and error.\n\nVersion: {}\nCommit: {}\nError: {:#}",
            env!("CARGO_PKG_VERSION"),
            env!("VERGEN_GIT_DESCRIBE"),
            err
        ))
    );

    let backtrace = err.backtrace();
    if backtrace.to_string() == "disabled backtrace" {
        let args = env::args().collect::<Vec<String>>().join(" ");
        eprintln!("\nRunning the following can help explain further what the issue is:");
        eprintln!("\nRUST_BACKTRACE=1 {args}");
    } else {
        eprintln!("\n{}", backtrace);
    }

    process::exit(1);
}

async fn run_chat() -> anyhow::Result<()> {
    let mut background_futures = task::JoinSet::new();
    if let Err(clipboard_err) = ClipboardService::healthcheck() {
        tracing::warn!(error = ?clipboard_err, "Clipboard service is unable to start")
    } else {
        background_futures.spawn(async move {
            return ClipboardService::start().await;
        });
    }

    let res = repl::start().await;
    background_futures.abort_all();

    return res;
}

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        better_panic::Settings::auto().create_panic_handler()(panic_info);
    }));

    let file_appender = tracing_appender::rolling::never(cli::log_dir(), "debug.log");
    let (writer, _guard) = tracing_appender::non_blocking(file_appender);
    let debug_log = env::var("RUST_LOG")
        .unwrap_or_else(|_| return "".to_string())
        .contains("guidechat");
    let serving = env::args().any(|arg| return arg == "serve");

    if debug_log {
        tracing_subscriber::fmt()
            .json()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(writer)
            .init();
    } else if serving {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .init();
    }

    let mode = match cli::parse().await {
        Ok(Some(mode)) => mode,
        Ok(None) => process::exit(0),
        Err(err) => {
            handle_error(err);
            return;
        }
    };

    let res = match mode {
        RunMode::Chat => run_chat().await,
        RunMode::Serve => server::start().await,
    };

    if let Err(err) = res {
        handle_error(err);
    }

    process::exit(0);
}
