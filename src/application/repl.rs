#[cfg(test)]
#[path = "repl_test.rs"]
mod tests;

use std::sync::Arc;

use anyhow::bail;
use anyhow::Result;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use yansi::Paint;

use crate::application::cli::format_session;
use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::Author;
use crate::domain::models::ChatPersistence;
use crate::domain::models::ChatTransport;
use crate::domain::models::ConversationMessage;
use crate::domain::models::Language;
use crate::domain::models::SlashCommand;
use crate::domain::services::ConversationController;
use crate::domain::services::Sessions;
use crate::domain::services::SubmitOutcome;
use crate::infrastructure::backends::ProxyTransport;

pub fn help_text() -> String {
    let text = r#"
COMMANDS:
- /new (/n) [NAME?] - Starts a new session, optionally with a name. The current session is kept and can be switched back to.
- /sessions (/s) - Lists your sessions.
- /switch (/sw) [SESSION_ID] - Switches to another session and shows its history.
- /regenerate (/r) [MESSAGE_NUMBER?] - Asks the guide to answer again. Defaults to the last reply.
- /rate [MESSAGE_NUMBER] [1-5] - Rates one of the guide's replies.
- /copy (/c) [MESSAGE_NUMBER?] - Copies a message to your clipboard. Defaults to the last reply.
- /quit /exit (/q) - Exit the chat.
- /help (/h) - Provides this help menu.

MESSAGE_NUMBER is the number shown in brackets in front of each message.
        "#;

    return text.trim().to_string();
}

pub fn render_message(position: usize, message: &ConversationMessage) -> String {
    let mut line = format!(
        "[{position}] {}: {}",
        message.author.display_name(),
        message.text
    );

    if let Some(rating) = message.rating {
        line = format!("{line} ({rating}/5)");
    }

    if message.is_error() {
        return Paint::red(line).to_string();
    }

    return line;
}

/// Line-oriented front end for a conversation. Each input line is either a
/// slash command or a message for the guide; the returned text is what gets
/// printed back.
pub struct Repl {
    controller: ConversationController,
    transport: Arc<dyn ChatTransport>,
}

impl Repl {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        persistence: Arc<dyn ChatPersistence>,
        user_id: &str,
        language: Language,
    ) -> Repl {
        return Repl {
            controller: ConversationController::new(
                transport.clone(),
                persistence,
                user_id,
                language,
            ),
            transport,
        };
    }

    pub fn controller(&self) -> &ConversationController {
        return &self.controller;
    }

    /// Loads `session_id`, or the user's current session, and returns the
    /// transcript to show first.
    pub async fn open(&mut self, session_id: Option<&str>) -> String {
        let mut lines = vec![];

        match session_id {
            Some(session_id) => {
                if let Err(err) = self.controller.switch_session(session_id).await {
                    tracing::warn!(error = ?err, session_id, "Failed to open session");
                    lines.push(format!("Could not open session {session_id}: {err}"));
                    self.controller.resume().await;
                }
            }
            None => self.controller.resume().await,
        }

        lines.push(self.render_transcript());

        if !self.transport.health_check().await {
            self.controller.set_online(false);
            lines.push(Paint::yellow(self.controller.language().offline_text()).to_string());
        }

        return lines.join("\n");
    }

    /// Returns `None` once the user asks to quit.
    pub async fn handle_line(&mut self, line: &str) -> Option<String> {
        let cmd = match SlashCommand::parse(line) {
            Some(cmd) => cmd,
            None => return Some(self.submit(line).await),
        };

        if cmd.is_quit() {
            return None;
        }

        let res = if cmd.is_help() {
            Ok(help_text())
        } else if cmd.is_new_session() {
            Ok(self.new_session(&cmd).await)
        } else if cmd.is_list_sessions() {
            self.list_sessions().await
        } else if cmd.is_switch_session() {
            self.switch_session(&cmd).await
        } else if cmd.is_regenerate() {
            self.regenerate(&cmd).await
        } else if cmd.is_rate() {
            self.rate(&cmd)
        } else if cmd.is_copy() {
            self.copy(&cmd)
        } else {
            Ok(help_text())
        };

        match res {
            Ok(text) => return Some(text),
            Err(err) => return Some(Paint::red(format!("{err}")).to_string()),
        }
    }

    /// Waits for queued store writes before the process exits.
    pub async fn flush(&self) {
        self.controller.flush().await;
    }

    fn render_transcript(&self) -> String {
        let messages = self.controller.messages();
        if messages.is_empty() {
            return format!(
                "{}: {}",
                Author::Bot.display_name(),
                self.controller.language().greeting()
            );
        }

        return messages
            .iter()
            .enumerate()
            .map(|(idx, message)| return render_message(idx + 1, message))
            .collect::<Vec<String>>()
            .join("\n");
    }

    async fn submit(&mut self, text: &str) -> String {
        if text.trim().is_empty() {
            return "".to_string();
        }

        if !self.controller.is_online() {
            if !self.transport.health_check().await {
                return Paint::yellow(self.controller.language().offline_text()).to_string();
            }
            self.controller.set_online(true);
        }

        match self.controller.submit(text).await {
            SubmitOutcome::Ignored => return "".to_string(),
            SubmitOutcome::Replied => return self.render_last(),
            SubmitOutcome::Failed => {
                let mut output = self.render_last();
                if !self.transport.health_check().await {
                    self.controller.set_online(false);
                    output = format!(
                        "{output}\n{}",
                        Paint::yellow(self.controller.language().offline_text())
                    );
                }
                return output;
            }
        }
    }

    fn render_last(&self) -> String {
        let messages = self.controller.messages();
        match messages.last() {
            Some(message) => return render_message(messages.len(), message),
            None => return "".to_string(),
        }
    }

    async fn new_session(&mut self, cmd: &SlashCommand) -> String {
        let name = cmd.args.join(" ");
        let name = if name.trim().is_empty() {
            None
        } else {
            Some(name.as_str())
        };

        let session = self.controller.new_session(name).await;

        return format!(
            "Started session {} (ID: {})\n{}",
            session.name,
            session.id,
            self.render_transcript()
        );
    }

    async fn list_sessions(&self) -> Result<String> {
        let sessions = self.controller.list_sessions().await?;
        if sessions.is_empty() {
            return Ok("There are no sessions available. You should start your first one!".to_string());
        }

        let current = self.controller.session().map(|session| return session.id.as_str());
        let lines = sessions
            .iter()
            .map(|session| {
                let line = format_session(session);
                if Some(session.id.as_str()) == current {
                    return format!("{line} *");
                }
                return line;
            })
            .collect::<Vec<String>>();

        return Ok(lines.join("\n"));
    }

    async fn switch_session(&mut self, cmd: &SlashCommand) -> Result<String> {
        let session_id = match cmd.args.first() {
            Some(session_id) => session_id.to_string(),
            None => bail!("Usage: /switch [SESSION_ID]"),
        };

        self.controller.switch_session(&session_id).await?;
        let name = self
            .controller
            .session()
            .map(|session| return session.name.to_string())
            .unwrap_or_default();

        return Ok(format!(
            "Switched to session {name}\n{}",
            self.render_transcript()
        ));
    }

    /// Resolves a 1-based message number, or the latest reply when none is
    /// given.
    fn target(&self, position: Option<usize>) -> Result<(usize, ConversationMessage)> {
        let messages = self.controller.messages();
        if let Some(position) = position {
            match messages.get(position - 1) {
                Some(message) => return Ok((position, message.clone())),
                None => bail!("There is no message {position}"),
            }
        }

        match messages
            .iter()
            .rposition(|message| return message.author == Author::Bot)
        {
            Some(idx) => return Ok((idx + 1, messages[idx].clone())),
            None => bail!("There are no replies yet"),
        }
    }

    async fn regenerate(&mut self, cmd: &SlashCommand) -> Result<String> {
        let (position, message) = self.target(cmd.position_arg(0))?;
        if message.author != Author::Bot {
            bail!("Only replies from the guide can be regenerated");
        }

        if let Err(err) = self.controller.regenerate(&message.id).await {
            tracing::warn!(error = ?err, position, "Regenerate failed");
            bail!(self.controller.language().error_text());
        }

        return Ok(render_message(position, &self.controller.messages()[position - 1]));
    }

    fn rate(&mut self, cmd: &SlashCommand) -> Result<String> {
        let usage = "Usage: /rate [MESSAGE_NUMBER] [1-5]";
        let position = match cmd.position_arg(0) {
            Some(position) => position,
            None => bail!(usage),
        };
        let rating = match cmd.args.get(1).and_then(|arg| return arg.parse::<u8>().ok()) {
            Some(rating) => rating,
            None => bail!(usage),
        };

        let (_, message) = self.target(Some(position))?;
        self.controller.rate(&message.id, rating)?;

        return Ok(format!("Rated message {position} with {rating}/5"));
    }

    fn copy(&self, cmd: &SlashCommand) -> Result<String> {
        let (position, message) = self.target(cmd.position_arg(0))?;
        self.controller.copy(&message.id)?;

        return Ok(format!("Copied message {position} to your clipboard"));
    }
}

pub async fn start() -> Result<()> {
    let transport: Arc<dyn ChatTransport> = Arc::new(ProxyTransport::from_config());
    let persistence: Arc<dyn ChatPersistence> = Arc::new(Sessions::default());
    let mut repl = Repl::new(
        transport,
        persistence,
        &Config::get(ConfigKey::Username),
        Config::language(),
    );

    let session_id = Config::get(ConfigKey::SessionId);
    let intro = if session_id.is_empty() {
        repl.open(None).await
    } else {
        repl.open(Some(&session_id)).await
    };
    println!("{intro}");

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let line = match lines.next_line().await? {
            Some(line) => line,
            None => break,
        };

        if SlashCommand::parse(&line).is_none() && repl.controller().can_submit(&line) {
            println!(
                "{}",
                Paint::new(format!("{} is typing...", Author::Bot.display_name())).dimmed()
            );
        }

        match repl.handle_line(&line).await {
            Some(output) => {
                if !output.is_empty() {
                    println!("{output}");
                }
            }
            None => break,
        }
    }

    repl.flush().await;
    return Ok(());
}
