#[cfg(test)]
#[path = "slash_commands_test.rs"]
mod tests;

pub struct SlashCommand {
    command: String,
    pub args: Vec<String>,
}

impl SlashCommand {
    pub fn parse(text: &str) -> Option<SlashCommand> {
        let mut args = text
            .split_whitespace()
            .map(|e| return e.to_string())
            .collect::<Vec<String>>();
        if args.is_empty() {
            return None;
        }
        let prefix = args.remove(0);

        let cmd = SlashCommand {
            command: prefix,
            args,
        };
        if cmd.is_quit()
            || cmd.is_help()
            || cmd.is_new_session()
            || cmd.is_list_sessions()
            || cmd.is_switch_session()
            || cmd.is_regenerate()
            || cmd.is_rate()
            || cmd.is_copy()
        {
            return Some(cmd);
        }

        return None;
    }

    pub fn is_quit(&self) -> bool {
        return ["/q", "/quit", "/exit"].contains(&self.command.as_str());
    }

    pub fn is_help(&self) -> bool {
        return ["/h", "/help"].contains(&self.command.as_str());
    }

    pub fn is_new_session(&self) -> bool {
        return ["/n", "/new"].contains(&self.command.as_str());
    }

    pub fn is_list_sessions(&self) -> bool {
        return ["/s", "/sessions"].contains(&self.command.as_str());
    }

    pub fn is_switch_session(&self) -> bool {
        return ["/sw", "/switch"].contains(&self.command.as_str());
    }

    pub fn is_regenerate(&self) -> bool {
        return ["/r", "/regenerate"].contains(&self.command.as_str());
    }

    pub fn is_rate(&self) -> bool {
        return self.command == "/rate";
    }

    pub fn is_copy(&self) -> bool {
        return ["/c", "/copy"].contains(&self.command.as_str());
    }

    /// Parses the argument at `idx` as a 1-based transcript position.
    pub fn position_arg(&self, idx: usize) -> Option<usize> {
        return self
            .args
            .get(idx)
            .and_then(|arg| return arg.parse::<usize>().ok())
            .filter(|position| return *position > 0);
    }
}
