use super::SlashCommand;

#[test]
fn it_parse_empty_string() {
    assert!(SlashCommand::parse("").is_none());
}

#[test]
fn it_parse_space_only() {
    assert!(SlashCommand::parse("  ").is_none());
}

#[test]
fn it_parse_single_slash() {
    assert!(SlashCommand::parse("/").is_none());
}

#[test]
fn it_parse_plain_text() {
    assert!(SlashCommand::parse("What is there to do in Hue?").is_none());
}

#[test]
fn it_parse_valid_prefix() {
    let cmd = SlashCommand::parse("/q");
    assert!(cmd.is_some());
    assert_eq!(cmd.unwrap().command, "/q");
}

#[test]
fn it_is_quit() {
    for text in ["/q", "/quit", "/exit"] {
        assert!(SlashCommand::parse(text).unwrap().is_quit());
    }
}

#[test]
fn it_is_help() {
    assert!(SlashCommand::parse("/h").unwrap().is_help());
    assert!(SlashCommand::parse("/help").unwrap().is_help());
}

#[test]
fn it_is_new_session_with_name() {
    let cmd = SlashCommand::parse("/new Hoi An trip").unwrap();
    assert!(cmd.is_new_session());
    assert_eq!(cmd.args.join(" "), "Hoi An trip");
}

#[test]
fn it_is_list_sessions() {
    assert!(SlashCommand::parse("/s").unwrap().is_list_sessions());
    assert!(SlashCommand::parse("/sessions").unwrap().is_list_sessions());
}

#[test]
fn it_is_switch_session() {
    let cmd = SlashCommand::parse("/switch ab12cd34-ef56").unwrap();
    assert!(cmd.is_switch_session());
    assert_eq!(cmd.args, vec!["ab12cd34-ef56".to_string()]);
}

#[test]
fn it_is_regenerate() {
    assert!(SlashCommand::parse("/r").unwrap().is_regenerate());
    assert!(SlashCommand::parse("/regenerate 4").unwrap().is_regenerate());
}

#[test]
fn it_is_rate() {
    let cmd = SlashCommand::parse("/rate 2 5").unwrap();
    assert!(cmd.is_rate());
    assert_eq!(cmd.position_arg(0), Some(2));
    assert_eq!(cmd.position_arg(1), Some(5));
}

#[test]
fn it_is_copy() {
    assert!(SlashCommand::parse("/c").unwrap().is_copy());
    assert!(SlashCommand::parse("/copy 3").unwrap().is_copy());
}

#[test]
fn it_rejects_invalid_positions() {
    let cmd = SlashCommand::parse("/copy 0").unwrap();
    assert_eq!(cmd.position_arg(0), None);

    let cmd = SlashCommand::parse("/copy last").unwrap();
    assert_eq!(cmd.position_arg(0), None);

    let cmd = SlashCommand::parse("/copy").unwrap();
    assert_eq!(cmd.position_arg(0), None);
}
