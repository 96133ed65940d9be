use super::Prompt;
use super::SYSTEM_PREAMBLE;
use crate::domain::models::Author;
use crate::domain::models::ConversationMessage;

#[test]
fn it_formats_turns_after_the_preamble() {
    let window = vec![
        ConversationMessage::new(Author::User, "Is Ha Long Bay worth a day trip?"),
        ConversationMessage::new(Author::Bot, "Yes, take an overnight cruise if you can."),
        ConversationMessage::new(Author::User, "What should I pack?"),
    ];

    let prompt = Prompt::from_window(&window);
    let turns = prompt
        .text
        .strip_prefix(SYSTEM_PREAMBLE)
        .unwrap()
        .trim_start();

    insta::assert_snapshot!(turns, @r###"
    User: Is Ha Long Bay worth a day trip?
    Assistant: Yes, take an overnight cruise if you can.
    User: What should I pack?
    "###);
}

#[test]
fn it_is_deterministic() {
    let window = vec![
        ConversationMessage::new(Author::User, "Hi"),
        ConversationMessage::new(Author::Bot, "Hello!"),
    ];

    assert_eq!(
        Prompt::from_window(&window).text,
        Prompt::from_window(&window).text
    );
}

#[test]
fn it_sends_only_the_preamble_for_an_empty_window() {
    let prompt = Prompt::from_window(&[]);
    assert_eq!(prompt.text, SYSTEM_PREAMBLE);
}
