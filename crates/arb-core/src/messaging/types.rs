use crate::domain::{ChatId, MessageId, MessageRef, UserId};

/// Cross-messenger incoming update model.
///
/// Telegram-specific fields stay in the Telegram adapter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IncomingUpdate {
    Command(Command),
    Text(TextMessage),
    /// Anything without text (photos, stickers, ...). The router ignores these.
    Other(Envelope),
}

/// Who sent what, and where.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Envelope {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub message_id: MessageId,
}

impl Envelope {
    pub fn message_ref(&self) -> MessageRef {
        MessageRef {
            chat_id: self.chat_id,
            message_id: self.message_id,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Command {
    pub envelope: Envelope,
    /// Lower-cased, without the leading `/` or an `@botname` suffix.
    pub name: String,
    /// Whitespace-separated tokens after the command name.
    pub args: Vec<String>,
}

impl Command {
    /// First argument token, if any.
    pub fn first_arg(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextMessage {
    pub envelope: Envelope,
    pub text: String,
}

impl IncomingUpdate {
    /// Classify a message by its text payload.
    ///
    /// Text starting with `/` is a command; other text is freeform; no text at
    /// all is `Other`.
    pub fn classify(envelope: Envelope, text: Option<&str>) -> Self {
        let Some(text) = text else {
            return IncomingUpdate::Other(envelope);
        };

        if text.starts_with('/') {
            let (name, args) = parse_command(text);
            return IncomingUpdate::Command(Command {
                envelope,
                name,
                args,
            });
        }

        IncomingUpdate::Text(TextMessage {
            envelope,
            text: text.to_string(),
        })
    }
}

/// Split `/cmd@botname arg1 arg2` into `("cmd", ["arg1", "arg2"])`.
pub fn parse_command(text: &str) -> (String, Vec<String>) {
    let mut parts = text.split_whitespace();
    let first = parts.next().unwrap_or("");

    let name = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (name, parts.map(str::to_string).collect())
}
