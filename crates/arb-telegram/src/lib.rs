//! Telegram adapter (teloxide).
//!
//! This crate implements the `arb-core` MessagingPort over the Telegram Bot API
//! and feeds incoming messages into the core router.

use async_trait::async_trait;

use teloxide::prelude::*;

pub mod handlers;
pub mod router;

use arb_core::{
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::port::MessagingPort,
    Result,
};

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn tg_msg_id(message_id: MessageId) -> teloxide::types::MessageId {
        teloxide::types::MessageId(message_id.0)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::External(format!("telegram error: {e}"))
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
        let msg = self
            .bot
            .send_message(Self::tg_chat(chat_id), text.to_string())
            .await
            .map_err(Self::map_err)?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        })
    }

    async fn copy_message(&self, chat_id: ChatId, source: MessageRef) -> Result<MessageRef> {
        let id = self
            .bot
            .copy_message(
                Self::tg_chat(chat_id),
                Self::tg_chat(source.chat_id),
                Self::tg_msg_id(source.message_id),
            )
            .await
            .map_err(Self::map_err)?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(id.0),
        })
    }
}
