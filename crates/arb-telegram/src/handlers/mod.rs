//! Telegram update handlers.
//!
//! The adapter only extracts ids and text from the teloxide message; everything
//! else happens in the `arb-core` router.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use arb_core::{
    domain::{ChatId, MessageId, UserId},
    messaging::types::{Envelope, IncomingUpdate},
    router::MessageRouter,
};

pub async fn handle_message(msg: Message, router: Arc<MessageRouter>) -> ResponseResult<()> {
    let Some(update) = to_update(&msg) else {
        tracing::debug!(chat_id = msg.chat.id.0, "skipping message without sender");
        return Ok(());
    };

    // Relay tasks run on their own; the dispatcher can move on.
    let _fanout = router.handle(update).await;
    Ok(())
}

fn to_update(msg: &Message) -> Option<IncomingUpdate> {
    let user = msg.from()?;
    let envelope = Envelope {
        chat_id: ChatId(msg.chat.id.0),
        user_id: UserId(user.id.0 as i64),
        message_id: MessageId(msg.id.0),
    };
    Some(IncomingUpdate::classify(envelope, msg.text()))
}
