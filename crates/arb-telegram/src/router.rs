use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use arb_core::{
    admins::AdminRegistry, config::Config, messaging::port::MessagingPort,
    router::MessageRouter,
};

use crate::handlers;
use crate::TelegramMessenger;

/// Long-poll Telegram and route every message through the core router.
///
/// Returns when the dispatcher stops (Ctrl-C).
pub async fn run_polling(cfg: Arc<Config>, admins: Arc<AdminRegistry>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    // Basic startup info.
    match bot.get_me().await {
        Ok(me) => tracing::info!(username = %me.username(), "bot started"),
        Err(e) => tracing::warn!(error = %e, "get_me failed"),
    }
    tracing::info!(
        admins = admins.list().await.len(),
        admin_file = %admins.path().display(),
        "admin registry ready"
    );

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let router = Arc::new(MessageRouter::new(admins, messenger));

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![router])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    tracing::info!("dispatcher stopped");
    Ok(())
}
