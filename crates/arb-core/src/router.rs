use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::{
    admins::AdminRegistry,
    domain::UserId,
    messaging::{
        port::MessagingPort,
        types::{Command, Envelope, IncomingUpdate, TextMessage},
    },
};

pub const GREETING: &str = "Ask your question and an administrator will get back to you.";
pub const QUESTION_RECEIVED: &str = "Question received, we'll answer soon!";
pub const INSUFFICIENT_RIGHTS: &str = "Insufficient rights";
pub const ADMIN_ADDED: &str = "Administrator added";
pub const ADMIN_REMOVED: &str = "Administrator removed";
pub const INVALID_ID_ADD: &str = "Could not add administrator: invalid id";
pub const INVALID_ID_REMOVE: &str = "Could not remove administrator: invalid id";
pub const NEW_QUESTION_NOTICE: &str = "New anonymous question:";

/// Outbound relay tasks spawned for one update.
///
/// Handlers never wait on these; tests (and shutdown paths) can.
#[derive(Default)]
pub struct Fanout {
    handles: Vec<JoinHandle<()>>,
}

impl Fanout {
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every relay task. Failures were already logged by the task.
    pub async fn join(self) {
        for h in self.handles {
            let _ = h.await;
        }
    }
}

/// Dispatches inbound updates to the admin commands or the relay path.
#[derive(Clone)]
pub struct MessageRouter {
    admins: Arc<AdminRegistry>,
    messenger: Arc<dyn MessagingPort>,
}

impl MessageRouter {
    pub fn new(admins: Arc<AdminRegistry>, messenger: Arc<dyn MessagingPort>) -> Self {
        Self { admins, messenger }
    }

    pub fn admins(&self) -> &Arc<AdminRegistry> {
        &self.admins
    }

    pub async fn handle(&self, update: IncomingUpdate) -> Fanout {
        match update {
            IncomingUpdate::Command(cmd) => {
                self.handle_command(cmd).await;
                Fanout::default()
            }
            IncomingUpdate::Text(msg) => self.relay(msg).await,
            IncomingUpdate::Other(env) => {
                tracing::debug!(chat_id = env.chat_id.0, "ignoring non-text message");
                Fanout::default()
            }
        }
    }

    async fn handle_command(&self, cmd: Command) {
        match cmd.name.as_str() {
            "start" => self.reply(&cmd.envelope, GREETING).await,
            "list" => self.list(&cmd).await,
            "mod" => self.add_admin(&cmd).await,
            "unmod" => self.remove_admin(&cmd).await,
            other => {
                tracing::debug!(command = other, "skipping unknown command");
            }
        }
    }

    async fn list(&self, cmd: &Command) {
        if !self.authorize(&cmd.envelope).await {
            return;
        }

        let admins = self.admins.list().await;
        self.reply(&cmd.envelope, &format_admin_list(&admins)).await;
    }

    async fn add_admin(&self, cmd: &Command) {
        if !self.authorize(&cmd.envelope).await {
            return;
        }

        match parse_target(cmd) {
            Some(target) => {
                self.admins.add(target).await;
                self.reply(&cmd.envelope, ADMIN_ADDED).await;
            }
            None => self.reply(&cmd.envelope, INVALID_ID_ADD).await,
        }
    }

    async fn remove_admin(&self, cmd: &Command) {
        if !self.authorize(&cmd.envelope).await {
            return;
        }

        // Unlike `mod`, the target must already be an admin.
        let target = match parse_target(cmd) {
            Some(t) if self.admins.is_member(t).await => t,
            _ => {
                self.reply(&cmd.envelope, INVALID_ID_REMOVE).await;
                return;
            }
        };

        self.admins.remove(target).await;
        self.reply(&cmd.envelope, ADMIN_REMOVED).await;
    }

    /// Replies with the denial message when the sender is not an admin.
    async fn authorize(&self, env: &Envelope) -> bool {
        if self.admins.is_member(env.user_id).await {
            return true;
        }
        tracing::info!(user_id = env.user_id.0, "unauthorized admin command");
        self.reply(env, INSUFFICIENT_RIGHTS).await;
        false
    }

    /// Copy a freeform message to every admin, then acknowledge the sender.
    async fn relay(&self, msg: TextMessage) -> Fanout {
        let source = msg.envelope.message_ref();
        let admins = self.admins.list().await;

        let handles = admins
            .into_iter()
            .map(|admin| {
                let messenger = self.messenger.clone();
                tracing::info!(
                    admin_id = admin.0,
                    chat_id = source.chat_id.0,
                    "forwarding message to admin"
                );
                tokio::spawn(async move {
                    let target = admin.private_chat();
                    if let Err(e) = messenger.send_text(target, NEW_QUESTION_NOTICE).await {
                        tracing::warn!(admin_id = admin.0, error = %e, "failed to notify admin");
                    }
                    if let Err(e) = messenger.copy_message(target, source).await {
                        tracing::error!(
                            admin_id = admin.0,
                            error = %e,
                            "failed to forward message to admin"
                        );
                    }
                })
            })
            .collect();

        self.reply(&msg.envelope, QUESTION_RECEIVED).await;
        Fanout { handles }
    }

    async fn reply(&self, env: &Envelope, text: &str) {
        if let Err(e) = self.messenger.send_text(env.chat_id, text).await {
            tracing::warn!(chat_id = env.chat_id.0, error = %e, "failed to reply");
        }
    }
}

fn parse_target(cmd: &Command) -> Option<UserId> {
    cmd.first_arg()?.parse::<i64>().ok().map(UserId)
}

/// `Administrators:` followed by `N. <id>` lines, numbered from 1.
pub fn format_admin_list(admins: &[UserId]) -> String {
    let mut out = String::from("Administrators:\n");
    for (idx, admin) in admins.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", idx + 1, admin));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{ChatId, MessageId, MessageRef},
        errors::Error,
        Result,
    };
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    static COUNTER: AtomicUsize = AtomicUsize::new(0);

    #[derive(Clone, Debug, PartialEq, Eq)]
    enum Sent {
        Text(ChatId, String),
        Copy(ChatId, MessageRef),
    }

    #[derive(Default)]
    struct FakeMessenger {
        sent: Mutex<Vec<Sent>>,
        failing: HashSet<i64>,
    }

    impl FakeMessenger {
        fn failing(chats: &[i64]) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                failing: chats.iter().copied().collect(),
            }
        }

        fn sent(&self) -> Vec<Sent> {
            self.sent.lock().unwrap().clone()
        }

        fn texts_to(&self, chat: i64) -> Vec<String> {
            self.sent()
                .into_iter()
                .filter_map(|s| match s {
                    Sent::Text(c, t) if c.0 == chat => Some(t),
                    _ => None,
                })
                .collect()
        }

        fn copies(&self) -> Vec<(ChatId, MessageRef)> {
            self.sent()
                .into_iter()
                .filter_map(|s| match s {
                    Sent::Copy(c, m) => Some((c, m)),
                    _ => None,
                })
                .collect()
        }

        fn check(&self, chat_id: ChatId) -> Result<MessageRef> {
            if self.failing.contains(&chat_id.0) {
                return Err(Error::External("telegram error: chat not found".to_string()));
            }
            Ok(MessageRef {
                chat_id,
                message_id: MessageId(1),
            })
        }
    }

    #[async_trait]
    impl MessagingPort for FakeMessenger {
        async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
            self.sent
                .lock()
                .unwrap()
                .push(Sent::Text(chat_id, text.to_string()));
            self.check(chat_id)
        }

        async fn copy_message(&self, chat_id: ChatId, source: MessageRef) -> Result<MessageRef> {
            self.sent.lock().unwrap().push(Sent::Copy(chat_id, source));
            self.check(chat_id)
        }
    }

    fn registry(admins: &[i64]) -> Arc<AdminRegistry> {
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        let dir: PathBuf =
            std::env::temp_dir().join(format!("arb-router-{}-{n}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let seed: Vec<UserId> = admins.iter().copied().map(UserId).collect();
        Arc::new(AdminRegistry::load(dir.join("admin.json"), &seed))
    }

    fn setup(admins: &[i64], failing: &[i64]) -> (MessageRouter, Arc<FakeMessenger>) {
        let messenger = Arc::new(FakeMessenger::failing(failing));
        let router = MessageRouter::new(registry(admins), messenger.clone());
        (router, messenger)
    }

    fn update(user: i64, text: &str) -> IncomingUpdate {
        IncomingUpdate::classify(
            Envelope {
                chat_id: ChatId(user),
                user_id: UserId(user),
                message_id: MessageId(77),
            },
            Some(text),
        )
    }

    async fn admin_ids(router: &MessageRouter) -> Vec<i64> {
        router.admins().list().await.into_iter().map(|a| a.0).collect()
    }

    #[tokio::test]
    async fn start_replies_with_greeting_to_anyone() {
        let (router, messenger) = setup(&[111], &[]);
        router.handle(update(5, "/start")).await.join().await;
        assert_eq!(messenger.texts_to(5), vec![GREETING.to_string()]);
    }

    #[tokio::test]
    async fn freeform_text_is_copied_to_every_admin_and_acknowledged() {
        let (router, messenger) = setup(&[111, 222], &[]);

        let fanout = router.handle(update(5, "how do I pray?")).await;
        assert_eq!(fanout.len(), 2);
        fanout.join().await;

        let source = MessageRef {
            chat_id: ChatId(5),
            message_id: MessageId(77),
        };
        let mut copies = messenger.copies();
        copies.sort_by_key(|(c, _)| c.0);
        assert_eq!(copies, vec![(ChatId(111), source), (ChatId(222), source)]);
        assert_eq!(messenger.texts_to(111), vec![NEW_QUESTION_NOTICE.to_string()]);
        assert_eq!(messenger.texts_to(5), vec![QUESTION_RECEIVED.to_string()]);
    }

    #[tokio::test]
    async fn failed_forward_does_not_block_other_admins_or_ack() {
        let (router, messenger) = setup(&[111, 222], &[111]);

        router.handle(update(5, "hello")).await.join().await;

        let targets: HashSet<i64> = messenger.copies().iter().map(|(c, _)| c.0).collect();
        assert_eq!(targets, HashSet::from([111, 222]));
        assert_eq!(messenger.copies().len(), 2);
        assert_eq!(messenger.texts_to(5), vec![QUESTION_RECEIVED.to_string()]);
    }

    #[tokio::test]
    async fn relay_with_no_admins_still_acknowledges() {
        let (router, messenger) = setup(&[], &[]);
        let fanout = router.handle(update(5, "anyone?")).await;
        assert!(fanout.is_empty());
        assert_eq!(messenger.texts_to(5), vec![QUESTION_RECEIVED.to_string()]);
    }

    #[tokio::test]
    async fn non_admin_cannot_run_privileged_commands() {
        let (router, messenger) = setup(&[111], &[]);

        for text in ["/list", "/mod 555", "/unmod 555", "/unmod 111"] {
            router.handle(update(5, text)).await;
        }

        assert_eq!(
            messenger.texts_to(5),
            vec![INSUFFICIENT_RIGHTS.to_string(); 4]
        );
        assert_eq!(admin_ids(&router).await, vec![111]);
    }

    #[tokio::test]
    async fn admin_lists_admins_one_indexed() {
        let (router, messenger) = setup(&[111, 222], &[]);
        router.handle(update(111, "/list")).await;
        assert_eq!(
            messenger.texts_to(111),
            vec!["Administrators:\n1. 111\n2. 222\n".to_string()]
        );
    }

    #[tokio::test]
    async fn admin_adds_admin() {
        let (router, messenger) = setup(&[111], &[]);
        router.handle(update(111, "/mod 555")).await;
        router.handle(update(111, "/mod 555")).await;

        assert_eq!(admin_ids(&router).await, vec![111, 555]);
        assert_eq!(
            messenger.texts_to(111),
            vec![ADMIN_ADDED.to_string(), ADMIN_ADDED.to_string()]
        );
    }

    #[tokio::test]
    async fn mod_with_bad_argument_is_rejected() {
        let (router, messenger) = setup(&[111], &[]);
        router.handle(update(111, "/mod abc")).await;
        router.handle(update(111, "/mod")).await;

        assert_eq!(admin_ids(&router).await, vec![111]);
        assert_eq!(
            messenger.texts_to(111),
            vec![INVALID_ID_ADD.to_string(), INVALID_ID_ADD.to_string()]
        );
    }

    #[tokio::test]
    async fn admin_removes_admin() {
        let (router, messenger) = setup(&[111, 222], &[]);
        router.handle(update(111, "/unmod 222")).await;

        assert_eq!(admin_ids(&router).await, vec![111]);
        assert_eq!(messenger.texts_to(111), vec![ADMIN_REMOVED.to_string()]);
    }

    #[tokio::test]
    async fn unmod_of_non_admin_is_invalid_id() {
        let (router, messenger) = setup(&[111], &[]);
        router.handle(update(111, "/unmod 999")).await;
        router.handle(update(111, "/unmod xyz")).await;

        assert_eq!(admin_ids(&router).await, vec![111]);
        assert_eq!(
            messenger.texts_to(111),
            vec![INVALID_ID_REMOVE.to_string(), INVALID_ID_REMOVE.to_string()]
        );
    }

    #[tokio::test]
    async fn unknown_commands_and_media_are_ignored() {
        let (router, messenger) = setup(&[111], &[]);
        router.handle(update(5, "/help")).await;
        let fanout = router
            .handle(IncomingUpdate::Other(Envelope {
                chat_id: ChatId(5),
                user_id: UserId(5),
                message_id: MessageId(1),
            }))
            .await;

        assert!(fanout.is_empty());
        assert!(messenger.sent().is_empty());
    }

    #[test]
    fn admin_list_format_is_one_indexed() {
        assert_eq!(
            format_admin_list(&[UserId(7), UserId(8)]),
            "Administrators:\n1. 7\n2. 8\n"
        );
        assert_eq!(format_admin_list(&[]), "Administrators:\n");
    }
}
