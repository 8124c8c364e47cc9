use async_trait::async_trait;
use parking_lot::Mutex;

use crate::blacklist::BlacklistStore;
use crate::models::{Inbound, Target};
use crate::spam;
use crate::violations::ViolationTracker;

/// The operations the engine needs from the chat platform, and nothing else.
/// Implemented for teloxide in `message.rs` and mocked in tests.
#[async_trait]
pub trait ChatActions: Send + Sync {
    async fn delete_message(&self, chat_id: i64, message_id: i32) -> anyhow::Result<()>;
    async fn send_notice(&self, chat_id: i64, html: &str) -> anyhow::Result<()>;
    async fn ban_member(&self, chat_id: i64, user_id: u64) -> anyhow::Result<()>;
    async fn member_is_admin(&self, chat_id: i64, user_id: u64) -> anyhow::Result<bool>;
}

/// What the pipeline decided for one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Not a group message, or sent by a bot account.
    Skipped,
    /// Sender already blacklisted; message deleted silently.
    Blacklisted,
    /// Not spam, nothing to do.
    Clean,
    /// Spam, but the sender administers this chat.
    AdminExempt,
    /// Confirmed violation at or below the warning threshold.
    Warned(u32),
    /// Confirmed violation past the warning threshold.
    Banned(u32),
}

pub struct Engine {
    blacklist: Mutex<BlacklistStore>,
    violations: ViolationTracker,
    warn_limit: u32,
}

impl Engine {
    pub fn new(store: BlacklistStore, warn_limit: u32) -> Self {
        Self {
            blacklist: Mutex::new(store),
            violations: ViolationTracker::default(),
            warn_limit,
        }
    }

    /// Ordered decision pipeline, first matching branch wins:
    /// scope filter, blacklist short-circuit, classification, admin
    /// exemption, enforcement. Every transport call is best-effort; a failed
    /// delete, notice or ban is logged and never aborts the remaining steps.
    pub async fn moderate(&self, api: &dyn ChatActions, msg: &Inbound) -> Verdict {
        if !msg.is_group || msg.sender.is_bot {
            return Verdict::Skipped;
        }

        let sender = &msg.sender;
        let already_banned = {
            let bl = self.blacklist.lock();
            bl.contains(sender.id, sender.username.as_deref())
        };
        if already_banned {
            // Standing ban in effect: delete unconditionally, no counter,
            // no admin exemption, no repeat notice.
            self.delete(api, msg, "blacklisted").await;
            return Verdict::Blacklisted;
        }

        // Classification comes before the admin lookup so the dominant
        // clean-message path never touches the network.
        if !spam::is_spam(msg.text.as_deref()) {
            return Verdict::Clean;
        }

        if self.is_admin(api, msg.chat_id, sender.id).await {
            return Verdict::AdminExempt;
        }

        // Confirmed violation. State first, side effects after; nothing is
        // rolled back if a transport call fails.
        let count = self.violations.record(sender.id);
        self.delete(api, msg, "spam_detected").await;
        self.blacklist_add(&Target::from_sender(sender));

        let mention = sender.mention_html();
        if count <= self.warn_limit {
            let notice = format!(
                "{mention}, that was spam. You have been added to the blacklist."
            );
            self.notify(api, msg.chat_id, &notice).await;
            Verdict::Warned(count)
        } else {
            if let Err(e) = api.ban_member(msg.chat_id, sender.id).await {
                log::warn!("failed to ban user {} in chat {}: {e:#}", sender.id, msg.chat_id);
            }
            let notice = format!("{mention} has been banned for repeated spam.");
            self.notify(api, msg.chat_id, &notice).await;
            Verdict::Banned(count)
        }
    }

    /// Admin policy gate. Any lookup failure counts as "not an admin": an
    /// unknown identity is never exempt from enforcement.
    pub async fn is_admin(&self, api: &dyn ChatActions, chat_id: i64, user_id: u64) -> bool {
        match api.member_is_admin(chat_id, user_id).await {
            Ok(is_admin) => is_admin,
            Err(e) => {
                log::debug!("admin lookup failed for {user_id} in chat {chat_id}: {e:#}");
                false
            }
        }
    }

    /// Adds a target to the blacklist and persists. Returns false if the
    /// target was already fully present (no mutation, no save).
    pub fn blacklist_add(&self, target: &Target) -> bool {
        let mut bl = self.blacklist.lock();
        let changed = bl.add(target);
        if changed {
            Self::persist(&bl);
        }
        changed
    }

    /// Removes a target from the blacklist and persists. Returns false if
    /// nothing matched; that case is reported to the caller, not an error.
    pub fn blacklist_remove(&self, target: &Target) -> bool {
        let mut bl = self.blacklist.lock();
        let found = bl.remove(target);
        if found {
            Self::persist(&bl);
        }
        found
    }

    pub fn blacklist_snapshot(&self) -> (Vec<u64>, Vec<String>) {
        self.blacklist.lock().snapshot()
    }

    fn persist(bl: &BlacklistStore) {
        // In-memory state stays authoritative when the write fails; the
        // worst case is losing the latest mutation across a restart.
        if let Err(e) = bl.save() {
            log::error!("failed to persist blacklist: {e}");
        }
    }

    async fn delete(&self, api: &dyn ChatActions, msg: &Inbound, reason: &str) {
        match api.delete_message(msg.chat_id, msg.message_id).await {
            Ok(()) => log::info!(
                "[DEL] {} | {} | {}",
                msg.sender.id,
                reason,
                msg.text.as_deref().unwrap_or("")
            ),
            Err(e) => log::warn!(
                "failed to delete message {} in chat {}: {e:#}",
                msg.message_id,
                msg.chat_id
            ),
        }
    }

    async fn notify(&self, api: &dyn ChatActions, chat_id: i64, html: &str) {
        if let Err(e) = api.send_notice(chat_id, html).await {
            log::warn!("failed to send notice to chat {chat_id}: {e:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sender;
    use std::sync::Mutex as StdMutex;

    #[derive(Debug, PartialEq)]
    enum Call {
        Delete(i64, i32),
        Notice(String),
        Ban(i64, u64),
    }

    #[derive(Default)]
    struct MockApi {
        admins: Vec<u64>,
        fail_all: bool,
        calls: StdMutex<Vec<Call>>,
    }

    impl MockApi {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().drain(..).collect()
        }
    }

    #[async_trait]
    impl ChatActions for MockApi {
        async fn delete_message(&self, chat_id: i64, message_id: i32) -> anyhow::Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Delete(chat_id, message_id));
            if self.fail_all {
                anyhow::bail!("delete failed");
            }
            Ok(())
        }

        async fn send_notice(&self, _chat_id: i64, html: &str) -> anyhow::Result<()> {
            self.calls.lock().unwrap().push(Call::Notice(html.into()));
            if self.fail_all {
                anyhow::bail!("send failed");
            }
            Ok(())
        }

        async fn ban_member(&self, chat_id: i64, user_id: u64) -> anyhow::Result<()> {
            self.calls.lock().unwrap().push(Call::Ban(chat_id, user_id));
            if self.fail_all {
                anyhow::bail!("ban failed");
            }
            Ok(())
        }

        async fn member_is_admin(&self, _chat_id: i64, user_id: u64) -> anyhow::Result<bool> {
            if self.fail_all {
                anyhow::bail!("lookup failed");
            }
            Ok(self.admins.contains(&user_id))
        }
    }

    fn engine() -> (Engine, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = BlacklistStore::load(dir.path().join("blacklist.json"));
        (Engine::new(store, 2), dir)
    }

    fn spam_msg(user_id: u64) -> Inbound {
        Inbound {
            chat_id: -100,
            message_id: 10,
            is_group: true,
            sender: Sender {
                id: user_id,
                username: Some("spammer".into()),
                display_name: "Spammer".into(),
                is_bot: false,
            },
            text: Some("Ищу помощников для онлайн-работы, доход: от $500".into()),
        }
    }

    #[tokio::test]
    async fn clean_message_passes_through() {
        let (engine, _dir) = engine();
        let api = MockApi::default();
        let mut msg = spam_msg(1);
        msg.text = Some("See you at the park tomorrow".into());

        assert_eq!(engine.moderate(&api, &msg).await, Verdict::Clean);
        assert!(api.calls().is_empty());
        assert_eq!(engine.blacklist_snapshot(), (vec![], vec![]));
    }

    #[tokio::test]
    async fn non_group_and_bot_senders_are_skipped() {
        let (engine, _dir) = engine();
        let api = MockApi::default();

        let mut private = spam_msg(1);
        private.is_group = false;
        assert_eq!(engine.moderate(&api, &private).await, Verdict::Skipped);

        let mut from_bot = spam_msg(2);
        from_bot.sender.is_bot = true;
        assert_eq!(engine.moderate(&api, &from_bot).await, Verdict::Skipped);

        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn first_offense_deletes_blacklists_and_warns() {
        let (engine, _dir) = engine();
        let api = MockApi::default();
        let msg = spam_msg(42);

        assert_eq!(engine.moderate(&api, &msg).await, Verdict::Warned(1));

        let calls = api.calls();
        assert_eq!(calls[0], Call::Delete(-100, 10));
        match &calls[1] {
            Call::Notice(text) => assert!(text.contains("blacklist")),
            other => panic!("expected warning notice, got {other:?}"),
        }
        assert_eq!(
            engine.blacklist_snapshot(),
            (vec![42], vec!["spammer".into()])
        );
    }

    #[tokio::test]
    async fn blacklisted_sender_is_deleted_silently_even_if_admin() {
        let (engine, _dir) = engine();
        let api = MockApi {
            admins: vec![42],
            ..MockApi::default()
        };
        engine.blacklist_add(&Target::Id(42));

        let msg = spam_msg(42);
        assert_eq!(engine.moderate(&api, &msg).await, Verdict::Blacklisted);
        assert_eq!(api.calls(), vec![Call::Delete(-100, 10)]);
    }

    #[tokio::test]
    async fn blacklisted_sender_is_deleted_regardless_of_content() {
        let (engine, _dir) = engine();
        let api = MockApi::default();
        engine.blacklist_add(&Target::Id(42));

        let mut msg = spam_msg(42);
        msg.text = Some("See you at the park tomorrow".into());
        assert_eq!(engine.moderate(&api, &msg).await, Verdict::Blacklisted);
        assert_eq!(api.calls(), vec![Call::Delete(-100, 10)]);
    }

    #[tokio::test]
    async fn blacklist_matches_rotated_handle() {
        let (engine, _dir) = engine();
        let api = MockApi::default();
        engine.blacklist_add(&Target::Handle("spammer".into()));

        // Different numeric id, same handle.
        let msg = spam_msg(777);
        assert_eq!(engine.moderate(&api, &msg).await, Verdict::Blacklisted);
    }

    #[tokio::test]
    async fn admin_spam_is_fully_exempt() {
        let (engine, _dir) = engine();
        let api = MockApi {
            admins: vec![42],
            ..MockApi::default()
        };

        let msg = spam_msg(42);
        assert_eq!(engine.moderate(&api, &msg).await, Verdict::AdminExempt);
        assert!(api.calls().is_empty());
        assert_eq!(engine.blacklist_snapshot(), (vec![], vec![]));
    }

    #[tokio::test]
    async fn escalates_to_ban_past_warn_limit() {
        let (engine, _dir) = engine();
        let api = MockApi::default();
        let msg = spam_msg(42);
        let target = Target::from_sender(&msg.sender);

        assert_eq!(engine.moderate(&api, &msg).await, Verdict::Warned(1));
        api.calls();

        // Repeat offenses are only reachable after an admin unbans.
        assert!(engine.blacklist_remove(&target));
        assert_eq!(engine.moderate(&api, &msg).await, Verdict::Warned(2));
        api.calls();

        assert!(engine.blacklist_remove(&target));
        assert_eq!(engine.moderate(&api, &msg).await, Verdict::Banned(3));
        let calls = api.calls();
        assert_eq!(calls[0], Call::Delete(-100, 10));
        assert_eq!(calls[1], Call::Ban(-100, 42));
        match &calls[2] {
            Call::Notice(text) => assert!(text.contains("banned")),
            other => panic!("expected ban notice, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn admin_lookup_failure_is_fail_closed() {
        let (engine, _dir) = engine();
        // Every transport call fails, including the admin lookup for a user
        // who would otherwise be exempt.
        let api = MockApi {
            admins: vec![42],
            fail_all: true,
            ..MockApi::default()
        };

        let msg = spam_msg(42);
        assert_eq!(engine.moderate(&api, &msg).await, Verdict::Warned(1));
    }

    #[tokio::test]
    async fn transport_failures_never_roll_back_state() {
        let (engine, _dir) = engine();
        let api = MockApi {
            fail_all: true,
            ..MockApi::default()
        };

        let msg = spam_msg(42);
        assert_eq!(engine.moderate(&api, &msg).await, Verdict::Warned(1));
        assert_eq!(
            engine.blacklist_snapshot(),
            (vec![42], vec!["spammer".into()])
        );
    }

    #[tokio::test]
    async fn remove_reports_not_found_without_changes() {
        let (engine, _dir) = engine();
        engine.blacklist_add(&Target::Id(1));

        assert!(!engine.blacklist_remove(&Target::Id(2)));
        assert_eq!(engine.blacklist_snapshot(), (vec![1], vec![]));
    }
}
