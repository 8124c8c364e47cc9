use serde::{Deserialize, Serialize};

/// On-disk shape of the blacklist file. Field names match the historical
/// format so files written by earlier deployments keep loading.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct BlacklistData {
    #[serde(default)]
    pub user_ids: Vec<u64>,
    #[serde(default)]
    pub usernames: Vec<String>,
}

/// The author of an inbound message, as reported by the transport.
#[derive(Debug, Clone)]
pub struct Sender {
    pub id: u64,
    pub username: Option<String>,
    pub display_name: String,
    pub is_bot: bool,
}

impl Sender {
    /// Clickable HTML mention, used in warning and ban notices.
    pub fn mention_html(&self) -> String {
        format!(
            "<a href=\"tg://user?id={}\">{}</a>",
            self.id,
            teloxide::utils::html::escape(&self.display_name)
        )
    }
}

/// Transport-independent view of one inbound message event.
#[derive(Debug, Clone)]
pub struct Inbound {
    pub chat_id: i64,
    pub message_id: i32,
    pub is_group: bool,
    pub sender: Sender,
    /// Message text or caption, whichever is present.
    pub text: Option<String>,
}

/// A blacklist target named by an administrative command: a bare numeric id,
/// a bare handle, or a full identity taken from a replied-to message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Id(u64),
    Handle(String),
    User { id: u64, handle: Option<String> },
}

impl Target {
    pub fn from_sender(sender: &Sender) -> Self {
        Target::User {
            id: sender.id,
            handle: sender.username.as_deref().map(str::to_lowercase),
        }
    }
}
