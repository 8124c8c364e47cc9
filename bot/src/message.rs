use std::sync::Arc;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{MessageId, ParseMode};

use crate::engine::{ChatActions, Engine, Verdict};
use crate::models::{Inbound, Sender};

/// teloxide-backed implementation of the engine's transport trait.
pub struct TelegramApi {
    bot: Bot,
}

impl TelegramApi {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl ChatActions for TelegramApi {
    async fn delete_message(&self, chat_id: i64, message_id: i32) -> anyhow::Result<()> {
        self.bot
            .delete_message(ChatId(chat_id), MessageId(message_id))
            .await?;
        Ok(())
    }

    async fn send_notice(&self, chat_id: i64, html: &str) -> anyhow::Result<()> {
        self.bot
            .send_message(ChatId(chat_id), html)
            .parse_mode(ParseMode::Html)
            .await?;
        Ok(())
    }

    async fn ban_member(&self, chat_id: i64, user_id: u64) -> anyhow::Result<()> {
        self.bot
            .ban_chat_member(ChatId(chat_id), UserId(user_id))
            .await?;
        Ok(())
    }

    async fn member_is_admin(&self, chat_id: i64, user_id: u64) -> anyhow::Result<bool> {
        let member = self
            .bot
            .get_chat_member(ChatId(chat_id), UserId(user_id))
            .await?;
        Ok(member.is_privileged())
    }
}

fn inbound_from(msg: &Message) -> Option<Inbound> {
    let user = msg.from()?;
    Some(Inbound {
        chat_id: msg.chat.id.0,
        message_id: msg.id.0,
        is_group: msg.chat.is_group() || msg.chat.is_supergroup(),
        sender: Sender {
            id: user.id.0,
            username: user.username.clone(),
            display_name: user.first_name.clone(),
            is_bot: user.is_bot,
        },
        text: msg.text().or_else(|| msg.caption()).map(str::to_owned),
    })
}

pub async fn handle_message(bot: Bot, engine: Arc<Engine>, msg: Message) -> ResponseResult<()> {
    let inbound = match inbound_from(&msg) {
        Some(inbound) => inbound,
        None => return Ok(()),
    };

    let api = TelegramApi::new(bot);
    match engine.moderate(&api, &inbound).await {
        Verdict::Skipped | Verdict::Clean => {}
        verdict => log::info!(
            "moderation outcome for user {} in chat {}: {:?}",
            inbound.sender.id,
            inbound.chat_id,
            verdict
        ),
    }

    Ok(())
}
