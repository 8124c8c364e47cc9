use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::User;
use teloxide::utils::command::BotCommands;

use crate::engine::{ChatActions, Engine};
use crate::message::TelegramApi;
use crate::models::Target;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "snake_case", description = "Moderation commands:")]
pub enum AdminCommand {
    #[command(description = "add a user to the blacklist: @handle, numeric id, or reply.")]
    AddBlacklist(String),
    #[command(description = "remove a user from the blacklist: @handle, numeric id, or reply.")]
    RemoveBlacklist(String),
    #[command(description = "show the current blacklist.")]
    Blacklist,
    #[command(description = "show this help.")]
    Help,
}

/// Resolves a command argument into a blacklist target: `@handle`, a bare
/// numeric id, or (with an empty argument) the sender of the replied-to
/// message. Anything else is reported back to the invoking admin verbatim.
fn parse_target(arg: &str, reply_sender: Option<&User>) -> Result<Target, &'static str> {
    let arg = arg.trim();

    if let Some(handle) = arg.strip_prefix('@') {
        if !handle.is_empty() {
            return Ok(Target::Handle(handle.to_lowercase()));
        }
    }

    if !arg.is_empty() {
        return match arg.parse::<u64>() {
            Ok(id) => Ok(Target::Id(id)),
            Err(_) => Err("Could not parse that as @handle or a numeric id."),
        };
    }

    if let Some(user) = reply_sender {
        return Ok(Target::User {
            id: user.id.0,
            handle: user.username.as_deref().map(str::to_lowercase),
        });
    }

    Err("Reply to the user's message, or pass @handle or a numeric id.")
}

fn render_blacklist(ids: &[u64], handles: &[String]) -> String {
    let ids = if ids.is_empty() {
        "—".to_string()
    } else {
        ids.iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    };
    let handles = if handles.is_empty() {
        "—".to_string()
    } else {
        handles
            .iter()
            .map(|h| format!("@{h}"))
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!("ID: {ids}\nUsername: {handles}")
}

/// Gate-then-mutate core of the command surface: checks the invoker through
/// the transport trait, applies the mutation, and returns the reply text.
/// Transport-agnostic so the whole decision is exercisable against a mock.
async fn run_command(
    engine: &Engine,
    api: &dyn ChatActions,
    chat_id: i64,
    invoker_id: u64,
    reply_sender: Option<&User>,
    cmd: AdminCommand,
) -> String {
    if !engine.is_admin(api, chat_id, invoker_id).await {
        return "Administrators only.".to_string();
    }

    match cmd {
        AdminCommand::AddBlacklist(arg) => match parse_target(&arg, reply_sender) {
            Ok(target) => {
                if engine.blacklist_add(&target) {
                    "Added to the blacklist.".to_string()
                } else {
                    "Already blacklisted.".to_string()
                }
            }
            Err(hint) => hint.to_string(),
        },
        AdminCommand::RemoveBlacklist(arg) => match parse_target(&arg, reply_sender) {
            Ok(target) => {
                if engine.blacklist_remove(&target) {
                    "Removed from the blacklist.".to_string()
                } else {
                    "Not found in the blacklist.".to_string()
                }
            }
            Err(hint) => hint.to_string(),
        },
        AdminCommand::Blacklist => {
            let (ids, handles) = engine.blacklist_snapshot();
            render_blacklist(&ids, &handles)
        }
        AdminCommand::Help => AdminCommand::descriptions().to_string(),
    }
}

pub async fn handle_command(
    bot: Bot,
    engine: Arc<Engine>,
    msg: Message,
    cmd: AdminCommand,
) -> ResponseResult<()> {
    let chat_id = msg.chat.id;
    let user = match msg.from() {
        Some(user) => user,
        None => {
            bot.send_message(chat_id, "Could not identify the sender.")
                .await?;
            return Ok(());
        }
    };

    let api = TelegramApi::new(bot.clone());
    let reply_sender = msg.reply_to_message().and_then(|m| m.from());
    let response = run_command(&engine, &api, chat_id.0, user.id.0, reply_sender, cmd).await;

    bot.send_message(chat_id, response)
        .reply_to_message_id(msg.id)
        .await?;
    Ok(())
}
