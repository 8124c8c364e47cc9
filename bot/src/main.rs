use teloxide::error_handlers::ErrorHandler;
use teloxide::{dispatching::UpdateFilterExt, prelude::*};

use futures_util::future::BoxFuture;
use std::sync::Arc;

mod admin;
mod blacklist;
mod config;
mod engine;
mod health;
mod message;
mod models;
mod spam;
mod violations;

use admin::AdminCommand;
use blacklist::BlacklistStore;
use config::Config;
use engine::Engine;

#[tokio::main(flavor = "multi_thread", worker_threads = 4)]
async fn main() {
    dotenv::dotenv().ok();
    pretty_env_logger::init();
    log::info!("starting moderation bot...");

    let config = Config::from_env();
    let store = BlacklistStore::load(&config.blacklist_file);
    let engine = Arc::new(Engine::new(store, config.warn_limit));

    tokio::spawn(health::serve(config.health_port));

    let bot = Bot::from_env();

    let engine_cmd = engine.clone();
    let engine_msg = engine.clone();

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<AdminCommand>()
                .endpoint(move |bot: Bot, msg: Message, cmd: AdminCommand| {
                    let engine = engine_cmd.clone();
                    async move {
                        if let Err(e) = admin::handle_command(bot, engine, msg, cmd).await {
                            log::warn!("admin command error: {:?}", e);
                        }
                        Ok::<(), teloxide::RequestError>(())
                    }
                }),
        )
        .branch(
            Update::filter_message().endpoint(move |bot: Bot, msg: Message| {
                let engine = engine_msg.clone();
                async move {
                    if let Err(e) = message::handle_message(bot, engine, msg).await {
                        log::debug!("message handling error: {:?}", e);
                    }
                    Ok::<(), teloxide::RequestError>(())
                }
            }),
        );

    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .error_handler(Arc::new(LoggingErrorHandler::new()))
        .build()
        .dispatch()
        .await;
}

use std::fmt::Debug;

struct LoggingErrorHandler;

impl LoggingErrorHandler {
    fn new() -> Self {
        Self
    }
}

impl<E> ErrorHandler<E> for LoggingErrorHandler
where
    E: Debug + Send + 'static,
{
    fn handle_error(self: Arc<Self>, error: E) -> BoxFuture<'static, ()> {
        Box::pin(async move {
            log::debug!("dispatcher error: {:?}", error);
        })
    }
}
