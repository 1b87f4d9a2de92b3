#![forbid(clippy::unwrap_used)]
#![forbid(unsafe_code)]
#![forbid(clippy::expect_used)]
#![forbid(clippy::panic)]

use bot::api::{ApiClient, BotApi};
use bot::config::BotConfig;
use bot::dispatcher::Dispatcher;
use bot::telegram::{AnswerCallbackQuery, GetUpdates, TelegramClient, Update};
use bot::updates::{self, ChatUpdate};
use clap::Parser;
use kanau::processor::Processor;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const RETRY_DELAY: Duration = Duration::from_secs(5);
const PURGE_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Parser)]
#[command(name = "delivery-bot", about = "Telegram front end of the delivery shop")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, env = "BOT_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = BotConfig::load(cli.config.as_deref())?;
    framework::telemetry::init(&config.log);
    info!(api = %config.api_base_url, mode = ?config.mode, "starting");

    let telegram = TelegramClient::new(&config)?;
    let dispatcher = Dispatcher::new(ApiClient::new(&config)?, &config);

    let shutdown = framework::shutdown::signal();
    tokio::pin!(shutdown);
    let mut purge = tokio::time::interval(PURGE_INTERVAL);
    let mut offset = None;
    loop {
        tokio::select! {
            () = &mut shutdown => break,
            _ = purge.tick() => {
                let purged = dispatcher.sessions().purge_expired(Instant::now());
                debug!(purged, live = dispatcher.sessions().len(), "idle sessions purged");
            }
            // Dropping a poll mid-flight is fine: nothing is acknowledged until the offset moves.
            polled = telegram.process(GetUpdates::long_poll(offset, config.poll_timeout_secs)) => {
                match polled {
                    Ok(batch) => {
                        for update in batch {
                            offset = Some(update.update_id + 1);
                            serve(&telegram, &dispatcher, update).await;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "polling failed, retrying");
                        tokio::time::sleep(RETRY_DELAY).await;
                    }
                }
            }
        }
    }
    info!("stopped");
    Ok(())
}

/// Chats are served one update at a time, in order.
async fn serve<A: BotApi>(telegram: &TelegramClient, dispatcher: &Dispatcher<A>, update: Update) {
    let Some(ChatUpdate {
        chat_id,
        callback_id,
        incoming,
    }) = ChatUpdate::from_update(update)
    else {
        return;
    };
    if let Some(callback_query_id) = callback_id {
        if let Err(e) = telegram
            .process(AnswerCallbackQuery { callback_query_id })
            .await
        {
            warn!(chat_id, error = %e, "could not acknowledge button");
        }
    }
    let outgoing = updates::handle(dispatcher, chat_id, incoming).await;
    if let Err(e) = telegram.process(outgoing.into_message(chat_id)).await {
        warn!(chat_id, error = %e, "could not send reply");
    }
}
