//! # Main Entry Point
//!
//! Wires the survey bot together:
//! - Domain: Configuration and Types
//! - Infrastructure: Matrix, Logging
//! - Application: Router, Engine, Store, Stats
//!

mod application;
mod domain;
mod infrastructure;
mod strings;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use matrix_sdk::{
    Client,
    config::SyncSettings,
    room::Room,
    ruma::events::room::{
        member::{MembershipState, StrippedRoomMemberEvent},
        message::OriginalSyncRoomMessageEvent,
    },
};
use std::path::PathBuf;
use std::sync::Arc;

use crate::application::engine::ConversationEngine;
use crate::application::router::MessageRouter;
use crate::application::stats::StatReporter;
use crate::application::store::{ChatStore, LoadMode};
use crate::domain::config::AppConfig;
use crate::domain::error::StoreError;
use crate::infrastructure::matrix::MatrixService;

#[derive(Parser, Debug)]
#[command(name = "survey-bot", about = "Chat survey bot")]
struct Cli {
    /// Path to the configuration file
    #[arg(long, default_value = "data/config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Connect to Matrix and run the survey (default)
    Run,
    /// Print the statistics report from the chats file and exit
    Stats {
        /// Number of most recent registrations to list
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Load Configuration
    let config = AppConfig::load(&cli.config)?;

    // 2. Logging Setup
    let _guard = infrastructure::logging::init(&config.logging)?;
    tracing::info!("Starting survey bot...");

    let command = cli.command.unwrap_or(Command::Run);

    // 3. Load Chats (reporting never moves a corrupt file aside)
    let mode = match command {
        Command::Run => LoadMode::Quarantine,
        Command::Stats { .. } => LoadMode::ReadOnly,
    };
    let store = Arc::new(ChatStore::new(config.survey.chats_file.clone()));
    match store.load(mode).await {
        Ok(_) => {}
        Err(e @ (StoreError::Corrupt { .. } | StoreError::Unparseable { .. })) => {
            tracing::warn!("{}; starting with an empty store", e);
        }
        Err(e) => tracing::error!("Failed to load chats: {}; starting with an empty store", e),
    }

    tracing::info!(
        "{} chats registered, {} administrators configured",
        store.len().await,
        config.survey.admin_users.len()
    );

    match command {
        Command::Stats { limit } => {
            let records = store.snapshot().await;
            let limit = limit.unwrap_or(config.survey.stats_limit);
            println!("{}", StatReporter::summarize(&records, limit));
            Ok(())
        }
        Command::Run => run(config, store).await,
    }
}

async fn run(config: AppConfig, store: Arc<ChatStore>) -> Result<()> {
    let router = Arc::new(MessageRouter::new(
        store.clone(),
        ConversationEngine::new(config.survey.admin_users.clone()),
        config.survey.timezone(),
        config.survey.stats_limit,
    ));

    // 4. Matrix Setup
    let matrix = &config.services.matrix;
    let client = Client::builder()
        .homeserver_url(&matrix.homeserver)
        .build()
        .await
        .context("Failed to build Matrix client")?;

    client
        .matrix_auth()
        .login_username(&matrix.username, &matrix.password)
        .send()
        .await
        .context("Matrix login failed")?;
    tracing::info!("Logged in as {}", matrix.username);

    if let Some(name) = &matrix.display_name
        && let Err(e) = client.account().set_display_name(Some(name.as_str())).await
    {
        tracing::warn!("Failed to set display name: {}", e);
    }

    // 5. Event Handlers
    let start_time = std::time::SystemTime::now();
    client.add_event_handler(move |ev: OriginalSyncRoomMessageEvent, room: Room| {
        let router = router.clone();
        async move {
            // Ignore history replayed by the initial sync
            let event_time = std::time::UNIX_EPOCH
                + std::time::Duration::from_millis(ev.origin_server_ts.get().into());
            if event_time < start_time {
                return;
            }
            if room.client().user_id() == Some(&*ev.sender) {
                return;
            }

            let chat = MatrixService::new(room);
            let Some(event) = chat.inbound_event(&ev).await else {
                return;
            };
            if let Err(e) = router.route(&chat, event).await {
                tracing::error!("Failed to route message: {}", e);
            }
        }
    });

    client.add_event_handler(|ev: StrippedRoomMemberEvent, room: Room| async move {
        if ev.content.membership == MembershipState::Invite {
            tracing::info!("Received invite for room {}", room.room_id());
            if let Err(e) = room.join().await {
                tracing::error!("Failed to join room after invite: {}", e);
            }
        }
    });

    // 6. Sync until Ctrl-C
    tokio::select! {
        res = client.sync(SyncSettings::default()) => {
            if let Err(e) = res {
                tracing::error!("Sync loop failed: {}", e);
            }
        }
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                tracing::error!("Unable to listen for shutdown signal: {}", e);
            }
        }
    }

    tracing::info!("{}", strings::logs::SHUTDOWN);
    if let Err(e) = store.save_all().await {
        tracing::error!("Failed to save chats on shutdown: {}", e);
    }
    Ok(())
}
