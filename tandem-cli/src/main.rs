use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use tandem_core::model::{CloseReason, ConnectionState, ParticipantId, ParticipantRecord, RoomId};
use tandem_rendezvous::RendezvousService;
use tandem_session::{
    RemoteStore, RoomCoordinator, SessionConfig, SessionHandle, SyntheticSource,
};

#[derive(Parser)]
#[command(name = "tandem")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a rendezvous node for two-party calls.
    Serve {
        /// Address to listen on.
        #[arg(long, default_value = "127.0.0.1:8787")]
        addr: String,
    },
    /// Start or join a call.
    Call {
        /// Store endpoint of a rendezvous node.
        #[arg(long, default_value = "ws://127.0.0.1:8787/store")]
        url: String,

        /// Room code handed over by the creator.
        #[arg(long, conflicts_with = "create")]
        room: Option<String>,

        /// Create a new room instead of joining one.
        #[arg(long)]
        create: bool,

        /// Display name shown to the peer.
        #[arg(long)]
        name: Option<String>,

        /// Stable participant id (random if omitted).
        #[arg(long)]
        identity: Option<Uuid>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    match Cli::parse().command {
        Commands::Serve { addr } => serve(addr).await,
        Commands::Call {
            url,
            room,
            create,
            name,
            identity,
        } => call(url, room, create, name, identity).await,
    }
}

fn init_tracing(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();
}

async fn serve(addr: String) -> Result<()> {
    init_tracing("info");

    println!("{}", "📡 Starting rendezvous node...".green().bold());
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    println!("   🛰  Store: {}", format!("ws://{addr}/store").cyan());

    RendezvousService::new().serve(listener).await?;
    Ok(())
}

async fn call(
    url: String,
    room: Option<String>,
    create: bool,
    name: Option<String>,
    identity: Option<Uuid>,
) -> Result<()> {
    init_tracing("warn");

    let store = Arc::new(
        RemoteStore::connect(&url)
            .await
            .with_context(|| format!("Failed to reach the store at {url}"))?,
    );
    let source = Arc::new(SyntheticSource::new());
    let mut config = SessionConfig::new(
        identity
            .map(ParticipantId)
            .unwrap_or_else(ParticipantId::new),
    );
    config.display_name = name;

    let handle = if create {
        println!("{}", "🎬 Creating a room...".cyan());
        RoomCoordinator::create(store, source, config).await?
    } else {
        let code = match room {
            Some(code) => code,
            None => dialoguer::Input::<String>::new()
                .with_prompt("Room code")
                .interact_text()
                .context("Failed to read the room code")?,
        };
        println!("{}", "🚪 Joining the room...".cyan());
        RoomCoordinator::join(store, source, RoomId(code), config).await?
    };

    println!(
        "{} {}",
        "🔑 Room code:".green().bold(),
        handle.room().to_string().yellow().bold()
    );
    println!("   {}", "Press Ctrl-C to hang up".dimmed());

    run_call(handle).await
}

/// Цикл звонка: печатает переходы состояния и ждет Ctrl-C.
async fn run_call(handle: SessionHandle) -> Result<()> {
    let mut state = handle.state();
    let mut peer = handle.peer();
    let mut peer_open = true;
    let mut last_peer: Option<ParticipantId> = None;

    print_state(&state.borrow());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("{}", "👋 Hanging up...".yellow());
                handle.leave().await;
                println!("{}", "✨ Call finished".green().bold());
                return Ok(());
            }

            changed = state.changed() => {
                let current = state.borrow_and_update().clone();
                print_state(&current);
                match current {
                    ConnectionState::Closed(CloseReason::PeerLeft) => {
                        println!("{}", "✨ Call finished".green().bold());
                        return Ok(());
                    }
                    ConnectionState::Closed(reason) => {
                        anyhow::bail!("call ended: {reason:?}");
                    }
                    ConnectionState::Failed => {
                        anyhow::bail!("transport failed");
                    }
                    _ => {}
                }
                if changed.is_err() {
                    // Координатор исчез, не опубликовав терминального состояния.
                    anyhow::bail!("session ended unexpectedly");
                }
            }

            changed = peer.changed(), if peer_open => {
                if changed.is_err() {
                    peer_open = false;
                    continue;
                }
                match peer.borrow_and_update().clone() {
                    Some(record) => {
                        if last_peer.as_ref() == Some(&record.id) {
                            print_profile(&record);
                        } else {
                            last_peer = Some(record.id.clone());
                            let label = record
                                .display_name
                                .clone()
                                .unwrap_or_else(|| record.id.to_string());
                            println!("{} {}", "👥 Peer joined:".green(), label.bold());
                            print_profile(&record);
                        }
                    }
                    None => {
                        last_peer = None;
                        println!("{}", "👤 Peer left the room".yellow());
                    }
                }
            }
        }
    }
}

fn print_state(state: &ConnectionState) {
    match state {
        ConnectionState::Connecting => println!("{}", "⏳ Connecting...".cyan()),
        ConnectionState::Connected => println!("{}", "✅ Connected".green().bold()),
        ConnectionState::Disconnected => {
            println!("{}", "⚠️  Connection hiccup, waiting for recovery...".yellow())
        }
        ConnectionState::Failed => println!("{}", "💥 Transport failed".red().bold()),
        ConnectionState::Closed(reason) => {
            println!("{} {reason:?}", "📴 Call closed:".yellow())
        }
    }
}

fn print_profile(record: &ParticipantRecord) {
    let mic = if record.profile.audio {
        "on".green()
    } else {
        "muted".red()
    };
    let cam = if record.profile.video {
        "on".green()
    } else {
        "off".red()
    };
    println!("   🎤 mic {mic}   📷 cam {cam}");
}
