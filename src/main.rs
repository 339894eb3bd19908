use clap::Parser;
use skirmish::config::SyncConfig;
use skirmish::controller::{SyncController, SyncEvent};
use skirmish::runtime::{ClientError, Command, Exit, Runtime};
use skirmish::store::GameOutcome;
use skirmish::types::{JoinIntent, MovementMode};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "skirmish", about = "Headless skirmish client: joins a room and follows the match")]
struct Cli {
    /// Websocket endpoint; overrides `SKIRMISH_SERVER_URL`.
    #[arg(long)]
    url: Option<String>,

    #[arg(long, env = "SKIRMISH_ROOM")]
    room: Option<String>,

    #[arg(long, env = "SKIRMISH_NAME", default_value = "Skirmisher")]
    name: String,

    #[arg(long, default_value = "manual")]
    mode: MovementMode,

    /// End the turn automatically whenever it becomes ours.
    #[arg(long, default_value_t = false)]
    end_turn: bool,

    /// Exit once the local player has won or lost.
    #[arg(long, default_value_t = false)]
    exit_on_finish: bool,
}

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = SyncConfig::from_env()?;
    if let Some(url) = cli.url {
        config.server_url = url;
        config.validate()?;
    }
    tracing::info!(url = %config.server_url, "starting client");

    let (runtime, commands) = Runtime::new(config);

    if let Some(room) = cli.room {
        if commands.send(Command::Join(JoinIntent::new(room, cli.name, cli.mode))).is_err() {
            tracing::warn!("runtime gone before join was queued");
        }
    }

    let ctrl_c = commands.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("interrupt received; shutting down");
                if ctrl_c.send(Command::Shutdown).is_err() {
                    tracing::debug!("runtime already stopped");
                }
            }
            Err(e) => tracing::warn!(error = %e, "cannot listen for interrupt"),
        }
    });

    let auto_end_turn = cli.end_turn;
    let exit_on_finish = cli.exit_on_finish;
    let exit = runtime
        .run(move |controller: &mut SyncController, event: SyncEvent| {
            log_event(&event);
            match event {
                SyncEvent::TurnChanged { mine: true, .. } if auto_end_turn => {
                    if let Err(e) = controller.end_turn() {
                        tracing::warn!(error = %e, "could not end turn");
                    }
                }
                SyncEvent::Outcome(GameOutcome::Win | GameOutcome::Lose) if exit_on_finish => {
                    if commands.send(Command::Shutdown).is_err() {
                        tracing::debug!("runtime already stopped");
                    }
                }
                _ => {}
            }
        })
        .await;

    match exit {
        Exit::Shutdown => tracing::info!("client stopped"),
        Exit::Terminated(reason) => tracing::info!(%reason, "server ended the session"),
    }
    Ok(())
}

fn log_event(event: &SyncEvent) {
    match event {
        SyncEvent::Status(status) => tracing::info!(?status, "connection status"),
        SyncEvent::Phase(phase) => tracing::info!(?phase, "session phase"),
        SyncEvent::JoinConfirmed { room_id } => tracing::info!(%room_id, "joined room"),
        SyncEvent::JoinAborted { room_id, message } => tracing::warn!(%room_id, %message, "join failed"),
        SyncEvent::Rejoining { room_id } => tracing::info!(%room_id, "rejoining after reconnect"),
        SyncEvent::TurnChanged { player_id, turn_number, mine } => {
            tracing::info!(?player_id, turn_number, mine, "turn changed");
        }
        SyncEvent::Outcome(outcome) => tracing::info!(?outcome, "game over"),
        SyncEvent::RoomReset => tracing::info!("room reset"),
    }
}
