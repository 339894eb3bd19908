//! Websocket driver for a [`SyncController`].
//!
//! SYSTEM CONTEXT
//! ==============
//! The controller makes every decision; this task only moves bytes and time.
//! One connection is live at a time. While it is up, a single `select!` loop
//! multiplexes socket reads, queued outbound frames, frame ticks, and user
//! commands. While it is down, the loop sleeps the controller-computed backoff
//! and keeps servicing commands and ticks.
//!
//! ERROR HANDLING
//! ==============
//! Connect and socket failures are reported to the controller as transport
//! events and retried per its backoff. Undecodable frames are logged and
//! dropped. The loop ends only on [`Command::Shutdown`] or a deliberate
//! server-side close.

use std::time::Duration;

use frames::Frame;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

use crate::config::{ConfigError, SyncConfig};
use crate::connection::DisconnectReason;
use crate::controller::{SyncController, SyncEvent};
use crate::types::{JoinIntent, Millis};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("websocket connect failed: {0}")]
    WsConnect(Box<tokio_tungstenite::tungstenite::Error>),
}

/// User intents delivered to a running client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Join(JoinIntent),
    ForceStart,
    EndTurn,
    RequestRoomStatus,
    Shutdown,
}

/// Why [`Runtime::run`] returned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Exit {
    /// A [`Command::Shutdown`] arrived or every command sender was dropped.
    Shutdown,
    /// The server ended the session on purpose; reconnecting would be wrong.
    Terminated(DisconnectReason),
}

enum SessionEnd {
    Shutdown,
    Lost(DisconnectReason),
}

/// Millisecond clock anchored at runtime start.
#[derive(Clone, Copy, Debug)]
struct Clock {
    epoch: Instant,
}

impl Clock {
    fn new() -> Self {
        Self { epoch: Instant::now() }
    }

    fn now(self) -> Millis {
        Millis::try_from(self.epoch.elapsed().as_millis()).unwrap_or(Millis::MAX)
    }

    fn instant_at(self, at: Millis) -> Instant {
        self.epoch + Duration::from_millis(at)
    }
}

pub struct Runtime {
    url: String,
    controller: SyncController,
    outbound: UnboundedReceiver<Frame>,
    commands: UnboundedReceiver<Command>,
    clock: Clock,
}

impl Runtime {
    /// Build a runtime and the handle used to send it commands.
    #[must_use]
    pub fn new(config: SyncConfig) -> (Self, UnboundedSender<Command>) {
        let (frame_tx, outbound) = mpsc::unbounded_channel();
        let (command_tx, commands) = mpsc::unbounded_channel();
        let runtime = Self {
            url: config.server_url.clone(),
            controller: SyncController::new(config, frame_tx),
            outbound,
            commands,
            clock: Clock::new(),
        };
        (runtime, command_tx)
    }

    /// Connect, reconnect, and pump events until shutdown.
    ///
    /// `observer` sees every [`SyncEvent`] together with the controller, so
    /// it can react (for example by ending the turn) without a round trip
    /// through the command channel.
    pub async fn run<F>(self, mut observer: F) -> Exit
    where
        F: FnMut(&mut SyncController, SyncEvent),
    {
        let Self { url, mut controller, mut outbound, mut commands, clock } = self;

        loop {
            let delay = match connect(&url).await {
                Ok(stream) => {
                    // Anything queued before the link dropped belongs to a dead session.
                    while outbound.try_recv().is_ok() {}
                    controller.on_connected(clock.now());
                    notify(&mut controller, &mut observer);

                    let reason =
                        match drive_session(stream, &mut controller, &mut outbound, &mut commands, clock, &mut observer)
                            .await
                        {
                            SessionEnd::Shutdown => {
                                controller.on_disconnected(&DisconnectReason::ClientRequested, clock.now());
                                notify(&mut controller, &mut observer);
                                return Exit::Shutdown;
                            }
                            SessionEnd::Lost(reason) => reason,
                        };

                    let delay = controller.on_disconnected(&reason, clock.now());
                    notify(&mut controller, &mut observer);
                    match delay {
                        Some(delay) => delay,
                        None => return Exit::Terminated(reason),
                    }
                }
                Err(e) => {
                    warn!(error = %e, url = %url, "connect failed");
                    let delay = controller.on_transport_error(clock.now());
                    notify(&mut controller, &mut observer);
                    delay
                }
            };

            info!(?delay, "waiting before reconnect");
            if !wait_backoff(delay, &mut controller, &mut commands, clock, &mut observer).await {
                return Exit::Shutdown;
            }
        }
    }
}

async fn connect(url: &str) -> Result<WsStream, ClientError> {
    let (stream, _) = connect_async(url)
        .await
        .map_err(|error| ClientError::WsConnect(Box::new(error)))?;
    Ok(stream)
}

fn notify<F>(controller: &mut SyncController, observer: &mut F)
where
    F: FnMut(&mut SyncController, SyncEvent),
{
    for event in controller.take_events() {
        observer(controller, event);
    }
}

/// Returns `false` when the command asks the runtime to stop.
fn apply_command(controller: &mut SyncController, command: Command) -> bool {
    let result = match command {
        Command::Shutdown => return false,
        Command::Join(intent) => {
            if !controller.join_room(intent) {
                info!("offline; join queued for next connect");
            }
            Ok(())
        }
        Command::ForceStart => controller.force_start(),
        Command::EndTurn => controller.end_turn(),
        Command::RequestRoomStatus => controller.request_room_status(),
    };
    if let Err(e) = result {
        warn!(error = %e, "command rejected locally");
    }
    true
}

async fn sleep_until(at: Option<Instant>) {
    match at {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

async fn drive_session<F>(
    stream: WsStream,
    controller: &mut SyncController,
    outbound: &mut UnboundedReceiver<Frame>,
    commands: &mut UnboundedReceiver<Command>,
    clock: Clock,
    observer: &mut F,
) -> SessionEnd
where
    F: FnMut(&mut SyncController, SyncEvent),
{
    let (mut write, mut read) = stream.split();

    let end = loop {
        let tick_at = controller.next_deadline(clock.now()).map(|at| clock.instant_at(at));

        tokio::select! {
            message = read.next() => match message {
                Some(Ok(Message::Binary(bytes))) => match frames::decode_frame(&bytes) {
                    Ok(frame) => controller.on_frame(&frame, clock.now()),
                    Err(e) => warn!(error = %e, "quarantined undecodable frame"),
                },
                Some(Ok(Message::Close(close))) => {
                    let reason = close.map_or(DisconnectReason::TransportClose, |frame| {
                        DisconnectReason::from_close_reason(frame.reason.as_str())
                    });
                    break SessionEnd::Lost(reason);
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => break SessionEnd::Lost(DisconnectReason::TransportError(e.to_string())),
                None => break SessionEnd::Lost(DisconnectReason::TransportClose),
            },
            Some(frame) = outbound.recv() => {
                debug!(syscall = %frame.syscall, "sending frame");
                if let Err(e) = write.send(Message::Binary(frames::encode_frame(&frame).into())).await {
                    break SessionEnd::Lost(DisconnectReason::TransportError(e.to_string()));
                }
            }
            () = sleep_until(tick_at) => {
                controller.tick(clock.now());
            }
            command = commands.recv() => {
                let keep_going = command.is_some_and(|command| apply_command(controller, command));
                if !keep_going {
                    break SessionEnd::Shutdown;
                }
            }
        }
        notify(controller, observer);
    };

    if matches!(end, SessionEnd::Shutdown) {
        // Flush whatever the final commands queued, then close politely.
        while let Ok(frame) = outbound.try_recv() {
            if let Err(e) = write.send(Message::Binary(frames::encode_frame(&frame).into())).await {
                debug!(error = %e, "final flush failed");
                break;
            }
        }
        if let Err(e) = write.close().await {
            debug!(error = %e, "close handshake failed");
        }
    }
    end
}

/// Sleep out a reconnect delay while still serving commands and ticks.
/// Returns `false` if shutdown was requested.
async fn wait_backoff<F>(
    delay: Duration,
    controller: &mut SyncController,
    commands: &mut UnboundedReceiver<Command>,
    clock: Clock,
    observer: &mut F,
) -> bool
where
    F: FnMut(&mut SyncController, SyncEvent),
{
    let wake = tokio::time::sleep(delay);
    tokio::pin!(wake);

    loop {
        let tick_at = controller.next_deadline(clock.now()).map(|at| clock.instant_at(at));
        tokio::select! {
            () = &mut wake => return true,
            () = sleep_until(tick_at) => {
                controller.tick(clock.now());
            }
            command = commands.recv() => {
                let keep_going = command.is_some_and(|command| apply_command(controller, command));
                if !keep_going {
                    return false;
                }
            }
        }
        notify(controller, observer);
    }
}
