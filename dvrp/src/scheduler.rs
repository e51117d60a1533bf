//! Task orchestration (spec §5 concurrency model).
//!
//! Four cooperating tasks, wired together with bounded `flume` channels:
//!
//! - **Listener**: blocks on `Transport::recv`, forwards decoded datagrams.
//! - **Ticker**: fires every `update_interval`, triggers a tick + broadcast.
//! - **Engine**: the sole owner of `Engine`; drains `EngineMsg` sequentially.
//! - **Command port**: operator commands, see [`crate::command`].
//!
//! Only the engine task ever calls a `&mut Engine` method; every other task
//! only ever sends messages to it, so the routing table's mutator stays
//! single-threaded even though I/O is fully concurrent.

use std::net::SocketAddr;
use std::sync::Arc;

use dvr_core::endpoint::Endpoint;
use dvr_core::error::Result;
use flume::{Receiver, Sender};
use tokio::time::interval;
use tracing::{error, info, warn};

use crate::codec::UpdateMessage;
use crate::command::{Command, CommandResponse};
use crate::engine::Engine;
use crate::transport::Transport;

/// Messages the engine task consumes, from whichever source produced them.
pub enum EngineMsg {
    Packet(SocketAddr, UpdateMessage),
    Tick,
    Command(Command, flume::Sender<CommandResponse>),
}

/// A cloneable handle to feed the engine task.
#[derive(Clone)]
pub struct EngineHandle {
    tx: Sender<EngineMsg>,
}

impl EngineHandle {
    #[must_use]
    pub const fn new(tx: Sender<EngineMsg>) -> Self {
        Self { tx }
    }

    pub async fn send(&self, msg: EngineMsg) -> Result<()> {
        self.tx
            .send_async(msg)
            .await
            .map_err(|_| dvr_core::error::Error::ChannelClosed("engine"))
    }
}

/// Spawns the listener task: reads datagrams off `transport` forever and
/// forwards them to the engine (spec §5 Listener).
pub fn spawn_listener(transport: Arc<dyn Transport>, handle: EngineHandle) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match transport.recv().await {
                Ok((src, msg)) => {
                    if handle.send(EngineMsg::Packet(src, msg)).await.is_err() {
                        error!("engine channel closed, listener stopping");
                        break;
                    }
                }
                Err(err) => {
                    warn!(%err, "transport recv error");
                }
            }
        }
    })
}

/// Spawns the ticker task: fires `EngineMsg::Tick` every `interval`
/// (spec §5 Scheduler, §4.5).
pub fn spawn_ticker(period: std::time::Duration, handle: EngineHandle) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        loop {
            ticker.tick().await;
            if handle.send(EngineMsg::Tick).await.is_err() {
                error!("engine channel closed, ticker stopping");
                break;
            }
        }
    })
}

/// Runs the engine task to completion: drains `rx` until the channel is
/// closed, applying each message to `engine` and broadcasting any resulting
/// updates through `transport` (spec §5 Engine).
pub async fn run_engine(
    mut engine: Engine,
    rx: Receiver<EngineMsg>,
    transport: Arc<dyn Transport>,
) {
    while let Ok(msg) = rx.recv_async().await {
        match msg {
            EngineMsg::Packet(src, update) => match engine.on_packet(&update) {
                Ok(true) => send_all(engine.outgoing_updates(), &transport).await,
                Ok(false) => {}
                Err(err) => warn!(%src, %err, "rejected inbound update"),
            },
            EngineMsg::Tick => {
                engine.tick();
                send_all(engine.outgoing_updates(), &transport).await;
            }
            EngineMsg::Command(cmd, reply) => {
                let crashing = matches!(cmd, Command::Crash);
                let response = apply_command(&mut engine, cmd, &transport).await;
                let _ = reply.send(response);
                if crashing {
                    info!("crash command received, engine task exiting");
                    break;
                }
            }
        }
    }
    info!("engine task exiting, channel closed");
}

/// Sends each `(dest, update)` pair through `transport`, logging (not
/// failing) on a per-destination send error (spec §7 `ErrSendFailed`).
async fn send_all(updates: Vec<(Endpoint, UpdateMessage)>, transport: &Arc<dyn Transport>) {
    for (dest, update) in updates {
        if let Err(err) = transport.send(dest, &update).await {
            warn!(%dest, %err, "failed to send update");
        }
    }
}

/// Applies one operator command to `engine`, sending any datagrams it
/// produces (an immediate `step`, a local `update`/`disable` broadcast, or a
/// cross-remote `update` redirect pair) through `transport`
/// (spec §4.3.2, §4.3.3, §4.3.4, §6).
async fn apply_command(
    engine: &mut Engine,
    cmd: Command,
    transport: &Arc<dyn Transport>,
) -> CommandResponse {
    match cmd {
        Command::Update { id1, id2, cost } => match engine.update_link(id1, id2, cost) {
            Ok(outgoing) => {
                send_all(outgoing, transport).await;
                CommandResponse::Ok
            }
            Err(err) => CommandResponse::Error(err),
        },
        Command::Step => {
            send_all(engine.step(), transport).await;
            CommandResponse::Ok
        }
        Command::Packets => CommandResponse::Packets(engine.packets()),
        Command::Disable { neighbor_id } => match engine.disable_link(neighbor_id) {
            Ok(outgoing) => {
                send_all(outgoing, transport).await;
                CommandResponse::Ok
            }
            Err(err) => CommandResponse::Error(err),
        },
        Command::Display => CommandResponse::Display(engine.display()),
        Command::Crash => {
            engine.crash();
            CommandResponse::Ok
        }
    }
}
