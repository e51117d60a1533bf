//! Task wiring (spec §5): loads the topology, binds the transport, builds
//! the engine, and spawns the listener/ticker/engine/command-port tasks.

use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;

use dvr_core::clock::SystemClock;
use dvr_core::error::{Error, Result};
use dvr_core::topology::{self, Topology};
use dvrp::command::{self, Command, CommandResponse};
use dvrp::engine::Engine;
use dvrp::scheduler::{self, EngineHandle, EngineMsg};
use dvrp::transport::{Transport, UdpTransport};
use tokio::io::{AsyncBufReadExt, BufReader as TokioBufReader};
use tracing::{error, info};

use crate::cli::Args;

/// Load and validate the topology file named by `args` (spec §6).
pub fn load_topology(args: &Args) -> Result<Topology> {
    let file = File::open(&args.topology).map_err(Error::Io)?;
    topology::parse(BufReader::new(file), args.id)
}

/// Run the node to completion (it only returns on a fatal error or stdin
/// EOF; spec §5).
pub async fn run(args: Args) -> Result<()> {
    let topo = load_topology(&args)?;
    let self_port = topo
        .self_entry()
        .map_or(0, |e| e.endpoint.port);
    let bind_addr = args.bind_addr(self_port);

    let transport: Arc<dyn Transport> = Arc::new(UdpTransport::bind(bind_addr).await?);
    info!(%bind_addr, node_id = args.id, "bound UDP socket");

    let engine = Engine::new(&topo, args.config(), Arc::new(SystemClock));

    let (tx, rx) = flume::bounded::<EngineMsg>(256);
    let handle = EngineHandle::new(tx);

    let listener_task = scheduler::spawn_listener(Arc::clone(&transport), handle.clone());
    let ticker_task = scheduler::spawn_ticker(args.config().update_interval, handle.clone());
    let engine_task = tokio::spawn(scheduler::run_engine(engine, rx, Arc::clone(&transport)));

    run_command_port(handle).await;

    listener_task.abort();
    ticker_task.abort();
    drop(engine_task);
    Ok(())
}

/// Reads operator commands from stdin, one per line, dispatching each to the
/// engine task and printing its response (spec §6).
async fn run_command_port(handle: EngineHandle) {
    let stdin = tokio::io::stdin();
    let mut lines = TokioBufReader::new(stdin).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                info!("stdin closed, command port exiting");
                break;
            }
            Err(err) => {
                error!(%err, "error reading stdin");
                break;
            }
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        // `help` (or menu entry `1`) is CLI-only: it carries no Engine
        // operation (spec §6 table, "Engine op: —"), so it never reaches
        // the engine task.
        let verb = trimmed.split_whitespace().next().unwrap_or("");
        if verb == "help" || verb == "1" {
            print_help();
            continue;
        }

        let cmd = match command::parse(trimmed) {
            Ok(cmd) => cmd,
            Err(err) => {
                eprintln!("error: {err}");
                continue;
            }
        };
        let crashing = matches!(cmd, Command::Crash);

        let (reply_tx, reply_rx) = flume::bounded(1);
        if handle.send(EngineMsg::Command(cmd, reply_tx)).await.is_err() {
            eprintln!("error: engine task is gone");
            break;
        }

        match reply_rx.recv_async().await {
            Ok(CommandResponse::Ok) => println!("ok"),
            Ok(CommandResponse::Display(table)) => print!("{table}"),
            Ok(CommandResponse::Packets(count)) => println!("{count}"),
            Ok(CommandResponse::Error(err)) => eprintln!("error: {err}"),
            Err(_) => {
                eprintln!("error: engine task dropped the reply channel");
                break;
            }
        }

        if crashing {
            info!("crash command received, command port exiting");
            break;
        }
    }
}

/// Prints the CLI surface table (spec §6): verbs by name or 1-based number.
fn print_help() {
    println!("1  help                 show this message");
    println!("2  update <a> <b> <c>   set the link cost between a and b to c (or \"inf\")");
    println!("3  step                 emit the current vector immediately");
    println!("4  packets              read and reset the inbound packet counter");
    println!("5  display              show the routing table");
    println!("6  disable <neighbor>   disable the direct link to neighbor");
    println!("7  crash                terminate this node");
}
