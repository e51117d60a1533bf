//! Operator command vocabulary (spec §6).
//!
//! The command port parses operator input into a [`Command`] and sends it
//! to the engine task over a reply channel; it never touches the routing
//! table directly.

use dvr_core::error::{Error, Result};
use dvr_core::types::{Cost, NodeId, INF};

/// An operator command, parsed from a line of input (spec §6 command
/// table: `update`, `step`, `packets`, `display`, `disable`, `crash`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Set the link cost between `id1` and `id2` (either may be this node,
    /// or neither — see [`crate::engine::Engine::update_link`]).
    Update { id1: NodeId, id2: NodeId, cost: Cost },
    /// Emit the current vector immediately, without waiting for the next
    /// scheduled tick.
    Step,
    /// Read-and-reset the inbound packet counter.
    Packets,
    Disable { neighbor_id: NodeId },
    Display,
    /// "Close all connections" and terminate the process (spec §4.3.7).
    Crash,
}

/// The engine's reply to a dispatched command.
#[derive(Debug, Clone)]
pub enum CommandResponse {
    Ok,
    Display(String),
    Packets(u32),
    Error(Error),
}

/// Parse one line of operator input into a [`Command`] (spec §6).
///
/// Each verb may also be given as its 1-based position in the CLI surface
/// table (`2` for `update`, `3` for `step`, and so on) to match the
/// original's numbered menu.
///
/// Grammar:
/// ```text
/// update <id1> <id2> <cost>|inf
/// step
/// packets
/// display
/// disable <neighbor_id>
/// crash
/// ```
pub fn parse(line: &str) -> Result<Command> {
    let mut parts = line.split_whitespace();
    let verb = parts
        .next()
        .ok_or_else(|| Error::UpdateArgs("empty command".into()))?;

    match canonical_verb(verb)? {
        "update" => {
            let id1 = parts
                .next()
                .ok_or_else(|| Error::UpdateArgs("missing first node id".into()))?
                .parse::<NodeId>()
                .map_err(|_| Error::UpdateArgs("node id must be a number".into()))?;
            let id2 = parts
                .next()
                .ok_or_else(|| Error::UpdateArgs("missing second node id".into()))?
                .parse::<NodeId>()
                .map_err(|_| Error::UpdateArgs("node id must be a number".into()))?;
            let cost_token = parts
                .next()
                .ok_or_else(|| Error::UpdateArgs("missing cost".into()))?;
            let cost = parse_cost(cost_token)?;
            if parts.next().is_some() {
                return Err(Error::UpdateArgs("too many arguments".into()));
            }
            Ok(Command::Update { id1, id2, cost })
        }
        "step" => Ok(Command::Step),
        "packets" => Ok(Command::Packets),
        "disable" => {
            let neighbor_id = parts
                .next()
                .ok_or_else(|| Error::DisableArgs("missing neighbor id".into()))?
                .parse::<NodeId>()
                .map_err(|_| Error::DisableArgs("neighbor id must be a number".into()))?;
            if parts.next().is_some() {
                return Err(Error::DisableArgs("too many arguments".into()));
            }
            Ok(Command::Disable { neighbor_id })
        }
        "display" => Ok(Command::Display),
        "crash" => Ok(Command::Crash),
        other => Err(Error::UpdateArgs(format!("unknown command {other:?}"))),
    }
}

/// Maps the CLI's 1-based numbered menu (spec §6 table) onto the same verbs
/// accepted by name; `help` and out-of-range numbers fall through to the
/// "unknown command" error, since `help` carries no Engine operation.
fn canonical_verb(verb: &str) -> Result<&'static str> {
    Ok(match verb {
        "update" | "2" => "update",
        "step" | "3" => "step",
        "packets" | "4" => "packets",
        "display" | "5" => "display",
        "disable" | "6" => "disable",
        "crash" | "7" => "crash",
        _ => return Err(Error::UpdateArgs(format!("unknown command {verb:?}"))),
    })
}

fn parse_cost(token: &str) -> Result<Cost> {
    if token.eq_ignore_ascii_case("inf") {
        return Ok(INF);
    }
    token
        .parse::<Cost>()
        .map_err(|_| Error::UpdateArgs("cost must be a number or \"inf\"".into()))
}
