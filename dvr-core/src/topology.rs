//! Topology file parsing (spec §6).
//!
//! Grounded in `original_source/server/topology.go`'s line-oriented parser,
//! re-expressed idiomatically: a `BufRead` line scanner instead of manual
//! index juggling, and `Error::Topology` in place of `log.Fatalf`.

use std::io::BufRead;

use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use crate::types::{Cost, NodeId, INF};

/// One node known at startup: its id, address, and the direct cost from
/// *this* node to it (`INF` if not a direct neighbor) (spec §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyEntry {
    pub id: NodeId,
    pub endpoint: Endpoint,
    pub initial_direct_cost: Cost,
}

/// Immutable description of the peer set loaded at startup (spec §2).
#[derive(Debug, Clone)]
pub struct Topology {
    pub self_id: NodeId,
    pub entries: Vec<TopologyEntry>,
}

impl Topology {
    #[must_use]
    pub fn num_nodes(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn entry(&self, id: NodeId) -> Option<&TopologyEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    #[must_use]
    pub fn self_entry(&self) -> Option<&TopologyEntry> {
        self.entry(self.self_id)
    }
}

/// Parse a topology file from any `BufRead` source (spec §6):
///
/// ```text
/// line 1:   N (number of nodes)
/// line 2:   K (number of direct neighbors of this node)
/// lines 3..2+N:   <node_id> <ip> <port>
/// lines 3+N..2+N+K: <self_id> <neighbor_id> <cost>
/// ```
pub fn parse<R: BufRead>(reader: R, self_id: NodeId) -> Result<Topology> {
    let mut lines = reader.lines();

    let num_nodes = parse_count(&mut lines, "number of nodes")?;
    let num_neighbors = parse_count(&mut lines, "number of neighbors")?;

    let mut entries: Vec<TopologyEntry> = Vec::with_capacity(num_nodes);
    for _ in 0..num_nodes {
        let line = next_line(&mut lines, "node descriptor")?;
        let mut parts = line.split_whitespace();
        let id = parse_field::<NodeId>(&mut parts, &line, "node id")?;
        let ip = parts
            .next()
            .ok_or_else(|| malformed(&line, "missing ip"))?;
        let port = parse_field::<u16>(&mut parts, &line, "port")?;
        let endpoint_str = format!("{ip}:{port}");
        let endpoint = endpoint_str
            .parse::<Endpoint>()
            .map_err(|e| Error::Topology(format!("line {line:?}: {e}")))?;

        entries.push(TopologyEntry {
            id,
            endpoint,
            initial_direct_cost: INF,
        });
    }

    for _ in 0..num_neighbors {
        let line = next_line(&mut lines, "neighbor descriptor")?;
        let mut parts = line.split_whitespace();
        let a = parse_field::<NodeId>(&mut parts, &line, "self id")?;
        let b = parse_field::<NodeId>(&mut parts, &line, "neighbor id")?;
        let cost = parse_field::<Cost>(&mut parts, &line, "cost")?;

        if a != self_id {
            return Err(Error::Topology(format!(
                "line {line:?}: neighbor line's self id {a} does not match configured self id {self_id}"
            )));
        }

        let entry = entries
            .iter_mut()
            .find(|e| e.id == b)
            .ok_or_else(|| Error::Topology(format!("line {line:?}: unknown node id {b}")))?;
        entry.initial_direct_cost = cost;
    }

    Ok(Topology { self_id, entries })
}

fn parse_count(
    lines: &mut std::io::Lines<impl BufRead>,
    what: &str,
) -> Result<usize> {
    let line = next_line(lines, what)?;
    line.trim()
        .parse::<usize>()
        .map_err(|_| Error::Topology(format!("expected {what}, got {line:?}")))
}

fn next_line(lines: &mut std::io::Lines<impl BufRead>, what: &str) -> Result<String> {
    lines
        .next()
        .ok_or_else(|| Error::Topology(format!("unexpected end of file, expected {what}")))?
        .map_err(Error::Io)
}

fn parse_field<T: std::str::FromStr>(
    parts: &mut std::str::SplitWhitespace<'_>,
    line: &str,
    what: &str,
) -> Result<T> {
    parts
        .next()
        .ok_or_else(|| malformed(line, what))?
        .parse::<T>()
        .map_err(|_| malformed(line, what))
}

fn malformed(line: &str, what: &str) -> Error {
    Error::Topology(format!("line {line:?}: expected {what}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const TRIANGLE: &str = "\
3
2
1 10.0.0.1 5001
2 10.0.0.2 5002
3 10.0.0.3 5003
1 2 2
1 3 7
";

    #[test]
    fn parses_triangle_topology() {
        let t = parse(Cursor::new(TRIANGLE), 1).unwrap();
        assert_eq!(t.num_nodes(), 3);
        assert_eq!(t.entry(1).unwrap().initial_direct_cost, INF);
        assert_eq!(t.entry(2).unwrap().initial_direct_cost, 2);
        assert_eq!(t.entry(3).unwrap().initial_direct_cost, 7);
    }

    #[test]
    fn rejects_truncated_file() {
        let bad = "3\n2\n1 10.0.0.1 5001\n";
        assert!(parse(Cursor::new(bad), 1).is_err());
    }

    #[test]
    fn rejects_unknown_neighbor_id() {
        let bad = "\
2
1
1 10.0.0.1 5001
2 10.0.0.2 5002
1 9 4
";
        assert!(parse(Cursor::new(bad), 1).is_err());
    }
}
