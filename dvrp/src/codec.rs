//! Wire codec for update datagrams (spec §4.1).
//!
//! Fixed big-endian layout, grounded byte-for-byte in
//! `original_source/message/message.go`'s `Marshal`/`UnmarshalMessage`:
//!
//! ```text
//! offset  size  field
//! 0       2     num_updates (u16)
//! 2       2     sender_port (u16)
//! 4       4     sender_ip (4 bytes, network order)
//! 8       N*12  neighbor records
//! ```
//!
//! Each neighbor record is 12 bytes:
//!
//! ```text
//! offset  size  field
//! 0       4     ip (4 bytes)
//! 4       2     port (u16)
//! 6       2     reserved, always zero
//! 8       2     neighbor_id (u16)
//! 10      2     cost (u16, saturated; spec's `Cost` is wider but the wire
//!                      field is 16 bits, so costs are clamped to u16::MAX)
//! ```

use std::net::Ipv4Addr;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use dvr_core::endpoint::Endpoint;
use dvr_core::error::{Error, Result};
use dvr_core::types::{Cost, NodeId};

const HEADER_LEN: usize = 8;
const RECORD_LEN: usize = 12;

/// One row of the distance vector this node is advertising: "I can reach
/// `neighbor_id` at `cost`" (spec §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateRecord {
    pub endpoint: Endpoint,
    pub neighbor_id: NodeId,
    pub cost: Cost,
}

/// A full update datagram: the sender's own endpoint plus its distance
/// vector (spec §4.1, §4.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateMessage {
    pub sender: Endpoint,
    pub records: Vec<UpdateRecord>,
}

impl UpdateMessage {
    #[must_use]
    pub fn new(sender: Endpoint, records: Vec<UpdateRecord>) -> Self {
        Self { sender, records }
    }

    /// Encode into a fresh buffer (spec §4.1 wire layout).
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_LEN + self.records.len() * RECORD_LEN);
        self.encode_into(&mut buf);
        buf.freeze()
    }

    /// Encode into a caller-supplied buffer, reusing its allocation.
    pub fn encode_into(&self, buf: &mut BytesMut) {
        buf.put_u16(self.records.len() as u16);
        buf.put_u16(self.sender.port);
        buf.put_slice(&self.sender.ip.octets());

        for record in &self.records {
            buf.put_slice(&record.endpoint.ip.octets());
            buf.put_u16(record.endpoint.port);
            buf.put_u16(0); // reserved
            buf.put_u16(record.neighbor_id);
            buf.put_u16(record.cost.min(u32::from(u16::MAX)) as u16);
        }
    }

    /// Decode a datagram from `src`. Any length mismatch or truncation is a
    /// [`Error::Decode`] (spec §7: malformed datagrams are logged and
    /// dropped, never panics).
    ///
    /// A valid message always carries at least one record (spec §4.1 "a
    /// valid message has `U ≥ 1`"), so anything shorter than one header plus
    /// one record (20 bytes) is rejected outright — matching
    /// `original_source/message/message.go`'s `if len(msg) < 20`.
    pub fn decode(mut src: &[u8]) -> Result<Self> {
        if src.len() < HEADER_LEN + RECORD_LEN {
            return Err(Error::Decode(format!(
                "datagram too short: {} bytes, need at least {} (header plus at least one record)",
                src.len(),
                HEADER_LEN + RECORD_LEN
            )));
        }

        let num_updates = src.get_u16() as usize;
        let sender_port = src.get_u16();
        let sender_ip = Ipv4Addr::new(src[0], src[1], src[2], src[3]);
        src.advance(4);

        let expected_len = num_updates * RECORD_LEN;
        if src.len() != expected_len {
            return Err(Error::Decode(format!(
                "datagram declares {num_updates} records ({expected_len} bytes) but body has {} bytes",
                src.len()
            )));
        }

        let mut records = Vec::with_capacity(num_updates);
        for _ in 0..num_updates {
            let ip = Ipv4Addr::new(src[0], src[1], src[2], src[3]);
            src.advance(4);
            let port = src.get_u16();
            src.advance(2); // reserved
            let neighbor_id = src.get_u16();
            let cost = Cost::from(src.get_u16());

            records.push(UpdateRecord {
                endpoint: Endpoint::new(ip, port),
                neighbor_id,
                cost,
            });
        }

        Ok(Self {
            sender: Endpoint::new(sender_ip, sender_port),
            records,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> UpdateMessage {
        UpdateMessage::new(
            Endpoint::new(Ipv4Addr::new(10, 0, 0, 1), 5001),
            vec![
                UpdateRecord {
                    endpoint: Endpoint::new(Ipv4Addr::new(10, 0, 0, 2), 5002),
                    neighbor_id: 2,
                    cost: 2,
                },
                UpdateRecord {
                    endpoint: Endpoint::new(Ipv4Addr::new(10, 0, 0, 3), 5003),
                    neighbor_id: 3,
                    cost: 99_999,
                },
            ],
        )
    }

    #[test]
    fn round_trips() {
        let msg = sample();
        let encoded = msg.encode();
        let decoded = UpdateMessage::decode(&encoded).unwrap();
        assert_eq!(decoded.sender, msg.sender);
        assert_eq!(decoded.records.len(), 2);
        assert_eq!(decoded.records[0].neighbor_id, 2);
        assert_eq!(decoded.records[1].cost, 65_535); // clamped to u16 on the wire
    }

    #[test]
    fn rejects_empty_update() {
        // A message with zero records is too short to be valid (spec §4.1
        // "a valid message has U ≥ 1"; spec §8: anything under 20 bytes is
        // `ErrDecode`), even though it encodes to an otherwise well-formed
        // 8-byte header.
        let msg = UpdateMessage::new(Endpoint::new(Ipv4Addr::new(127, 0, 0, 1), 5000), vec![]);
        let encoded = msg.encode();
        assert_eq!(encoded.len(), HEADER_LEN);
        assert!(UpdateMessage::decode(&encoded).is_err());
    }

    #[test]
    fn rejects_truncated_header() {
        assert!(UpdateMessage::decode(&[0u8; 3]).is_err());
    }

    #[test]
    fn rejects_length_mismatch() {
        let mut encoded = sample().encode().to_vec();
        encoded.truncate(encoded.len() - 1);
        assert!(UpdateMessage::decode(&encoded).is_err());
    }

    proptest::proptest! {
        #[test]
        fn arbitrary_messages_round_trip(
            sender_ip in proptest::array::uniform4(0u8..=255),
            sender_port in 0u16..=65535,
            records in proptest::collection::vec(
                (
                    proptest::array::uniform4(0u8..=255),
                    0u16..=65535,
                    0u16..=65535,
                    0u16..=65535,
                ),
                1..16,
            ),
        ) {
            let sender = Endpoint::new(Ipv4Addr::from(sender_ip), sender_port);
            let records: Vec<UpdateRecord> = records
                .into_iter()
                .map(|(ip, port, neighbor_id, cost)| UpdateRecord {
                    endpoint: Endpoint::new(Ipv4Addr::from(ip), port),
                    neighbor_id,
                    cost: Cost::from(cost),
                })
                .collect();
            let msg = UpdateMessage::new(sender, records.clone());

            let encoded = msg.encode();
            let decoded = UpdateMessage::decode(&encoded).unwrap();

            prop_assert_eq!(decoded.sender, sender);
            prop_assert_eq!(decoded.records, records);
        }
    }
}
