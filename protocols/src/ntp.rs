//! # NTP Control Messages
//!
//! Mode 6 control queries, as answered by `ntpd`. Every message starts with a
//! fixed 12 byte header made of 7 big-endian fields:
//!
//! ```text
//!  0      1      2-3       4-5     6-7       8-9     10-11
//! +------+------+---------+-------+---------+-------+-------+
//! |LI VN | R E M| sequence| status| assoc id| offset| count |
//! | Mode |  Op  |         |       |         |       |       |
//! +------+------+---------+-------+---------+-------+-------+
//! ```
//!
//! The layout is a byte-exact contract with the remote implementation.
//! Bit positions live in the constants below and nowhere else.

use std::collections::HashMap;

use tracing::trace;

use crate::error::DecodeError;

pub const HEADER_LEN: usize = 12;
pub const ASSOC_RECORD_LEN: usize = 4;
pub const CONTROL_MODE: u8 = 6;
pub const DEFAULT_VERSION: u8 = 2;

// first header byte
const LEAP_SHIFT: u8 = 6;
const LEAP_MASK: u8 = 0x3;
const VERSION_SHIFT: u8 = 3;
const VERSION_MASK: u8 = 0x7;
const MODE_MASK: u8 = 0x7;

// second header byte
const RESPONSE_BIT: u8 = 1 << 7;
const ERROR_BIT: u8 = 1 << 6;
const MORE_BIT: u8 = 1 << 5;
const OPCODE_MASK: u8 = 0x1f;

/// Opcodes this client issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    /// Lists the peer associations.
    ReadStatus = 1,
    /// Returns the variables of a single association.
    ReadVariables = 2,
}

/// The two leading flag bytes of the header, packed as `byte0 << 8 | byte1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlFlags(u16);

impl ControlFlags {
    pub fn new(leap: u8, version: u8, mode: u8, opcode: u8) -> Self {
        let mut flags = Self(0);
        flags.set_first(
            ((leap & LEAP_MASK) << LEAP_SHIFT)
                | ((version & VERSION_MASK) << VERSION_SHIFT)
                | (mode & MODE_MASK),
        );
        flags.set_second(opcode & OPCODE_MASK);
        flags
    }

    pub fn from_bytes(first: u8, second: u8) -> Self {
        Self(u16::from_be_bytes([first, second]))
    }

    pub fn to_bytes(self) -> [u8; 2] {
        self.0.to_be_bytes()
    }

    fn first(self) -> u8 {
        (self.0 >> 8) as u8
    }

    fn second(self) -> u8 {
        (self.0 & 0xff) as u8
    }

    fn set_first(&mut self, value: u8) {
        self.0 = (u16::from(value) << 8) | u16::from(self.second());
    }

    fn set_second(&mut self, value: u8) {
        self.0 = (u16::from(self.first()) << 8) | u16::from(value);
    }

    fn set_bit(&mut self, bit: u8, on: bool) {
        let second = if on { self.second() | bit } else { self.second() & !bit };
        self.set_second(second);
    }

    pub fn leap(self) -> u8 {
        (self.first() >> LEAP_SHIFT) & LEAP_MASK
    }

    pub fn version(self) -> u8 {
        (self.first() >> VERSION_SHIFT) & VERSION_MASK
    }

    pub fn mode(self) -> u8 {
        self.first() & MODE_MASK
    }

    pub fn is_response(self) -> bool {
        self.second() & RESPONSE_BIT != 0
    }

    pub fn is_error(self) -> bool {
        self.second() & ERROR_BIT != 0
    }

    /// Set when further fragments of the same response follow.
    pub fn has_more(self) -> bool {
        self.second() & MORE_BIT != 0
    }

    pub fn opcode(self) -> u8 {
        self.second() & OPCODE_MASK
    }

    pub fn set_response(&mut self, on: bool) {
        self.set_bit(RESPONSE_BIT, on);
    }

    pub fn set_error(&mut self, on: bool) {
        self.set_bit(ERROR_BIT, on);
    }

    pub fn set_more(&mut self, on: bool) {
        self.set_bit(MORE_BIT, on);
    }
}

impl Default for ControlFlags {
    fn default() -> Self {
        Self::new(0, DEFAULT_VERSION, CONTROL_MODE, Opcode::ReadStatus as u8)
    }
}

/// System status word carried in responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SystemStatus(pub u16);

impl SystemStatus {
    pub fn leap_indicator(self) -> u8 {
        ((self.0 >> 14) & 0x3) as u8
    }

    pub fn clock_source(self) -> u8 {
        ((self.0 >> 8) & 0x3f) as u8
    }

    pub fn event_counter(self) -> u8 {
        ((self.0 >> 4) & 0xf) as u8
    }

    pub fn event_code(self) -> u8 {
        (self.0 & 0xf) as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlHeader {
    pub flags: ControlFlags,
    pub sequence: u16,
    pub status: SystemStatus,
    pub assoc_id: u16,
    pub offset: u16,
    pub count: u16,
}

impl ControlHeader {
    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.flags.to_bytes());
        out.extend_from_slice(&self.sequence.to_be_bytes());
        out.extend_from_slice(&self.status.0.to_be_bytes());
        out.extend_from_slice(&self.assoc_id.to_be_bytes());
        out.extend_from_slice(&self.offset.to_be_bytes());
        out.extend_from_slice(&self.count.to_be_bytes());
    }

    fn read(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < HEADER_LEN {
            return Err(DecodeError::Truncated {
                needed: HEADER_LEN,
                available: data.len(),
            });
        }
        let word = |at: usize| u16::from_be_bytes([data[at], data[at + 1]]);
        Ok(Self {
            flags: ControlFlags::from_bytes(data[0], data[1]),
            sequence: word(2),
            status: SystemStatus(word(4)),
            assoc_id: word(6),
            offset: word(8),
            count: word(10),
        })
    }
}

/// Selection codes reported in the low 3 bits of a peer status byte.
pub mod selection {
    pub const REJECT: u8 = 0;
    pub const FALSETICK: u8 = 1;
    pub const EXCESS: u8 = 2;
    pub const OUTLIER: u8 = 3;
    pub const CANDIDATE: u8 = 4;
    pub const BACKUP: u8 = 5;
    pub const SYS_PEER: u8 = 6;
    pub const PPS_PEER: u8 = 7;
}

/// One entry of a peer listing: association id followed by two status bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssociationRecord {
    pub assoc_id: u16,
    status: u8,
    event: u8,
}

impl AssociationRecord {
    pub fn new(assoc_id: u16, status: u8, event: u8) -> Self {
        Self {
            assoc_id,
            status,
            event,
        }
    }

    fn read(slice: &[u8]) -> Self {
        Self {
            assoc_id: u16::from_be_bytes([slice[0], slice[1]]),
            status: slice[2],
            event: slice[3],
        }
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.assoc_id.to_be_bytes());
        out.push(self.status);
        out.push(self.event);
    }

    pub fn configured(&self) -> bool {
        self.status & 0x80 != 0
    }

    pub fn authenticable(&self) -> bool {
        self.status & 0x40 != 0
    }

    pub fn authentic(&self) -> bool {
        self.status & 0x20 != 0
    }

    pub fn reachable(&self) -> bool {
        self.status & 0x10 != 0
    }

    // bit 3 is reserved

    pub fn selection(&self) -> u8 {
        self.status & 0x7
    }

    pub fn event_counter(&self) -> u8 {
        (self.event >> 4) & 0xf
    }

    pub fn event_code(&self) -> u8 {
        self.event & 0xf
    }
}

/// A control request or (possibly reassembled) response.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ControlMessage {
    pub header: ControlHeader,
    /// Filled by opcode 1 responses.
    pub peers: Vec<AssociationRecord>,
    /// Filled by opcode 2 responses.
    pub assoc_data: HashMap<String, String>,
}

impl ControlMessage {
    /// A request for the peer association listing.
    pub fn read_status() -> Self {
        Self::request(Opcode::ReadStatus, 0)
    }

    /// A request for the variables of association `assoc_id`.
    pub fn read_variables(assoc_id: u16) -> Self {
        Self::request(Opcode::ReadVariables, assoc_id)
    }

    fn request(opcode: Opcode, assoc_id: u16) -> Self {
        Self {
            header: ControlHeader {
                flags: ControlFlags::new(0, DEFAULT_VERSION, CONTROL_MODE, opcode as u8),
                sequence: 1,
                assoc_id,
                ..ControlHeader::default()
            },
            ..Self::default()
        }
    }

    pub fn opcode(&self) -> u8 {
        self.header.flags.opcode()
    }

    pub fn has_more(&self) -> bool {
        self.header.flags.has_more()
    }

    /// Serialises the header. Queries never carry a payload, and the
    /// status word is always sent as zero.
    pub fn to_wire(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN);
        let header = ControlHeader {
            status: SystemStatus(0),
            ..self.header
        };
        header.write(&mut out);
        out
    }

    /// Serialises the header followed by the payload the opcode implies.
    /// Used by responders; the count field is recomputed.
    pub fn to_wire_with_payload(&self) -> Vec<u8> {
        let mut payload = Vec::new();
        match self.opcode() {
            1 => self.peers.iter().for_each(|peer| peer.write(&mut payload)),
            2 => {
                let mut pairs: Vec<_> = self.assoc_data.iter().collect();
                pairs.sort();
                let text = pairs
                    .iter()
                    .map(|(key, value)| format!("{key}={value}"))
                    .collect::<Vec<String>>()
                    .join(", ");
                payload.extend_from_slice(text.as_bytes());
            }
            _ => {}
        }
        let header = ControlHeader {
            count: payload.len() as u16,
            ..self.header
        };
        let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
        header.write(&mut out);
        out.extend_from_slice(&payload);
        out
    }

    /// Decodes a single datagram.
    pub fn from_wire(data: &[u8]) -> Result<Self, DecodeError> {
        let header = ControlHeader::read(data)?;
        let payload = &data[HEADER_LEN..];
        let mut message = Self {
            header,
            ..Self::default()
        };

        match header.flags.opcode() {
            1 => {
                let records = usize::from(header.count) / ASSOC_RECORD_LEN;
                let needed = records * ASSOC_RECORD_LEN;
                if payload.len() < needed {
                    return Err(DecodeError::Truncated {
                        needed: HEADER_LEN + needed,
                        available: data.len(),
                    });
                }
                message.peers = payload[..needed]
                    .chunks_exact(ASSOC_RECORD_LEN)
                    .map(AssociationRecord::read)
                    .collect();
            }
            2 => {
                let len = usize::from(header.count).min(payload.len());
                parse_assoc_data(&payload[..len], &mut message.assoc_data);
            }
            other => trace!(opcode = other, "unknown opcode, header only"),
        }

        Ok(message)
    }

    /// Folds a later fragment of the same response into `self`.
    ///
    /// The header is replaced by the fragment's header, association records
    /// are appended and association data keys overwrite earlier ones.
    pub fn absorb(&mut self, fragment: ControlMessage) {
        self.header = fragment.header;
        self.peers.extend(fragment.peers);
        self.assoc_data.extend(fragment.assoc_data);
    }

    /// Decodes one datagram and folds it into `self`.
    pub fn merge_wire(&mut self, data: &[u8]) -> Result<(), DecodeError> {
        let fragment = Self::from_wire(data)?;
        self.absorb(fragment);
        Ok(())
    }
}

/// Parses `key=value, key=value` text. Tokens without `=` are ignored and
/// later keys overwrite earlier ones.
fn parse_assoc_data(payload: &[u8], into: &mut HashMap<String, String>) {
    let text = String::from_utf8_lossy(payload);
    for token in text.split(',') {
        let Some((key, value)) = token.split_once('=') else {
            trace!(token, "association data token without '=' ignored");
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let value = value.trim().trim_matches('"');
        into.insert(key.to_string(), value.to_string());
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
