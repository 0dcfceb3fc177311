//! Wire adapters plugged into a [`Dispatcher`](super::dispatcher::Dispatcher).
//!
//! A codec stamps outgoing requests with a correlation number, turns them into
//! bytes and folds reply datagrams into a response value. Multi datagram
//! replies are accumulated until a fragment reports no further data.

use rnms_protocols::{DecodeError, EncodeError};
use rnms_protocols::ntp::ControlMessage;
use rnms_protocols::snmp::{Message, PduType, VarBind};

pub trait Codec: Send + 'static {
    type Request: Send + 'static;
    type Response: Default + Send + 'static;
    type Fragment;

    const NAME: &'static str;

    /// Writes `sequence` into the request and returns the number the peer
    /// is expected to echo back.
    fn stamp(request: &mut Self::Request, sequence: u32) -> u32;

    fn encode(request: &Self::Request) -> Result<Vec<u8>, EncodeError>;

    fn decode(datagram: &[u8]) -> Result<Self::Fragment, DecodeError>;

    /// Number echoed by the peer, for protocols that carry one usable for
    /// matching. `None` matches on the peer address alone.
    fn correlation(_fragment: &Self::Fragment) -> Option<u32> {
        None
    }

    fn has_more(fragment: &Self::Fragment) -> bool;

    fn merge(response: &mut Self::Response, fragment: Self::Fragment);
}

/// NTP mode 6 control queries.
pub struct NtpCodec;

impl Codec for NtpCodec {
    type Request = ControlMessage;
    type Response = ControlMessage;
    type Fragment = ControlMessage;

    const NAME: &'static str = "ntp";

    fn stamp(request: &mut ControlMessage, sequence: u32) -> u32 {
        request.header.sequence = sequence as u16;
        u32::from(request.header.sequence)
    }

    fn encode(request: &ControlMessage) -> Result<Vec<u8>, EncodeError> {
        Ok(request.to_wire())
    }

    fn decode(datagram: &[u8]) -> Result<ControlMessage, DecodeError> {
        ControlMessage::from_wire(datagram)
    }

    fn has_more(fragment: &ControlMessage) -> bool {
        fragment.has_more()
    }

    fn merge(response: &mut ControlMessage, fragment: ControlMessage) {
        response.absorb(fragment);
    }
}

/// The parts of an SNMP response the clients look at.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SnmpReply {
    pub error_status: i64,
    pub error_index: i64,
    pub varbinds: Vec<VarBind>,
}

impl SnmpReply {
    pub fn is_error(&self) -> bool {
        self.error_status != 0
    }
}

/// SNMP v1/v2c requests. Replies are matched on the request id as well.
pub struct SnmpCodec;

impl Codec for SnmpCodec {
    type Request = Message;
    type Response = SnmpReply;
    type Fragment = Message;

    const NAME: &'static str = "snmp";

    fn stamp(request: &mut Message, sequence: u32) -> u32 {
        // request ids stay positive, some agents mishandle negative ones
        let id = sequence & 0x7fff_ffff;
        request.pdu.request_id = id as i32;
        id
    }

    fn encode(request: &Message) -> Result<Vec<u8>, EncodeError> {
        request.encode()
    }

    fn decode(datagram: &[u8]) -> Result<Message, DecodeError> {
        let message = Message::decode(datagram)?;
        if message.pdu.pdu_type != PduType::Response {
            return Err(DecodeError::UnexpectedTag {
                expected: PduType::Response.tag(),
                found: message.pdu.pdu_type.tag(),
            });
        }
        Ok(message)
    }

    fn correlation(fragment: &Message) -> Option<u32> {
        Some(fragment.pdu.request_id as u32)
    }

    fn has_more(_fragment: &Message) -> bool {
        false
    }

    fn merge(response: &mut SnmpReply, fragment: Message) {
        response.error_status = fragment.pdu.error_status;
        response.error_index = fragment.pdu.error_index;
        response.varbinds = fragment.pdu.varbinds;
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
