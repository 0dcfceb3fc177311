//! # SNMP Messages
//!
//! Community based SNMP (v1 and v2c) in BER. Only the PDUs the poller needs
//! are supported: `GetRequest`, `GetNextRequest` and `GetResponse`.
//!
//! ```text
//! Message ::= SEQUENCE { version INTEGER, community OCTET STRING, data PDU }
//! PDU     ::= [tag] { request-id INTEGER, error-status INTEGER,
//!                     error-index INTEGER, varbinds SEQUENCE OF VarBind }
//! VarBind ::= SEQUENCE { name OBJECT IDENTIFIER, value ANY }
//! ```

use crate::error::{DecodeError, EncodeError};
use crate::oid::Oid;

pub mod tag {
    pub const INTEGER: u8 = 0x02;
    pub const OCTET_STRING: u8 = 0x04;
    pub const NULL: u8 = 0x05;
    pub const OBJECT_ID: u8 = 0x06;
    pub const SEQUENCE: u8 = 0x30;
    pub const IP_ADDRESS: u8 = 0x40;
    pub const COUNTER32: u8 = 0x41;
    pub const GAUGE32: u8 = 0x42;
    pub const TIMETICKS: u8 = 0x43;
    pub const OPAQUE: u8 = 0x44;
    pub const COUNTER64: u8 = 0x46;
    pub const NO_SUCH_OBJECT: u8 = 0x80;
    pub const NO_SUCH_INSTANCE: u8 = 0x81;
    pub const END_OF_MIB_VIEW: u8 = 0x82;
    pub const GET_REQUEST: u8 = 0xa0;
    pub const GET_NEXT_REQUEST: u8 = 0xa1;
    pub const GET_RESPONSE: u8 = 0xa2;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Version {
    V1,
    #[default]
    V2c,
}

impl Version {
    fn wire(self) -> i64 {
        match self {
            Version::V1 => 0,
            Version::V2c => 1,
        }
    }

    fn from_wire(value: i64) -> Result<Self, DecodeError> {
        match value {
            0 => Ok(Version::V1),
            1 => Ok(Version::V2c),
            other => Err(DecodeError::UnsupportedVersion(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PduType {
    Get,
    GetNext,
    Response,
}

impl PduType {
    pub fn tag(self) -> u8 {
        match self {
            PduType::Get => tag::GET_REQUEST,
            PduType::GetNext => tag::GET_NEXT_REQUEST,
            PduType::Response => tag::GET_RESPONSE,
        }
    }

    fn from_tag(found: u8) -> Result<Self, DecodeError> {
        match found {
            tag::GET_REQUEST => Ok(PduType::Get),
            tag::GET_NEXT_REQUEST => Ok(PduType::GetNext),
            tag::GET_RESPONSE => Ok(PduType::Response),
            _ => Err(DecodeError::UnexpectedTag {
                expected: tag::GET_RESPONSE,
                found,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Integer(i64),
    OctetString(Vec<u8>),
    Null,
    ObjectId(Oid),
    IpAddress([u8; 4]),
    Counter32(u32),
    Gauge32(u32),
    TimeTicks(u32),
    Counter64(u64),
    Opaque(Vec<u8>),
    NoSuchObject,
    NoSuchInstance,
    EndOfMibView,
}

impl Value {
    /// v2c exception values and `Null` carry no data.
    pub fn is_absent(&self) -> bool {
        matches!(
            self,
            Value::Null | Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView
        )
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            Value::Counter32(v) | Value::Gauge32(v) | Value::TimeTicks(v) => Some(i64::from(*v)),
            Value::Counter64(v) => i64::try_from(*v).ok(),
            Value::OctetString(bytes) => std::str::from_utf8(bytes).ok()?.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Counter64(v) => Some(*v as f64),
            Value::OctetString(bytes) => std::str::from_utf8(bytes).ok()?.trim().parse().ok(),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    /// Text form, as a poller would store it.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::OctetString(bytes) | Value::Opaque(bytes) => {
                Some(String::from_utf8_lossy(bytes).into_owned())
            }
            Value::ObjectId(oid) => Some(oid.to_string()),
            Value::IpAddress([a, b, c, d]) => Some(format!("{a}.{b}.{c}.{d}")),
            Value::Integer(v) => Some(v.to_string()),
            Value::Counter32(v) | Value::Gauge32(v) | Value::TimeTicks(v) => Some(v.to_string()),
            Value::Counter64(v) => Some(v.to_string()),
            Value::Null | Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarBind {
    pub oid: Oid,
    pub value: Value,
}

impl VarBind {
    pub fn new(oid: Oid, value: Value) -> Self {
        Self { oid, value }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pdu {
    pub pdu_type: PduType,
    pub request_id: i32,
    pub error_status: i64,
    pub error_index: i64,
    pub varbinds: Vec<VarBind>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub version: Version,
    pub community: String,
    pub pdu: Pdu,
}

impl Message {
    pub fn get(version: Version, community: &str, oids: &[Oid]) -> Self {
        Self::request(PduType::Get, version, community, oids)
    }

    pub fn get_next(version: Version, community: &str, oids: &[Oid]) -> Self {
        Self::request(PduType::GetNext, version, community, oids)
    }

    /// Builds the reply an agent would send for `request`.
    pub fn response_to(request: &Message, varbinds: Vec<VarBind>) -> Self {
        Self {
            version: request.version,
            community: request.community.clone(),
            pdu: Pdu {
                pdu_type: PduType::Response,
                request_id: request.pdu.request_id,
                error_status: 0,
                error_index: 0,
                varbinds,
            },
        }
    }

    fn request(pdu_type: PduType, version: Version, community: &str, oids: &[Oid]) -> Self {
        Self {
            version,
            community: community.to_string(),
            pdu: Pdu {
                pdu_type,
                request_id: 0,
                error_status: 0,
                error_index: 0,
                varbinds: oids
                    .iter()
                    .map(|oid| VarBind::new(oid.clone(), Value::Null))
                    .collect(),
            },
        }
    }

    /// Fails only when an object identifier has no BER form.
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let mut varbinds = Vec::new();
        for varbind in &self.pdu.varbinds {
            let mut inner = Vec::new();
            write_tlv(&mut inner, tag::OBJECT_ID, &encode_oid(&varbind.oid)?);
            encode_value(&mut inner, &varbind.value)?;
            write_tlv(&mut varbinds, tag::SEQUENCE, &inner);
        }

        let mut pdu = Vec::new();
        write_integer(&mut pdu, i64::from(self.pdu.request_id));
        write_integer(&mut pdu, self.pdu.error_status);
        write_integer(&mut pdu, self.pdu.error_index);
        write_tlv(&mut pdu, tag::SEQUENCE, &varbinds);

        let mut body = Vec::new();
        write_integer(&mut body, self.version.wire());
        write_tlv(&mut body, tag::OCTET_STRING, self.community.as_bytes());
        write_tlv(&mut body, self.pdu.pdu_type.tag(), &pdu);

        let mut out = Vec::with_capacity(body.len() + 4);
        write_tlv(&mut out, tag::SEQUENCE, &body);
        Ok(out)
    }

    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let mut outer = Reader::new(data);
        let mut body = Reader::new(outer.expect(tag::SEQUENCE)?);

        let version = Version::from_wire(decode_integer(body.expect(tag::INTEGER)?)?)?;
        let community = String::from_utf8_lossy(body.expect(tag::OCTET_STRING)?).into_owned();

        let (pdu_tag, pdu_content) = body.next_tlv()?;
        let pdu_type = PduType::from_tag(pdu_tag)?;
        let mut pdu = Reader::new(pdu_content);
        let request_id = decode_integer(pdu.expect(tag::INTEGER)?)? as i32;
        let error_status = decode_integer(pdu.expect(tag::INTEGER)?)?;
        let error_index = decode_integer(pdu.expect(tag::INTEGER)?)?;

        let mut list = Reader::new(pdu.expect(tag::SEQUENCE)?);
        let mut varbinds = Vec::new();
        while !list.is_empty() {
            let mut varbind = Reader::new(list.expect(tag::SEQUENCE)?);
            let oid = decode_oid(varbind.expect(tag::OBJECT_ID)?)?;
            let (value_tag, content) = varbind.next_tlv()?;
            varbinds.push(VarBind::new(oid, decode_value(value_tag, content)?));
        }

        Ok(Self {
            version,
            community,
            pdu: Pdu {
                pdu_type,
                request_id,
                error_status,
                error_index,
                varbinds,
            },
        })
    }
}

// ----- encoding -----

fn write_length(out: &mut Vec<u8>, len: usize) {
    if len < 0x80 {
        out.push(len as u8);
        return;
    }
    let bytes = len.to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count();
    let significant = &bytes[skip..];
    out.push(0x80 | significant.len() as u8);
    out.extend_from_slice(significant);
}

fn write_tlv(out: &mut Vec<u8>, tag: u8, content: &[u8]) {
    out.push(tag);
    write_length(out, content.len());
    out.extend_from_slice(content);
}

fn write_integer(out: &mut Vec<u8>, value: i64) {
    let bytes = value.to_be_bytes();
    let mut start = 0;
    // drop redundant sign bytes
    while start < 7 {
        let redundant = (bytes[start] == 0x00 && bytes[start + 1] & 0x80 == 0)
            || (bytes[start] == 0xff && bytes[start + 1] & 0x80 != 0);
        if !redundant {
            break;
        }
        start += 1;
    }
    write_tlv(out, tag::INTEGER, &bytes[start..]);
}

fn write_unsigned(out: &mut Vec<u8>, tag: u8, value: u64) {
    let bytes = value.to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count().min(7);
    let mut content = Vec::with_capacity(9);
    if bytes[skip] & 0x80 != 0 {
        content.push(0);
    }
    content.extend_from_slice(&bytes[skip..]);
    write_tlv(out, tag, &content);
}

fn encode_oid(oid: &Oid) -> Result<Vec<u8>, EncodeError> {
    let first = oid
        .leading_subidentifier()
        .ok_or_else(|| EncodeError::UnencodableOid(oid.to_string()))?;
    let mut out = Vec::new();
    encode_subidentifier(&mut out, first);
    oid.arcs()
        .iter()
        .skip(2)
        .for_each(|arc| encode_subidentifier(&mut out, *arc));
    Ok(out)
}

fn encode_subidentifier(out: &mut Vec<u8>, mut arc: u32) {
    let mut stack = [0u8; 5];
    let mut n = 0;
    loop {
        stack[n] = (arc & 0x7f) as u8;
        n += 1;
        arc >>= 7;
        if arc == 0 {
            break;
        }
    }
    for i in (0..n).rev() {
        let continuation = if i > 0 { 0x80 } else { 0 };
        out.push(stack[i] | continuation);
    }
}

fn encode_value(out: &mut Vec<u8>, value: &Value) -> Result<(), EncodeError> {
    match value {
        Value::Integer(v) => write_integer(out, *v),
        Value::OctetString(bytes) => write_tlv(out, tag::OCTET_STRING, bytes),
        Value::Null => write_tlv(out, tag::NULL, &[]),
        Value::ObjectId(oid) => write_tlv(out, tag::OBJECT_ID, &encode_oid(oid)?),
        Value::IpAddress(octets) => write_tlv(out, tag::IP_ADDRESS, octets),
        Value::Counter32(v) => write_unsigned(out, tag::COUNTER32, u64::from(*v)),
        Value::Gauge32(v) => write_unsigned(out, tag::GAUGE32, u64::from(*v)),
        Value::TimeTicks(v) => write_unsigned(out, tag::TIMETICKS, u64::from(*v)),
        Value::Counter64(v) => write_unsigned(out, tag::COUNTER64, *v),
        Value::Opaque(bytes) => write_tlv(out, tag::OPAQUE, bytes),
        Value::NoSuchObject => write_tlv(out, tag::NO_SUCH_OBJECT, &[]),
        Value::NoSuchInstance => write_tlv(out, tag::NO_SUCH_INSTANCE, &[]),
        Value::EndOfMibView => write_tlv(out, tag::END_OF_MIB_VIEW, &[]),
    }
    Ok(())
}

// ----- decoding -----

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn byte(&mut self) -> Result<u8, DecodeError> {
        let byte = *self.data.get(self.pos).ok_or(DecodeError::Truncated {
            needed: self.pos + 1,
            available: self.data.len(),
        })?;
        self.pos += 1;
        Ok(byte)
    }

    fn length(&mut self) -> Result<usize, DecodeError> {
        let first = self.byte()?;
        if first & 0x80 == 0 {
            return Ok(usize::from(first));
        }
        let octets = usize::from(first & 0x7f);
        if octets == 0 || octets > 4 {
            return Err(DecodeError::BadLength);
        }
        let mut len = 0usize;
        for _ in 0..octets {
            len = (len << 8) | usize::from(self.byte()?);
        }
        Ok(len)
    }

    fn next_tlv(&mut self) -> Result<(u8, &'a [u8]), DecodeError> {
        let found = self.byte()?;
        let len = self.length()?;
        let end = self.pos + len;
        if end > self.data.len() {
            return Err(DecodeError::Truncated {
                needed: end,
                available: self.data.len(),
            });
        }
        let content = &self.data[self.pos..end];
        self.pos = end;
        Ok((found, content))
    }

    fn expect(&mut self, expected: u8) -> Result<&'a [u8], DecodeError> {
        let (found, content) = self.next_tlv()?;
        if found != expected {
            return Err(DecodeError::UnexpectedTag { expected, found });
        }
        Ok(content)
    }
}

fn decode_integer(content: &[u8]) -> Result<i64, DecodeError> {
    if content.is_empty() {
        return Err(DecodeError::BadLength);
    }
    if content.len() > 8 {
        return Err(DecodeError::IntegerOverflow);
    }
    let negative = content[0] & 0x80 != 0;
    let mut value: i64 = if negative { -1 } else { 0 };
    for byte in content {
        value = (value << 8) | i64::from(*byte);
    }
    Ok(value)
}

fn decode_unsigned(content: &[u8]) -> Result<u64, DecodeError> {
    if content.is_empty() {
        return Err(DecodeError::BadLength);
    }
    let skip = content.iter().take_while(|b| **b == 0).count();
    let significant = &content[skip..];
    if significant.len() > 8 {
        return Err(DecodeError::IntegerOverflow);
    }
    Ok(significant
        .iter()
        .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte)))
}

fn decode_u32(content: &[u8]) -> Result<u32, DecodeError> {
    u32::try_from(decode_unsigned(content)?).map_err(|_| DecodeError::IntegerOverflow)
}

fn decode_oid(content: &[u8]) -> Result<Oid, DecodeError> {
    if content.is_empty() {
        return Err(DecodeError::BadOid(String::from("empty")));
    }
    let mut subids = Vec::new();
    let mut current: u32 = 0;
    for (i, byte) in content.iter().enumerate() {
        if current > (u32::MAX >> 7) {
            return Err(DecodeError::BadOid(format!("arc overflow at byte {i}")));
        }
        current = (current << 7) | u32::from(byte & 0x7f);
        if byte & 0x80 == 0 {
            subids.push(current);
            current = 0;
        } else if i == content.len() - 1 {
            return Err(DecodeError::BadOid(String::from("unterminated arc")));
        }
    }

    let first = subids[0];
    let mut arcs = Vec::with_capacity(subids.len() + 1);
    match first {
        0..=39 => arcs.extend([0, first]),
        40..=79 => arcs.extend([1, first - 40]),
        _ => arcs.extend([2, first - 80]),
    }
    arcs.extend_from_slice(&subids[1..]);
    Ok(Oid::new(arcs))
}

fn decode_value(found: u8, content: &[u8]) -> Result<Value, DecodeError> {
    let value = match found {
        tag::INTEGER => Value::Integer(decode_integer(content)?),
        tag::OCTET_STRING => Value::OctetString(content.to_vec()),
        tag::NULL => Value::Null,
        tag::OBJECT_ID => Value::ObjectId(decode_oid(content)?),
        tag::IP_ADDRESS => {
            let octets: [u8; 4] = content.try_into().map_err(|_| DecodeError::BadLength)?;
            Value::IpAddress(octets)
        }
        tag::COUNTER32 => Value::Counter32(decode_u32(content)?),
        tag::GAUGE32 => Value::Gauge32(decode_u32(content)?),
        tag::TIMETICKS => Value::TimeTicks(decode_u32(content)?),
        tag::COUNTER64 => Value::Counter64(decode_unsigned(content)?),
        tag::OPAQUE => Value::Opaque(content.to_vec()),
        tag::NO_SUCH_OBJECT => Value::NoSuchObject,
        tag::NO_SUCH_INSTANCE => Value::NoSuchInstance,
        tag::END_OF_MIB_VIEW => Value::EndOfMibView,
        other => {
            return Err(DecodeError::UnexpectedTag {
                expected: tag::NULL,
                found: other,
            });
        }
    };
    Ok(value)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
