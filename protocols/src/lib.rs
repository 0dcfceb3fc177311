//! # Wire Codec
//!
//! Pure encode/decode of the protocols the poller speaks. Nothing in here
//! touches a socket; the dispatchers in `rnms-core` own all I/O.
//!
//! * [`ntp`]: NTP mode 6 control messages (peer listings and association data).
//! * [`snmp`]: community based SNMP v1/v2c messages in BER.
//! * [`oid`]: object identifiers shared by the SNMP codec and its callers.

pub mod error;
pub mod ntp;
pub mod oid;
pub mod snmp;

pub use error::{DecodeError, EncodeError};
pub use oid::Oid;
