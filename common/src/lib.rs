//! Types shared by every part of the poller: configuration, errors, the
//! host/attribute model handed in by the persistence layer, and logging.

pub mod config;
pub mod error;
pub mod host;
pub mod logging;
pub mod value;

pub use config::Config;
pub use error::{ConfigError, TransportError};
pub use host::{Attribute, Community, MonitoredHost, SnmpVersion};
pub use value::PollValue;
