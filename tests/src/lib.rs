//! End-to-end tests against fake devices bound on loopback.

#[cfg(test)]
mod support;

mod discovery;
mod polling;
mod transport;
