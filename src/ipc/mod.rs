//! IPC with the scripting addition over its Unix socket.
//!
//! Layered bottom-up: [`codec`] turns commands into frames and back,
//! [`transport`] moves bytes, and [`session`] runs the handshake and the
//! one-call-at-a-time request/response exchange.

pub mod codec;
pub mod session;
pub mod transport;

#[cfg(test)]
pub(crate) mod mock;
