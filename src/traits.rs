//! Core traits that decouple mss from any specific transport or operating
//! system backend.
//!
//! Every concrete backend (a Unix socket, the macOS lifecycle helpers, a test
//! harness, …) implements one of these traits.  The
//! [`Context`](crate::context::Context) only depends on these abstractions.

use crate::error::ConnectionError;
use std::fmt;
use std::io;
use std::path::Path;

/// A connected byte stream to the scripting addition.
///
/// Implementations provide exactly two I/O primitives and no buffering;
/// framing is the session's concern.
///
/// # Contract
///
/// * [`send_all`](Transport::send_all) returns only once every byte has been
///   written, or with an error.
/// * [`recv_exact`](Transport::recv_exact) fills the whole buffer or fails;
///   a short read is never reported as success.  A peer that closes the
///   stream yields [`ConnectionError::PeerClosed`].
pub trait Transport: Send {
    fn send_all(&mut self, bytes: &[u8]) -> Result<(), ConnectionError>;

    fn recv_exact(&mut self, buf: &mut [u8]) -> Result<(), ConnectionError>;

    /// Tear the connection down.  Idempotent.
    fn close(&mut self);

    /// A handle able to shut the connection down from another thread while
    /// a call is blocked inside [`recv_exact`](Transport::recv_exact).
    fn interrupter(&self) -> Option<Interrupter> {
        None
    }
}

/// Opens [`Transport`]s to a socket path.
pub trait Connector: Send + Sync {
    type Transport: Transport;

    /// Connect to `path`.
    ///
    /// `NotFound` and `ConnectionRefused` errors mean nobody is listening,
    /// which the session reports as "not loaded".
    fn connect(&self, path: &Path) -> io::Result<Self::Transport>;
}

/// Out-of-band shutdown handle returned by [`Transport::interrupter`].
pub struct Interrupter(Box<dyn Fn() + Send + Sync>);

impl Interrupter {
    pub fn new(f: impl Fn() + Send + Sync + 'static) -> Self {
        Self(Box::new(f))
    }

    pub fn interrupt(&self) {
        (self.0)()
    }
}

impl fmt::Debug for Interrupter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Interrupter")
    }
}

/// The operating-system collaborators the lifecycle flows sequence.
///
/// Nothing here talks to the scripting addition; these are the filesystem,
/// privilege and injection steps around it.
pub trait System {
    /// The error type produced by this backend.
    type Error: std::error::Error + Send + 'static;

    /// Whether the caller runs with root privileges.
    fn is_root(&self) -> bool;

    /// Whether OS protections and boot configuration allow loading the
    /// scripting addition.  `Err` carries a human-readable reason.
    fn protections(&self) -> Result<(), String>;

    fn is_installed(&self) -> bool;

    /// Copy the scripting addition bundle into the system directory.
    fn install_payload(&self) -> Result<(), Self::Error>;

    /// Remove the bundle from the system directory.  Removing a bundle that
    /// is not installed succeeds.
    fn uninstall_payload(&self) -> Result<(), Self::Error>;

    /// Ask the host process to load the installed scripting addition.
    fn inject(&self) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn interrupter_runs_its_closure() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();
        let handle = Interrupter::new(move || flag.store(true, Ordering::SeqCst));
        handle.interrupt();
        assert!(fired.load(Ordering::SeqCst));
    }
}
