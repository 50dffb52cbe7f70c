//! The handshaken channel every command travels over.
//!
//! A [`Session`] owns at most one [`Transport`].  All exchanges run under a
//! single internal lock held from the first byte sent to the last byte of
//! the reply: the protocol has no request ids, so interleaving two calls
//! would corrupt both.

use crate::command::{Command, Handshake, Reply};
use crate::error::{ConnectionError, Error, OperationFailure, Result};
use crate::ipc::codec::{self, ResponseHeader, Status, RESPONSE_HEADER_LEN};
use crate::traits::{Connector, Interrupter, Transport};
use log::{debug, info, warn};
use std::io;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Where the session stands.  Callers never observe a connection whose
/// handshake has not completed.
enum Link<T> {
    /// No handshake yet, or explicitly closed.
    Idle,
    /// The last connect attempt found nobody listening.
    Unreachable(String),
    /// The connection failed mid-session; a new handshake is required.
    Broken,
    Ready { transport: T, handshake: Handshake },
}

pub struct Session<T: Transport> {
    link: Mutex<Link<T>>,
    interrupter: Mutex<Option<Interrupter>>,
}

impl<T: Transport> Default for Session<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Transport> Session<T> {
    pub fn new() -> Self {
        Self {
            link: Mutex::new(Link::Idle),
            interrupter: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Link<T>> {
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_interrupter(&self, interrupter: Option<Interrupter>) {
        *self
            .interrupter
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = interrupter;
    }

    /// The cached handshake, if the session is connected.
    pub fn cached_handshake(&self) -> Option<Handshake> {
        match &*self.lock() {
            Link::Ready { handshake, .. } => Some(handshake.clone()),
            _ => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(&*self.lock(), Link::Ready { .. })
    }

    /// Connect through `connector` and perform the handshake.
    ///
    /// On an already connected session this returns the cached result
    /// without any I/O.
    pub fn handshake<C>(&self, connector: &C, path: &Path) -> Result<Handshake>
    where
        C: Connector<Transport = T>,
    {
        let mut link = self.lock();
        if let Link::Ready { handshake, .. } = &*link {
            return Ok(handshake.clone());
        }
        self.establish(&mut link, connector, path)
    }

    /// Drop the current connection, if any, and handshake afresh.
    pub fn reconnect<C>(&self, connector: &C, path: &Path) -> Result<Handshake>
    where
        C: Connector<Transport = T>,
    {
        let mut link = self.lock();
        self.teardown(&mut link, Link::Idle);
        self.establish(&mut link, connector, path)
    }

    fn establish<C>(&self, link: &mut Link<T>, connector: &C, path: &Path) -> Result<Handshake>
    where
        C: Connector<Transport = T>,
    {
        let mut transport = match connector.connect(path) {
            Ok(t) => t,
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::NotFound | io::ErrorKind::ConnectionRefused
                ) =>
            {
                let reason = format!("nothing listening at {}: {}", path.display(), e);
                info!("{}", reason);
                *link = Link::Unreachable(reason.clone());
                return Err(Error::NotLoaded(reason));
            }
            Err(e) => {
                warn!("connect to {} failed: {}", path.display(), e);
                *link = Link::Broken;
                return Err(ConnectionError::Io(e).into());
            }
        };

        // Armed before the hello so a stalled handshake can be interrupted.
        self.set_interrupter(transport.interrupter());
        match exchange_hello(&mut transport) {
            Ok(handshake) => {
                info!(
                    "handshake complete: version {} capabilities {}",
                    handshake.version, handshake.capabilities
                );
                *link = Link::Ready {
                    transport,
                    handshake: handshake.clone(),
                };
                Ok(handshake)
            }
            Err(e) => {
                warn!("handshake failed: {}", e);
                self.set_interrupter(None);
                transport.close();
                *link = Link::Broken;
                Err(e)
            }
        }
    }

    /// Send `command` and wait for its reply.
    ///
    /// Fails without touching the transport when the session is not
    /// connected or the scripting addition lacks a required capability.  A
    /// remote failure status leaves the connection usable; any transport or
    /// framing failure closes it.
    pub fn call(&self, command: &Command) -> Result<Reply> {
        let mut link = self.lock();
        let (transport, handshake) = match &mut *link {
            Link::Idle => return Err(OperationFailure::NotHandshaken.into()),
            Link::Unreachable(reason) => return Err(Error::NotLoaded(reason.clone())),
            Link::Broken => return Err(ConnectionError::Closed.into()),
            Link::Ready {
                transport,
                handshake,
            } => (transport, handshake),
        };

        let missing = handshake
            .capabilities
            .missing(command.required_capabilities());
        if !missing.is_empty() {
            debug!("{} refused locally: missing {}", command.name(), missing);
            return Err(OperationFailure::MissingCapability(missing).into());
        }

        let frame = codec::encode_command(command).map_err(|e| Error::InvalidArg(e.to_string()))?;
        debug!("-> {} ({} bytes)", command.name(), frame.len());

        let outcome = round_trip(transport, &frame).and_then(|(status, payload)| match status {
            Status::Failure => Ok(None),
            Status::Success => codec::decode_reply_for(command, &payload)
                .map(Some)
                .map_err(ConnectionError::Corrupt),
        });

        match outcome {
            Ok(Some(reply)) => {
                debug!("<- {} ok", command.name());
                Ok(reply)
            }
            Ok(None) => {
                debug!("<- {} failed remotely", command.name());
                Err(OperationFailure::Rejected(command.name()).into())
            }
            Err(e) => {
                warn!("{} lost the connection: {}", command.name(), e);
                self.teardown(&mut link, Link::Broken);
                Err(e.into())
            }
        }
    }

    /// Close the connection.  Later calls fail until a new handshake.
    pub fn close(&self) {
        let mut link = self.lock();
        self.teardown(&mut link, Link::Idle);
    }

    /// Shut the connection down from another thread.
    ///
    /// An in-flight call fails with a connection error; the session is then
    /// broken and needs a new handshake.
    pub fn interrupt(&self) {
        if let Some(handle) = self
            .interrupter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            info!("interrupting session");
            handle.interrupt();
        }
    }

    fn teardown(&self, link: &mut Link<T>, next: Link<T>) {
        if let Link::Ready { transport, .. } = link {
            transport.close();
        }
        self.set_interrupter(None);
        *link = next;
    }
}

/// Send `frame`, then read one response header and its payload.
fn round_trip<T: Transport>(
    transport: &mut T,
    frame: &[u8],
) -> std::result::Result<(Status, Vec<u8>), ConnectionError> {
    transport.send_all(frame)?;
    let mut header = [0u8; RESPONSE_HEADER_LEN];
    transport.recv_exact(&mut header)?;
    let header = ResponseHeader::decode(&header)?;
    let mut payload = vec![0u8; header.payload_len as usize];
    transport.recv_exact(&mut payload)?;
    Ok((header.status, payload))
}

fn exchange_hello<T: Transport>(transport: &mut T) -> Result<Handshake> {
    let (status, payload) = round_trip(transport, &codec::encode_hello_request())?;
    match status {
        Status::Success => Ok(codec::decode_hello(&payload)?),
        Status::Failure => Err(OperationFailure::Rejected("handshake").into()),
    }
}
