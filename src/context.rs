//! The opaque handle callers hold.
//!
//! A [`Context`] owns the resolved socket path, a [`Connector`] and exactly
//! one [`Session`].  The per-operation methods live next to their domain in
//! [`space`](crate::space), [`window`](crate::window),
//! [`display`](crate::display) and [`lifecycle`](crate::lifecycle).
//!
//! # Typical usage
//!
//! ```ignore
//! let ctx = Context::open(&Config::default())?;
//! let hs = ctx.handshake()?;
//! ctx.window_set_opacity(wid, 0.5)?;
//! ctx.close();
//! ```

use crate::command::{Capabilities, Command, Handshake, Reply};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::ipc::codec::ProtocolError;
use crate::ipc::session::Session;
use crate::ipc::transport::UnixConnector;
use crate::traits::Connector;
use log::info;
use std::path::{Path, PathBuf};

/// Connection state and cached handshake for one scripting addition.
///
/// Every method takes `&self`; calls from several threads are serialized by
/// the session, one exchange at a time.
pub struct Context<C: Connector = UnixConnector> {
    socket_path: PathBuf,
    connector: C,
    session: Session<C::Transport>,
}

impl Context {
    /// Create a context for the socket described by `config`.
    ///
    /// Nothing is connected yet; call [`handshake`](Context::handshake).
    pub fn open(config: &Config) -> Result<Self> {
        config.validate().map_err(|e| Error::Init(e.to_string()))?;
        let path = config
            .resolve_socket_path()
            .map_err(|e| Error::Init(e.to_string()))?;
        Ok(Self::with_connector(path, UnixConnector::new(config.timeout())))
    }
}

impl<C: Connector> Context<C> {
    pub fn with_connector(socket_path: impl Into<PathBuf>, connector: C) -> Self {
        let socket_path = socket_path.into();
        info!("context for {}", socket_path.display());
        Self {
            socket_path,
            connector,
            session: Session::new(),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Connect and negotiate capabilities.
    ///
    /// Performed at most once per connection: later calls return the cached
    /// result without touching the socket.
    pub fn handshake(&self) -> Result<Handshake> {
        self.session.handshake(&self.connector, &self.socket_path)
    }

    /// Drop any connection and handshake again, picking up a scripting
    /// addition that was (re)loaded since.
    pub fn reconnect(&self) -> Result<Handshake> {
        self.session.reconnect(&self.connector, &self.socket_path)
    }

    /// Capabilities from the last handshake, if connected.
    pub fn capabilities(&self) -> Option<Capabilities> {
        self.session.cached_handshake().map(|hs| hs.capabilities)
    }

    /// Version string from the last handshake, if connected.
    pub fn version(&self) -> Option<String> {
        self.session.cached_handshake().map(|hs| hs.version)
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    /// Abort any in-flight call from another thread by shutting the socket
    /// down.  The context then needs a new handshake.
    pub fn interrupt(&self) {
        self.session.interrupt();
    }

    /// Release the connection.
    pub fn close(self) {
        self.session.close();
        info!("context for {} closed", self.socket_path.display());
    }

    /// Validate `command` locally, then run it through the session.
    pub(crate) fn call(&self, command: Command) -> Result<Reply> {
        command.validate().map_err(Error::InvalidArg)?;
        self.session.call(&command)
    }

    pub(crate) fn call_ack(&self, command: Command) -> Result<()> {
        match self.call(command)? {
            Reply::Ack => Ok(()),
            _ => Err(ProtocolError::ShapeMismatch.into()),
        }
    }
}
