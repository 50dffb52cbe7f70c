//! **mss**: client for the mss window-management scripting addition.
//!
//! The scripting addition runs inside Dock and listens on a per-user Unix
//! socket.  This crate speaks its binary protocol: it connects, negotiates
//! a capability bitmask, and then issues space, window and display
//! commands one at a time.
//!
//! # Architecture
//!
//! The crate is organised around two seams:
//!
//! * [`traits::Transport`] / [`traits::Connector`]: move bytes to and from
//!   the scripting addition, so the session logic is not coupled to a real
//!   socket.
//! * [`traits::System`]: the privileged host operations (root check, SIP
//!   state, copying the bundle, injecting) behind install and load.
//!
//! [`Context`] is the handle callers hold.  The wire format lives in
//! [`ipc::codec`], the one-call-at-a-time exchange in [`ipc::session`], and
//! the macOS backend in [`macos`].

pub mod command;
pub mod config;
pub mod context;
pub mod display;
pub mod error;
pub mod ipc;
pub mod lifecycle;
pub mod logging;
pub mod macos;
pub mod space;
pub mod traits;
pub mod window;

pub use command::{
    Capabilities, DisplayId, Frame, Handshake, SpaceId, WindowAnimation, WindowId, WindowLayer,
    WindowOrder, LIBRARY_VERSION,
};
pub use config::Config;
pub use context::Context;
pub use error::{Error, ErrorKind, Result};
