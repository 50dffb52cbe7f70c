//! In-memory stand-in for the scripting addition.
//!
//! [`MockExtension`] speaks the real wire protocol through the codec: it
//! parses every request frame it receives, records the decoded command and
//! answers through a handler.  It also counts bytes and flags overlapping
//! exchanges.

use crate::command::{Capabilities, Command, Handshake, Reply};
use crate::error::ConnectionError;
use crate::ipc::codec::{self, Status, REQUEST_HEADER_LEN, TAG_HANDSHAKE};
use crate::traits::{Connector, Transport};
use std::collections::VecDeque;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How the mock answers one command.
pub(crate) enum Answer {
    Reply(Reply),
    Fail,
    /// Send these bytes verbatim as the response.
    Raw(Vec<u8>),
    /// Send nothing; the client's read times out.
    Silence,
}

type Handler = Box<dyn Fn(&Command) -> Answer + Send + Sync>;

pub(crate) struct MockExtension {
    handshake: Mutex<Handshake>,
    handler: Handler,
    commands: Mutex<Vec<Command>>,
    frames: Mutex<Vec<Vec<u8>>>,
    bytes_sent: AtomicUsize,
    listening: AtomicBool,
    io_delay: AtomicBool,
    in_flight: AtomicBool,
    pub connects: AtomicUsize,
    pub overlaps: AtomicUsize,
}

impl MockExtension {
    /// An extension that acknowledges everything.
    pub fn new(capabilities: Capabilities, version: &str) -> Arc<Self> {
        Self::with_handler(capabilities, version, |_| Answer::Reply(Reply::Ack))
    }

    pub fn with_handler(
        capabilities: Capabilities,
        version: &str,
        handler: impl Fn(&Command) -> Answer + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            handshake: Mutex::new(Handshake {
                capabilities,
                version: version.into(),
            }),
            handler: Box::new(handler),
            commands: Mutex::new(Vec::new()),
            frames: Mutex::new(Vec::new()),
            bytes_sent: AtomicUsize::new(0),
            listening: AtomicBool::new(true),
            io_delay: AtomicBool::new(false),
            in_flight: AtomicBool::new(false),
            connects: AtomicUsize::new(0),
            overlaps: AtomicUsize::new(0),
        })
    }

    pub fn set_handshake(&self, capabilities: Capabilities, version: &str) {
        *self.handshake.lock().unwrap() = Handshake {
            capabilities,
            version: version.into(),
        };
    }

    pub fn set_listening(&self, listening: bool) {
        self.listening.store(listening, Ordering::SeqCst);
    }

    /// Sleep inside every send and receive, widening any race window.
    pub fn set_io_delay(&self, delay: bool) {
        self.io_delay.store(delay, Ordering::SeqCst);
    }

    pub fn bytes_sent(&self) -> usize {
        self.bytes_sent.load(Ordering::SeqCst)
    }

    /// Every non-handshake command received, in order.
    pub fn commands(&self) -> Vec<Command> {
        self.commands.lock().unwrap().clone()
    }

    /// Raw request frames, handshake included.
    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.frames.lock().unwrap().clone()
    }

    fn pause(&self) {
        if self.io_delay.load(Ordering::SeqCst) {
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    /// Produce the response bytes for one complete request frame, or `None`
    /// when the mock stays silent.
    fn respond(&self, frame: &[u8]) -> Option<Vec<u8>> {
        self.frames.lock().unwrap().push(frame.to_vec());
        let tag = u16::from_le_bytes([frame[0], frame[1]]);
        if tag == TAG_HANDSHAKE {
            if codec::decode_hello_request(frame).is_err() {
                return Some(codec::encode_response(Status::Failure, &[]).unwrap());
            }
            let hello = codec::encode_hello(&self.handshake.lock().unwrap()).unwrap();
            return Some(codec::encode_response(Status::Success, &hello).unwrap());
        }
        let command = match codec::decode_command(frame) {
            Ok(c) => c,
            Err(_) => return Some(codec::encode_response(Status::Failure, &[]).unwrap()),
        };
        self.commands.lock().unwrap().push(command.clone());
        match (self.handler)(&command) {
            Answer::Reply(reply) => {
                let payload = codec::encode_reply(&reply).unwrap();
                Some(codec::encode_response(Status::Success, &payload).unwrap())
            }
            Answer::Fail => Some(codec::encode_response(Status::Failure, &[]).unwrap()),
            Answer::Raw(bytes) => Some(bytes),
            Answer::Silence => None,
        }
    }
}

pub(crate) struct MockTransport {
    ext: Arc<MockExtension>,
    inbox: Vec<u8>,
    outbox: VecDeque<u8>,
    closed: bool,
}

impl Transport for MockTransport {
    fn send_all(&mut self, bytes: &[u8]) -> Result<(), ConnectionError> {
        if self.closed {
            return Err(ConnectionError::Closed);
        }
        if self.ext.in_flight.swap(true, Ordering::SeqCst) {
            self.ext.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        self.ext.pause();
        self.ext.bytes_sent.fetch_add(bytes.len(), Ordering::SeqCst);
        self.inbox.extend_from_slice(bytes);

        while self.inbox.len() >= REQUEST_HEADER_LEN {
            let len = u32::from_le_bytes(self.inbox[2..6].try_into().unwrap()) as usize;
            if self.inbox.len() < REQUEST_HEADER_LEN + len {
                break;
            }
            let frame: Vec<u8> = self.inbox.drain(..REQUEST_HEADER_LEN + len).collect();
            if let Some(response) = self.ext.respond(&frame) {
                self.outbox.extend(response);
            }
        }
        Ok(())
    }

    fn recv_exact(&mut self, buf: &mut [u8]) -> Result<(), ConnectionError> {
        if self.closed {
            return Err(ConnectionError::Closed);
        }
        self.ext.pause();
        if self.outbox.len() < buf.len() {
            self.ext.in_flight.store(false, Ordering::SeqCst);
            return Err(ConnectionError::Timeout);
        }
        for b in buf.iter_mut() {
            // Length checked above.
            *b = self.outbox.pop_front().unwrap_or_default();
        }
        if self.outbox.is_empty() {
            self.ext.in_flight.store(false, Ordering::SeqCst);
        }
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

/// Hands out [`MockTransport`]s wired to one [`MockExtension`].
pub(crate) struct MockConnector {
    ext: Arc<MockExtension>,
}

impl MockConnector {
    pub fn new(ext: Arc<MockExtension>) -> Self {
        Self { ext }
    }
}

impl Connector for MockConnector {
    type Transport = MockTransport;

    fn connect(&self, _path: &Path) -> io::Result<MockTransport> {
        if !self.ext.listening.load(Ordering::SeqCst) {
            return Err(io::ErrorKind::NotFound.into());
        }
        self.ext.connects.fetch_add(1, Ordering::SeqCst);
        Ok(MockTransport {
            ext: self.ext.clone(),
            inbox: Vec::new(),
            outbox: VecDeque::new(),
            closed: false,
        })
    }
}
