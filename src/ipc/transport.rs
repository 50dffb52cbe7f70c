//! Blocking stream [`Transport`] and the Unix-socket [`Connector`].
//!
//! A short write or read on a stream socket is normal; both primitives loop
//! until the whole buffer has moved.

use crate::error::ConnectionError;
use crate::traits::{Connector, Interrupter, Transport};
use log::debug;
use std::io::{self, Read, Write};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::Duration;

/// [`Transport`] over any blocking byte stream.
pub struct StreamTransport<S> {
    stream: Option<S>,
}

impl<S> StreamTransport<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream: Some(stream),
        }
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }
}

fn classify(e: io::Error) -> ConnectionError {
    match e.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => ConnectionError::Timeout,
        io::ErrorKind::BrokenPipe
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::UnexpectedEof
        | io::ErrorKind::WriteZero => ConnectionError::PeerClosed,
        _ => ConnectionError::Io(e),
    }
}

impl<S: Read + Write + Send> StreamTransport<S> {
    fn stream(&mut self) -> Result<&mut S, ConnectionError> {
        self.stream.as_mut().ok_or(ConnectionError::Closed)
    }

    fn write_loop(&mut self, bytes: &[u8]) -> Result<(), ConnectionError> {
        let stream = self.stream()?;
        let mut written = 0;
        while written < bytes.len() {
            match stream.write(&bytes[written..]) {
                Ok(0) => return Err(ConnectionError::PeerClosed),
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(classify(e)),
            }
        }
        stream.flush().map_err(classify)
    }

    fn read_loop(&mut self, buf: &mut [u8]) -> Result<(), ConnectionError> {
        let stream = self.stream()?;
        let mut filled = 0;
        while filled < buf.len() {
            match stream.read(&mut buf[filled..]) {
                Ok(0) => return Err(ConnectionError::PeerClosed),
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(classify(e)),
            }
        }
        Ok(())
    }
}

impl<S: Read + Write + Send> Transport for StreamTransport<S> {
    fn send_all(&mut self, bytes: &[u8]) -> Result<(), ConnectionError> {
        self.write_loop(bytes)
    }

    fn recv_exact(&mut self, buf: &mut [u8]) -> Result<(), ConnectionError> {
        self.read_loop(buf)
    }

    fn close(&mut self) {
        self.stream = None;
    }
}

/// The transport used against a real scripting addition.
///
/// Unlike a plain [`StreamTransport`] it can be shut down from another
/// thread through [`Transport::interrupter`].
pub struct UnixTransport(StreamTransport<UnixStream>);

impl UnixTransport {
    pub fn new(stream: UnixStream) -> Self {
        Self(StreamTransport::new(stream))
    }
}

impl Transport for UnixTransport {
    fn send_all(&mut self, bytes: &[u8]) -> Result<(), ConnectionError> {
        self.0.send_all(bytes)
    }

    fn recv_exact(&mut self, buf: &mut [u8]) -> Result<(), ConnectionError> {
        self.0.recv_exact(buf)
    }

    fn close(&mut self) {
        if let Some(stream) = self.0.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }

    fn interrupter(&self) -> Option<Interrupter> {
        let clone = self.0.stream.as_ref()?.try_clone().ok()?;
        Some(Interrupter::new(move || {
            let _ = clone.shutdown(Shutdown::Both);
        }))
    }
}

/// Connects to the scripting addition's Unix socket.
///
/// Every stream gets `timeout` as its read and write timeout, so a hung
/// server surfaces as [`ConnectionError::Timeout`] instead of blocking
/// forever.  A zero `timeout` means no timeout.
#[derive(Debug, Clone)]
pub struct UnixConnector {
    timeout: Duration,
}

impl UnixConnector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Connector for UnixConnector {
    type Transport = UnixTransport;

    fn connect(&self, path: &Path) -> io::Result<UnixTransport> {
        let stream = UnixStream::connect(path)?;
        let timeout = Some(self.timeout).filter(|t| !t.is_zero());
        stream.set_read_timeout(timeout)?;
        stream.set_write_timeout(timeout)?;
        debug!("connected to {}", path.display());
        Ok(UnixTransport::new(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::os::unix::net::UnixListener;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Monotonic counter to generate unique socket paths per test.
    static TEST_ID: AtomicU32 = AtomicU32::new(0);

    fn tmp_socket_path() -> PathBuf {
        let id = TEST_ID.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!("mss-transport-{}-{}.sock", std::process::id(), id))
    }

    /// A stream that moves at most `chunk` bytes per call.
    struct Trickle {
        input: Cursor<Vec<u8>>,
        output: Vec<u8>,
        chunk: usize,
        interrupted_once: bool,
    }

    impl Trickle {
        fn new(input: Vec<u8>, chunk: usize) -> Self {
            Self {
                input: Cursor::new(input),
                output: Vec::new(),
                chunk,
                interrupted_once: false,
            }
        }
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if !self.interrupted_once {
                self.interrupted_once = true;
                return Err(io::ErrorKind::Interrupted.into());
            }
            let n = buf.len().min(self.chunk);
            self.input.read(&mut buf[..n])
        }
    }

    impl Write for Trickle {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = buf.len().min(self.chunk);
            self.output.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn partial_writes_are_completed() {
        let mut t = StreamTransport::new(Trickle::new(Vec::new(), 3));
        t.send_all(b"hello, scripting addition").unwrap();
        assert_eq!(t.stream.as_ref().unwrap().output, b"hello, scripting addition");
    }

    #[test]
    fn partial_reads_are_completed() {
        let mut t = StreamTransport::new(Trickle::new((0u8..20).collect(), 4));
        let mut buf = [0u8; 10];
        t.recv_exact(&mut buf).unwrap();
        assert_eq!(buf, [0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn short_stream_reports_peer_closed() {
        let mut t = StreamTransport::new(Trickle::new(vec![1, 2, 3], 8));
        let mut buf = [0u8; 4];
        assert!(matches!(
            t.recv_exact(&mut buf),
            Err(ConnectionError::PeerClosed)
        ));
    }

    #[test]
    fn closed_transport_refuses_io() {
        let mut t = StreamTransport::new(Trickle::new(vec![1], 1));
        t.close();
        assert!(!t.is_open());
        assert!(matches!(t.send_all(&[1]), Err(ConnectionError::Closed)));
    }

    #[test]
    fn connect_to_missing_socket_is_not_found() {
        let connector = UnixConnector::new(Duration::from_millis(100));
        let err = connector.connect(&tmp_socket_path()).err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn zero_timeout_connects_without_deadline() {
        let path = tmp_socket_path();
        let listener = UnixListener::bind(&path).unwrap();
        let connector = UnixConnector::new(Duration::ZERO);
        assert!(connector.connect(&path).is_ok());
        drop(listener);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn silent_server_times_out() {
        let path = tmp_socket_path();
        let listener = UnixListener::bind(&path).unwrap();
        let connector = UnixConnector::new(Duration::from_millis(50));
        let mut t = connector.connect(&path).unwrap();
        let (_server_side, _) = listener.accept().unwrap();

        let mut buf = [0u8; 1];
        assert!(matches!(
            t.recv_exact(&mut buf),
            Err(ConnectionError::Timeout)
        ));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn interrupter_unblocks_a_pending_read() {
        let path = tmp_socket_path();
        let listener = UnixListener::bind(&path).unwrap();
        let connector = UnixConnector::new(Duration::from_secs(5));
        let mut t = connector.connect(&path).unwrap();
        let (_server_side, _) = listener.accept().unwrap();

        let handle = t.interrupter().unwrap();
        let killer = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            handle.interrupt();
        });

        let mut buf = [0u8; 1];
        assert!(t.recv_exact(&mut buf).is_err());
        killer.join().unwrap();
        let _ = std::fs::remove_file(&path);
    }
}
