//! Socket channel implementation.
//!
//! A [`WorkerChannel`] is one bidirectional connection to a worker. Calling
//! [`WorkerChannel::split`] yields an independent read half and write half
//! backed by cloned socket handles, so the writer and the reader can run on
//! different threads without sharing any state.
//!
//! # Example
//!
//! ```no_run
//! use udfwire::transport::{WorkerChannel, WorkerListener};
//!
//! let listener = WorkerListener::bind_tcp("127.0.0.1:0")?;
//! // ... launch the worker with listener.local_addr() ...
//! let channel = listener.accept()?;
//! let (reader, writer) = channel.split()?;
//! # Ok::<(), udfwire::BridgeError>(())
//! ```

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};

#[cfg(unix)]
use std::os::unix::net::{UnixListener, UnixStream};
#[cfg(unix)]
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Generate a unique socket path for this process.
///
/// Format: `{tmp}/udfwire-{pid}-{random}.sock`
#[cfg(unix)]
pub fn generate_socket_path() -> PathBuf {
    let pid = std::process::id();
    std::env::temp_dir().join(format!("udfwire-{}-{:x}.sock", pid, rand_u64()))
}

/// Simple random u64 using system time, process ID and a call counter.
#[cfg(unix)]
fn rand_u64() -> u64 {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    let pid = std::process::id() as u64;

    nanos.wrapping_mul(0x517cc1b727220a95) ^ pid ^ seq.rotate_left(32)
}

/// Underlying connected socket.
#[derive(Debug)]
enum Socket {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl Socket {
    fn try_clone(&self) -> io::Result<Self> {
        match self {
            Socket::Tcp(s) => s.try_clone().map(Socket::Tcp),
            #[cfg(unix)]
            Socket::Unix(s) => s.try_clone().map(Socket::Unix),
        }
    }

    fn shutdown(&self, how: Shutdown) -> io::Result<()> {
        match self {
            Socket::Tcp(s) => s.shutdown(how),
            #[cfg(unix)]
            Socket::Unix(s) => s.shutdown(how),
        }
    }

    fn describe(&self) -> String {
        match self {
            Socket::Tcp(s) => s
                .peer_addr()
                .map(|a| format!("tcp://{}", a))
                .unwrap_or_else(|_| "tcp://<unknown>".to_string()),
            #[cfg(unix)]
            Socket::Unix(_) => "unix".to_string(),
        }
    }
}

impl Read for Socket {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Socket::Tcp(s) => s.read(buf),
            #[cfg(unix)]
            Socket::Unix(s) => s.read(buf),
        }
    }
}

impl Write for Socket {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Socket::Tcp(s) => s.write(buf),
            #[cfg(unix)]
            Socket::Unix(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Socket::Tcp(s) => s.flush(),
            #[cfg(unix)]
            Socket::Unix(s) => s.flush(),
        }
    }
}

/// Listener the worker connects back to.
pub enum WorkerListener {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix { listener: UnixListener, path: PathBuf },
}

impl WorkerListener {
    /// Bind a TCP listener. Use port 0 for an ephemeral port.
    pub fn bind_tcp<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        Ok(WorkerListener::Tcp(TcpListener::bind(addr)?))
    }

    /// Bind a Unix socket listener.
    ///
    /// Removes any existing socket file at the path before binding.
    #[cfg(unix)]
    pub fn bind_unix<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        let listener = UnixListener::bind(path)?;
        Ok(WorkerListener::Unix {
            listener,
            path: path.to_path_buf(),
        })
    }

    /// Accept a single worker connection.
    pub fn accept(&self) -> Result<WorkerChannel> {
        let socket = match self {
            WorkerListener::Tcp(l) => Socket::Tcp(l.accept()?.0),
            #[cfg(unix)]
            WorkerListener::Unix { listener, .. } => Socket::Unix(listener.accept()?.0),
        };
        let channel = WorkerChannel { socket };
        tracing::debug!(peer = %channel.socket.describe(), "Worker connected");
        Ok(channel)
    }

    /// Local TCP address, if this is a TCP listener.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match self {
            WorkerListener::Tcp(l) => l.local_addr().ok(),
            #[cfg(unix)]
            WorkerListener::Unix { .. } => None,
        }
    }

    /// Socket path, if this is a Unix listener.
    #[cfg(unix)]
    pub fn path(&self) -> Option<&Path> {
        match self {
            WorkerListener::Unix { path, .. } => Some(path),
            WorkerListener::Tcp(_) => None,
        }
    }
}

#[cfg(unix)]
impl Drop for WorkerListener {
    fn drop(&mut self) {
        if let WorkerListener::Unix { path, .. } = self {
            let _ = std::fs::remove_file(path);
        }
    }
}

/// Connected bidirectional byte stream to a worker.
#[derive(Debug)]
pub struct WorkerChannel {
    socket: Socket,
}

impl WorkerChannel {
    /// Connect to a worker listening on TCP.
    pub fn connect_tcp<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        Ok(Self::from(stream))
    }

    /// Connect to a worker listening on a Unix socket.
    #[cfg(unix)]
    pub fn connect_unix<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::from(UnixStream::connect(path)?))
    }

    /// Split into independent read and write halves.
    ///
    /// The halves share the socket; closing either one (or dropping all of
    /// them) is the caller's decision.
    pub fn split(&self) -> Result<(ChannelReader, ChannelWriter)> {
        let reader = ChannelReader {
            socket: self.socket.try_clone()?,
        };
        let writer = ChannelWriter {
            socket: self.socket.try_clone()?,
        };
        Ok((reader, writer))
    }

    /// Shut down both directions, unblocking any pending read or write.
    pub fn shutdown(&self) -> Result<()> {
        self.socket.shutdown(Shutdown::Both)?;
        Ok(())
    }

    /// Human-readable peer description for logs.
    pub fn describe(&self) -> String {
        self.socket.describe()
    }
}

impl From<TcpStream> for WorkerChannel {
    fn from(stream: TcpStream) -> Self {
        Self {
            socket: Socket::Tcp(stream),
        }
    }
}

#[cfg(unix)]
impl From<UnixStream> for WorkerChannel {
    fn from(stream: UnixStream) -> Self {
        Self {
            socket: Socket::Unix(stream),
        }
    }
}

impl Read for WorkerChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.socket.read(buf)
    }
}

impl Write for WorkerChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.socket.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.socket.flush()
    }
}

/// Inbound half of a [`WorkerChannel`].
#[derive(Debug)]
pub struct ChannelReader {
    socket: Socket,
}

impl Read for ChannelReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.socket.read(buf)
    }
}

/// Outbound half of a [`WorkerChannel`].
#[derive(Debug)]
pub struct ChannelWriter {
    socket: Socket,
}

impl ChannelWriter {
    /// Shut down both directions of the underlying socket.
    ///
    /// Used to release a reader blocked on a worker that will never answer.
    pub fn abort(&self) -> Result<()> {
        self.socket.shutdown(Shutdown::Both)?;
        Ok(())
    }
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.socket.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.socket.flush()
    }
}
