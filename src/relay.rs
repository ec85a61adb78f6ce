//! UDP transport and the relay loop.
//!
//! A single thread drives everything: receive one datagram, hand its bytes
//! to the sink, repeat. One datagram is one frame; there is no framing,
//! buffering, or retry on top of that, which keeps arrival-order,
//! at-most-once delivery trivially correct.

use std::io;
use std::net::{SocketAddr, SocketAddrV4, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use tracing::info;

use crate::error::RelayError;
use crate::sink::CaptureSink;

/// Largest payload one UDP datagram can carry.
const MAX_DATAGRAM: usize = 65_535;

/// Kernel receive buffer size, sized for bursts of full-size frames.
const RECV_BUFFER_SIZE: usize = 1 << 20;

/// How often a blocking receive wakes to observe the shutdown flag.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Composition root: one socket, one sink, one shutdown flag.
pub struct Relay {
    // Declared before `sink` so teardown runs in reverse construction
    // order: socket first, then sink.
    socket: UdpSocket,
    sink: Box<dyn CaptureSink>,
    running: Arc<AtomicBool>,
}

impl std::fmt::Debug for Relay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relay")
            .field("socket", &self.socket)
            .field("sink", &self.sink.name())
            .field("running", &self.running)
            .finish()
    }
}

impl Relay {
    /// Bind the UDP socket and wire it to the sink. Bind failure is fatal;
    /// the process aborts startup rather than running degraded.
    pub fn new(addr: SocketAddrV4, sink: Box<dyn CaptureSink>) -> Result<Self, RelayError> {
        let socket = create_socket(addr)?;
        Ok(Self {
            socket,
            sink,
            running: Arc::new(AtomicBool::new(true)),
        })
    }

    /// The shutdown flag. Starts true; the signal handler stores false
    /// exactly once, and it never returns to true for the process
    /// lifetime.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    /// The bound socket address, with the kernel-assigned port resolved.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Receive datagrams and deliver each one to the sink until the
    /// shutdown flag clears, the sink reports a terminal failure, or the
    /// transport faults.
    ///
    /// The flag is observed once per iteration boundary; an in-flight
    /// receive is never cancelled, it simply runs to its next timeout.
    pub fn run(&mut self) -> Result<(), RelayError> {
        info!("relay running, delivering to {}", self.sink.name());

        let mut buf = [0u8; MAX_DATAGRAM];
        while self.running.load(Ordering::SeqCst) {
            let len = match self.socket.recv_from(&mut buf) {
                Ok((len, _peer)) => len,
                // Timeouts and EINTR are iteration boundaries, not faults:
                // loop back and observe the flag. This is also how an
                // interrupted receive turns into shutdown once the signal
                // handler has cleared the flag.
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::WouldBlock
                            | io::ErrorKind::TimedOut
                            | io::ErrorKind::Interrupted
                    ) =>
                {
                    continue;
                }
                Err(e) => return Err(RelayError::Recv(e)),
            };

            self.sink.consume(&buf[..len])?;
        }

        info!("relay stopped");
        Ok(())
    }
}

fn create_socket(addr: SocketAddrV4) -> Result<UdpSocket, RelayError> {
    let bind_err = |source| RelayError::Bind { addr, source };

    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP)).map_err(bind_err)?;
    socket
        .set_recv_buffer_size(RECV_BUFFER_SIZE)
        .map_err(bind_err)?;
    socket.bind(&addr.into()).map_err(bind_err)?;

    let socket: UdpSocket = socket.into();
    socket
        .set_read_timeout(Some(POLL_INTERVAL))
        .map_err(bind_err)?;
    Ok(socket)
}
