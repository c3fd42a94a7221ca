use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::SimError;
use crate::packet::{FrameError, FrameLayout};
use crate::state::{new_strip_state, StripReader, StripWriter};

/// Upper bound on how long a blocking receive waits before re-checking the
/// running flag. Only matters if the shutdown wake datagram is lost.
const RECV_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Outcome of a single `PixelChannel::receive_and_apply` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    /// A valid frame replaced the strip.
    Applied { leds: usize, from: SocketAddr },
    /// The datagram was dropped.
    Rejected { error: FrameError, from: SocketAddr },
    /// Woken without anything to apply (timeout, signal, or shutdown).
    Idle,
}

/// UDP receiver that owns the strip state.
///
/// Every accepted frame swaps in a complete new snapshot; the HTTP side only
/// ever sees those snapshots through a [`StripReader`].
pub struct PixelChannel {
    socket: UdpSocket,
    local_addr: SocketAddr,
    layout: FrameLayout,
    buf: Vec<u8>,
    writer: StripWriter,
    running: Arc<AtomicBool>,
}

/// Cloneable stop switch for a [`PixelChannel`], safe to call from a signal
/// handler thread.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    running: Arc<AtomicBool>,
    wake_addr: SocketAddr,
}

impl PixelChannel {
    /// Binds the receive socket. A busy port is reported as `SimError::Bind`.
    pub fn bind(addr: SocketAddr, layout: FrameLayout) -> Result<Self, SimError> {
        let socket = UdpSocket::bind(addr).map_err(|source| SimError::Bind {
            what: "UDP",
            addr,
            source,
        })?;
        socket
            .set_read_timeout(Some(RECV_POLL_INTERVAL))
            .map_err(SimError::Socket)?;
        let local_addr = socket.local_addr().map_err(SimError::Socket)?;
        let (writer, _) = new_strip_state();

        Ok(Self {
            socket,
            local_addr,
            layout,
            buf: vec![0u8; layout.max_frame_len()],
            writer,
            running: Arc::new(AtomicBool::new(true)),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn reader(&self) -> StripReader {
        self.writer.reader()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            running: Arc::clone(&self.running),
            wake_addr: wake_target(self.local_addr),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Blocks for at most one datagram and applies it if it is a valid frame.
    ///
    /// Interrupted or timed-out receives are not errors; they report
    /// `Received::Idle` so the caller can re-check the running flag. A
    /// datagram that arrives after shutdown was requested is discarded.
    pub fn receive_and_apply(&mut self) -> Result<Received, SimError> {
        let (len, from) = match self.socket.recv_from(&mut self.buf) {
            Ok(v) => v,
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::Interrupted | ErrorKind::WouldBlock | ErrorKind::TimedOut
                ) =>
            {
                return Ok(Received::Idle);
            }
            Err(e) => return Err(SimError::Socket(e)),
        };

        if !self.is_running() {
            return Ok(Received::Idle);
        }

        log::debug!("{len} bytes received from {from}");

        match self.layout.decode(&self.buf[..len]) {
            Ok(pixels) => {
                let leds = pixels.len();
                self.writer.apply(pixels, from);
                Ok(Received::Applied { leds, from })
            }
            Err(error) => {
                log::warn!("Invalid data packet size received from {from}: {error}");
                Ok(Received::Rejected { error, from })
            }
        }
    }

    /// Receives frames until shutdown is requested, then closes the socket.
    pub fn run(mut self) -> Result<(), SimError> {
        log::info!("UDP server listening on {}", self.local_addr);
        while self.is_running() {
            self.receive_and_apply()?;
        }
        log::info!("UDP server stopped");
        Ok(())
    }
}

impl ShutdownHandle {
    /// Clears the running flag and wakes a pending receive.
    ///
    /// Returns `true` only for the call that actually stopped the channel.
    pub fn request(&self) -> bool {
        if !self.running.swap(false, Ordering::SeqCst) {
            return false;
        }

        let bind_ip: IpAddr = match self.wake_addr {
            SocketAddr::V4(_) => Ipv4Addr::UNSPECIFIED.into(),
            SocketAddr::V6(_) => Ipv6Addr::UNSPECIFIED.into(),
        };
        match UdpSocket::bind((bind_ip, 0)).and_then(|s| s.send_to(&[], self.wake_addr)) {
            Ok(_) => log::debug!("sent wake datagram to {}", self.wake_addr),
            Err(e) => log::debug!("wake datagram failed, relying on poll timeout: {e}"),
        }
        true
    }
}

/// Address the channel can be reached at from this host.
fn wake_target(local: SocketAddr) -> SocketAddr {
    let ip = match local.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    SocketAddr::new(ip, local.port())
}
