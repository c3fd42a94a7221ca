use std::net::{SocketAddr, UdpSocket};

/// Largest strip a single frame may describe.
pub const MAX_LED_COUNT: usize = 1000;

/// Frames shorter than this are rejected outright.
pub const MIN_FRAME_LEN: usize = 4;

/// One pixel as raw (red, green, blue) bytes.
pub type Rgb = [u8; 3];

/// Reasons a received frame is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("frame of {0} bytes is shorter than {min} bytes", min = MIN_FRAME_LEN)]
    TooShort(usize),
    #[error("frame of {0} bytes is not a multiple of 3 bytes")]
    Misaligned(usize),
}

/// Byte layout of a pixel frame: `[header; data_offset]` followed by
/// 3-byte groups with the color channels at the given positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    data_offset: usize,
    red_offset: usize,
    green_offset: usize,
    blue_offset: usize,
}

impl FrameLayout {
    /// Three header bytes, then plain RGB groups.
    pub const DEFAULT: FrameLayout = FrameLayout::new(3, 0, 1, 2);

    /// Panics if a channel offset does not address a byte inside its group.
    pub const fn new(
        data_offset: usize,
        red_offset: usize,
        green_offset: usize,
        blue_offset: usize,
    ) -> Self {
        assert!(red_offset < 3 && green_offset < 3 && blue_offset < 3);
        Self {
            data_offset,
            red_offset,
            green_offset,
            blue_offset,
        }
    }

    pub fn data_offset(&self) -> usize {
        self.data_offset
    }

    /// Receive buffer size: header plus `MAX_LED_COUNT` pixels.
    pub fn max_frame_len(&self) -> usize {
        self.data_offset + MAX_LED_COUNT * 3
    }

    /// Decodes a whole frame into pixels.
    ///
    /// The length check covers the entire datagram, header included, so it
    /// only lines up with the pixel groups when `data_offset` is itself a
    /// multiple of 3. Trailing bytes that do not fill a group are dropped.
    pub fn decode(&self, frame: &[u8]) -> Result<Vec<Rgb>, FrameError> {
        let len = frame.len();
        if len < MIN_FRAME_LEN {
            return Err(FrameError::TooShort(len));
        }
        if len % 3 != 0 {
            return Err(FrameError::Misaligned(len));
        }

        let payload = frame.get(self.data_offset..).unwrap_or(&[]);
        Ok(payload
            .chunks_exact(3)
            .map(|group| {
                [
                    group[self.red_offset],
                    group[self.green_offset],
                    group[self.blue_offset],
                ]
            })
            .collect())
    }

    /// Builds a frame with a zeroed header.
    pub fn encode(&self, pixels: &[Rgb]) -> Vec<u8> {
        let mut buf = vec![0u8; self.data_offset + pixels.len() * 3];
        for (group, [r, g, b]) in buf[self.data_offset..].chunks_exact_mut(3).zip(pixels) {
            group[self.red_offset] = *r;
            group[self.green_offset] = *g;
            group[self.blue_offset] = *b;
        }
        buf
    }
}

impl Default for FrameLayout {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Fire-and-forget client that pushes whole strips to a simulator.
pub struct PixelSender {
    socket: UdpSocket,
    target: SocketAddr,
    layout: FrameLayout,
}

impl PixelSender {
    pub fn new(target_ip: &str, port: u16, layout: FrameLayout) -> std::io::Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        let target: SocketAddr = format!("{target_ip}:{port}").parse().map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, e)
        })?;
        Ok(Self {
            socket,
            target,
            layout,
        })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// Sends one frame; strips longer than `MAX_LED_COUNT` are truncated.
    pub fn send(&self, pixels: &[Rgb]) -> std::io::Result<usize> {
        let pixels = &pixels[..pixels.len().min(MAX_LED_COUNT)];
        let bytes = self.layout.encode(pixels);
        self.socket.send_to(&bytes, self.target)
    }
}
