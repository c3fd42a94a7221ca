use std::net::SocketAddr;
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::Serialize;

use crate::packet::Rgb;

/// Immutable view of the strip, replaced wholesale on every accepted frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StripSnapshot {
    pub pixels: Vec<Rgb>,
    /// Sender of the last accepted frame, empty until one arrives.
    pub last_client: String,
    pub data_updates: u64,
}

/// Sole mutator of the strip state; there is exactly one per strip.
#[derive(Debug)]
pub struct StripWriter {
    shared: Arc<ArcSwap<StripSnapshot>>,
}

/// Read-only accessor handed to anything outside the UDP loop.
#[derive(Debug, Clone)]
pub struct StripReader {
    shared: Arc<ArcSwap<StripSnapshot>>,
}

/// Create an empty strip and split it into its writer and a reader.
pub fn new_strip_state() -> (StripWriter, StripReader) {
    let shared = Arc::new(ArcSwap::from_pointee(StripSnapshot::default()));
    (
        StripWriter {
            shared: Arc::clone(&shared),
        },
        StripReader { shared },
    )
}

impl StripWriter {
    /// Publish a freshly decoded buffer from `client`, counting the update.
    pub fn apply(&mut self, pixels: Vec<Rgb>, client: SocketAddr) -> u64 {
        let data_updates = self.shared.load().data_updates + 1;
        self.shared.store(Arc::new(StripSnapshot {
            pixels,
            last_client: client.to_string(),
            data_updates,
        }));
        data_updates
    }

    pub fn reader(&self) -> StripReader {
        StripReader {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl StripReader {
    pub fn snapshot(&self) -> Arc<StripSnapshot> {
        self.shared.load_full()
    }
}
