use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::channel::{PixelChannel, ShutdownHandle};
use crate::error::SimError;
use crate::geometry::GeometryMap;
use crate::http::{PublisherHandle, StatusPublisher};
use crate::packet::FrameLayout;
use crate::state::StripReader;

#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    pub led_addr: SocketAddr,
    pub http_addr: SocketAddr,
    pub heightmap_file: PathBuf,
    pub www_dir: PathBuf,
    pub layout: FrameLayout,
}

/// UDP receiver and HTTP publisher wired around one strip.
pub struct Simulator {
    channel: PixelChannel,
    http: PublisherHandle,
}

/// Publisher exposing `/data` (strip snapshot) and `/map` (LED positions).
pub fn build_publisher(
    reader: StripReader,
    geometry: Arc<GeometryMap>,
    www_dir: &Path,
) -> StatusPublisher {
    let mut publisher = StatusPublisher::new(www_dir);
    publisher.register_key("data", move || reader.snapshot());
    publisher.register_key("map", move || Arc::clone(&geometry));
    publisher
}

impl Simulator {
    /// Loads the heightmap, binds both sockets and starts the HTTP worker.
    ///
    /// Nothing is served if the heightmap cannot be loaded.
    pub fn start(config: &SimulatorConfig) -> Result<Self, SimError> {
        let geometry = GeometryMap::load(&config.heightmap_file)?;
        log::info!(
            "Loaded {} LED positions from {}",
            geometry.len(),
            config.heightmap_file.display()
        );

        let channel = PixelChannel::bind(config.led_addr, config.layout)?;
        let publisher = build_publisher(channel.reader(), Arc::new(geometry), &config.www_dir);
        let http = publisher.start(config.http_addr)?;

        Ok(Self { channel, http })
    }

    pub fn led_addr(&self) -> SocketAddr {
        self.channel.local_addr()
    }

    pub fn http_addr(&self) -> SocketAddr {
        self.http.local_addr()
    }

    pub fn reader(&self) -> StripReader {
        self.channel.reader()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.channel.shutdown_handle()
    }

    /// Runs the UDP loop on the calling thread until shutdown is requested,
    /// then stops the HTTP worker. Both have exited when this returns.
    pub fn run(self) -> Result<(), SimError> {
        let Self { channel, http } = self;
        let shutdown = channel.shutdown_handle();

        let udp_result = channel.run();
        // a socket error ends the loop with the flag still set
        shutdown.request();
        let http_result = http.stop();

        udp_result.and(http_result)
    }
}
