use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use clap::Parser;

use crate::packet::FrameLayout;
use crate::simulator::SimulatorConfig;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "ledstrip-simulator",
    version,
    about = "Simulate a UDP-driven LED strip and watch it in the browser"
)]
pub struct Cli {
    /// UDP port receiving LED frames
    #[arg(long = "led-port", alias = "led_port", default_value_t = 7777)]
    pub led_port: u16,

    /// Accept LED frames from all addresses, not only localhost
    #[arg(long = "led-public", alias = "led_public")]
    pub led_public: bool,

    /// Port of the web interface
    #[arg(long = "http-port", alias = "http_port", default_value_t = 8000)]
    pub http_port: u16,

    /// Serve the web interface on all addresses, not only localhost
    #[arg(long = "http-public", alias = "http_public")]
    pub http_public: bool,

    /// JSON file with LED positions
    #[arg(
        long = "heightmap-file",
        alias = "heightmapfile",
        default_value = "data/heightmap.default.json"
    )]
    pub heightmap_file: PathBuf,

    /// Directory holding the visualizer's HTML, JS and CSS
    #[arg(long = "www-dir", default_value = "www")]
    pub www_dir: PathBuf,

    /// Do not open a browser on start
    #[arg(long = "no-browser", alias = "no_browser")]
    pub no_browser: bool,

    /// Log every received packet
    #[arg(long)]
    pub debug: bool,
}

/// `0.0.0.0` when public, loopback otherwise.
pub fn bind_ip(public: bool) -> IpAddr {
    if public {
        Ipv4Addr::UNSPECIFIED.into()
    } else {
        Ipv4Addr::LOCALHOST.into()
    }
}

impl Cli {
    pub fn led_addr(&self) -> SocketAddr {
        SocketAddr::new(bind_ip(self.led_public), self.led_port)
    }

    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(bind_ip(self.http_public), self.http_port)
    }

    /// Address the local browser should open.
    pub fn browser_url(&self) -> String {
        format!("http://127.0.0.1:{}/", self.http_port)
    }

    pub fn simulator_config(&self) -> SimulatorConfig {
        SimulatorConfig {
            led_addr: self.led_addr(),
            http_addr: self.http_addr(),
            heightmap_file: self.heightmap_file.clone(),
            www_dir: self.www_dir.clone(),
            layout: FrameLayout::DEFAULT,
        }
    }
}
