use std::net::SocketAddr;

use crate::geometry::GeometryError;

#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("cannot bind {what} socket on {addr}: {source}")]
    Bind {
        what: &'static str,
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot load heightmap: {0}")]
    Geometry(#[from] GeometryError),
    #[error("UDP socket error: {0}")]
    Socket(#[source] std::io::Error),
    #[error("HTTP server error: {0}")]
    Http(#[source] std::io::Error),
    #[error("cannot install Ctrl+C handler: {0}")]
    Signal(#[from] ctrlc::Error),
    #[error("fatal: {0}")]
    Fatal(String),
}
