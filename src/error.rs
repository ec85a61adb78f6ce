use std::io;
use std::net::SocketAddrV4;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by a capture sink.
///
/// Every variant is terminal for the relay: construction failures abort
/// startup, and a `Write` failure means the underlying transport (tap
/// descriptor or pcap reader) can no longer accept data, so the loop ends
/// rather than retrying.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("could not open {}: {source}", .path.display())]
    TapOpen { path: PathBuf, source: io::Error },

    #[error("could not create tap interface: {0}")]
    TapCreate(#[source] io::Error),

    #[error("could not bring {name} up: {source}")]
    TapFlags { name: String, source: io::Error },

    #[error("could not create capture directory: {0}")]
    CaptureDir(#[source] io::Error),

    #[error("could not create fifo at {}: {source}", .path.display())]
    FifoCreate { path: PathBuf, source: io::Error },

    #[error("could not open {} for writing: {source}", .path.display())]
    FifoOpen { path: PathBuf, source: io::Error },

    #[error("write to {name} failed: {source}")]
    Write { name: String, source: io::Error },
}

/// Errors that end the relay itself.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("could not bind UDP socket on {addr}: {source}")]
    Bind { addr: SocketAddrV4, source: io::Error },

    #[error("receive failed: {0}")]
    Recv(#[source] io::Error),

    #[error(transparent)]
    Sink(#[from] SinkError),
}
