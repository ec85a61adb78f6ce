//! Capture sink abstraction.
//!
//! This module defines the `CaptureSink` trait and provides the two
//! delivery backends: injection into a kernel tap interface and recording
//! into a pcap stream. The relay loop depends only on the trait, which
//! also keeps the loop testable with in-memory sinks.

mod pcap_sink;
mod tap;

pub use pcap_sink::PcapSink;
pub use tap::TapSink;

use crate::error::SinkError;

/// Trait for frame delivery backends.
///
/// A sink consumes one raw frame per call. Frames are opaque byte
/// sequences bounded by a UDP datagram's payload; the sink must not retain
/// the slice past the call. Any error returned is terminal: the underlying
/// transport can no longer accept data (reader detached, descriptor
/// closed), and the relay ends rather than retrying.
pub trait CaptureSink: Send {
    /// Deliver one frame. Performs exactly one write of the frame's bytes
    /// (plus a record header for recording sinks) on success.
    fn consume(&mut self, frame: &[u8]) -> Result<(), SinkError>;

    /// Human-readable identity of the sink, for logging: the kernel
    /// interface name or the pcap fifo path.
    fn name(&self) -> &str;
}
