//! udptap - relays raw network frames between two machines over UDP.
//!
//! The sender (`udptap-sniff`) captures frames from a local network device
//! and forwards each one unmodified as a single UDP datagram. The receiver
//! (`udptapd`) feeds every datagram to a capture sink: either a kernel tap
//! interface, making the remote traffic visible to the local network
//! stack, or a pcap stream served through a fifo for inspection with
//! standard analysis tools.

pub mod error;
pub mod pcap;
pub mod relay;
pub mod sink;

pub use error::{RelayError, SinkError};
pub use relay::Relay;
pub use sink::{CaptureSink, PcapSink, TapSink};
