//! Legacy pcap file format encoding.
//!
//! The recording sink emits the classic libpcap stream layout: one 24-byte
//! global header followed by a 16-byte record header plus raw frame bytes
//! per captured frame. Fields are written in the machine's native byte
//! order; readers use the magic number to detect the writer's endianness.

/// Magic number identifying a native-endian pcap stream.
pub const PCAP_MAGIC: u32 = 0xA1B2_C3D4;
/// Format version written to the global header.
pub const PCAP_VERSION_MAJOR: u16 = 2;
pub const PCAP_VERSION_MINOR: u16 = 4;
/// Maximum captured length advertised to readers.
pub const PCAP_SNAPLEN: u32 = 65536;
/// Link-layer type for Ethernet frames.
pub const LINKTYPE_ETHERNET: u32 = 1;

/// Serialized size of [`FileHeader`].
pub const FILE_HEADER_LEN: usize = 24;
/// Serialized size of [`RecordHeader`].
pub const RECORD_HEADER_LEN: usize = 16;

/// The pcap global header, written exactly once at the head of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub magic: u32,
    pub version_major: u16,
    pub version_minor: u16,
    /// Offset from UTC in seconds. Always 0; timestamps are UTC.
    pub thiszone: i32,
    /// Timestamp accuracy. Always 0 in practice.
    pub sigfigs: u32,
    pub snaplen: u32,
    pub linktype: u32,
}

impl FileHeader {
    /// Header for an Ethernet capture stream with the standard snaplen.
    pub fn ethernet() -> Self {
        Self {
            magic: PCAP_MAGIC,
            version_major: PCAP_VERSION_MAJOR,
            version_minor: PCAP_VERSION_MINOR,
            thiszone: 0,
            sigfigs: 0,
            snaplen: PCAP_SNAPLEN,
            linktype: LINKTYPE_ETHERNET,
        }
    }

    pub fn to_bytes(&self) -> [u8; FILE_HEADER_LEN] {
        let mut buf = [0u8; FILE_HEADER_LEN];
        buf[0..4].copy_from_slice(&self.magic.to_ne_bytes());
        buf[4..6].copy_from_slice(&self.version_major.to_ne_bytes());
        buf[6..8].copy_from_slice(&self.version_minor.to_ne_bytes());
        buf[8..12].copy_from_slice(&self.thiszone.to_ne_bytes());
        buf[12..16].copy_from_slice(&self.sigfigs.to_ne_bytes());
        buf[16..20].copy_from_slice(&self.snaplen.to_ne_bytes());
        buf[20..24].copy_from_slice(&self.linktype.to_ne_bytes());
        buf
    }
}

/// The per-frame record header preceding each frame's bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub ts_sec: u32,
    pub ts_usec: u32,
    /// Bytes of frame data following this header.
    pub incl_len: u32,
    /// Original frame length on the wire. Equal to `incl_len`; frames are
    /// never truncated.
    pub orig_len: u32,
}

impl RecordHeader {
    /// Header for a full, untruncated frame captured at the given time.
    pub fn for_frame(ts_sec: u32, ts_usec: u32, frame_len: u32) -> Self {
        Self {
            ts_sec,
            ts_usec,
            incl_len: frame_len,
            orig_len: frame_len,
        }
    }

    pub fn to_bytes(&self) -> [u8; RECORD_HEADER_LEN] {
        let mut buf = [0u8; RECORD_HEADER_LEN];
        buf[0..4].copy_from_slice(&self.ts_sec.to_ne_bytes());
        buf[4..8].copy_from_slice(&self.ts_usec.to_ne_bytes());
        buf[8..12].copy_from_slice(&self.incl_len.to_ne_bytes());
        buf[12..16].copy_from_slice(&self.orig_len.to_ne_bytes());
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_u32(buf: &[u8]) -> u32 {
        u32::from_ne_bytes(buf.try_into().unwrap())
    }

    fn read_u16(buf: &[u8]) -> u16 {
        u16::from_ne_bytes(buf.try_into().unwrap())
    }

    #[test]
    fn file_header_layout() {
        let bytes = FileHeader::ethernet().to_bytes();
        assert_eq!(bytes.len(), FILE_HEADER_LEN);
        assert_eq!(read_u32(&bytes[0..4]), 0xA1B2_C3D4);
        assert_eq!(read_u16(&bytes[4..6]), 2);
        assert_eq!(read_u16(&bytes[6..8]), 4);
        assert_eq!(read_u32(&bytes[8..12]), 0); // thiszone
        assert_eq!(read_u32(&bytes[12..16]), 0); // sigfigs
        assert_eq!(read_u32(&bytes[16..20]), 65536);
        assert_eq!(read_u32(&bytes[20..24]), 1);
    }

    #[test]
    fn record_header_layout() {
        let bytes = RecordHeader::for_frame(1_700_000_000, 123_456, 1500).to_bytes();
        assert_eq!(bytes.len(), RECORD_HEADER_LEN);
        assert_eq!(read_u32(&bytes[0..4]), 1_700_000_000);
        assert_eq!(read_u32(&bytes[4..8]), 123_456);
        assert_eq!(read_u32(&bytes[8..12]), 1500);
        assert_eq!(read_u32(&bytes[12..16]), 1500);
    }

    #[test]
    fn record_header_lengths_always_equal() {
        for len in [0u32, 14, 46, 1500, 65507] {
            let header = RecordHeader::for_frame(0, 0, len);
            assert_eq!(header.incl_len, header.orig_len);
        }
    }
}
