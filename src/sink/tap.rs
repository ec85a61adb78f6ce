//! Tap interface sink.
//!
//! Presents a virtual Ethernet device to the local network stack and
//! injects relayed frames into it as if they had arrived from the wire.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::fd::AsRawFd;

use tracing::info;

use crate::error::SinkError;
use crate::sink::CaptureSink;

const CLONE_DEV: &str = "/dev/net/tun";

/// _IOW('T', 202, int), not exported by the libc crate.
const TUNSETIFF: libc::c_ulong = 0x4004_54ca;

/// Sink that writes frames into a kernel tap interface.
///
/// The interface is created in tap mode (full Ethernet framing, no
/// packet-info prefix) with a kernel-chosen name and brought up during
/// construction. Closing the descriptor tears the interface down; the
/// kernel reclaims it, so no explicit deletion is needed.
pub struct TapSink {
    file: File,
    name: String,
}

impl TapSink {
    /// Create a tap interface and bring it up.
    ///
    /// Fails if the clone device cannot be opened, the interface cannot be
    /// created, or the UP|RUNNING flags cannot be set. There is no
    /// degraded mode: callers abort startup on any of these.
    pub fn new() -> Result<Self, SinkError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(CLONE_DEV)
            .map_err(|e| SinkError::TapOpen {
                path: CLONE_DEV.into(),
                source: e,
            })?;

        let mut ifr: libc::ifreq = unsafe { std::mem::zeroed() };
        unsafe {
            ifr.ifr_ifru.ifru_flags = (libc::IFF_TAP | libc::IFF_NO_PI) as libc::c_short;
        }

        if unsafe { libc::ioctl(file.as_raw_fd(), TUNSETIFF as _, &mut ifr as *mut libc::ifreq) } < 0
        {
            return Err(SinkError::TapCreate(io::Error::last_os_error()));
        }

        let name = ifr_name_to_string(&ifr.ifr_name);
        bring_up(&mut ifr, &name)?;
        info!("created tap interface {}", name);

        Ok(Self { file, name })
    }
}

impl CaptureSink for TapSink {
    fn consume(&mut self, frame: &[u8]) -> Result<(), SinkError> {
        self.file.write_all(frame).map_err(|e| SinkError::Write {
            name: self.name.clone(),
            source: e,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Set IFF_UP | IFF_RUNNING on the interface named in `ifr`.
///
/// Interface flags are a control-plane operation: they go through a
/// throwaway AF_INET datagram socket, not the tap descriptor itself.
fn bring_up(ifr: &mut libc::ifreq, name: &str) -> Result<(), SinkError> {
    let flags_err = |source| SinkError::TapFlags {
        name: name.to_string(),
        source,
    };

    let sock = unsafe { libc::socket(libc::AF_INET, libc::SOCK_DGRAM, 0) };
    if sock < 0 {
        return Err(flags_err(io::Error::last_os_error()));
    }

    if unsafe { libc::ioctl(sock, libc::SIOCGIFFLAGS as _, ifr as *mut libc::ifreq) } < 0 {
        let err = io::Error::last_os_error();
        unsafe { libc::close(sock) };
        return Err(flags_err(err));
    }

    unsafe {
        ifr.ifr_ifru.ifru_flags |= (libc::IFF_UP | libc::IFF_RUNNING) as libc::c_short;
    }

    let rc = unsafe { libc::ioctl(sock, libc::SIOCSIFFLAGS as _, ifr as *mut libc::ifreq) };
    let err = io::Error::last_os_error();
    unsafe { libc::close(sock) };
    if rc < 0 {
        return Err(flags_err(err));
    }

    Ok(())
}

/// Decode the kernel-assigned interface name from an ifreq name field.
fn ifr_name_to_string(raw: &[libc::c_char]) -> String {
    let bytes: Vec<u8> = raw
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn as_c_chars(s: &[u8; 16]) -> [libc::c_char; 16] {
        let mut out = [0 as libc::c_char; 16];
        for (dst, src) in out.iter_mut().zip(s.iter()) {
            *dst = *src as libc::c_char;
        }
        out
    }

    #[test]
    fn decodes_nul_terminated_name() {
        let raw = as_c_chars(b"tap0\0\0\0\0\0\0\0\0\0\0\0\0");
        assert_eq!(ifr_name_to_string(&raw), "tap0");
    }

    #[test]
    fn decodes_full_width_name() {
        let raw = as_c_chars(b"verylongtapname0");
        assert_eq!(ifr_name_to_string(&raw), "verylongtapname0");
    }

    #[test]
    fn decodes_empty_name() {
        let raw = [0 as libc::c_char; 16];
        assert_eq!(ifr_name_to_string(&raw), "");
    }
}
