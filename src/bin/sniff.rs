use std::io;
use std::net::{Ipv4Addr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use pnet::datalink::{self, Channel::Ethernet, Config};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "udptap-sniff")]
#[command(about = "Captures frames from a network device and forwards them over UDP")]
struct Args {
    /// Network device to capture from (e.g., eth0)
    device: String,

    /// Remote relay address
    remote: Ipv4Addr,

    /// Remote relay port
    port: u16,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let interface = datalink::interfaces()
        .into_iter()
        .find(|iface| iface.name == args.device)
        .with_context(|| format!("no such device: {}", args.device))?;

    // Non-promiscuous: only traffic the device would see anyway. No read
    // timeout; the capture blocks until a frame arrives.
    let config = Config {
        promiscuous: false,
        read_timeout: None,
        ..Config::default()
    };

    let (_tx, mut rx) = match datalink::channel(&interface, config) {
        Ok(Ethernet(tx, rx)) => (tx, rx),
        Ok(_) => bail!("unsupported channel type on {}", args.device),
        Err(e) => {
            return Err(e).with_context(|| format!("could not open {} for capture", args.device))
        }
    };

    let socket =
        UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).context("could not create UDP socket")?;
    socket
        .connect((args.remote, args.port))
        .with_context(|| format!("could not connect to {}:{}", args.remote, args.port))?;

    let running = Arc::new(AtomicBool::new(true));
    let flag = running.clone();
    ctrlc::set_handler(move || {
        flag.store(false, Ordering::SeqCst);
    })
    .context("failed to install signal handler")?;

    info!(
        "forwarding frames from {} to {}:{}",
        args.device, args.remote, args.port
    );

    // One captured frame, one datagram. No batching, no retry: a frame
    // the remote misses is simply lost.
    while running.load(Ordering::SeqCst) {
        match rx.next() {
            Ok(frame) => {
                if let Err(e) = socket.send(frame) {
                    debug!("send failed: {}", e);
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                debug!("capture error: {}", e);
            }
        }
    }

    info!("capture stopped");
    Ok(())
}
