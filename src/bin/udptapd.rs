use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::atomic::Ordering;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use udptap::{CaptureSink, PcapSink, Relay, TapSink};

#[derive(Parser)]
#[command(name = "udptapd")]
#[command(about = "Receives frames over UDP and feeds them into a tap interface or pcap stream")]
struct Args {
    /// Local address to bind
    #[arg(short, long, default_value_t = Ipv4Addr::UNSPECIFIED)]
    bind: Ipv4Addr,

    /// UDP port to listen on
    #[arg(short, long)]
    port: u16,

    /// Record frames to a pcap fifo instead of injecting them into a tap
    /// interface
    #[arg(long)]
    pcap: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let sink: Box<dyn CaptureSink> = if args.pcap {
        Box::new(PcapSink::new().context("failed to create pcap sink")?)
    } else {
        Box::new(TapSink::new().context("failed to create tap sink")?)
    };
    info!("created sink {}", sink.name());

    let mut relay = Relay::new(SocketAddrV4::new(args.bind, args.port), sink)
        .context("failed to start relay")?;
    info!("listening on {}:{}", args.bind, args.port);

    let running = relay.running_flag();
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .context("failed to install signal handler")?;

    relay.run().context("relay terminated")?;
    Ok(())
}
