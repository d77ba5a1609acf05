// cidtool -- encode and decode ZigBee coordinator CID frames from the
// command line.
//
// Usage:
//   cidtool decode 0210100101 00
//   cidtool decode --stats "02 10 31 0D 18 ..."
//   cidtool encode ping
//   cidtool encode set-time 2024-03-01T12:00:00Z
//   cidtool encode zcl --address 0x7E2B --endpoint 1 --cluster 0x0006 --command 0x01

use std::process::ExitCode;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use thiserror::Error;
use tracing::{debug, info, warn};

use zigbee_cid_client::protocol::{
    AddressMode, CidPacket, ProtocolError, StreamReassembler, ZclCommand,
};
use zigbee_cid_client::{ClientConfig, ClientError};

#[derive(Debug, Error)]
enum CliError {
    #[error("invalid hex input: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("invalid time: {0}")]
    Time(#[from] chrono::ParseError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Encode and decode ZigBee coordinator CID frames.
#[derive(Parser)]
#[command(name = "cidtool", version, about)]
struct Cli {
    /// YAML client configuration; `log_frames` enables per-chunk tracing.
    #[arg(long, global = true)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode a captured byte stream. Each argument is one received chunk.
    Decode {
        /// Hex chunks; spaces and colons are ignored.
        #[arg(required = true)]
        chunks: Vec<String>,

        /// Print reassembler counters at the end.
        #[arg(long)]
        stats: bool,
    },

    /// Print the frame for a request as hex.
    Encode {
        #[command(subcommand)]
        packet: PacketArg,
    },
}

#[derive(Subcommand)]
enum PacketArg {
    /// Ping the coordinator.
    Ping,

    /// Read the coordinator clock.
    Time,

    /// Set the coordinator clock.
    SetTime {
        /// RFC 3339 timestamp, e.g. 2024-03-01T12:00:00Z.
        time: String,
    },

    /// Send a ZCL command.
    Zcl {
        /// Address mode byte (0 bound, 1 group, 2 short, 15 broadcast).
        #[arg(long, default_value = "2", value_parser = parse_u8)]
        mode: u8,

        /// Manufacturer code for manufacturer-specific commands.
        #[arg(long, value_parser = parse_u16)]
        manufacturer: Option<u16>,

        /// Destination address.
        #[arg(long, value_parser = parse_u16)]
        address: u16,

        /// Destination endpoint.
        #[arg(long, value_parser = parse_u8)]
        endpoint: u8,

        /// Cluster id.
        #[arg(long, value_parser = parse_u16)]
        cluster: u16,

        /// ZCL command id.
        #[arg(long, value_parser = parse_u8)]
        command: u8,

        /// Command payload as hex.
        #[arg(long, default_value = "")]
        payload: String,
    },
}

/// Parse "0x1A2B" as hex, anything else as decimal.
fn parse_u16(s: &str) -> Result<u16, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid number {s:?}: {e}"))
}

fn parse_u8(s: &str) -> Result<u8, String> {
    let v = parse_u16(s)?;
    u8::try_from(v).map_err(|_| format!("{s:?} does not fit in a byte"))
}

fn parse_hex(s: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let cleaned: String = s
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();
    hex::decode(cleaned)
}

fn decode(chunks: &[String], config: &ClientConfig, stats: bool) -> Result<(), CliError> {
    let mut reassembler = StreamReassembler::new();
    for chunk in chunks {
        let bytes = parse_hex(chunk)?;
        if config.log_frames {
            debug!(len = bytes.len(), data = %hex::encode(&bytes), "chunk");
        }
        reassembler.on_bytes_received(&bytes, |response| println!("{}", response));
    }
    if reassembler.buffered_len() > 0 {
        warn!("{} bytes left over (incomplete frame)", reassembler.buffered_len());
    }
    if stats {
        let s = reassembler.stats();
        println!(
            "frames={} checksum_errors={} framing_errors={} length_errors={} discarded_bytes={}",
            s.frames, s.checksum_errors, s.framing_errors, s.length_errors, s.discarded_bytes
        );
    }
    Ok(())
}

fn build_packet(arg: PacketArg) -> Result<CidPacket, CliError> {
    let packet = match arg {
        PacketArg::Ping => CidPacket::ping(),
        PacketArg::Time => CidPacket::get_system_time(),
        PacketArg::SetTime { time } => {
            let time = DateTime::parse_from_rfc3339(&time)?.with_timezone(&Utc);
            CidPacket::set_system_time(time)?
        }
        PacketArg::Zcl {
            mode,
            manufacturer,
            address,
            endpoint,
            cluster,
            command,
            payload,
        } => ZclCommand {
            address_mode: AddressMode(mode),
            manufacturer_code: manufacturer,
            address,
            endpoint,
            cluster_id: cluster,
            command_id: command,
            payload: parse_hex(&payload)?,
        }
        .to_packet()?,
    };
    Ok(packet)
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = match &cli.config {
        Some(path) => ClientConfig::from_file(path)?,
        None => ClientConfig::default(),
    };

    match cli.command {
        Command::Decode { chunks, stats } => decode(&chunks, &config, stats),
        Command::Encode { packet } => {
            let packet = build_packet(packet)?;
            let frame = packet.encode()?;
            info!(command = packet.command, len = frame.len(), "encoded");
            println!("{}", hex::encode_upper(frame));
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
