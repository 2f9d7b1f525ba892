//! Command-line interface definitions and parsing

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use beaconcast_ble::{AdvertiseMode, TxPowerLevel};
use beaconcast_core::{ErrorCode, PacketType, StructRecord};

use crate::config::MAX_TIMEOUT_SECS;

#[derive(Parser, Debug)]
#[command(name = "beaconcast", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

/// Packet type and records shared by `encode` and `advertise`
#[derive(Args, Debug, Clone, Default)]
pub struct PayloadArgs {
    /// Packet type (plain, ibeacon)
    #[arg(short = 'p', long = "packet-type")]
    pub packet_type: Option<PacketType>,

    /// Record to advertise, repeatable; replaces the records from the config file
    #[arg(short = 'r', long = "record", value_name = "ID=VALUE")]
    pub records: Vec<StructRecord>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List struct types and packet types
    Types,
    /// Encode records and print the advertisement payload
    Encode {
        #[command(flatten)]
        payload: PayloadArgs,
        /// Print JSON instead of a breakdown
        #[arg(long)]
        json: bool,
    },
    /// Advertise records on the simulated radio until stopped
    Advertise {
        #[command(flatten)]
        payload: PayloadArgs,
        /// Stop automatically after this many seconds of advertising (0 disables)
        #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(..=MAX_TIMEOUT_SECS))]
        timeout: Option<u64>,
        /// Stop after this many seconds regardless of state
        #[arg(long, value_name = "SECS")]
        duration: Option<u64>,
        /// Make the radio reject the start with this code (name or number)
        #[arg(long, value_name = "CODE", value_parser = parse_error_code)]
        fail_with: Option<ErrorCode>,
        /// Advertisement slots available on the radio
        #[arg(long)]
        slots: Option<usize>,
        /// Slots already held by other applications
        #[arg(long)]
        occupied_slots: Option<usize>,
        /// Advertise mode (low-power, balanced, low-latency)
        #[arg(long)]
        mode: Option<AdvertiseMode>,
        /// TX power level (ultra-low, low, medium, high)
        #[arg(long)]
        tx_power: Option<TxPowerLevel>,
    },
}

fn parse_error_code(input: &str) -> Result<ErrorCode, String> {
    ErrorCode::parse(input).ok_or_else(|| format!("unknown error code: {}", input))
}
