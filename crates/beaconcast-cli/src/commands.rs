//! Command handlers for the beaconcast CLI

use std::fmt::Write as _;
use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use beaconcast_ble::{AdvertisingSession, SimulatedAdvertiser};
use beaconcast_core::{
    encode, AdvertisementPayload, EventKind, PacketType, SessionEvent, SessionState,
    StructRecord, StructType,
};

use crate::cli::{Cli, Commands, PayloadArgs};
use crate::config::AppConfig;
use crate::error::{CliError, Result};

/// Command dispatcher for handling CLI commands
pub struct CommandDispatcher;

impl CommandDispatcher {
    /// Execute a CLI command
    pub async fn execute(cli: Cli, mut config: AppConfig) -> Result<()> {
        match cli.command {
            Commands::Types => {
                print!("{}", render_types());
                Ok(())
            }
            Commands::Encode { payload, json } => {
                let (packet_type, records) = resolve_payload(&payload, &config);
                let encoded = encode(packet_type, &records)?;
                print!("{}", render_encoding(&encoded, json)?);
                Ok(())
            }
            Commands::Advertise {
                payload,
                timeout,
                duration,
                fail_with,
                slots,
                occupied_slots,
                mode,
                tx_power,
            } => {
                if let Some(secs) = timeout {
                    config.advertising.timeout_secs = secs;
                }
                if let Some(slots) = slots {
                    config.radio.slots = slots;
                }
                if let Some(occupied) = occupied_slots {
                    config.radio.occupied_slots = occupied;
                }
                if let Some(mode) = mode {
                    config.advertising.mode = mode;
                }
                if let Some(tx_power) = tx_power {
                    config.advertising.tx_power = tx_power;
                }
                config.validate()?;

                let mut radio = config.radio_config();
                radio.fail_with = fail_with;

                let (packet_type, records) = resolve_payload(&payload, &config);
                let session = AdvertisingSession::with_config(
                    SimulatedAdvertiser::with_config(radio),
                    config.session_config(),
                )?;
                let duration = duration.map(Duration::from_secs);

                run_advertise(&session, packet_type, &records, duration)
                    .await
                    .map(|_| ())
            }
        }
    }
}

/// Packet type and records from the command line, falling back to the config file
pub fn resolve_payload(args: &PayloadArgs, config: &AppConfig) -> (PacketType, Vec<StructRecord>) {
    let packet_type = args
        .packet_type
        .unwrap_or(config.advertising.packet_type);
    let records = if args.records.is_empty() {
        config.records.clone()
    } else {
        args.records.clone()
    };
    (packet_type, records)
}

// ----------------------------------------------------------------------------
// types
// ----------------------------------------------------------------------------

/// Table of struct types and packet types
pub fn render_types() -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Struct types:");
    let _ = writeln!(out, "  {:<12} {:<14} {:<6} EXAMPLE", "ID", "NAME", "TAG");
    for ty in StructType::ALL {
        let _ = writeln!(
            out,
            "  {:<12} {:<14} 0x{:02X}   {}",
            ty.id(),
            ty.display_name(),
            ty.tag(),
            ty.example()
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Packet types:");
    for packet_type in PacketType::ALL {
        let _ = writeln!(
            out,
            "  {:<12} {:<14} header {} ({} bytes free)",
            packet_type.id(),
            packet_type.display_name(),
            hex_bytes(packet_type.header()),
            packet_type.budget()
        );
    }
    out
}

// ----------------------------------------------------------------------------
// encode
// ----------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct EncodeReport<'a> {
    packet_type: &'a str,
    length: usize,
    records: usize,
    hex: String,
}

/// Human-readable or JSON rendering of an encoded payload
pub fn render_encoding(payload: &AdvertisementPayload, json: bool) -> Result<String> {
    if json {
        let report = EncodeReport {
            packet_type: payload.packet_type().id(),
            length: payload.len(),
            records: payload.record_count(),
            hex: payload.to_hex(),
        };
        return Ok(format!("{}\n", serde_json::to_string_pretty(&report)?));
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} payload, {} bytes, {} record(s)",
        payload.packet_type(),
        payload.len(),
        payload.record_count()
    );
    let _ = writeln!(out, "hex: {}", payload);
    for (ad_type, data) in payload.ad_structures() {
        let _ = writeln!(
            out,
            "  0x{:02X} {:<28} {}",
            ad_type,
            ad_type_name(ad_type),
            hex_bytes(data)
        );
    }
    Ok(out)
}

fn ad_type_name(ad_type: u8) -> &'static str {
    match ad_type {
        0x01 => "Flags",
        0x03 => "Complete 16-bit Service UUIDs",
        0x07 => "Complete 128-bit Service UUIDs",
        0x09 => "Complete Local Name",
        0x0A => "Tx Power Level",
        0x19 => "Appearance",
        0x24 => "URI",
        0xFF => "Manufacturer Specific Data",
        _ => "Unknown",
    }
}

fn hex_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

// ----------------------------------------------------------------------------
// advertise
// ----------------------------------------------------------------------------

/// Run one advertisement until the session is idle again
///
/// Stops the session on Ctrl-C or once `duration` has elapsed. Returns every event
/// observed; a rejected start or lost advertisement is returned as an error.
pub async fn run_advertise(
    session: &AdvertisingSession,
    packet_type: PacketType,
    records: &[StructRecord],
    duration: Option<Duration>,
) -> Result<Vec<SessionEvent>> {
    let (observer, mut events) = session.subscribe_channel();

    if let Err(err) = session.start(packet_type, records) {
        println!("{}", err.user_message());
        session.unsubscribe(observer);
        return Err(err.into());
    }
    info!(
        "Advertising {} record(s) as {}",
        records.len(),
        packet_type
    );

    let seen = watch_session(session, &mut events, duration, tokio::signal::ctrl_c()).await;
    session.unsubscribe(observer);

    let failure = seen
        .iter()
        .rev()
        .find(|event| event.kind == EventKind::Failed)
        .and_then(|event| event.code);
    match failure {
        Some(code) => Err(CliError::Radio(code)),
        None => Ok(seen),
    }
}

/// Follow session events until idle, stopping once on `interrupt` or after `duration`
async fn watch_session<F: Future>(
    session: &AdvertisingSession,
    events: &mut mpsc::UnboundedReceiver<SessionEvent>,
    duration: Option<Duration>,
    interrupt: F,
) -> Vec<SessionEvent> {
    let deadline = async {
        match duration {
            Some(duration) => tokio::time::sleep(duration).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);
    tokio::pin!(interrupt);

    let mut seen = Vec::new();
    let mut last_state = SessionState::Idle;
    let mut stop_requested = false;

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    warn!("Session event stream closed");
                    break;
                };
                report(&event);

                let finished = match event.kind {
                    EventKind::StateChanged(state) => {
                        last_state = state;
                        state == SessionState::Idle
                    }
                    // A rejected start goes straight back to idle without a state event
                    EventKind::Failed => last_state == SessionState::Starting,
                    EventKind::TimedOut => false,
                };
                seen.push(event);
                if finished {
                    break;
                }
            }
            _ = &mut interrupt, if !stop_requested => {
                info!("Interrupted, stopping advertisement");
                stop_requested = true;
                session.stop();
            }
            _ = &mut deadline, if !stop_requested => {
                info!("Duration elapsed, stopping advertisement");
                stop_requested = true;
                session.stop();
            }
        }
    }

    seen
}

fn report(event: &SessionEvent) {
    debug!("Session event at {}: {}", event.timestamp, event);
    match (event.user_message(), event.kind) {
        (Some(message), _) => println!("{}", message),
        (None, EventKind::StateChanged(SessionState::Running)) => println!("Advertising started."),
        (None, EventKind::StateChanged(SessionState::Idle)) => println!("Advertising stopped."),
        (None, _) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beaconcast_ble::{SessionConfig, SimulatedRadioConfig};
    use beaconcast_core::ErrorCode;

    fn quick_radio() -> SimulatedRadioConfig {
        SimulatedRadioConfig::new().with_latency(Duration::from_millis(1))
    }

    #[test]
    fn test_resolve_payload_prefers_cli() {
        let mut config = AppConfig::default();
        config.advertising.packet_type = PacketType::IBeacon;
        config.records = vec![StructRecord::new(StructType::Text, "from-config")];

        let (packet_type, records) = resolve_payload(&PayloadArgs::default(), &config);
        assert_eq!(packet_type, PacketType::IBeacon);
        assert_eq!(records, config.records);

        let args = PayloadArgs {
            packet_type: Some(PacketType::Plain),
            records: vec![StructRecord::new(StructType::Text, "from-cli")],
        };
        let (packet_type, records) = resolve_payload(&args, &config);
        assert_eq!(packet_type, PacketType::Plain);
        assert_eq!(records[0].raw_value(), "from-cli");
    }

    #[test]
    fn test_render_types_lists_everything() {
        let rendered = render_types();
        for ty in StructType::ALL {
            assert!(rendered.contains(ty.id()));
        }
        assert!(rendered.contains("ibeacon"));
        assert!(rendered.contains("0x24"));
    }

    #[test]
    fn test_render_encoding() {
        let payload = encode(PacketType::Plain, &[StructRecord::new(StructType::Text, "hi")]).unwrap();

        let text = render_encoding(&payload, false).unwrap();
        assert!(text.contains("hex: 02010603096869"));
        assert!(text.contains("Complete Local Name"));

        let json = render_encoding(&payload, true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["packet_type"], "plain");
        assert_eq!(value["length"], 7);
        assert_eq!(value["hex"], "02010603096869");
    }

    #[tokio::test(start_paused = true)]
    async fn test_advertise_until_duration() {
        let session = AdvertisingSession::with_config(
            SimulatedAdvertiser::with_config(quick_radio()),
            SessionConfig::new().without_timeout(),
        )
        .unwrap();
        let records = vec![StructRecord::new(StructType::Text, "hi")];

        let seen = run_advertise(&session, PacketType::Plain, &records, Some(Duration::from_secs(2)))
            .await
            .unwrap();
        let kinds: Vec<_> = seen.iter().map(|event| event.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::StateChanged(SessionState::Starting),
                EventKind::StateChanged(SessionState::Running),
                EventKind::StateChanged(SessionState::Stopping),
                EventKind::StateChanged(SessionState::Idle),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_advertise_until_timeout() {
        let session = AdvertisingSession::with_config(
            SimulatedAdvertiser::with_config(quick_radio()),
            SessionConfig::new().with_timeout(Duration::from_secs(3)),
        )
        .unwrap();

        let seen = run_advertise(&session, PacketType::Plain, &[], None).await.unwrap();
        assert!(seen.iter().any(|event| event.kind == EventKind::TimedOut));
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupt_raised_between_events_stops_once() {
        let session = AdvertisingSession::with_config(
            SimulatedAdvertiser::with_config(quick_radio()),
            SessionConfig::new().without_timeout(),
        )
        .unwrap();
        let (_observer, mut events) = session.subscribe_channel();
        session.start(PacketType::Plain, &[]).unwrap();

        // Fires while the loop is busy with the Starting and Running events
        let (interrupt_tx, interrupt_rx) = tokio::sync::oneshot::channel::<()>();
        interrupt_tx.send(()).unwrap();

        let seen = watch_session(&session, &mut events, None, interrupt_rx).await;
        assert_eq!(
            seen.last().map(|event| event.kind),
            Some(EventKind::StateChanged(SessionState::Idle))
        );
        let stopping = seen
            .iter()
            .filter(|event| event.kind == EventKind::StateChanged(SessionState::Stopping))
            .count();
        assert_eq!(stopping, 1);
    }

    #[tokio::test]
    async fn test_rejected_start_is_an_error() {
        let session = AdvertisingSession::new(SimulatedAdvertiser::with_config(
            quick_radio().with_fail_with(ErrorCode::InternalError),
        ))
        .unwrap();

        let err = run_advertise(&session, PacketType::Plain, &[], None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::InternalError));
    }

    #[tokio::test]
    async fn test_encoding_error_is_returned() {
        let session = AdvertisingSession::new(SimulatedAdvertiser::new()).unwrap();
        let records = vec![StructRecord::new(StructType::Url, "ftp://a.io")];

        let err = run_advertise(&session, PacketType::Plain, &records, None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::InvalidRecordValue));
        assert_eq!(session.notifier().observer_count(), 0);
    }
}
