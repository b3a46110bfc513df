//! Framing, correlation and error mapping of a single exchange.

mod common;

use std::io::Write;
use std::sync::{Arc, Mutex};

use common::*;
use pretty_assertions::assert_eq;
use swarm_tile::{ByteStream, Status, TileConfig, TileError};

#[test]
fn command_is_framed_with_checksum() {
    let mut tile = tile1("$FV", "$FV 2021-03-23-18:25:40,v1.0.0");
    tile.get_version().unwrap();
    assert_eq!(tile.get_ref().sent, vec!["$FV*10\n".to_string()]);
    assert!(tile.get_ref().unexpected.is_empty());
}

#[test]
fn bad_checksum_is_protocol_error() {
    let mut tile = tile1("$FV", "$FV 2021-03-23-18:25:40,v1.0.0*7e\n");
    let err = tile.get_version().unwrap_err();
    assert!(matches!(err, TileError::Protocol(_)), "{err:?}");
}

#[test]
fn missing_checksum_is_protocol_error() {
    let mut tile = tile1("$FV", "$FV 2021-03-23-18:25:40,v1.0.0\n");
    assert_eq!(tile.get_version().unwrap_err().status(), Status::ProtocolError);
}

#[test]
fn line_without_dollar_never_matches() {
    let mut tile = tile1("$FV", "FV 2021-03-23-18:25:40,v1.0.0");
    assert!(matches!(tile.get_version(), Err(TileError::Timeout)));
}

#[test]
fn no_answer_times_out() {
    let mut tile = tile(vec![silent("$FV")]);
    let result = tile.get_version();
    assert_eq!(Status::of(&result), Status::Timeout);
    assert_eq!(tile.get_ref().remaining_steps(), 0);
}

#[test]
fn zero_fields_is_protocol_error() {
    let mut tile = tile1("$FV", "$FV");
    assert!(matches!(tile.get_version(), Err(TileError::Protocol(_))));
}

#[test]
fn unsolicited_lines_are_skipped() {
    let response = format!(
        "{}\n{}\n{}\n",
        with_checksum("$TILE BOOT,RUNNING"),
        with_checksum("$RT RSSI=-104"),
        with_checksum("$FV 2021-03-23-18:25:40,v1.0.0")
    );
    let mut tile = tile1("$FV", &response);
    let v = tile.get_version().unwrap();
    assert_eq!(v.version, "v1.0.0");
}

#[test]
fn chatter_does_not_extend_the_deadline() {
    let chatter = format!("{}\n", with_checksum("$RT RSSI=-104"));
    let mut response = chatter.repeat(200);
    response.push_str(&format!(
        "{}\n",
        with_checksum("$FV 2021-03-23-18:25:40,v1.0.0")
    ));
    let mut tile = tile1("$FV", &response);
    assert!(matches!(tile.get_version(), Err(TileError::Timeout)));
}

#[test]
fn stale_input_is_flushed_before_send() {
    let mut tile = tile1("$FV", "$FV 2021-03-23-18:25:40,v1.0.0");
    let stale = format!("{}\n", with_checksum("$FV 1999-01-01-00:00:00,v0.0.1"));
    tile.get_mut().push_unsolicited(stale.as_bytes());
    let v = tile.get_version().unwrap();
    assert_eq!(v.version, "v1.0.0");
}

#[test]
fn overlong_line_overflows() {
    let config = TileConfig::default()
        .with_timeout_ms(TEST_TIMEOUT_MS)
        .with_rx_capacity(16);
    let mut tile = tile_with(
        vec![
            step("$FV", "$FV 2021-03-23-18:25:40,v1.0.0"),
            step("$MT C=U", "$MT 12"),
        ],
        config,
    );
    let result = tile.get_version();
    assert_eq!(Status::of(&result), Status::ReceiveOverflow);
    // the tail of the long line is still queued and gets flushed by the next command
    assert!(tile.get_mut().bytes_available().unwrap() > 0);
    assert_eq!(tile.get_unsent_count().unwrap(), 12);
}

#[test]
fn device_error_captures_token() {
    let mut tile = tile(vec![step("$GP 42", "$GP ERR,ERR"), step("$GP 5", "$GP OK")]);
    let err = tile.set_gpio_mode(42).unwrap_err();
    assert_eq!(err.status(), Status::CommandError);
    assert_eq!(err.command_text(), Some("ERR"));
    assert_eq!(tile.error_str(), "ERR");

    // cleared by the next exchange
    tile.set_gpio_mode(5).unwrap();
    assert_eq!(tile.error_str(), "");
}

#[test]
fn error_token_is_truncated() {
    let mut tile = tile1("$MM R=O", "$MM ERR,ATOKENFARLONGERTHANNINETEEN");
    let mut buf = [0u8; 8];
    let err = tile
        .read_message(swarm_tile::ReadOrder::Oldest, &mut buf)
        .unwrap_err();
    assert_eq!(tile.error_str(), "ATOKENFARLONGERTHAN");
    assert_eq!(err.command_text(), Some("ATOKENFARLONGERTHAN"));
}

#[test]
fn error_without_token() {
    let mut tile = tile1("$GP 9", "$GP ERR");
    assert!(matches!(tile.set_gpio_mode(9), Err(TileError::Command(t)) if t.is_empty()));
}

#[derive(Clone, Default)]
struct SharedSink(Arc<Mutex<Vec<u8>>>);

impl Write for SharedSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn debug_sink_sees_both_directions() {
    let sink = SharedSink::default();
    let mut tile = tile1("$MT C=U", "$MT 12");
    tile.set_debug_sink(Some(Box::new(sink.clone())));
    assert_eq!(tile.get_unsent_count().unwrap(), 12);

    let expected = format!("$MT C=U*12\n{}\n", with_checksum("$MT 12"));
    assert_eq!(
        String::from_utf8(sink.0.lock().unwrap().clone()).unwrap(),
        expected
    );
}

#[test]
fn raw_command_returns_fields() {
    let mut tile = tile1("$RT @", "$RT RSSI=-104,SNR=-9,FDEV=0");
    let resp = tile.command("$RT @").unwrap();
    assert_eq!(resp.command, "$RT");
    assert_eq!(resp.fields, vec!["RSSI=-104", "SNR=-9", "FDEV=0"]);
}

#[test]
fn notify_does_not_wait_or_flush() {
    let mut tile = tile(vec![silent("$SL @")]);
    tile.get_mut().push_unsolicited(b"$TILE BOOT*00\n");
    tile.notify("$SL @").unwrap();
    assert_eq!(tile.get_ref().sent.len(), 1);
    assert!(tile.get_ref().unexpected.is_empty());
    assert_eq!(tile.get_mut().bytes_available().unwrap(), 14);
}

#[test]
fn begin_discards_boot_chatter() {
    let mut tile = tile1("$FV", "$FV 2021-03-23-18:25:40,v1.0.0");
    tile.get_mut().push_unsolicited(b"$TILE BOOT,RUNNING*00\n");
    tile.begin().unwrap();
    assert_eq!(tile.get_mut().bytes_available().unwrap(), 0);
    assert!(tile.is_ready());
}

#[test]
fn identical_exchanges_decode_identically() {
    let gs = step("$GS @", "$GS 109,214,9,0,G3");
    let gn = step("$GN @", "$GN 37.8921,-122.0155,77,89,2");
    let mut tile = tile(vec![gs.clone(), gn.clone(), gs, gn]);
    let first = tile.get_geo_data().unwrap();
    let second = tile.get_geo_data().unwrap();
    assert_eq!(first, second);
}
