//! The Tile driver: one command/response exchange at a time, decoded into typed
//! results.

use tracing::{debug, warn};

use crate::codec::{self, CommandFrame, Sentence, parse_uint};
use crate::error::{Result, TileError};
use crate::stream::{ByteStream, Clock, SystemClock};
use crate::transport::{DebugSink, Deadline, LineTransport};
use crate::types::{
    Config, DateTime, GeoData, ReadMessage, ReadOrder, Response, SendRequest, SleepRequest,
    Version,
};

/// Largest message payload the Tile accepts, in bytes.
pub const MAX_MSG_SIZE: usize = 192;
/// One response line: hex payload plus room for `$RD`/`$TD` framing.
pub const DEFAULT_RX_CAPACITY: usize = 40 + MAX_MSG_SIZE * 2;
/// `$MT C=U` is slow on real hardware; measure before lowering.
pub const DEFAULT_TIMEOUT_MS: u64 = 2000;

const ERROR_STR_LEN: usize = 19;
const VERSION_STR_LEN: usize = 19;
const DEVICE_TYPE_LEN: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileConfig {
    pub timeout_ms: u64,
    pub rx_capacity: usize,
}

impl Default for TileConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            rx_capacity: DEFAULT_RX_CAPACITY,
        }
    }
}

impl TileConfig {
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_rx_capacity(mut self, rx_capacity: usize) -> Self {
        self.rx_capacity = rx_capacity;
        self
    }
}

/// Driver for a Swarm Tile on a [`ByteStream`].
///
/// Every operation takes `&mut self`: the protocol is half-duplex and only one exchange
/// can be in flight per link.
pub struct Tile<S, C = SystemClock> {
    transport: LineTransport<S>,
    clock: C,
    timeout_ms: u64,
    error_str: String,
}

impl<S: ByteStream> Tile<S> {
    pub fn new(stream: S) -> Self {
        Self::with_clock(stream, SystemClock::new(), TileConfig::default())
    }
}

impl<S: ByteStream, C: Clock> Tile<S, C> {
    pub fn with_clock(stream: S, clock: C, config: TileConfig) -> Self {
        Self {
            transport: LineTransport::new(stream, config.rx_capacity),
            clock,
            timeout_ms: config.timeout_ms,
            error_str: String::new(),
        }
    }

    /// Reset scratch state and drop anything the Tile printed before we attached.
    pub fn begin(&mut self) -> Result<()> {
        self.transport.clear();
        self.error_str.clear();
        self.transport.flush_input()?;
        Ok(())
    }

    pub fn set_timeout(&mut self, timeout_ms: u64) {
        self.timeout_ms = timeout_ms;
    }

    /// Mirror all raw traffic to `sink`, or stop mirroring with `None`.
    pub fn set_debug_sink(&mut self, sink: Option<DebugSink>) {
        self.transport.set_debug_sink(sink);
    }

    /// Device error token from the last exchange, empty unless it failed with
    /// [`TileError::Command`].
    pub fn error_str(&self) -> &str {
        &self.error_str
    }

    pub fn get_ref(&self) -> &S {
        self.transport.get_ref()
    }

    pub fn get_mut(&mut self) -> &mut S {
        self.transport.get_mut()
    }

    pub fn into_inner(self) -> S {
        self.transport.into_inner()
    }

    /// True once the Tile has booted and answers a version query.
    pub fn is_ready(&mut self) -> bool {
        self.get_version().is_ok()
    }

    /// True once the Tile has booted and acquired date and time, which it needs to
    /// send or receive messages.
    pub fn is_ready_to_send(&mut self) -> bool {
        self.is_ready() && self.get_date_time().is_ok()
    }

    /* ---------- exchange ---------- */

    fn command_error(&mut self, text: &str) -> TileError {
        self.error_str = truncated(text, ERROR_STR_LEN);
        TileError::Command(self.error_str.clone())
    }

    fn transmit(&mut self, frame: CommandFrame, expect_response: bool) -> Result<()> {
        self.error_str.clear();
        if expect_response {
            // stale output must not be taken for the answer
            self.transport.flush_input()?;
        }
        debug!(command = frame.body(), "tx");
        self.transport.send(frame)
    }

    /// Wait for the line answering `prefix`, then validate, tokenize and check it for a
    /// device error.
    fn receive(&mut self, prefix: &[u8]) -> Result<Sentence<'_>> {
        let deadline = Deadline::start(&self.clock, self.timeout_ms);
        self.transport
            .wait_for_line(&self.clock, &deadline, |line| line.starts_with(prefix))?;

        let line = self.transport.line();
        if let Err(e) = codec::validate(line) {
            warn!(line = %String::from_utf8_lossy(line), error = %e, "rejected response");
            return Err(e);
        }
        let text =
            std::str::from_utf8(line).map_err(|_| TileError::Protocol("response not utf-8"))?;
        let sentence = codec::tokenize(text)?;

        let Some(&first) = sentence.fields().first() else {
            return Err(TileError::Protocol("response has no fields"));
        };
        if first == "ERR" {
            let token = sentence.fields().get(1).copied().unwrap_or("");
            self.error_str = truncated(token, ERROR_STR_LEN);
            debug!(error = token, "device reported error");
            return Err(TileError::Command(self.error_str.clone()));
        }
        debug!(response = text, "rx");
        Ok(sentence)
    }

    fn exchange(&mut self, frame: CommandFrame) -> Result<Sentence<'_>> {
        let body = frame.body().as_bytes();
        let mut prefix = [0u8; 3];
        let n = body.len().min(3);
        prefix[..n].copy_from_slice(&body[..n]);
        self.transmit(frame, true)?;
        self.receive(&prefix[..n])
    }

    fn send_command(&mut self, command: &str) -> Result<Sentence<'_>> {
        self.exchange(CommandFrame::begin(command))
    }

    /// Send any command line (without checksum) and return the raw answer.
    pub fn command(&mut self, command: &str) -> Result<Response> {
        let s = self.send_command(command)?;
        Ok(Response {
            command: s.command().to_string(),
            fields: s.fields().iter().map(|f| f.to_string()).collect(),
        })
    }

    /// Send a command without waiting for, or flushing room for, an answer.
    pub fn notify(&mut self, command: &str) -> Result<()> {
        self.transmit(CommandFrame::begin(command), false)
    }

    /* ---------- operations ---------- */

    pub fn get_version(&mut self) -> Result<Version> {
        let s = self.send_command("$FV")?;
        let [date, version] = exact::<2>(&s)?;
        Ok(Version {
            date: truncated(date, VERSION_STR_LEN),
            version: truncated(version, VERSION_STR_LEN),
        })
    }

    /// Device configuration. Firmware before v1.1.0 also reports `AI=`; later
    /// firmware omits it and the app id reads as 0.
    pub fn get_config(&mut self) -> Result<Config> {
        let s = self.send_command("$CS")?;
        let mut config = Config {
            app_id: 0,
            device_id: 0,
            device_type: String::new(),
        };
        for field in s.fields() {
            if let Some(v) = field.strip_prefix("AI=") {
                config.app_id = parse_num(v, "bad AI= value")?;
            } else if let Some(v) = field.strip_prefix("DI=") {
                config.device_id = parse_num(v, "bad DI= value")?;
            } else if let Some(v) = field.strip_prefix("DN=") {
                config.device_type = truncated(v, DEVICE_TYPE_LEN);
            }
        }
        Ok(config)
    }

    pub fn set_gpio_mode(&mut self, mode: u8) -> Result<()> {
        let mut frame = CommandFrame::begin("$GP ");
        frame.push_str(&mode.to_string());
        self.exchange(frame)?;
        Ok(())
    }

    /// Put the Tile to sleep for `seconds`, or until `wakeup` if no seconds are given.
    pub fn sleep(&mut self, req: &SleepRequest) -> Result<()> {
        let mut frame = CommandFrame::begin("$SL ");
        if req.seconds != 0 {
            frame.push_str("S=");
            frame.push_str(&req.seconds.to_string());
        } else if let Some(wakeup) = req.wakeup.filter(|w| w.valid) {
            frame.push_str("U=");
            frame.push_str(&wakeup.to_string());
        } else {
            return Err(self.command_error("BADPARAM"));
        }
        match self.exchange(frame)?.fields() {
            ["OK"] => Ok(()),
            _ => Err(TileError::Protocol("unexpected sleep response")),
        }
    }

    /// Wake a sleeping Tile over serial. Fails with `NOTSLEEPING` if it was awake.
    pub fn wake(&mut self) -> Result<()> {
        let woke = self.send_command("$SL @")?.fields()[0] == "WAKE";
        if !woke {
            return Err(self.command_error("NOTSLEEPING"));
        }
        Ok(())
    }

    pub fn power_off(&mut self) -> Result<()> {
        let s = self.send_command("$PO")?;
        let first = s.fields()[0];
        if first != "OK" {
            let token = first.to_string();
            return Err(self.command_error(&token));
        }
        Ok(())
    }

    /// Current UTC date and time. `valid` is false until the Tile trusts its clock.
    pub fn get_date_time(&mut self) -> Result<DateTime> {
        let s = self.send_command("$DT @")?;
        let [stamp, flag] = exact::<2>(&s)?;
        let mut datetime =
            DateTime::parse_compact(stamp).ok_or(TileError::Protocol("bad $DT timestamp"))?;
        datetime.valid = flag.starts_with('V');
        Ok(datetime)
    }

    /// Position from the GPS. Checks fix status with `$GS` first and only asks for the
    /// position with `$GN` when there is a fix.
    pub fn get_geo_data(&mut self) -> Result<GeoData> {
        let (hdop, vdop, satellites, fix_type) = {
            let s = self.send_command("$GS @")?;
            let [hdop, vdop, sats, _, fix] = exact::<5>(&s)?;
            if fix == "NF" {
                debug!("no GPS fix");
                return Err(TileError::NoFix);
            }
            (
                parse_num::<u16>(hdop, "bad hdop")?,
                parse_num::<u16>(vdop, "bad vdop")?,
                parse_num::<u16>(sats, "bad satellite count")?,
                fix.to_string(),
            )
        };

        let s = self.send_command("$GN @")?;
        let [lat, lon, alt, course, speed] = exact::<5>(&s)?;
        Ok(GeoData {
            latitude: parse_float(lat)?,
            longitude: parse_float(lon)?,
            altitude: parse_float(alt)?,
            course: parse_float(course)?,
            speed: parse_float(speed)?,
            hdop,
            vdop,
            satellites,
            fix_type,
        })
    }

    fn msg_count(&mut self, command: &str) -> Result<u16> {
        let s = self.send_command(command)?;
        let [count] = exact::<1>(&s)?;
        parse_num(count, "bad message count")
    }

    /// Messages queued for transmission.
    pub fn get_unsent_count(&mut self) -> Result<u16> {
        self.msg_count("$MT C=U")
    }

    /// Received messages not read yet.
    pub fn get_unread_count(&mut self) -> Result<u16> {
        self.msg_count("$MM C=U")
    }

    /// Drop all unsent messages; returns how many were deleted.
    pub fn delete_unsent_msgs(&mut self) -> Result<u16> {
        self.msg_count("$MT D=U")
    }

    /// Drop all read messages; returns how many were deleted.
    pub fn delete_read_msgs(&mut self) -> Result<u16> {
        self.msg_count("$MM D=R")
    }

    /// Queue a message for transmission and return the id the Tile assigned to it.
    pub fn send_message(&mut self, req: &SendRequest<'_>) -> Result<u64> {
        let mut frame = CommandFrame::begin("$TD ");
        if req.hold_time > 0 {
            frame.push_str("HD=");
            frame.push_str(&req.hold_time.to_string());
            frame.push(b',');
        } else if let Some(expiration) = req.expiration.filter(|e| e.valid) {
            let Some(epoch) = expiration.to_epoch().filter(|&e| e >= 0) else {
                return Err(self.command_error("BADPARAM"));
            };
            frame.push_str("ET=");
            frame.push_str(&epoch.to_string());
            frame.push(b',');
        }
        frame.push_hex(req.message);

        match self.exchange(frame)?.fields() {
            ["OK", id] => parse_uint(id).ok_or(TileError::Protocol("bad message id")),
            _ => Err(TileError::Protocol("unexpected $TD response")),
        }
    }

    /// Read one received message into `buf`.
    ///
    /// A payload longer than `buf` is truncated, not rejected; the returned `len` says
    /// how much was written.
    pub fn read_message(&mut self, order: ReadOrder, buf: &mut [u8]) -> Result<ReadMessage> {
        if buf.is_empty() {
            return Err(self.command_error("NOREADBUFFER"));
        }
        buf.fill(0);

        let s = self.send_command(order.command())?;
        let (app_id, payload, id, epoch) = match s.fields() {
            [payload, id, epoch] => (0, *payload, *id, *epoch),
            [app, payload, id, epoch] if app.starts_with("AI=") => {
                (parse_num(&app[3..], "bad AI= value")?, *payload, *id, *epoch)
            }
            _ => return Err(TileError::Protocol("unexpected $MM response")),
        };
        let msg_id = parse_uint(id).ok_or(TileError::Protocol("bad message id"))?;
        let epoch: i64 = parse_num(epoch, "bad message timestamp")?;
        let timestamp =
            DateTime::from_epoch(epoch).ok_or(TileError::Protocol("bad message timestamp"))?;

        let bytes = hex::decode(payload).map_err(|_| TileError::Protocol("bad hex payload"))?;
        let len = bytes.len().min(buf.len());
        buf[..len].copy_from_slice(&bytes[..len]);

        Ok(ReadMessage {
            app_id,
            msg_id,
            len,
            timestamp,
        })
    }
}

/* ---------- helpers ---------- */

fn exact<'a, const N: usize>(s: &Sentence<'a>) -> Result<[&'a str; N]> {
    <[&'a str; N]>::try_from(s.fields()).map_err(|_| TileError::Protocol("unexpected field count"))
}

fn parse_num<T: TryFrom<u64>>(s: &str, what: &'static str) -> Result<T> {
    parse_uint(s)
        .and_then(|v| T::try_from(v).ok())
        .ok_or(TileError::Protocol(what))
}

fn parse_float(s: &str) -> Result<f32> {
    s.parse().map_err(|_| TileError::Protocol("bad number in $GN"))
}

fn truncated(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}
