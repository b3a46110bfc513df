//! Scripted Tile emulator shared by the integration tests.

// not every test file uses every helper
#![allow(dead_code)]

use std::cell::Cell;
use std::collections::VecDeque;
use std::io;

use swarm_tile::codec::checksum;
use swarm_tile::{ByteStream, Clock, Tile, TileConfig};

pub const TEST_TIMEOUT_MS: u64 = 100;

/// `$FV` -> `$FV*10`, ready to be framed with a newline.
pub fn with_checksum(sentence: &str) -> String {
    format!("{}*{:02x}", sentence, checksum(sentence.as_bytes()))
}

/// One expected command and the Tile's reply.
///
/// Strings ending in `\n` are compared/sent verbatim; anything else gets its checksum
/// and newline appended.
#[derive(Debug, Clone)]
pub struct Step {
    pub expected: String,
    pub response: Option<String>,
}

pub fn step(expected: &str, response: &str) -> Step {
    Step {
        expected: expected.to_string(),
        response: Some(response.to_string()),
    }
}

pub fn silent(expected: &str) -> Step {
    Step {
        expected: expected.to_string(),
        response: None,
    }
}

fn framed(s: &str) -> String {
    if s.ends_with('\n') {
        s.to_string()
    } else {
        format!("{}\n", with_checksum(s))
    }
}

/// Answers each complete command line with the next scripted response, provided the
/// line matches what the step expects.
#[derive(Debug, Default)]
pub struct TileEmu {
    steps: VecDeque<Step>,
    rx: VecDeque<u8>,
    line: Vec<u8>,
    /// Every line the driver sent, newline included.
    pub sent: Vec<String>,
    /// Lines that did not match the expected step.
    pub unexpected: Vec<String>,
}

impl TileEmu {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: steps.into(),
            ..Self::default()
        }
    }

    /// Bytes already waiting when the next command is sent.
    pub fn push_unsolicited(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes);
    }

    pub fn remaining_steps(&self) -> usize {
        self.steps.len()
    }

    fn process_line(&mut self, line: String) {
        self.sent.push(line.clone());
        let Some(step) = self.steps.pop_front() else {
            self.unexpected.push(line);
            return;
        };
        if framed(&step.expected) != line {
            self.unexpected.push(line);
            return;
        }
        if let Some(response) = step.response {
            self.rx.extend(framed(&response).into_bytes());
        }
    }
}

impl ByteStream for TileEmu {
    fn bytes_available(&mut self) -> io::Result<usize> {
        Ok(self.rx.len())
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        self.rx
            .pop_front()
            .ok_or_else(|| io::Error::from(io::ErrorKind::WouldBlock))
    }

    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        self.line.push(byte);
        if byte == b'\n' {
            let line = String::from_utf8_lossy(&self.line).into_owned();
            self.line.clear();
            self.process_line(line);
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Advances one millisecond every time it is read, so waits end deterministically.
#[derive(Debug, Default)]
pub struct StepClock(Cell<u64>);

impl Clock for StepClock {
    fn now_millis(&self) -> u64 {
        let now = self.0.get();
        self.0.set(now + 1);
        now
    }
}

pub type TestTile = Tile<TileEmu, StepClock>;

pub fn tile(steps: Vec<Step>) -> TestTile {
    tile_with(steps, TileConfig::default().with_timeout_ms(TEST_TIMEOUT_MS))
}

pub fn tile_with(steps: Vec<Step>, config: TileConfig) -> TestTile {
    Tile::with_clock(TileEmu::new(steps), StepClock::default(), config)
}

/// Tile answering a single command.
pub fn tile1(expected: &str, response: &str) -> TestTile {
    tile(vec![step(expected, response)])
}
