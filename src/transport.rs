//! Line-level I/O over a [`ByteStream`]: flush-on-send, mirrored transmit and
//! timeout-bounded line collection.

use std::io::Write;

use tracing::trace;

use crate::codec::CommandFrame;
use crate::error::{Result, TileError};
use crate::stream::{ByteStream, Clock};

/// Passive copy of all traffic, e.g. stderr. Failures writing to it are ignored.
pub type DebugSink = Box<dyn Write + Send>;

/// Fixed start point plus allowed duration for one receive phase.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    start: u64,
    timeout_ms: u64,
}

impl Deadline {
    pub fn start<C: Clock>(clock: &C, timeout_ms: u64) -> Self {
        Self {
            start: clock.now_millis(),
            timeout_ms,
        }
    }

    pub fn expired<C: Clock>(&self, clock: &C) -> bool {
        clock.now_millis().saturating_sub(self.start) > self.timeout_ms
    }
}

pub struct LineTransport<S> {
    stream: S,
    debug: Option<DebugSink>,
    line: Vec<u8>,
    capacity: usize,
}

impl<S: ByteStream> LineTransport<S> {
    pub fn new(stream: S, capacity: usize) -> Self {
        Self {
            stream,
            debug: None,
            line: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn set_debug_sink(&mut self, sink: Option<DebugSink>) {
        self.debug = sink;
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Last line collected by [`LineTransport::read_line`], without the newline.
    pub fn line(&self) -> &[u8] {
        &self.line
    }

    pub fn clear(&mut self) {
        self.line.clear();
    }

    /// Discard everything already queued on the stream.
    pub fn flush_input(&mut self) -> Result<usize> {
        let mut dropped = 0;
        while self.stream.bytes_available()? > 0 {
            self.stream.read_byte()?;
            dropped += 1;
        }
        if dropped > 0 {
            trace!(dropped, "discarded stale input");
        }
        Ok(dropped)
    }

    /// Write a finished sentence and force it out, mirroring it to the debug sink.
    pub fn send(&mut self, frame: CommandFrame) -> Result<()> {
        let bytes = frame.finish();
        self.stream.write_bytes(&bytes)?;
        self.stream.flush()?;
        if let Some(debug) = self.debug.as_mut() {
            let _ = debug.write_all(&bytes);
            let _ = debug.flush();
        }
        Ok(())
    }

    /// Collect bytes until a newline.
    ///
    /// The deadline is shared by the whole receive phase, so bytes arriving do not
    /// extend it. On overflow the rest of the physical line stays in the stream.
    pub fn read_line<C: Clock>(&mut self, clock: &C, deadline: &Deadline) -> Result<()> {
        self.line.clear();
        loop {
            if deadline.expired(clock) {
                return Err(TileError::Timeout);
            }
            let available = self.stream.bytes_available()?;
            if available == 0 {
                clock.idle();
                continue;
            }
            for _ in 0..available {
                let ch = self.stream.read_byte()?;
                if let Some(debug) = self.debug.as_mut() {
                    let _ = debug.write_all(&[ch]);
                }
                if ch == b'\n' {
                    return Ok(());
                }
                if self.line.len() < self.capacity.saturating_sub(1) {
                    self.line.push(ch);
                } else {
                    return Err(TileError::RxOverflow);
                }
            }
        }
    }

    /// Read lines until `accept` matches one, discarding the rest.
    pub fn wait_for_line<C, F>(&mut self, clock: &C, deadline: &Deadline, mut accept: F) -> Result<()>
    where
        C: Clock,
        F: FnMut(&[u8]) -> bool,
    {
        loop {
            self.read_line(clock, deadline)?;
            if accept(&self.line) {
                return Ok(());
            }
            trace!(line = %String::from_utf8_lossy(&self.line), "ignoring unsolicited line");
        }
    }
}
