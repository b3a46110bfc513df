//! Byte stream and clock boundaries the driver runs on.
//!
//! The driver only needs four byte-level capabilities from its link and a monotonic
//! millisecond clock to bound waits. Real hardware plugs in through
//! [`crate::port::SerialStream`].

#[cfg(test)]
use std::collections::VecDeque;
use std::io;
use std::time::{Duration, Instant};

/// Minimal byte link to a Tile.
pub trait ByteStream {
    /// Number of received bytes that can be read without blocking.
    fn bytes_available(&mut self) -> io::Result<usize>;
    /// Read one byte. Only valid after `bytes_available` reported data.
    fn read_byte(&mut self) -> io::Result<u8>;
    fn write_byte(&mut self, byte: u8) -> io::Result<()>;
    /// Force buffered output onto the wire.
    fn flush(&mut self) -> io::Result<()>;

    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        for &b in bytes {
            self.write_byte(b)?;
        }
        Ok(())
    }
}

impl<S: ByteStream + ?Sized> ByteStream for &mut S {
    fn bytes_available(&mut self) -> io::Result<usize> {
        (**self).bytes_available()
    }
    fn read_byte(&mut self) -> io::Result<u8> {
        (**self).read_byte()
    }
    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        (**self).write_byte(byte)
    }
    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

impl<S: ByteStream + ?Sized> ByteStream for Box<S> {
    fn bytes_available(&mut self) -> io::Result<usize> {
        (**self).bytes_available()
    }
    fn read_byte(&mut self) -> io::Result<u8> {
        (**self).read_byte()
    }
    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        (**self).write_byte(byte)
    }
    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

/// Monotonic millisecond time source used to bound response waits.
pub trait Clock {
    fn now_millis(&self) -> u64;

    /// Called while polling an empty stream.
    fn idle(&self) {}
}

#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn idle(&self) {
        std::thread::sleep(Duration::from_millis(1));
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_millis(&self) -> u64 {
        (**self).now_millis()
    }
    fn idle(&self) {
        (**self).idle()
    }
}

#[cfg(test)]
/// In-memory loopback: bytes pushed with [`MemoryStream::push_rx`] are what the driver
/// reads, and everything the driver writes is collected for inspection.
#[derive(Debug, Default, Clone)]
pub struct MemoryStream {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
    flushes: usize,
}

#[cfg(test)]
impl MemoryStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_rx(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes);
    }

    pub fn pending_rx(&self) -> usize {
        self.rx.len()
    }

    pub fn tx(&self) -> &[u8] {
        &self.tx
    }

    pub fn take_tx(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.tx)
    }

    pub fn flush_count(&self) -> usize {
        self.flushes
    }
}

#[cfg(test)]
impl ByteStream for MemoryStream {
    fn bytes_available(&mut self) -> io::Result<usize> {
        Ok(self.rx.len())
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        self.rx
            .pop_front()
            .ok_or_else(|| io::Error::from(io::ErrorKind::WouldBlock))
    }

    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        self.tx.push(byte);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushes += 1;
        Ok(())
    }
}
