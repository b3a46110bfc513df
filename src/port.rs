use std::io::{self, Read, Write};
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};

use crate::stream::ByteStream;

/// Tiles talk 115200 8N1 out of the box.
pub const DEFAULT_BAUD: u32 = 115_200;

pub fn open_port(dev: &str, baud: u32, rtscts: bool) -> serialport::Result<Box<dyn SerialPort>> {
    serialport::new(dev, baud)
        .timeout(Duration::from_millis(100))
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(if rtscts {
            FlowControl::Hardware
        } else {
            FlowControl::None
        })
        .open()
}

/// [`ByteStream`] over a `serialport` handle.
pub struct SerialStream {
    port: Box<dyn SerialPort>,
}

impl SerialStream {
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }

    pub fn open(dev: &str, baud: u32, rtscts: bool) -> serialport::Result<Self> {
        open_port(dev, baud, rtscts).map(Self::new)
    }
}

impl ByteStream for SerialStream {
    fn bytes_available(&mut self) -> io::Result<usize> {
        Ok(self.port.bytes_to_read()? as usize)
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        let mut b = [0u8; 1];
        self.port.read_exact(&mut b)?;
        Ok(b[0])
    }

    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        self.port.write_all(&[byte])
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.port.write_all(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }
}
