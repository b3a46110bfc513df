//! Host-side driver for the Swarm Tile satellite modem.
//!
//! The Tile speaks NMEA-style sentences over a serial link:
//! `$<CMD>[ <field>[,<field>...]]*<cc>\n`. [`Tile`] sends one command at a time, waits
//! for the matching answer and decodes it.
//!
//! ```no_run
//! use swarm_tile::{SerialStream, Tile};
//!
//! let stream = SerialStream::open("/dev/ttyUSB0", swarm_tile::port::DEFAULT_BAUD, false)?;
//! let mut tile = Tile::new(stream);
//! tile.begin()?;
//! let id = tile.send_text("hello world")?;
//! println!("queued as {id}");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod codec;
pub mod error;
pub mod port;
mod simple;
pub mod stream;
pub mod tile;
pub mod transport;
pub mod types;

pub use error::{Result, Status, TileError};
pub use port::SerialStream;
pub use stream::{ByteStream, Clock, SystemClock};
pub use tile::{Tile, TileConfig};
pub use types::{
    Config, DateTime, GeoData, ReadMessage, ReadOrder, Response, SendRequest, SleepRequest,
    Version,
};
