//! Shorthand calls that fold errors into a plain value.
//!
//! They hide which error happened; use the typed calls on [`Tile`] when that matters.

use crate::error::Result;
use crate::stream::{ByteStream, Clock};
use crate::tile::Tile;
use crate::types::{ReadOrder, SendRequest};

impl<S: ByteStream, C: Clock> Tile<S, C> {
    /// Unsent message count, 0 on any error.
    pub fn unsent_count_or_zero(&mut self) -> u16 {
        self.get_unsent_count().unwrap_or(0)
    }

    /// Unread message count, 0 on any error.
    pub fn unread_count_or_zero(&mut self) -> u16 {
        self.get_unread_count().unwrap_or(0)
    }

    pub fn delete_unsent_or_zero(&mut self) -> u16 {
        self.delete_unsent_msgs().unwrap_or(0)
    }

    pub fn delete_read_or_zero(&mut self) -> u16 {
        self.delete_read_msgs().unwrap_or(0)
    }

    /// Send a text message with the Tile's default hold time.
    pub fn send_text(&mut self, text: &str) -> Result<u64> {
        self.send_bytes(text.as_bytes())
    }

    pub fn send_bytes(&mut self, bytes: &[u8]) -> Result<u64> {
        self.send_message(&SendRequest::new(bytes))
    }

    /// Read a message into `buf` and return its length, 0 if none could be read.
    pub fn read_into(&mut self, buf: &mut [u8], order: ReadOrder) -> usize {
        self.read_message(order, buf).map(|m| m.len).unwrap_or(0)
    }
}
