//! Sentence framing: `$<CMD>[ <f1>[,<f2>...]]*<cc>\n`.
//!
//! `cc` is the XOR of every byte after the leading `$` up to the `*`, written as two
//! lowercase hex digits.

use std::fmt;

use crate::error::{Result, TileError};

/// Max entries in a parsed sentence, including the command token.
pub const MAX_FIELDS: usize = 8;

const HEX: &[u8; 16] = b"0123456789abcdef";

/// XOR checksum of a sentence body. A leading `$` is not part of the sum.
pub fn checksum(body: &[u8]) -> u8 {
    let body = body.strip_prefix(b"$").unwrap_or(body);
    body.iter().fold(0, |cs, b| cs ^ b)
}

fn hex_pair(b: u8) -> [u8; 2] {
    [HEX[(b >> 4) as usize], HEX[(b & 0x0f) as usize]]
}

/// Outbound sentence under construction.
///
/// Bytes are checksummed as they are pushed; [`CommandFrame::finish`] appends the
/// `*cc\n` trailer.
#[derive(Debug, Clone, Default)]
pub struct CommandFrame {
    buf: Vec<u8>,
    checksum: u8,
}

impl CommandFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(command: &str) -> Self {
        let mut frame = Self::new();
        frame.push_str(command);
        frame
    }

    pub fn push(&mut self, c: u8) {
        if !(self.buf.is_empty() && c == b'$') {
            self.checksum ^= c;
        }
        self.buf.push(c);
    }

    pub fn push_str(&mut self, s: &str) {
        for &c in s.as_bytes() {
            self.push(c);
        }
    }

    /// Append `bytes` as two lowercase hex digits each.
    pub fn push_hex(&mut self, bytes: &[u8]) {
        for &b in bytes {
            let [hi, lo] = hex_pair(b);
            self.push(hi);
            self.push(lo);
        }
    }

    /// Running byte count, trailer excluded.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn checksum(&self) -> u8 {
        self.checksum
    }

    /// Sentence body without the trailer, for logging.
    pub fn body(&self) -> &str {
        std::str::from_utf8(&self.buf).unwrap_or("<binary>")
    }

    pub fn finish(mut self) -> Vec<u8> {
        let [hi, lo] = hex_pair(self.checksum);
        self.buf.extend_from_slice(&[b'*', hi, lo, b'\n']);
        self.buf
    }
}

impl fmt::Write for CommandFrame {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push_str(s);
        Ok(())
    }
}

/// Check framing and checksum of a received line (newline already stripped).
pub fn validate(line: &[u8]) -> Result<()> {
    let len = line.len();
    if len <= 5 {
        return Err(TileError::Protocol("sentence too short"));
    }
    if line[0] != b'$' {
        return Err(TileError::Protocol("missing '$'"));
    }
    if line[len - 3] != b'*' {
        return Err(TileError::Protocol("missing checksum"));
    }
    let expected = hex_pair(checksum(&line[..len - 3]));
    if line[len - 2..] != expected {
        return Err(TileError::Protocol("checksum mismatch"));
    }
    Ok(())
}

/// A validated response split into its command token and fields.
///
/// All slices borrow from the line they were parsed from.
#[derive(Debug, Clone, Copy)]
pub struct Sentence<'a> {
    command: &'a str,
    fields: [&'a str; MAX_FIELDS - 1],
    count: usize,
}

impl<'a> Sentence<'a> {
    /// Command token including the leading `$`, e.g. `$FV`.
    pub fn command(&self) -> &'a str {
        self.command
    }

    /// Fields after the command, in order.
    pub fn fields(&self) -> &[&'a str] {
        &self.fields[..self.count]
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Split a sentence into command and comma separated fields, stopping at `*`.
///
/// The command ends at the first space; a sentence without a space has no fields.
/// More than `MAX_FIELDS - 1` fields is a protocol error rather than a silent drop.
pub fn tokenize(line: &str) -> Result<Sentence<'_>> {
    let body = match line.find('*') {
        Some(star) => &line[..star],
        None => line,
    };
    let mut sentence = Sentence {
        command: body,
        fields: [""; MAX_FIELDS - 1],
        count: 0,
    };
    let Some((command, rest)) = body.split_once(' ') else {
        return Ok(sentence);
    };
    sentence.command = command;
    for field in rest.split(',') {
        if sentence.count == MAX_FIELDS - 1 {
            return Err(TileError::Protocol("too many fields"));
        }
        sentence.fields[sentence.count] = field;
        sentence.count += 1;
    }
    Ok(sentence)
}

/// Parse an unsigned decimal, or hex with a `0x` prefix.
pub fn parse_uint(s: &str) -> Option<u64> {
    match s.strip_prefix("0x") {
        Some(digits) if !digits.is_empty() => u64::from_str_radix(digits, 16).ok(),
        Some(_) => None,
        None if s.bytes().all(|b| b.is_ascii_digit()) => s.parse().ok(),
        None => None,
    }
}
