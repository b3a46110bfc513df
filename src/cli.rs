use clap::{Args, Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};

use swarm_tile::{DateTime, ReadOrder};

#[derive(Parser, Debug)]
#[command(name = "swarm-tile", version, about = "Talk to a Swarm Tile over a serial port")]
pub struct Cli {
    #[command(flatten)]
    pub ser: SerialOpts,
    #[command(flatten)]
    pub verbose: Verbosity<InfoLevel>,
    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Cmd {
    /// Check that the Tile booted (and optionally has date/time to send)
    Ready {
        #[arg(long, default_value_t = false)]
        send: bool,
    },
    /// Firmware version
    Version,
    /// Device id, type and app id
    Config,
    /// Set GPIO1 mode
    Gpio { mode: u8 },
    /// Current UTC date and time
    Datetime,
    /// GPS position
    Gps,
    /// Number of unsent messages
    Unsent,
    /// Number of unread messages
    Unread,
    /// Delete all unsent messages
    DeleteUnsent,
    /// Delete all read messages
    DeleteRead,
    /// Queue a message for transmission
    Send(SendOpts),
    /// Read a received message
    Read(ReadOpts),
    /// Sleep for some seconds or until a UTC time
    Sleep(SleepOpts),
    /// Wake a sleeping Tile
    Wake,
    /// Power the Tile off
    PowerOff,
    /// Send any command, e.g. "$RT @", and print the answer fields
    Raw { command: String },
}

#[derive(Args, Debug, Clone)]
pub struct SerialOpts {
    /// Serial device path
    #[arg(long, default_value = "/dev/ttyUSB0")]
    pub dev: String,
    /// Baud rate
    #[arg(long, default_value_t = swarm_tile::port::DEFAULT_BAUD)]
    pub baud: u32,
    /// Enable RTS/CTS
    #[arg(long, default_value_t = false)]
    pub rtscts: bool,
    /// Response timeout in milliseconds
    #[arg(long, default_value_t = swarm_tile::tile::DEFAULT_TIMEOUT_MS)]
    pub timeout: u64,
    /// Echo raw serial traffic to stderr
    #[arg(long, default_value_t = false)]
    pub echo: bool,
}

#[derive(Args, Debug, Clone)]
pub struct SendOpts {
    /// Message text, or hex bytes with --hex
    pub message: String,
    /// Treat MESSAGE as hex encoded bytes
    #[arg(long, default_value_t = false)]
    pub hex: bool,
    /// Seconds to hold an unsent message (60-172800)
    #[arg(long)]
    pub hold: Option<u32>,
    /// Discard if unsent by this UTC time, "YYYY-MM-DD HH:MM:SS"
    #[arg(long, conflicts_with = "hold")]
    pub expire: Option<DateTime>,
}

#[derive(Args, Debug, Clone)]
pub struct ReadOpts {
    /// "oldest" or "newest"
    #[arg(long, default_value = "oldest")]
    pub order: ReadOrder,
    /// Receive buffer size in bytes
    #[arg(long, default_value_t = swarm_tile::tile::MAX_MSG_SIZE)]
    pub max: usize,
    /// Print the payload as hex instead of text
    #[arg(long, default_value_t = false)]
    pub hex: bool,
}

#[derive(Args, Debug, Clone)]
pub struct SleepOpts {
    /// Seconds to sleep
    #[arg(long, conflicts_with = "until")]
    pub seconds: Option<u16>,
    /// Wake up at this UTC time, "YYYY-MM-DD HH:MM:SS"
    #[arg(long)]
    pub until: Option<DateTime>,
}
