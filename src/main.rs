use anyhow::{Context, Result};
use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use swarm_tile::{SerialStream, Tile};

mod cli;
mod run;

fn setup_logging(verbosity: &Verbosity<InfoLevel>) {
    let filter = EnvFilter::builder()
        .with_default_directive(verbosity.tracing_level_filter().into())
        .from_env_lossy();
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .init();
}

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    setup_logging(&args.verbose);

    let ser = &args.ser;
    let stream = SerialStream::open(&ser.dev, ser.baud, ser.rtscts)
        .with_context(|| format!("open {}", ser.dev))?;
    let mut tile = Tile::new(stream);
    tile.set_timeout(ser.timeout);
    if ser.echo {
        tile.set_debug_sink(Some(Box::new(std::io::stderr())));
    }
    tile.begin().context("flushing serial input")?;

    run::run(&mut tile, args.cmd)
}
