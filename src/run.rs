use anyhow::{Context, Result, bail};
use tracing::info;

use swarm_tile::{ByteStream, Clock, SendRequest, SleepRequest, Tile, TileError};

use crate::cli::{Cmd, ReadOpts, SendOpts, SleepOpts};

pub fn run<S: ByteStream, C: Clock>(tile: &mut Tile<S, C>, cmd: Cmd) -> Result<()> {
    match cmd {
        Cmd::Ready { send } => {
            let ready = if send {
                tile.is_ready_to_send()
            } else {
                tile.is_ready()
            };
            println!("{}", if ready { "ready" } else { "not ready" });
            if !ready {
                bail!("tile not ready");
            }
        }
        Cmd::Version => {
            let v = tile.get_version().context("$FV")?;
            println!("{} ({})", v.version, v.date);
        }
        Cmd::Config => {
            let c = tile.get_config().context("$CS")?;
            println!(
                "device_id=0x{:08x} device_type={} app_id={}",
                c.device_id, c.device_type, c.app_id
            );
        }
        Cmd::Gpio { mode } => {
            tile.set_gpio_mode(mode).context("$GP")?;
            info!(mode, "gpio mode set");
        }
        Cmd::Datetime => {
            let dt = tile.get_date_time().context("$DT")?;
            println!("{} UTC{}", dt, if dt.valid { "" } else { " (not valid)" });
        }
        Cmd::Gps => match tile.get_geo_data() {
            Ok(g) => println!(
                "lat={} lon={} alt={}m course={} speed={}km/h fix={} sats={} hdop={} vdop={}",
                g.latitude,
                g.longitude,
                g.altitude,
                g.course,
                g.speed,
                g.fix_type,
                g.satellites,
                g.hdop,
                g.vdop
            ),
            Err(TileError::NoFix) => println!("no fix"),
            Err(e) => return Err(e).context("$GS/$GN"),
        },
        Cmd::Unsent => println!("{}", tile.get_unsent_count().context("$MT C=U")?),
        Cmd::Unread => println!("{}", tile.get_unread_count().context("$MM C=U")?),
        Cmd::DeleteUnsent => println!("{}", tile.delete_unsent_msgs().context("$MT D=U")?),
        Cmd::DeleteRead => println!("{}", tile.delete_read_msgs().context("$MM D=R")?),
        Cmd::Send(opts) => send(tile, opts)?,
        Cmd::Read(opts) => read(tile, opts)?,
        Cmd::Sleep(opts) => sleep(tile, opts)?,
        Cmd::Wake => {
            tile.wake().context("$SL @")?;
            info!("tile woke up");
        }
        Cmd::PowerOff => {
            tile.power_off().context("$PO")?;
            info!("tile powering off");
        }
        Cmd::Raw { command } => {
            let command = if command.starts_with('$') {
                command
            } else {
                format!("${command}")
            };
            let resp = tile.command(&command).with_context(|| command.clone())?;
            println!("{} {}", resp.command, resp.fields.join(","));
        }
    }
    Ok(())
}

fn send<S: ByteStream, C: Clock>(tile: &mut Tile<S, C>, opts: SendOpts) -> Result<()> {
    let payload = if opts.hex {
        hex::decode(opts.message.trim()).context("message is not valid hex")?
    } else {
        opts.message.into_bytes()
    };
    let mut req = SendRequest::new(&payload);
    if let Some(hold) = opts.hold {
        req = req.hold_for(hold);
    }
    if let Some(expire) = opts.expire {
        req = req.expire_at(expire);
    }
    let id = tile.send_message(&req).context("$TD")?;
    println!("{id}");
    Ok(())
}

fn read<S: ByteStream, C: Clock>(tile: &mut Tile<S, C>, opts: ReadOpts) -> Result<()> {
    let mut buf = vec![0u8; opts.max];
    let msg = tile.read_message(opts.order, &mut buf).context("$MM R")?;
    let payload = &buf[..msg.len];
    let text = if opts.hex {
        hex::encode(payload)
    } else {
        String::from_utf8_lossy(payload).into_owned()
    };
    println!(
        "id={} app_id={} received={} UTC len={}",
        msg.msg_id, msg.app_id, msg.timestamp, msg.len
    );
    println!("{text}");
    Ok(())
}

fn sleep<S: ByteStream, C: Clock>(tile: &mut Tile<S, C>, opts: SleepOpts) -> Result<()> {
    let req = match (opts.seconds, opts.until) {
        (Some(seconds), _) => SleepRequest::for_seconds(seconds),
        (None, Some(until)) => SleepRequest::until(until),
        (None, None) => bail!("give --seconds or --until"),
    };
    tile.sleep(&req).context("$SL")?;
    info!("tile sleeping");
    Ok(())
}
