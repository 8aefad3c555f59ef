use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, bail};
use base64::{Engine as _, engine::general_purpose};
use crossbeam_channel::Receiver;
use futures::future::BoxFuture;
use tokio::task::JoinHandle;

use regionshot::config::OverlayConfig;
use regionshot::core::overlay::run_pending_frames;
use regionshot::render::scheduler::{ChannelScheduler, FrameTick};
use regionshot::screenshot::{self, FileHost};
use regionshot::{Event, Key, Overlay};

const USAGE: &str = "usage: regionshot <image> [--viewport WxH] [--pick x,y] \
                     [--drag x0,y0,x1,y1] [--frame frame.png] [--out-dir DIR] [--write-config]";

/// Steps used to interpolate the scripted drag
const DRAG_STEPS: u32 = 8;

struct Args {
    image: PathBuf,
    viewport: Option<(u32, u32)>,
    pick: Option<[f32; 2]>,
    drag: Option<[f32; 4]>,
    frame: Option<PathBuf>,
    out_dir: Option<PathBuf>,
    write_config: bool,
}

fn parse_floats(value: &str) -> anyhow::Result<Vec<f32>> {
    Ok(value
        .split(',')
        .map(str::parse::<f32>)
        .collect::<Result<Vec<_>, _>>()?)
}

fn parse_args() -> anyhow::Result<Args> {
    let mut image = None;
    let mut viewport = None;
    let mut pick = None;
    let mut drag = None;
    let mut frame = None;
    let mut out_dir = None;
    let mut write_config = false;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--viewport" => {
                let value = args.next().context("--viewport needs a value")?;
                let (w, h) = value.split_once('x').context("--viewport must be WxH")?;
                viewport = Some((w.parse()?, h.parse()?));
            }
            "--pick" => {
                let parts = parse_floats(&args.next().context("--pick needs a value")?)?;
                let [x, y] = parts[..] else {
                    bail!("--pick must be x,y");
                };
                pick = Some([x, y]);
            }
            "--drag" => {
                let parts = parse_floats(&args.next().context("--drag needs a value")?)?;
                let [x0, y0, x1, y1] = parts[..] else {
                    bail!("--drag must be x0,y0,x1,y1");
                };
                drag = Some([x0, y0, x1, y1]);
            }
            "--frame" => frame = Some(PathBuf::from(args.next().context("--frame needs a path")?)),
            "--out-dir" => {
                out_dir = Some(PathBuf::from(args.next().context("--out-dir needs a path")?))
            }
            "--write-config" => write_config = true,
            "-h" | "--help" => {
                println!("{}", USAGE);
                std::process::exit(0);
            }
            _ if image.is_none() => image = Some(PathBuf::from(arg)),
            _ => bail!("unexpected argument {}\n{}", arg, USAGE),
        }
    }

    Ok(Args {
        image: image.context(USAGE)?,
        viewport,
        pick,
        drag,
        frame,
        out_dir,
        write_config,
    })
}

/// Run every frame the overlay asked for since the last call
fn pump_frames(overlay: &mut Overlay, ticks: &Receiver<FrameTick>) {
    if run_pending_frames(overlay, ticks) == 0 {
        return;
    }
    if let Some(frame) = overlay.last_frame() {
        for label in &frame.labels {
            log::debug!("label {:?} at ({:.0}, {:.0})", label.text, label.x, label.y);
        }
    }
}

/// Wait for the host calls spawned so far
async fn settle(calls: &RefCell<Vec<JoinHandle<()>>>) -> anyhow::Result<()> {
    settle(&calls).await?;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = parse_args()?;
    let config = OverlayConfig::load();
    if args.write_config {
        config.save();
    }

    let bytes = std::fs::read(&args.image)
        .with_context(|| format!("failed to read {}", args.image.display()))?;
    let full = image::load_from_memory(&bytes)
        .with_context(|| format!("failed to decode {}", args.image.display()))?
        .to_rgba8();
    let viewport = args.viewport.unwrap_or(full.dimensions());
    let data_url = format!(
        "data:image/png;base64,{}",
        general_purpose::STANDARD.encode(&bytes)
    );

    let out_dir = args.out_dir.unwrap_or_else(screenshot::default_output_dir);
    let host = Arc::new(FileHost::new(full, out_dir));

    let (tx, ticks) = crossbeam_channel::unbounded();
    let calls: Rc<RefCell<Vec<JoinHandle<()>>>> = Rc::default();
    let spawned = calls.clone();
    let mut overlay = Overlay::new(
        viewport,
        &config,
        host.clone(),
        Box::new(ChannelScheduler::new(tx)),
        Box::new(move |fut: BoxFuture<'static, ()>| {
            spawned.borrow_mut().push(tokio::spawn(fut))
        }),
    );

    let init = overlay.initialize(serde_json::json!({ "imageDataUrl": data_url }));
    pump_frames(&mut overlay, &ticks);

    if init.is_ok() {
        if let Some([x, y]) = args.pick {
            overlay.handle(Event::pointer_move(x, y), Instant::now());
            overlay.handle(Event::key("c"), Instant::now());
            settle(&calls).await?;
            overlay.poll_host(Instant::now());
            pump_frames(&mut overlay, &ticks);
        }
        match args.drag {
            Some([x0, y0, x1, y1]) => {
                overlay.handle(Event::pointer_move(x0, y0), Instant::now());
                overlay.handle(Event::pointer_down(x0, y0), Instant::now());
                pump_frames(&mut overlay, &ticks);
                for step in 1..=DRAG_STEPS {
                    let t = step as f32 / DRAG_STEPS as f32;
                    let x = x0 + (x1 - x0) * t;
                    let y = y0 + (y1 - y0) * t;
                    overlay.handle(Event::pointer_move(x, y), Instant::now());
                }
                pump_frames(&mut overlay, &ticks);
                if let Some(path) = &args.frame {
                    save_frame(&overlay, path)?;
                }
                overlay.handle(Event::pointer_up(x1, y1), Instant::now());
            }
            None => {
                if let Some(path) = &args.frame {
                    save_frame(&overlay, path)?;
                }
                overlay.handle(Event::KeyDown(Key::Escape), Instant::now());
            }
        }
    }

    settle(&calls).await?;

    log::info!("Session finished: {:?}", overlay.state());
    if let Some(path) = host.last_saved() {
        println!("{}", path.display());
    }
    if let Some(reason) = host.close_reason() {
        bail!(reason);
    }
    Ok(())
}

fn save_frame(overlay: &Overlay, path: &Path) -> anyhow::Result<()> {
    let frame = overlay.last_frame().context("no frame was composited")?;
    screenshot::save_rgba(&frame.to_rgba(), path)?;
    log::info!("Frame written to {}", path.display());
    Ok(())
}
