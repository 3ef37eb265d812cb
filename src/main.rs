// src/main.rs

//! `dosframe`: drives a synthetic renderer through the video output and
//! checks that a mirroring consumer ends up with the same pixels.

use std::path::PathBuf;

use anyhow::{bail, ensure, Context, Result};
use log::{info, warn};

use dosframe::config::{self, Config, CONFIG};
use dosframe::encoder::encode_change_runs;
use dosframe::{FrameView, MirrorSink, ModeFlags, Rgb, VideoOutput};

const DEFAULT_FRAMES: u32 = 120;
const BASE_SIZE: (usize, usize) = (320, 200);
const BAR_HEIGHT: usize = 8;

struct Args {
    config_paths: Vec<PathBuf>,
    user_conf: bool,
    frames: u32,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        config_paths: Vec::new(),
        user_conf: false,
        frames: DEFAULT_FRAMES,
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-userconf" => args.user_conf = true,
            "-conf" => {
                let path = iter.next().context("-conf needs a path")?;
                args.config_paths.push(PathBuf::from(path));
            }
            "-frames" => {
                let n = iter.next().context("-frames needs a count")?;
                args.frames = n
                    .parse()
                    .with_context(|| format!("Invalid frame count `{n}`"))?;
            }
            other => bail!("Unknown argument `{other}`"),
        }
    }
    ensure!(args.frames > 0, "-frames must be positive");
    Ok(args)
}

/// Static diagonal gradient with a white bar that moves down each frame.
fn draw_frame(view: &mut FrameView<'_>, frame: u32) {
    let (width, height) = (view.width(), view.height());
    let bar_top = (frame as usize * 3) % height;
    for y in 0..height {
        if (bar_top..bar_top + BAR_HEIGHT).contains(&y) {
            view.fill_row(y, Rgb::new(0xff, 0xff, 0xff));
            continue;
        }
        for x in 0..width {
            let shade = ((x + y) % 256) as u8;
            view.put_pixel(x, y, Rgb::new(shade, shade / 2, 0x40));
        }
    }
}

/// Main entry point for the `dosframe` demo.
fn main() -> Result<()> {
    // Default filter is "info" if RUST_LOG is not set.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    let args = parse_args().context("Failed to parse arguments")?;

    let config = if args.config_paths.is_empty() && !args.user_conf {
        Config::clone(&CONFIG)
    } else {
        let user_dir = config::user_config_dir();
        let (config, source) =
            Config::resolve(&args.config_paths, user_dir.as_deref(), args.user_conf);
        match source {
            Some(path) => info!("Configuration loaded from {}", path.display()),
            None => warn!("No config file could be loaded; using default settings"),
        }
        config
    };
    info!(
        "Output {:?}, fullscreen {}, window resolution {}",
        config.sdl.output,
        config.sdl.fullscreen,
        config.sdl.window_resolution()?
    );

    let mut video = VideoOutput::new(MirrorSink::new());
    let mode = video.best_mode(ModeFlags::CAN_8 | ModeFlags::CAN_32);
    info!("Best mode: {:?}", mode);

    let mut previous: Vec<u8> = Vec::new();
    let mut rows_published = 0usize;
    for frame in 0..args.frames {
        let (w, h) = if frame < args.frames / 2 {
            BASE_SIZE
        } else {
            (BASE_SIZE.0 * 2, BASE_SIZE.1 * 2)
        };
        video
            .ensure_size(w, h)
            .with_context(|| format!("Failed to size the surface to {w}x{h}"))?;

        let (current, pitch) = {
            let mut view = video.begin_update().context("Surface unexpectedly busy")?;
            draw_frame(&mut view, frame);
            let pitch = view.pitch();
            (view.pixels_mut().to_vec(), pitch)
        };
        let runs = encode_change_runs(&previous, &current, pitch, h);
        if let Some(stats) = video.end_update(Some(runs.as_slice())) {
            rows_published += stats.rows;
        }
        previous = current;
    }

    let surface = video.surface().context("No surface after rendering")?;
    let mirror = video.sink();
    ensure!(
        mirror.pixels() == surface.pixels(),
        "Mirror diverged from the surface"
    );
    info!(
        "Published {} frames, {} rows ({} rows received by the mirror); final size {:?}",
        video.frames_published(),
        rows_published,
        mirror.rows_received(),
        mirror.dimensions()
    );
    Ok(())
}
