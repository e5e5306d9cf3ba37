use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use raylib::prelude::*;

use image_automater::config::{Cli, Config, TriggerDevice};
use image_automater::constants::*;
use image_automater::display::ChannelSink;
use image_automater::link::{NullLink, TriggerLink};
use image_automater::screen::Screen;
use image_automater::{Engine, ImageSet};

fn open_link(device: &TriggerDevice) -> Result<Box<dyn TriggerLink>> {
    match device {
        TriggerDevice::Null => {
            info!("Using null trigger link; the slideshow will wait forever for `next`");
            Ok(Box::new(NullLink))
        }
        #[cfg(unix)]
        TriggerDevice::Serial { path, baud } => {
            let link = image_automater::link::SerialLink::open(path, *baud)
                .with_context(|| format!("Failed to open trigger device {}", path.display()))?;
            Ok(Box::new(link))
        }
        #[cfg(not(unix))]
        TriggerDevice::Serial { path, .. } => {
            anyhow::bail!("Serial trigger devices are not supported on this platform: {}", path.display())
        }
    }
}

fn run(config: Config) -> Result<()> {
    // --- Load images and open the trigger link before any window exists ---
    let images = ImageSet::load(&config.folder, config.recursive)
        .with_context(|| format!("Error loading images from '{}'", config.folder.display()))?;
    info!("Loaded {} images from {}", images.len(), config.folder.display());

    let link = config.trigger.as_ref().map(open_link).transpose()?;

    let (mut rl, thread) = raylib::init()
        .size(WINDOW_WIDTH, WINDOW_HEIGHT)
        .title("Slideshow")
        .vsync()
        .resizable()
        .build();
    rl.set_target_fps(FPS);
    rl.set_trace_log(TraceLogLevel::LOG_ERROR);
    if !config.windowed {
        rl.toggle_fullscreen();
    }

    let (sink, requests) = ChannelSink::new();
    let mut screen = Screen::new(requests, config.background);

    let mut engine =
        Engine::new(images, config.mode, sink, link).context("Failed to create slideshow engine")?;
    engine.start().context("Failed to start slideshow")?;

    // --- Main Loop ---
    while !rl.window_should_close() {
        if rl.is_key_pressed(KeyboardKey::KEY_SPACE) {
            if let Err(e) = engine.toggle_pause() {
                error!("Pause failed: {}", e);
            }
        }
        let ctrl = rl.is_key_down(KeyboardKey::KEY_LEFT_CONTROL) || rl.is_key_down(KeyboardKey::KEY_RIGHT_CONTROL);
        if ctrl && rl.is_key_pressed(KeyboardKey::KEY_K) {
            info!("Ctrl+K pressed, quitting");
            break;
        }

        if !screen.update(&mut rl, &thread) {
            break;
        }

        let mut d = rl.begin_drawing(&thread);
        screen.draw(&mut d);
    }

    engine.stop().context("Failed to stop slideshow")?;
    // The link comes back to us once the engine has stopped; dropping it closes the device.
    drop(engine.take_link());
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let result = Config::try_from(cli)
        .context("Invalid arguments")
        .and_then(run);

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
