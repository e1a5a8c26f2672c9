#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod config;
mod gesture;
mod media;
mod model_download;
mod pipeline;
mod types;
mod ui;

use anyhow::Result;
use clap::Parser;
use crossbeam_channel::{bounded, unbounded};
use gpui::Application;

use config::AppConfig;
use pipeline::{ChannelDisplay, spawn_session};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::parse();

    if config.list_cameras {
        return list_cameras();
    }

    media::prepare_media_dir(&config.media_dir, &config.media_table())?;

    if config.landmark_command().is_some() && !config.skip_model_download {
        model_download::ensure_models(&config.models_dir);
    }

    let (frame_tx, frame_rx) = bounded(2);
    let (quit_tx, quit_rx) = unbounded();
    let initial_size = (config.width * 2, config.height);

    let session = spawn_session(config, ChannelDisplay::new(frame_tx, quit_rx))?;

    Application::new()
        .with_assets(gpui_component_assets::Assets)
        .run(move |app| {
            gpui_component::init(app);

            app.on_window_closed(|app| {
                if app.windows().is_empty() {
                    app.quit();
                }
            })
            .detach();

            if let Err(err) = ui::launch_ui(app, frame_rx, quit_tx, initial_size) {
                log::error!("failed to launch ui: {err:?}");
                app.quit();
            }
        });

    match session.join() {
        Ok(outcome) => {
            outcome?;
        }
        Err(_) => log::error!("capture thread panicked"),
    }
    Ok(())
}

#[cfg(feature = "camera-nokhwa")]
fn list_cameras() -> Result<()> {
    let cameras = pipeline::available_cameras()?;
    if cameras.is_empty() {
        println!("no cameras found");
    }
    for camera in cameras {
        println!("{}: {}", camera.index, camera.label);
    }
    Ok(())
}

#[cfg(not(feature = "camera-nokhwa"))]
fn list_cameras() -> Result<()> {
    anyhow::bail!("this build has no camera backend (enable the camera-nokhwa feature)")
}
