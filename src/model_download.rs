use std::{
    fs,
    io::{Read, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;

/// MediaPipe task bundles the landmark helper loads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelKind {
    HandLandmarker,
    FaceLandmarker,
}

impl ModelKind {
    pub const ALL: [ModelKind; 2] = [ModelKind::HandLandmarker, ModelKind::FaceLandmarker];

    pub fn filename(&self) -> &'static str {
        match self {
            ModelKind::HandLandmarker => "hand_landmarker.task",
            ModelKind::FaceLandmarker => "face_landmarker.task",
        }
    }

    fn url(&self) -> &'static str {
        match self {
            ModelKind::HandLandmarker => {
                "https://storage.googleapis.com/mediapipe-models/hand_landmarker/hand_landmarker/float16/latest/hand_landmarker.task"
            }
            ModelKind::FaceLandmarker => {
                "https://storage.googleapis.com/mediapipe-models/face_landmarker/face_landmarker/float16/latest/face_landmarker.task"
            }
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ModelKind::HandLandmarker => "hand landmarker",
            ModelKind::FaceLandmarker => "face landmarker",
        }
    }
}

pub fn model_path(models_dir: &Path, model: ModelKind) -> PathBuf {
    models_dir.join(model.filename())
}

/// Fetches every missing model. Failures are logged and skipped; the helper
/// will then report no detections for that task.
pub fn ensure_models(models_dir: &Path) {
    for model in ModelKind::ALL {
        if let Err(err) = ensure_model_ready(models_dir, model) {
            log::warn!("{} model unavailable: {err:?}", model.label());
        }
    }
}

pub fn ensure_model_ready(models_dir: &Path, model: ModelKind) -> anyhow::Result<PathBuf> {
    let dest = model_path(models_dir, model);
    if dest.exists() {
        log::debug!("{} model present at {}", model.label(), dest.display());
        return Ok(dest);
    }

    fs::create_dir_all(models_dir)
        .with_context(|| format!("failed to create model directory {}", models_dir.display()))?;

    download_to_path(model, &dest)
        .with_context(|| format!("failed to download {} to {}", model.label(), dest.display()))?;
    Ok(dest)
}

fn download_to_path(model: ModelKind, dest: &Path) -> anyhow::Result<()> {
    let url = model.url();
    log::info!(
        "downloading {} model from {url} to {}",
        model.label(),
        dest.display()
    );

    let client = Client::new();
    let mut response = client
        .get(url)
        .send()
        .context("failed to start model download")?
        .error_for_status()
        .context("model download returned error status")?;

    let progress = create_progress_bar(response.content_length());

    let tmp_path = dest.with_extension("download");
    let mut file = fs::File::create(&tmp_path)
        .with_context(|| format!("failed to create {}", tmp_path.display()))?;

    let mut downloaded: u64 = 0;
    let mut buffer = [0u8; 16 * 1024];
    loop {
        let bytes_read = response
            .read(&mut buffer)
            .context("failed while reading model bytes")?;
        if bytes_read == 0 {
            break;
        }

        file.write_all(&buffer[..bytes_read])
            .context("failed while writing model to disk")?;
        downloaded += bytes_read as u64;
        progress.set_position(downloaded);
    }

    file.sync_all()
        .context("failed to flush downloaded model to disk")?;
    fs::rename(&tmp_path, dest).with_context(|| {
        format!(
            "failed to move temp model {} into place at {}",
            tmp_path.display(),
            dest.display()
        )
    })?;

    progress.finish_with_message(format!("{} model ready", model.label()));
    Ok(())
}

fn create_progress_bar(total_size: Option<u64>) -> ProgressBar {
    match total_size {
        Some(total) if total > 0 => {
            let pb = ProgressBar::new(total);
            let style = ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-");
            pb.set_style(style);
            pb
        }
        _ => {
            let pb = ProgressBar::new_spinner();
            let style = ProgressStyle::with_template("{spinner:.green} downloading model")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            pb.set_style(style);
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        }
    }
}
