mod placeholder;
mod video;

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use image::RgbaImage;

use crate::{
    config::MediaTable,
    types::{GestureLabel, MediaFrame},
};

pub use placeholder::{PLACEHOLDER_SIZE, placeholder_image};
pub use video::{LoopingVideo, VideoSource, is_video_path, open_video};

pub enum MediaAsset {
    Still(Arc<RgbaImage>),
    Placeholder {
        image: Arc<RgbaImage>,
        caption: String,
    },
    Video(LoopingVideo),
}

impl MediaAsset {
    pub fn placeholder(label: GestureLabel) -> Self {
        MediaAsset::Placeholder {
            image: placeholder_image(label),
            caption: label.placeholder_caption(),
        }
    }

    /// Loads `path` as a still or a looping video, depending on its extension.
    pub fn open(path: &Path) -> Result<Self> {
        if is_video_path(path) {
            let source = open_video(path)?;
            return Ok(MediaAsset::Video(LoopingVideo::new(source)?));
        }

        let image = image::open(path)
            .with_context(|| format!("failed to decode image {}", path.display()))?;
        Ok(MediaAsset::Still(Arc::new(image.to_rgba8())))
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, MediaAsset::Placeholder { .. })
    }

    pub fn is_video(&self) -> bool {
        matches!(self, MediaAsset::Video(_))
    }

    fn next_frame(&mut self) -> MediaFrame {
        match self {
            MediaAsset::Still(image) => MediaFrame {
                image: image.clone(),
                caption: None,
            },
            MediaAsset::Placeholder { image, caption } => MediaFrame {
                image: image.clone(),
                caption: Some(caption.clone()),
            },
            MediaAsset::Video(video) => MediaFrame {
                image: video.next_frame(),
                caption: None,
            },
        }
    }
}

/// One asset per gesture label, loaded once at startup. Missing or broken
/// files are replaced with generated placeholders and never reported upward.
pub struct MediaCache {
    assets: BTreeMap<GestureLabel, MediaAsset>,
}

impl MediaCache {
    pub fn load(dir: &Path, table: &MediaTable) -> Self {
        let mut assets = BTreeMap::new();

        for label in GestureLabel::ALL {
            let path = dir.join(table.file(label));
            let asset = if path.exists() {
                MediaAsset::open(&path).unwrap_or_else(|err| {
                    log::warn!("using placeholder for {}: {err:?}", label.key());
                    MediaAsset::placeholder(label)
                })
            } else {
                log::debug!("{} not found, using placeholder", path.display());
                MediaAsset::placeholder(label)
            };
            assets.insert(label, asset);
        }

        let cache = Self { assets };
        log::info!(
            "media ready: {} assets ({} placeholders, {} videos)",
            cache.len(),
            cache.placeholder_count(),
            cache.assets.values().filter(|a| a.is_video()).count()
        );
        cache
    }

    #[cfg(test)]
    pub(crate) fn with_asset(mut self, label: GestureLabel, asset: MediaAsset) -> Self {
        self.assets.insert(label, asset);
        self
    }

    #[cfg(test)]
    pub fn asset(&self, label: GestureLabel) -> Option<&MediaAsset> {
        self.assets.get(&label)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn placeholder_count(&self) -> usize {
        self.assets.values().filter(|a| a.is_placeholder()).count()
    }

    /// Same buffer every call for stills; one decoded frame per call for
    /// videos, wrapping to the start at end of stream.
    pub fn next_frame(&mut self, label: GestureLabel) -> MediaFrame {
        self.assets
            .entry(label)
            .or_insert_with(|| MediaAsset::placeholder(label))
            .next_frame()
    }
}

/// Creates the media directory on first run and tells the operator which
/// filenames are expected. Returns whether the directory was created.
pub fn prepare_media_dir(dir: &Path, table: &MediaTable) -> Result<bool> {
    if dir.exists() {
        return Ok(false);
    }

    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create media directory {}", dir.display()))?;

    log::info!("created media folder at {}", display_path(dir).display());
    log::info!("add your meme images or videos to this folder");
    log::info!("expected filenames: {}", table.filenames().join(", "));
    Ok(true)
}

fn display_path(dir: &Path) -> PathBuf {
    fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf())
}
