use std::{collections::BTreeMap, path::PathBuf};

use clap::Parser;

use crate::{gesture::RuleSet, types::GestureLabel};

const DEFAULT_LANDMARK_CMD: &str = "python3 scripts/mediapipe_landmarks.py";

#[derive(Parser, Clone, Debug)]
#[command(name = "meme-mirror")]
#[command(version, about = "Show a meme next to your webcam for every gesture you make", long_about = None)]
pub struct AppConfig {
    /// Directory holding one image or video per gesture
    #[arg(long, default_value = "images")]
    pub media_dir: PathBuf,

    /// Camera index as reported by the platform backend
    #[arg(long, default_value_t = 0)]
    pub camera_index: u32,

    /// Requested capture width
    #[arg(long, default_value_t = 640)]
    pub width: u32,

    /// Requested capture height
    #[arg(long, default_value_t = 480)]
    pub height: u32,

    /// Gesture rules to apply
    #[arg(long, value_enum, default_value_t = RuleSet::Expressions)]
    pub rule_set: RuleSet,

    /// Command that speaks the landmark protocol on stdin/stdout
    #[arg(long, default_value = DEFAULT_LANDMARK_CMD)]
    pub landmark_cmd: String,

    /// Run without a landmark provider (always neutral)
    #[arg(long)]
    pub no_landmarks: bool,

    /// Where the landmark models are kept
    #[arg(long, default_value = "models")]
    pub models_dir: PathBuf,

    /// Do not fetch missing landmark models
    #[arg(long)]
    pub skip_model_download: bool,

    /// Use FILE for a gesture instead of its default name, e.g. `fist=punch.png`
    #[arg(long = "media-file", value_name = "GESTURE=FILE", value_parser = parse_media_override)]
    pub media_files: Vec<(GestureLabel, String)>,

    /// Print the cameras the platform reports and exit
    #[arg(long)]
    pub list_cameras: bool,
}

impl AppConfig {
    pub fn media_table(&self) -> MediaTable {
        self.media_files
            .iter()
            .fold(MediaTable::default(), |table, (label, file)| {
                table.with_file(*label, file.clone())
            })
    }

    /// Program and arguments of the landmark helper, if one should run.
    pub fn landmark_command(&self) -> Option<Vec<String>> {
        if self.no_landmarks {
            return None;
        }
        let parts: Vec<String> = self
            .landmark_cmd
            .split_whitespace()
            .map(str::to_string)
            .collect();
        if parts.is_empty() { None } else { Some(parts) }
    }
}

fn parse_media_override(value: &str) -> Result<(GestureLabel, String), String> {
    let (key, file) = value
        .split_once('=')
        .ok_or_else(|| format!("expected GESTURE=FILE, got `{value}`"))?;
    let label = GestureLabel::from_key(key.trim()).ok_or_else(|| {
        let known: Vec<&str> = GestureLabel::ALL.iter().map(|l| l.key()).collect();
        format!("unknown gesture `{key}` (known: {})", known.join(", "))
    })?;
    let file = file.trim();
    if file.is_empty() {
        return Err(format!("no file given for `{key}`"));
    }
    Ok((label, file.to_string()))
}

/// Gesture to asset filename. Always has one entry per label.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaTable {
    entries: BTreeMap<GestureLabel, String>,
}

impl Default for MediaTable {
    fn default() -> Self {
        Self {
            entries: GestureLabel::ALL
                .iter()
                .map(|label| (*label, label.media_file().to_string()))
                .collect(),
        }
    }
}

impl MediaTable {
    pub fn with_file(mut self, label: GestureLabel, file: impl Into<String>) -> Self {
        self.entries.insert(label, file.into());
        self
    }

    pub fn file(&self, label: GestureLabel) -> &str {
        self.entries
            .get(&label)
            .map(String::as_str)
            .unwrap_or_else(|| label.media_file())
    }

    pub fn filenames(&self) -> Vec<&str> {
        self.entries.values().map(String::as_str).collect()
    }
}
