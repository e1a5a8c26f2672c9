use std::{sync::Arc, time::Instant};

use image::RgbaImage;

#[derive(Clone, Debug)]
pub struct Frame {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub timestamp: Instant,
}

impl Frame {
    pub fn new(rgba: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            rgba,
            width,
            height,
            timestamp: Instant::now(),
        }
    }

    pub fn filled(width: u32, height: u32, color: [u8; 4]) -> Self {
        let mut rgba = Vec::with_capacity(width as usize * height as usize * 4);
        for _ in 0..(width as usize * height as usize) {
            rgba.extend_from_slice(&color);
        }
        Self::new(rgba, width, height)
    }

    #[cfg(test)]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y * self.width + x) as usize) * 4;
        let px = self.rgba.get(idx..idx + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Packed RGB copy, the layout the landmark helper expects.
    pub fn to_rgb(&self) -> Vec<u8> {
        let mut rgb = Vec::with_capacity(self.rgba.len() / 4 * 3);
        for px in self.rgba.chunks_exact(4) {
            rgb.extend_from_slice(&px[..3]);
        }
        rgb
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LandmarkPoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl LandmarkPoint {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: 0.0 }
    }

    pub fn distance_2d(&self, other: &LandmarkPoint) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Handedness {
    Left,
    Right,
    Unknown,
}

impl Handedness {
    pub fn from_label(label: &str) -> Self {
        match label.to_ascii_lowercase().as_str() {
            "left" => Handedness::Left,
            "right" => Handedness::Right,
            _ => Handedness::Unknown,
        }
    }
}

pub const HAND_LANDMARK_COUNT: usize = 21;

pub const WRIST: usize = 0;
pub const THUMB_CMC: usize = 1;
pub const THUMB_MCP: usize = 2;
pub const THUMB_IP: usize = 3;
pub const THUMB_TIP: usize = 4;
pub const INDEX_MCP: usize = 5;
pub const INDEX_PIP: usize = 6;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_MCP: usize = 9;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_TIP: usize = 12;
pub const RING_MCP: usize = 13;
pub const RING_PIP: usize = 14;
pub const RING_TIP: usize = 16;
pub const PINKY_MCP: usize = 17;
pub const PINKY_PIP: usize = 18;
pub const PINKY_TIP: usize = 20;

/// One detected hand: 21 normalized points in the hand-skeleton order.
#[derive(Clone, Debug)]
pub struct HandLandmarks {
    pub points: [LandmarkPoint; HAND_LANDMARK_COUNT],
    pub handedness: Handedness,
    pub score: f32,
}

impl HandLandmarks {
    pub fn new(points: [LandmarkPoint; HAND_LANDMARK_COUNT]) -> Self {
        Self {
            points,
            handedness: Handedness::Unknown,
            score: 1.0,
        }
    }

    pub fn from_slice(points: &[LandmarkPoint]) -> Option<Self> {
        let points: [LandmarkPoint; HAND_LANDMARK_COUNT] = points.try_into().ok()?;
        Some(Self::new(points))
    }

    pub fn point(&self, idx: usize) -> LandmarkPoint {
        self.points[idx]
    }

    pub fn wrist(&self) -> LandmarkPoint {
        self.points[WRIST]
    }
}

pub const FACE_UPPER_LIP: usize = 13;
pub const FACE_LOWER_LIP: usize = 14;
pub const FACE_MOUTH_LEFT: usize = 61;
pub const FACE_MOUTH_RIGHT: usize = 291;

/// Face-mesh points for one face. Only the mouth indices are consulted.
#[derive(Clone, Debug, Default)]
pub struct FaceLandmarks {
    pub points: Vec<LandmarkPoint>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MouthMetrics {
    pub opening: f32,
    pub width: f32,
}

impl FaceLandmarks {
    pub fn new(points: Vec<LandmarkPoint>) -> Self {
        Self { points }
    }

    pub fn mouth(&self) -> Option<MouthMetrics> {
        let upper = self.points.get(FACE_UPPER_LIP)?;
        let lower = self.points.get(FACE_LOWER_LIP)?;
        let left = self.points.get(FACE_MOUTH_LEFT)?;
        let right = self.points.get(FACE_MOUTH_RIGHT)?;

        Some(MouthMetrics {
            opening: upper.distance_2d(lower),
            width: left.distance_2d(right),
        })
    }

    pub fn mouth_points(&self) -> Vec<LandmarkPoint> {
        [FACE_UPPER_LIP, FACE_LOWER_LIP, FACE_MOUTH_LEFT, FACE_MOUTH_RIGHT]
            .iter()
            .filter_map(|&idx| self.points.get(idx).copied())
            .collect()
    }
}

/// Everything the landmark provider found in one frame.
#[derive(Clone, Debug, Default)]
pub struct Detections {
    pub hands: Vec<HandLandmarks>,
    pub face: Option<FaceLandmarks>,
}

impl Detections {
    pub fn primary_hand(&self) -> Option<&HandLandmarks> {
        self.hands.first()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GestureLabel {
    Laughing,
    BothFists,
    OneFinger,
    WideSpread,
    ThumbsUp,
    Peace,
    Fist,
    OpenPalm,
    OkSign,
    None,
}

impl GestureLabel {
    pub const ALL: [GestureLabel; 10] = [
        GestureLabel::Laughing,
        GestureLabel::BothFists,
        GestureLabel::OneFinger,
        GestureLabel::WideSpread,
        GestureLabel::ThumbsUp,
        GestureLabel::Peace,
        GestureLabel::Fist,
        GestureLabel::OpenPalm,
        GestureLabel::OkSign,
        GestureLabel::None,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            GestureLabel::Laughing => "laughing",
            GestureLabel::BothFists => "both_fists",
            GestureLabel::OneFinger => "one_finger",
            GestureLabel::WideSpread => "wide_spread",
            GestureLabel::ThumbsUp => "thumbs_up",
            GestureLabel::Peace => "peace",
            GestureLabel::Fist => "fist",
            GestureLabel::OpenPalm => "open_palm",
            GestureLabel::OkSign => "ok_sign",
            GestureLabel::None => "none",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        GestureLabel::ALL
            .into_iter()
            .find(|label| label.key().eq_ignore_ascii_case(key))
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            GestureLabel::Laughing => "Laughing",
            GestureLabel::BothFists => "Both Fists",
            GestureLabel::OneFinger => "One Finger",
            GestureLabel::WideSpread => "Wide Spread",
            GestureLabel::ThumbsUp => "Thumbs Up",
            GestureLabel::Peace => "Peace",
            GestureLabel::Fist => "Fist",
            GestureLabel::OpenPalm => "Open Palm",
            GestureLabel::OkSign => "Ok Sign",
            GestureLabel::None => "None",
        }
    }

    /// Default asset filename inside the media directory.
    pub fn media_file(&self) -> &'static str {
        match self {
            GestureLabel::Laughing => "laughing.mp4",
            GestureLabel::BothFists => "both_fists.jpg",
            GestureLabel::OneFinger => "one_finger.jpg",
            GestureLabel::WideSpread => "wide_spread.gif",
            GestureLabel::ThumbsUp => "thumbs_up.jpg",
            GestureLabel::Peace => "peace.jpg",
            GestureLabel::Fist => "fist.jpg",
            GestureLabel::OpenPalm => "open_palm.jpg",
            GestureLabel::OkSign => "ok_sign.jpg",
            GestureLabel::None => "default.jpg",
        }
    }

    /// RGB background of the generated placeholder.
    pub fn placeholder_color(&self) -> [u8; 3] {
        match self {
            GestureLabel::Laughing => [255, 165, 0],
            GestureLabel::BothFists => [178, 34, 34],
            GestureLabel::OneFinger => [30, 144, 255],
            GestureLabel::WideSpread => [148, 0, 211],
            GestureLabel::ThumbsUp => [0, 255, 0],
            GestureLabel::Peace => [0, 255, 255],
            GestureLabel::Fist => [255, 0, 0],
            GestureLabel::OpenPalm => [255, 0, 255],
            GestureLabel::OkSign => [255, 255, 0],
            GestureLabel::None => [128, 128, 128],
        }
    }

    pub fn placeholder_caption(&self) -> String {
        self.key().to_uppercase().replace('_', " ")
    }
}

/// One tick of a media asset, ready to be composited.
#[derive(Clone, Debug)]
pub struct MediaFrame {
    pub image: Arc<RgbaImage>,
    pub caption: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverlayStyle {
    Label,
    Hint,
    Debug,
    Caption,
}

/// Text drawn by the display surface on top of the composited pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct TextOverlay {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub color: u32,
    pub style: OverlayStyle,
}

#[derive(Clone, Debug)]
pub struct CompositedFrame {
    pub frame: Frame,
    pub label: GestureLabel,
    pub camera_width: u32,
    pub overlays: Vec<TextOverlay>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hand_from_slice_requires_21_points() {
        let points = vec![LandmarkPoint::default(); 20];
        assert!(HandLandmarks::from_slice(&points).is_none());

        let points = vec![LandmarkPoint::default(); 21];
        assert!(HandLandmarks::from_slice(&points).is_some());
    }

    #[test]
    fn mouth_metrics_need_all_mouth_points() {
        let face = FaceLandmarks::new(vec![LandmarkPoint::default(); 100]);
        assert!(face.mouth().is_none());

        let mut points = vec![LandmarkPoint::default(); 300];
        points[FACE_UPPER_LIP] = LandmarkPoint::new(0.5, 0.60);
        points[FACE_LOWER_LIP] = LandmarkPoint::new(0.5, 0.64);
        points[FACE_MOUTH_LEFT] = LandmarkPoint::new(0.45, 0.62);
        points[FACE_MOUTH_RIGHT] = LandmarkPoint::new(0.55, 0.62);
        let mouth = FaceLandmarks::new(points).mouth().unwrap();
        assert!((mouth.opening - 0.04).abs() < 1e-5);
        assert!((mouth.width - 0.10).abs() < 1e-5);
    }

    #[test]
    fn every_label_has_distinct_media_file() {
        let mut files: Vec<_> = GestureLabel::ALL.iter().map(|l| l.media_file()).collect();
        files.sort();
        files.dedup();
        assert_eq!(files.len(), GestureLabel::ALL.len());
    }

    #[test]
    fn keys_round_trip_to_labels() {
        for label in GestureLabel::ALL {
            assert_eq!(GestureLabel::from_key(label.key()), Some(label));
        }
        assert_eq!(GestureLabel::from_key("Thumbs_Up"), Some(GestureLabel::ThumbsUp));
        assert_eq!(GestureLabel::from_key("wave"), None);
    }

    #[test]
    fn placeholder_caption_is_uppercase_words() {
        assert_eq!(GestureLabel::ThumbsUp.placeholder_caption(), "THUMBS UP");
        assert_eq!(GestureLabel::None.placeholder_caption(), "NONE");
    }
}
