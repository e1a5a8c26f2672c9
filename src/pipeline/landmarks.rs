//! Landmark extraction lives outside this process. A helper program (by
//! default a MediaPipe script) receives raw RGB frames on stdin and answers
//! with one JSON line per request.
//!
//! Request: 16-byte little-endian header `width, height, channels, task`
//! (`task` 0 = hands, 1 = face) followed by `width * height * channels`
//! bytes of RGB data.
//!
//! Response: `{"hands": [...], "face": {...} | null, "error": null}`.

use std::{
    io::{BufRead, BufReader, Write},
    path::Path,
    process::{Child, ChildStdin, ChildStdout, Command, Stdio},
};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::types::{FaceLandmarks, Frame, HandLandmarks, Handedness, LandmarkPoint};

const TASK_HANDS: u32 = 0;
const TASK_FACE: u32 = 1;
const RGB_CHANNELS: u32 = 3;

pub trait LandmarkProvider {
    fn detect_hands(&mut self, frame: &Frame) -> Result<Vec<HandLandmarks>>;
    fn detect_face(&mut self, frame: &Frame) -> Result<Option<FaceLandmarks>>;
}

impl<T: LandmarkProvider + ?Sized> LandmarkProvider for Box<T> {
    fn detect_hands(&mut self, frame: &Frame) -> Result<Vec<HandLandmarks>> {
        (**self).detect_hands(frame)
    }

    fn detect_face(&mut self, frame: &Frame) -> Result<Option<FaceLandmarks>> {
        (**self).detect_face(frame)
    }
}

/// Used when no helper is configured: every frame is empty.
#[derive(Debug, Default)]
pub struct NoLandmarks;

impl LandmarkProvider for NoLandmarks {
    fn detect_hands(&mut self, _frame: &Frame) -> Result<Vec<HandLandmarks>> {
        Ok(Vec::new())
    }

    fn detect_face(&mut self, _frame: &Frame) -> Result<Option<FaceLandmarks>> {
        Ok(None)
    }
}

#[derive(Deserialize, Debug)]
struct PointJson {
    x: f32,
    y: f32,
    #[serde(default)]
    z: f32,
}

impl From<&PointJson> for LandmarkPoint {
    fn from(p: &PointJson) -> Self {
        LandmarkPoint {
            x: p.x,
            y: p.y,
            z: p.z,
        }
    }
}

#[derive(Deserialize, Debug)]
struct HandJson {
    #[serde(default)]
    handedness: String,
    #[serde(default)]
    score: f32,
    landmarks: Vec<PointJson>,
}

#[derive(Deserialize, Debug)]
struct FaceJson {
    landmarks: Vec<PointJson>,
}

#[derive(Deserialize, Debug, Default)]
struct DetectionJson {
    #[serde(default)]
    hands: Vec<HandJson>,
    #[serde(default)]
    face: Option<FaceJson>,
    #[serde(default)]
    error: Option<String>,
}

fn parse_response(line: &str) -> Result<DetectionJson> {
    let parsed: DetectionJson = serde_json::from_str(line.trim())
        .with_context(|| format!("failed to parse landmark response: {}", line.trim()))?;
    if let Some(error) = &parsed.error {
        bail!("landmark helper reported: {error}");
    }
    Ok(parsed)
}

fn hands_from_json(hands: Vec<HandJson>) -> Vec<HandLandmarks> {
    hands
        .into_iter()
        .filter_map(|hand| {
            let points: Vec<LandmarkPoint> = hand.landmarks.iter().map(Into::into).collect();
            let Some(mut landmarks) = HandLandmarks::from_slice(&points) else {
                log::warn!("expected 21 hand landmarks, got {}", points.len());
                return None;
            };
            landmarks.handedness = Handedness::from_label(&hand.handedness);
            landmarks.score = hand.score;
            Some(landmarks)
        })
        .collect()
}

fn face_from_json(face: Option<FaceJson>) -> Option<FaceLandmarks> {
    face.map(|face| FaceLandmarks::new(face.landmarks.iter().map(Into::into).collect()))
}

/// Landmark helper running as a child process. Killed when dropped.
pub struct SubprocessProvider {
    process: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl SubprocessProvider {
    pub fn spawn(command: &[String], models_dir: &Path) -> Result<Self> {
        let Some((program, args)) = command.split_first() else {
            bail!("empty landmark helper command");
        };

        log::info!("starting landmark helper: {}", command.join(" "));
        let mut process = Command::new(program)
            .args(args)
            .arg("--models")
            .arg(models_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("failed to start landmark helper {program}"))?;

        match Self::handshake(&mut process) {
            Ok((stdin, stdout)) => {
                log::info!("landmark helper ready");
                Ok(Self {
                    process,
                    stdin,
                    stdout,
                })
            }
            Err(err) => {
                reap(&mut process);
                Err(err)
            }
        }
    }

    fn handshake(process: &mut Child) -> Result<(ChildStdin, BufReader<ChildStdout>)> {
        let stdin = process.stdin.take().context("landmark helper has no stdin")?;
        let stdout = process.stdout.take().context("landmark helper has no stdout")?;
        let mut stdout = BufReader::new(stdout);

        let mut ready = String::new();
        stdout
            .read_line(&mut ready)
            .context("landmark helper exited before becoming ready")?;
        if ready.trim() != "READY" {
            bail!("landmark helper did not signal ready, got: {}", ready.trim());
        }
        Ok((stdin, stdout))
    }

    fn request(&mut self, frame: &Frame, task: u32) -> Result<DetectionJson> {
        let rgb = frame.to_rgb();
        for value in [frame.width, frame.height, RGB_CHANNELS, task] {
            self.stdin.write_all(&value.to_le_bytes())?;
        }
        self.stdin.write_all(&rgb)?;
        self.stdin.flush()?;

        let mut line = String::new();
        let read = self.stdout.read_line(&mut line)?;
        if read == 0 {
            bail!("landmark helper closed its output");
        }
        parse_response(&line)
    }
}

impl LandmarkProvider for SubprocessProvider {
    fn detect_hands(&mut self, frame: &Frame) -> Result<Vec<HandLandmarks>> {
        let response = self.request(frame, TASK_HANDS)?;
        Ok(hands_from_json(response.hands))
    }

    fn detect_face(&mut self, frame: &Frame) -> Result<Option<FaceLandmarks>> {
        let response = self.request(frame, TASK_FACE)?;
        Ok(face_from_json(response.face))
    }
}

fn reap(process: &mut Child) {
    let _ = process.kill();
    let _ = process.wait();
}

impl Drop for SubprocessProvider {
    fn drop(&mut self) {
        reap(&mut self.process);
    }
}
