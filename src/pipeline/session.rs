use std::thread;

use anyhow::{Context, Result, anyhow};
use crossbeam_channel::{Receiver, Sender, TryRecvError};
use thiserror::Error;

use super::{
    camera::FrameSource,
    compositor,
    landmarks::{LandmarkProvider, NoLandmarks, SubprocessProvider},
    rgba_converter, skeleton,
};
use crate::{
    config::AppConfig,
    gesture::GestureClassifier,
    media::MediaCache,
    types::{CompositedFrame, Detections, Frame},
};

/// Where composited frames go, and where the quit key comes from.
pub trait DisplaySurface {
    /// An error means the surface is gone and the session should stop.
    fn present(&mut self, frame: CompositedFrame) -> Result<()>;
    fn quit_requested(&mut self) -> bool;
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("camera unavailable")]
    CameraUnavailable(#[source] anyhow::Error),
    #[error("frame acquisition failed after {frames} frames")]
    FrameAcquisition {
        frames: u64,
        #[source]
        source: anyhow::Error,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    QuitRequested,
    DisplayClosed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionReport {
    /// Frames that reached the display.
    pub frames: u64,
    pub stop: StopReason,
}

/// Owns every resource of one run. `run` consumes it, so each resource is
/// released exactly once: camera, then media, then display.
pub struct CaptureSession<S, P, D> {
    source: S,
    provider: P,
    classifier: GestureClassifier,
    media: MediaCache,
    display: D,
}

impl<S, P, D> CaptureSession<S, P, D>
where
    S: FrameSource,
    P: LandmarkProvider,
    D: DisplaySurface,
{
    pub fn new(
        source: S,
        provider: P,
        classifier: GestureClassifier,
        media: MediaCache,
        display: D,
    ) -> Self {
        Self {
            source,
            provider,
            classifier,
            media,
            display,
        }
    }

    pub fn run(self) -> Result<SessionReport, SessionError> {
        let Self {
            mut source,
            mut provider,
            classifier,
            mut media,
            mut display,
        } = self;

        let outcome = run_loop(
            &mut source,
            &mut provider,
            &classifier,
            &mut media,
            &mut display,
        );

        drop(source);
        drop(media);
        drop(display);
        drop(provider);

        match &outcome {
            Ok(report) => log::info!(
                "session stopped after {} frames ({:?})",
                report.frames,
                report.stop
            ),
            Err(err) => log::error!("session aborted: {err:?}"),
        }
        outcome
    }
}

fn detect<P: LandmarkProvider>(provider: &mut P, frame: &Frame) -> Detections {
    let hands = provider.detect_hands(frame).unwrap_or_else(|err| {
        log::warn!("hand detection failed: {err:?}");
        Vec::new()
    });
    let face = provider.detect_face(frame).unwrap_or_else(|err| {
        log::warn!("face detection failed: {err:?}");
        None
    });
    Detections { hands, face }
}

fn run_loop<S, P, D>(
    source: &mut S,
    provider: &mut P,
    classifier: &GestureClassifier,
    media: &mut MediaCache,
    display: &mut D,
) -> Result<SessionReport, SessionError>
where
    S: FrameSource,
    P: LandmarkProvider,
    D: DisplaySurface,
{
    let mut frames = 0u64;

    loop {
        let mut frame = source
            .read_frame()
            .map_err(|source| SessionError::FrameAcquisition { frames, source })?;
        rgba_converter::mirror_horizontal(&mut frame);

        let detections = detect(provider, &frame);
        let face = detections.face.as_ref();
        let label = classifier.classify(detections.primary_hand(), &detections.hands, face);
        for hand in &detections.hands {
            log::debug!("frame {frames}: {:?} hand ({:.2})", hand.handedness, hand.score);
        }
        log::debug!(
            "frame {frames}: face {}, label {}",
            face.is_some(),
            label.key()
        );

        skeleton::draw_landmarks(&mut frame, &detections.hands, face);
        let media_frame = media.next_frame(label);
        let mouth = face.and_then(|face| face.mouth());

        match compositor::compose(&frame, &media_frame, label, mouth) {
            Ok(composed) => {
                if let Err(err) = display.present(composed) {
                    log::info!("display closed: {err}");
                    return Ok(SessionReport {
                        frames,
                        stop: StopReason::DisplayClosed,
                    });
                }
                frames += 1;
            }
            Err(err) => log::warn!("failed to compose frame: {err:?}"),
        }

        if display.quit_requested() {
            return Ok(SessionReport {
                frames,
                stop: StopReason::QuitRequested,
            });
        }
    }
}

/// Hands frames to the window and listens for its quit message. Dropping it
/// disconnects the frame channel, which the window takes as the end of the run.
pub struct ChannelDisplay {
    frames: Sender<CompositedFrame>,
    quit: Receiver<()>,
}

impl ChannelDisplay {
    pub fn new(frames: Sender<CompositedFrame>, quit: Receiver<()>) -> Self {
        Self { frames, quit }
    }
}

impl DisplaySurface for ChannelDisplay {
    fn present(&mut self, frame: CompositedFrame) -> Result<()> {
        self.frames
            .send(frame)
            .map_err(|_| anyhow!("display window is gone"))
    }

    fn quit_requested(&mut self) -> bool {
        match self.quit.try_recv() {
            Ok(()) => true,
            Err(TryRecvError::Empty) => false,
            Err(TryRecvError::Disconnected) => true,
        }
    }
}

impl Drop for ChannelDisplay {
    fn drop(&mut self) {
        log::info!("display released");
    }
}

fn open_camera(config: &AppConfig) -> Result<Box<dyn FrameSource>, SessionError> {
    open_camera_backend(config).inspect_err(|err| {
        log::error!("camera {}: {err:?}", config.camera_index);
    })
}

#[cfg(feature = "camera-nokhwa")]
fn open_camera_backend(config: &AppConfig) -> Result<Box<dyn FrameSource>, SessionError> {
    super::camera::NokhwaCamera::open(config.camera_index, config.width, config.height)
        .map(|camera| Box::new(camera) as Box<dyn FrameSource>)
        .map_err(SessionError::CameraUnavailable)
}

#[cfg(not(feature = "camera-nokhwa"))]
fn open_camera_backend(_config: &AppConfig) -> Result<Box<dyn FrameSource>, SessionError> {
    Err(SessionError::CameraUnavailable(anyhow!(
        "this build has no camera backend (enable the camera-nokhwa feature)"
    )))
}

fn open_provider(config: &AppConfig) -> Box<dyn LandmarkProvider> {
    let Some(command) = config.landmark_command() else {
        log::info!("landmark provider disabled, every frame will be neutral");
        return Box::new(NoLandmarks);
    };

    match SubprocessProvider::spawn(&command, &config.models_dir) {
        Ok(provider) => Box::new(provider),
        Err(err) => {
            log::warn!("landmark provider unavailable, continuing without it: {err:?}");
            Box::new(NoLandmarks)
        }
    }
}

/// Opens the camera once to fail fast, then runs the session on its own
/// thread. The camera, provider and media are created on that thread and
/// never leave it.
pub fn spawn_session(
    config: AppConfig,
    display: ChannelDisplay,
) -> Result<thread::JoinHandle<Result<SessionReport, SessionError>>, SessionError> {
    drop(open_camera(&config)?);

    thread::Builder::new()
        .name("capture".into())
        .spawn(move || {
            let source = open_camera(&config)?;
            let provider = open_provider(&config);
            let media = MediaCache::load(&config.media_dir, &config.media_table());
            let classifier = GestureClassifier::new(config.rule_set);
            log::info!("classifying with {:?} rules", classifier.rule_set());

            CaptureSession::new(source, provider, classifier, media, display).run()
        })
        .context("failed to spawn capture thread")
        .map_err(SessionError::CameraUnavailable)
}
