use anyhow::Result;

use crate::types::Frame;

/// Blocking frame acquisition. An error ends the capture session.
pub trait FrameSource {
    fn read_frame(&mut self) -> Result<Frame>;
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn read_frame(&mut self) -> Result<Frame> {
        (**self).read_frame()
    }
}

#[cfg(feature = "camera-nokhwa")]
pub use self::native::{CameraDevice, NokhwaCamera, available_cameras};

#[cfg(feature = "camera-nokhwa")]
mod native {
    use anyhow::{Context, Result, anyhow};
    use nokhwa::{
        Camera,
        pixel_format::RgbFormat,
        query,
        utils::{
            ApiBackend, CameraFormat, CameraIndex, CameraInfo, FrameFormat, RequestedFormat,
            RequestedFormatType, Resolution,
        },
    };

    use super::FrameSource;
    use crate::{pipeline::rgba_converter, types::Frame};

    // Prefer pixel formats that are widely supported on macOS (the built-in cameras
    // often reject YUYV even though Nokhwa reports it).
    const PREFERRED_PIXEL_FORMATS: &[FrameFormat] = &[
        FrameFormat::RAWRGB,
        FrameFormat::RAWBGR,
        FrameFormat::GRAY,
        FrameFormat::YUYV,
        FrameFormat::NV12,
        FrameFormat::MJPEG,
    ];

    fn requested_formats(width: u32, height: u32) -> [RequestedFormat<'static>; 4] {
        let wanted = CameraFormat::new(Resolution::new(width, height), FrameFormat::MJPEG, 30);
        [
            RequestedFormat::with_formats(
                RequestedFormatType::Closest(wanted),
                PREFERRED_PIXEL_FORMATS,
            ),
            RequestedFormat::with_formats(
                RequestedFormatType::AbsoluteHighestFrameRate,
                PREFERRED_PIXEL_FORMATS,
            ),
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate),
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::None),
        ]
    }

    #[derive(Clone, Debug)]
    pub struct CameraDevice {
        pub index: CameraIndex,
        pub label: String,
    }

    pub fn available_cameras() -> Result<Vec<CameraDevice>> {
        let cameras = query(ApiBackend::Auto)?;
        Ok(cameras
            .into_iter()
            .map(|info: CameraInfo| CameraDevice {
                index: info.index().clone(),
                label: info.human_name(),
            })
            .collect())
    }

    /// Webcam with an open stream. The stream is stopped when dropped.
    pub struct NokhwaCamera {
        camera: Camera,
    }

    impl NokhwaCamera {
        pub fn open(index: u32, width: u32, height: u32) -> Result<Self> {
            let index = CameraIndex::Index(index);
            let mut last_err = None;

            for requested in requested_formats(width, height) {
                match Camera::new(index.clone(), requested) {
                    Ok(mut camera) => match camera.open_stream() {
                        Ok(()) => {
                            log::info!(
                                "camera {} streaming at {}",
                                camera.info().human_name(),
                                camera.camera_format()
                            );
                            return Ok(Self { camera });
                        }
                        Err(err) => last_err = Some(err.into()),
                    },
                    Err(err) => last_err = Some(err.into()),
                }
            }

            Err(last_err
                .unwrap_or_else(|| anyhow!("failed to open camera with any supported format")))
        }
    }

    impl FrameSource for NokhwaCamera {
        fn read_frame(&mut self) -> Result<Frame> {
            let buffer = self.camera.frame().context("camera frame read failed")?;
            rgba_converter::convert_camera_frame(&buffer).context("failed to decode camera frame")
        }
    }

    impl Drop for NokhwaCamera {
        fn drop(&mut self) {
            if let Err(err) = self.camera.stop_stream() {
                log::warn!("failed to stop camera stream: {err:?}");
            }
            log::info!("camera released");
        }
    }
}
