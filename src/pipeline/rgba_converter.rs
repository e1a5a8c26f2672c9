use anyhow::{Result, anyhow};
use rayon::prelude::*;

use crate::types::Frame;

#[cfg(feature = "camera-nokhwa")]
pub use self::camera_formats::convert_camera_frame;

/// Flips the frame left-to-right in place so the preview behaves like a mirror.
pub fn mirror_horizontal(frame: &mut Frame) {
    let row_len = frame.width as usize * 4;
    if row_len == 0 {
        return;
    }

    frame.rgba.par_chunks_exact_mut(row_len).for_each(|row| {
        let pixels = row.len() / 4;
        for x in 0..pixels / 2 {
            let mirrored = pixels - 1 - x;
            for c in 0..4 {
                row.swap(x * 4 + c, mirrored * 4 + c);
            }
        }
    });
}

fn check_len(kind: &str, data: &[u8], expected: usize) -> Result<()> {
    if data.len() < expected {
        return Err(anyhow!(
            "{kind} buffer too small: got {}, expected {expected}",
            data.len()
        ));
    }
    Ok(())
}

fn packed_to_rgba(data: &[u8], width: u32, height: u32, swap_rb: bool) -> Result<Vec<u8>> {
    let pixels = width as usize * height as usize;
    check_len("RGB", data, pixels * 3)?;

    let mut rgba = vec![0u8; pixels * 4];
    rgba.par_chunks_mut(4)
        .zip(data.par_chunks_exact(3))
        .for_each(|(dst, src)| {
            let (r, b) = if swap_rb { (src[2], src[0]) } else { (src[0], src[2]) };
            dst.copy_from_slice(&[r, src[1], b, 255]);
        });
    Ok(rgba)
}

fn gray_to_rgba(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let pixels = width as usize * height as usize;
    check_len("GRAY", data, pixels)?;

    let mut rgba = vec![0u8; pixels * 4];
    rgba.par_chunks_mut(4)
        .zip(data.par_iter().copied())
        .for_each(|(dst, value)| dst.copy_from_slice(&[value, value, value, 255]));
    Ok(rgba)
}

#[cfg(feature = "camera-nokhwa")]
mod camera_formats {
    use anyhow::{Result, anyhow};
    use nokhwa::{Buffer, utils::FrameFormat};
    use yuv::{
        YuvBiPlanarImage, YuvConversionMode, YuvPackedImage, YuvRange, YuvStandardMatrix,
        yuv_nv12_to_rgba, yuyv422_to_rgba,
    };
    use zune_jpeg::{
        JpegDecoder,
        zune_core::{bytestream::ZCursor, colorspace::ColorSpace, options::DecoderOptions},
    };

    use super::{check_len, gray_to_rgba, packed_to_rgba};
    use crate::types::Frame;

    /// Decodes whatever the driver delivered into an RGBA [`Frame`].
    pub fn convert_camera_frame(buffer: &Buffer) -> Result<Frame> {
        let resolution = buffer.resolution();
        let (width, height) = (resolution.width_x, resolution.height_y);
        let data = buffer.buffer();

        let rgba = match buffer.source_frame_format() {
            FrameFormat::NV12 => nv12_to_rgba(data, width, height)?,
            FrameFormat::YUYV => yuyv_to_rgba(data, width, height)?,
            FrameFormat::MJPEG => mjpeg_to_rgba(data, width, height)?,
            FrameFormat::RAWRGB => packed_to_rgba(data, width, height, false)?,
            FrameFormat::RAWBGR => packed_to_rgba(data, width, height, true)?,
            FrameFormat::GRAY => gray_to_rgba(data, width, height)?,
        };

        Ok(Frame::new(rgba, width, height))
    }

    fn nv12_to_rgba(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
        let y_len = width as usize * height as usize;
        let uv_len = y_len / 2;
        check_len("NV12", data, y_len + uv_len)?;

        let image = YuvBiPlanarImage {
            y_plane: &data[..y_len],
            y_stride: width,
            uv_plane: &data[y_len..y_len + uv_len],
            uv_stride: width,
            width,
            height,
        };
        let mut rgba = vec![0u8; y_len * 4];
        yuv_nv12_to_rgba(
            &image,
            &mut rgba,
            width * 4,
            YuvRange::Full,
            YuvStandardMatrix::Bt709,
            YuvConversionMode::Balanced,
        )
        .map_err(|err| anyhow!("NV12→RGBA failed: {err:?}"))?;
        Ok(rgba)
    }

    fn yuyv_to_rgba(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
        let pixels = width as usize * height as usize;
        check_len("YUYV", data, pixels * 2)?;

        let packed = YuvPackedImage {
            yuy: data,
            yuy_stride: width * 2,
            width,
            height,
        };
        let mut rgba = vec![0u8; pixels * 4];
        yuyv422_to_rgba(
            &packed,
            &mut rgba,
            width * 4,
            YuvRange::Full,
            YuvStandardMatrix::Bt709,
        )
        .map_err(|err| anyhow!("YUYV422→RGBA failed: {err:?}"))?;
        Ok(rgba)
    }

    fn mjpeg_to_rgba(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
        let options = DecoderOptions::default().jpeg_set_out_colorspace(ColorSpace::RGBA);
        let mut decoder = JpegDecoder::new_with_options(ZCursor::new(data), options);
        let rgba = decoder
            .decode()
            .map_err(|err| anyhow!("MJPEG decode failed: {err:?}"))?;

        // Drivers occasionally report a resolution that differs from the
        // JPEG payload; the frame must match what was actually decoded.
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(anyhow!(
                "MJPEG frame is {} bytes, camera reported {width}x{height}",
                rgba.len()
            ));
        }
        Ok(rgba)
    }
}
