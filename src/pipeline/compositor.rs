use anyhow::{Context, Result, anyhow};
use fast_image_resize as fir;
use image::RgbaImage;

use crate::types::{
    CompositedFrame, Frame, GestureLabel, MediaFrame, MouthMetrics, OverlayStyle, TextOverlay,
};

pub const LABEL_COLOR: u32 = 0xffff00;
pub const HINT_COLOR: u32 = 0xffffff;
pub const DEBUG_COLOR: u32 = 0x00ff00;
pub const CAPTION_COLOR: u32 = 0x000000;

pub const QUIT_HINT: &str = "Press 'q' to quit";

const TEXT_MARGIN_X: f32 = 10.0;
const LABEL_TOP: f32 = 8.0;
const DEBUG_TOP: f32 = 40.0;
const HINT_BOTTOM_OFFSET: f32 = 30.0;

/// Width of `width x height` scaled to `target_height`, rounded.
pub fn scaled_width(width: u32, height: u32, target_height: u32) -> u32 {
    ((target_height as f64 * width as f64 / height as f64).round() as u32).max(1)
}

/// Scales `image` to `target_height` keeping its aspect ratio. When that would
/// be wider than `max_width`, the result is stretched to exactly
/// `max_width x target_height` instead.
pub fn resize_to_height(image: &RgbaImage, target_height: u32, max_width: u32) -> Result<RgbaImage> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 || target_height == 0 {
        return Err(anyhow!(
            "cannot resize {width}x{height} image to height {target_height}"
        ));
    }

    let mut new_w = scaled_width(width, height, target_height);
    if new_w > max_width {
        new_w = max_width;
    }
    if (new_w, target_height) == (width, height) {
        return Ok(image.clone());
    }

    let src_image =
        fir::images::Image::from_vec_u8(width, height, image.as_raw().clone(), fir::PixelType::U8x4)?;
    let mut dst_image = fir::images::Image::new(new_w, target_height, fir::PixelType::U8x4);
    let mut resizer = fir::Resizer::new();
    let resize_options = fir::ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Interpolation(fir::FilterType::Bilinear));
    resizer
        .resize(&src_image, &mut dst_image, Some(&resize_options))
        .context("fast resize failed")?;

    RgbaImage::from_raw(new_w, target_height, dst_image.into_vec())
        .context("resized media buffer has wrong size")
}

/// Places the camera frame on the left and the media on the right, and lists
/// the text the display should draw on top.
pub fn compose(
    camera: &Frame,
    media: &MediaFrame,
    label: GestureLabel,
    mouth: Option<MouthMetrics>,
) -> Result<CompositedFrame> {
    let expected = camera.width as usize * camera.height as usize * 4;
    if camera.rgba.len() != expected {
        return Err(anyhow!(
            "camera buffer size mismatch: got {}, expected {expected}",
            camera.rgba.len()
        ));
    }

    let resized = resize_to_height(&media.image, camera.height, camera.width)?;
    let media_w = resized.width();
    let canvas_w = camera.width + media_w;

    let camera_stride = camera.width as usize * 4;
    let media_stride = media_w as usize * 4;
    let mut canvas = Vec::with_capacity(canvas_w as usize * camera.height as usize * 4);
    for (camera_row, media_row) in camera
        .rgba
        .chunks_exact(camera_stride)
        .zip(resized.as_raw().chunks_exact(media_stride))
    {
        canvas.extend_from_slice(camera_row);
        canvas.extend_from_slice(media_row);
    }

    let height = camera.height as f32;
    let mut overlays = vec![
        TextOverlay {
            text: format!("Gesture: {}", label.display_name()),
            x: TEXT_MARGIN_X,
            y: LABEL_TOP,
            color: LABEL_COLOR,
            style: OverlayStyle::Label,
        },
        TextOverlay {
            text: QUIT_HINT.to_string(),
            x: TEXT_MARGIN_X,
            y: (height - HINT_BOTTOM_OFFSET).max(0.0),
            color: HINT_COLOR,
            style: OverlayStyle::Hint,
        },
    ];

    if let Some(mouth) = mouth {
        overlays.push(TextOverlay {
            text: format!("mouth open {:.3} / width {:.3}", mouth.opening, mouth.width),
            x: TEXT_MARGIN_X,
            y: DEBUG_TOP,
            color: DEBUG_COLOR,
            style: OverlayStyle::Debug,
        });
    }

    // Caption coordinates are the centre of the media region.
    if let Some(caption) = &media.caption {
        overlays.push(TextOverlay {
            text: caption.clone(),
            x: camera.width as f32 + media_w as f32 / 2.0,
            y: height / 2.0,
            color: CAPTION_COLOR,
            style: OverlayStyle::Caption,
        });
    }

    Ok(CompositedFrame {
        frame: Frame {
            rgba: canvas,
            width: canvas_w,
            height: camera.height,
            timestamp: camera.timestamp,
        },
        label,
        camera_width: camera.width,
        overlays,
    })
}
