use std::sync::Arc;

use image::{Rgba, RgbaImage};

use crate::types::GestureLabel;

pub const PLACEHOLDER_SIZE: u32 = 400;

/// Solid card in the label's palette colour. The caption is drawn later as
/// text on top of the composited frame.
pub fn placeholder_image(label: GestureLabel) -> Arc<RgbaImage> {
    let [r, g, b] = label.placeholder_color();
    Arc::new(RgbaImage::from_pixel(
        PLACEHOLDER_SIZE,
        PLACEHOLDER_SIZE,
        Rgba([r, g, b, 255]),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_uses_label_palette() {
        let image = placeholder_image(GestureLabel::Fist);
        assert_eq!(image.dimensions(), (PLACEHOLDER_SIZE, PLACEHOLDER_SIZE));
        assert_eq!(image.get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert_eq!(image.get_pixel(399, 399).0, [255, 0, 0, 255]);
    }
}
