//! Small raster helpers on top of `imageproc`.

use ab_glyph::{Font, PxScale};
use image::{imageops, Rgba, RgbaImage};
use imageproc::{
    drawing::{draw_text_mut, text_size},
    geometric_transformations::{rotate_about_center, Interpolation},
};

pub(crate) const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

pub(crate) fn rgba([r, g, b]: [u8; 3], alpha: u8) -> Rgba<u8> {
    Rgba([r, g, b, alpha])
}

pub(crate) fn measure(font: &impl Font, px: f32, text: &str) -> (u32, u32) {
    text_size(PxScale::from(px), font, text)
}

/// `text` on a transparent canvas with 30% padding on every side, so glyph
/// edges survive rotation.
pub(crate) fn text_sprite(font: &impl Font, px: f32, text: &str, color: Rgba<u8>) -> RgbaImage {
    let (w, h) = measure(font, px, text);
    let (pad_x, pad_y) = (w * 3 / 10, h * 3 / 10);
    let mut sprite = RgbaImage::from_pixel(w + 2 * pad_x + 1, h + 2 * pad_y + 1, TRANSPARENT);
    draw_text_mut(
        &mut sprite,
        color,
        pad_x as i32,
        pad_y as i32,
        PxScale::from(px),
        font,
        text,
    );
    sprite
}

/// Rotate counter-clockwise by `degrees`, growing the canvas so nothing is
/// clipped, then trim transparent borders.
pub(crate) fn rotate_expanded(sprite: &RgbaImage, degrees: f32) -> RgbaImage {
    if degrees == 0.0 {
        return trim_transparent(sprite);
    }
    let (w, h) = sprite.dimensions();
    let side = ((w as f32).hypot(h as f32)).ceil() as u32 + 2;
    let mut canvas = RgbaImage::from_pixel(side, side, TRANSPARENT);
    imageops::overlay(
        &mut canvas,
        sprite,
        i64::from((side - w) / 2),
        i64::from((side - h) / 2),
    );
    let rotated = rotate_about_center(
        &canvas,
        -degrees.to_radians(),
        Interpolation::Bilinear,
        TRANSPARENT,
    );
    trim_transparent(&rotated)
}

/// Crop to the bounding box of non-transparent pixels. A fully transparent
/// image is returned unchanged.
pub(crate) fn trim_transparent(image: &RgbaImage) -> RgbaImage {
    let (mut x0, mut y0, mut x1, mut y1) = (u32::MAX, u32::MAX, 0, 0);
    for (x, y, pixel) in image.enumerate_pixels() {
        if pixel[3] > 0 {
            x0 = x0.min(x);
            y0 = y0.min(y);
            x1 = x1.max(x);
            y1 = y1.max(y);
        }
    }
    if x0 > x1 {
        return image.clone();
    }
    imageops::crop_imm(image, x0, y0, x1 - x0 + 1, y1 - y0 + 1).to_image()
}

/// Alpha-blend `top` onto `base` at `(x, y)`; out-of-bounds parts are clipped.
pub(crate) fn blend(base: &mut RgbaImage, top: &RgbaImage, x: i64, y: i64) {
    imageops::overlay(base, top, x, y);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct BoundingBox {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self {
            x0: x,
            y0: y,
            x1: x + w,
            y1: y + h,
        }
    }

    pub fn overlaps(&self, other: &Self) -> bool {
        !(self.x1 <= other.x0 || self.x0 >= other.x1 || self.y1 <= other.y0 || self.y0 >= other.y1)
    }
}
