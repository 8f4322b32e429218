//! One renderer per watermark kind. Each draws onto a transparent layer the
//! size of the image and describes what it drew.

use ab_glyph::FontVec;
use artmark_core::dataset::{WatermarkInfo, WatermarkMark};
use chrono::{Datelike, Local};
use image::RgbaImage;
use imageproc::{
    drawing::{
        draw_filled_ellipse_mut, draw_filled_rect_mut, draw_hollow_circle_mut,
        draw_hollow_ellipse_mut, draw_hollow_rect_mut, draw_text_mut,
    },
    geometric_transformations::{rotate_about_center, Interpolation},
    rect::Rect,
};
use rand::{seq::SliceRandom, Rng};

use super::{
    draw::{blend, measure, rgba, rotate_expanded, text_sprite, BoundingBox, TRANSPARENT},
    Corner,
};
use crate::fonts::FontBook;

pub(crate) const WATERMARK_TEXTS: &[&str] = &[
    "CONFIDENTIAL", "DRAFT", "COPY", "ORIGINAL", "DUPLICATE", "SAMPLE", "SPECIMEN", "VOID",
    "CANCELLED", "EXPIRED", "INVALID", "APPROVED", "REJECTED", "PENDING", "CLASSIFIED",
    "RESTRICTED", "PRIVATE", "PUBLIC", "OFFICIAL", "UNOFFICIAL", "CERTIFIED", "UNCERTIFIED",
    "AUTHENTICATED", "VERIFIED", "PROPRIETARY", "COPYRIGHT", "TRADEMARK", "PATENT PENDING",
    "TRADE SECRET", "INTERNAL USE ONLY", "DO NOT COPY", "DO NOT DISTRIBUTE", "FOR REVIEW ONLY",
    "NOT FOR SALE", "PROOF", "FINAL", "PRELIMINARY", "WORKING COPY", "MASTER COPY",
    "CONTROLLED DOCUMENT", "UNCONTROLLED", "OBSOLETE", "SUPERSEDED", "PAID", "UNPAID", "OVERDUE",
    "RECEIVED", "PROCESSED", "AUDITED", "RECONCILED", "BUDGET", "ESTIMATE", "INVOICE",
    "STATEMENT", "QUOTE", "PROPOSAL", "URGENT", "PRIORITY", "RUSH", "HOLD", "FILE COPY",
    "REFERENCE ONLY", "ARCHIVE", "DESTROY AFTER USE", "RETAIN UNTIL", "EXPIRES ON",
    "EFFECTIVE DATE", "REVISION", "VERSION", "AMENDMENT", "TRANSCRIPT", "DIPLOMA",
    "CERTIFICATE", "LICENSE", "PRESCRIPTION", "MEDICAL RECORD", "TEST RESULTS", "LAB REPORT",
    "STUDENT COPY", "INSTRUCTOR COPY", "EXAMINATION", "ANSWER KEY", "WATERMARKED",
    "DIGITAL COPY", "ELECTRONIC VERSION", "SCANNED", "PHOTOGRAPHED", "REPRODUCED", "ENHANCED",
    "EDITED", "UNEDITED", "RAW", "COMPRESSED", "HIGH RESOLUTION", "LOW RESOLUTION", "PREVIEW",
    "THUMBNAIL", "CURRENT", "OUTDATED", "HISTORICAL", "ARCHIVED", "TEMPORARY", "PERMANENT",
    "LIMITED TIME", "SEASONAL", "ANNUAL", "QUARTERLY", "MONTHLY", "DAILY",
];

pub(crate) const BRAND_NAMES: &[&str] = &[
    "ACME Corp",
    "TechVision",
    "DataSoft",
    "CloudNet",
    "InfoSys",
    "Digital Solutions",
    "Smart Systems",
    "Global Tech",
    "ProServices",
];

const PALETTE: &[[u8; 3]] = &[
    [255, 255, 255],
    [200, 200, 200],
    [150, 150, 255],
    [255, 180, 180],
    [180, 255, 180],
    [255, 220, 150],
];

const STAMP_WORDS: &[&str] = &["APPROVED", "CERTIFIED", "VERIFIED", "OFFICIAL"];
const GRID_SYMBOLS: &[&str] = &["•", "×", "+", "◊", "○"];
const PLACEMENT_ATTEMPTS: usize = 50;

pub(crate) struct Layer<'a, R: Rng> {
    pub image: RgbaImage,
    pub fonts: &'a FontBook,
    pub rng: &'a mut R,
}

impl<'a, R: Rng> Layer<'a, R> {
    pub fn new(width: u32, height: u32, fonts: &'a FontBook, rng: &'a mut R) -> Self {
        Self {
            image: RgbaImage::from_pixel(width, height, TRANSPARENT),
            fonts,
            rng,
        }
    }

    fn min_side(&self) -> u32 {
        self.image.width().min(self.image.height())
    }

    fn font(&mut self, bold: bool) -> &'a FontVec {
        let fonts: &'a FontBook = self.fonts;
        fonts.choose(self.rng, bold)
    }

    fn pick<'t>(&mut self, options: &[&'t str]) -> &'t str {
        options.choose(self.rng).copied().unwrap_or_default()
    }

    /// One to five "WORD n" labels at random angles, placed inside the image
    /// without overlapping. A label that finds no free spot is dropped.
    pub fn text(&mut self, text: Option<&str>) -> WatermarkInfo {
        let (width, height) = self.image.dimensions();
        let margin = self.min_side() / 20;
        let count = self.rng.gen_range(1..=5);
        let mut occupied: Vec<BoundingBox> = Vec::new();
        let mut info = WatermarkInfo::new("text");

        for _ in 0..count {
            let base = text.map_or_else(|| self.pick(WATERMARK_TEXTS).to_string(), str::to_string);
            let number = self.rng.gen_range(1..=5);
            let final_text = format!("{base} {number}");

            let px = (self.min_side() / self.rng.gen_range(12..=18)) as f32;
            let opacity = self.rng.gen_range(80..=120);
            let color = PALETTE.choose(self.rng).copied().unwrap_or([255, 255, 255]);
            let angle = self.rng.gen_range(-45..=45) as f32;
            let font = self.font(true);
            let sprite = rotate_expanded(
                &text_sprite(font, px, &final_text, rgba(color, opacity)),
                angle,
            );
            let (w, h) = sprite.dimensions();

            for _ in 0..PLACEMENT_ATTEMPTS {
                let x = self
                    .rng
                    .gen_range(margin..=width.saturating_sub(w + margin).max(margin));
                let y = self
                    .rng
                    .gen_range(margin..=height.saturating_sub(h + margin).max(margin));
                let candidate = BoundingBox::new(x, y, w, h);
                if candidate.x1 > width || candidate.y1 > height {
                    continue;
                }
                if occupied.iter().any(|b| b.overlaps(&candidate)) {
                    continue;
                }
                blend(&mut self.image, &sprite, i64::from(x), i64::from(y));
                occupied.push(candidate);
                info.watermarks.push(WatermarkMark {
                    final_text: final_text.clone(),
                    x: x as i32,
                    y: y as i32,
                    width: w,
                    height: h,
                    angle,
                    opacity,
                });
                break;
            }
        }
        let count = info.watermarks.len();
        info.with_detail("count", count)
    }

    /// The same text repeated along the image diagonal and tiled.
    pub fn diagonal(&mut self, text: Option<&str>) -> WatermarkInfo {
        let (width, height) = self.image.dimensions();
        let base = text.map_or_else(|| self.pick(WATERMARK_TEXTS).to_string(), str::to_string);
        let repeat = self.rng.gen_range(2..=5);
        let final_text = vec![base.as_str(); repeat].join(" ");

        let px = (self.min_side() / 15) as f32;
        let angle = (height as f32).atan2(width as f32).to_degrees();
        let opacity = self.rng.gen_range(60..=90);
        let font = self.font(false);
        let sprite = rotate_expanded(
            &text_sprite(font, px, &final_text, rgba([200, 200, 200], opacity)),
            angle,
        );

        let (step_x, step_y) = (i64::from(width / 4).max(1), i64::from(height / 4).max(1));
        for i in -2..5 {
            for j in -2..5 {
                blend(&mut self.image, &sprite, i * step_x, j * step_y);
            }
        }

        let mut info = WatermarkInfo::new("diagonal_pattern")
            .with_detail("repeat_count", repeat)
            .with_detail("text", base);
        info.watermarks.push(WatermarkMark {
            final_text,
            x: 0,
            y: 0,
            width,
            height,
            angle,
            opacity,
        });
        info
    }

    /// A brand name or copyright line over a translucent dark box.
    pub fn corner(&mut self, text: Option<&str>, corner: Corner) -> WatermarkInfo {
        let (width, height) = self.image.dimensions();
        let text = match text {
            Some(text) => text.to_string(),
            None => {
                let copyright = format!("© {}", Local::now().year());
                let mut options: Vec<&str> = BRAND_NAMES.to_vec();
                options.push(&copyright);
                self.pick(&options).to_string()
            }
        };
        let corner = match corner {
            Corner::Random => *[
                Corner::TopLeft,
                Corner::TopRight,
                Corner::BottomLeft,
                Corner::BottomRight,
            ]
            .choose(self.rng)
            .unwrap_or(&Corner::BottomRight),
            corner => corner,
        };

        let px = (self.min_side() / 20) as f32;
        let font = self.font(false);
        let (tw, th) = measure(font, px, &text);
        let (w, h, tw, th) = (width as i32, height as i32, tw as i32, th as i32);
        let padding = 20;
        let (x, y) = match corner {
            Corner::TopLeft => (padding, padding),
            Corner::TopRight => (w - tw - padding, padding),
            Corner::BottomLeft => (padding, h - th - padding),
            Corner::BottomRight | Corner::Random => (w - tw - padding, h - th - padding),
        };
        let (x, y) = (x.max(0), y.max(0));

        let bg_padding = 10;
        let opacity_bg = self.rng.gen_range(60..=90);
        let opacity_text = self.rng.gen_range(90..=140);
        draw_filled_rect_mut(
            &mut self.image,
            Rect::at(x - bg_padding, y - bg_padding)
                .of_size((tw + 2 * bg_padding) as u32, (th + 2 * bg_padding) as u32),
            rgba([0, 0, 0], opacity_bg),
        );
        draw_text_mut(
            &mut self.image,
            rgba([255, 255, 255], opacity_text),
            x,
            y,
            px,
            font,
            &text,
        );

        let mut info = WatermarkInfo::new("corner").with_detail("corner", corner.as_str());
        info.watermarks.push(WatermarkMark {
            final_text: text,
            x,
            y,
            width: tw as u32,
            height: th as u32,
            angle: 0.0,
            opacity: opacity_text,
        });
        info
    }

    /// A brand name centered inside an outlined rectangle or ellipse.
    pub fn logo(&mut self, text: Option<&str>) -> WatermarkInfo {
        let (width, height) = self.image.dimensions();
        let text = text.map_or_else(|| self.pick(BRAND_NAMES).to_string(), str::to_string);
        let px = (self.min_side() / 12) as f32;
        let font = self.font(true);
        let (tw, th) = measure(font, px, &text);
        let x = (width as i32 - tw as i32) / 2;
        let y = (height as i32 - th as i32) / 2;

        let pad = 30;
        let opacity: u8 = self.rng.gen_range(60..=100);
        let fill = rgba([255, 255, 255], opacity);
        let outline = rgba([200, 200, 200], opacity + 20);
        let (box_w, box_h) = (tw + 2 * pad as u32, th + 2 * pad as u32);
        let shape = self.pick(&["rectangle", "ellipse"]);
        if shape == "ellipse" {
            let center = (x + tw as i32 / 2, y + th as i32 / 2);
            let (rx, ry) = (box_w as i32 / 2, box_h as i32 / 2);
            draw_filled_ellipse_mut(&mut self.image, center, rx, ry, fill);
            for inset in 0..3 {
                draw_hollow_ellipse_mut(&mut self.image, center, rx - inset, ry - inset, outline);
            }
        } else {
            draw_filled_rect_mut(
                &mut self.image,
                Rect::at(x - pad, y - pad).of_size(box_w, box_h),
                fill,
            );
            for inset in 0..3u32 {
                draw_hollow_rect_mut(
                    &mut self.image,
                    Rect::at(x - pad + inset as i32, y - pad + inset as i32)
                        .of_size(box_w - 2 * inset, box_h - 2 * inset),
                    outline,
                );
            }
        }
        let text_opacity = opacity.saturating_add(100);
        draw_text_mut(
            &mut self.image,
            rgba([0, 0, 0], text_opacity),
            x,
            y,
            px,
            font,
            &text,
        );

        let mut info = WatermarkInfo::new("logo_style").with_detail("shape", shape);
        info.watermarks.push(WatermarkMark {
            final_text: text,
            x,
            y,
            width: tw,
            height: th,
            angle: 0.0,
            opacity: text_opacity,
        });
        info
    }

    /// A red double ring with a word and today's date, rotated slightly.
    pub fn stamp(&mut self, text: Option<&str>) -> WatermarkInfo {
        let (width, height) = self.image.dimensions();
        let text = text.map_or_else(|| self.pick(STAMP_WORDS).to_string(), str::to_string);
        let size = (self.min_side() / 4) as i32;
        let margin = size + 20;
        let cx = self
            .rng
            .gen_range(margin..=(width as i32 - margin).max(margin));
        let cy = self
            .rng
            .gen_range(margin..=(height as i32 - margin).max(margin));
        let opacity = self.rng.gen_range(90..=150);
        let red = rgba([255, 0, 0], opacity);

        let mut stamp = RgbaImage::from_pixel(width, height, TRANSPARENT);
        for ring in 0..8 {
            draw_hollow_circle_mut(&mut stamp, (cx, cy), size - ring, red);
        }
        for ring in 0..4 {
            draw_hollow_circle_mut(&mut stamp, (cx, cy), size - 20 - ring, red);
        }

        let px = (size / 4).max(1) as f32;
        let font = self.font(true);
        let (tw, th) = measure(font, px, &text);
        draw_text_mut(
            &mut stamp,
            red,
            cx - tw as i32 / 2,
            cy - th as i32 / 2,
            px,
            font,
            &text,
        );

        let date = Local::now().format("%Y-%m-%d").to_string();
        let date_px = (px / 2.0).max(1.0);
        let date_font = self.font(false);
        let (dw, _) = measure(date_font, date_px, &date);
        draw_text_mut(
            &mut stamp,
            red,
            cx - dw as i32 / 2,
            cy + size / 3,
            date_px,
            date_font,
            &date,
        );

        let angle = self.rng.gen_range(-30..=30) as f32;
        let stamp = rotate_about_center(
            &stamp,
            -angle.to_radians(),
            Interpolation::Bilinear,
            TRANSPARENT,
        );
        blend(&mut self.image, &stamp, 0, 0);

        let mut info = WatermarkInfo::new("stamp")
            .with_detail("date", date)
            .with_detail("position", vec![cx, cy]);
        info.watermarks.push(WatermarkMark {
            final_text: text,
            x: cx - size,
            y: cy - size,
            width: 2 * size as u32,
            height: 2 * size as u32,
            angle,
            opacity,
        });
        info
    }

    /// A lattice of one symbol.
    pub fn grid(&mut self, text: Option<&str>) -> WatermarkInfo {
        let (width, height) = self.image.dimensions();
        let symbol = text.map_or_else(|| self.pick(GRID_SYMBOLS).to_string(), str::to_string);
        let grid_size: u32 = self.rng.gen_range(50..=100);
        let opacity = self.rng.gen_range(80..=150);
        let color = rgba([150, 150, 150], opacity);
        let px = (grid_size / 3) as f32;
        let font = self.font(false);

        for x in (0..width).step_by(grid_size as usize) {
            for y in (0..height).step_by(grid_size as usize) {
                draw_text_mut(&mut self.image, color, x as i32, y as i32, px, font, &symbol);
            }
        }

        let mut info = WatermarkInfo::new("grid").with_detail("grid_size", grid_size);
        info.watermarks.push(WatermarkMark {
            final_text: symbol,
            x: 0,
            y: 0,
            width,
            height,
            angle: 0.0,
            opacity,
        });
        info
    }

    /// Random bars with a numeric caption underneath, centered.
    pub fn barcode(&mut self, text: Option<&str>) -> WatermarkInfo {
        let (width, height) = self.image.dimensions();
        let bar_w = self.min_side() / 2;
        let bar_h = (bar_w / 4).max(1);
        let x0 = ((width - bar_w) / 2) as i32;
        let y0 = ((height - bar_h) / 2) as i32;
        let opacity = self.rng.gen_range(60..=140);
        let black = rgba([0, 0, 0], opacity);

        let bars: u32 = self.rng.gen_range(30..=50);
        for i in 0..bars {
            let w = self.rng.gen_range(2..=8);
            let x = x0 + (i * bar_w / bars) as i32;
            if self.rng.gen_bool(0.7) {
                draw_filled_rect_mut(&mut self.image, Rect::at(x, y0).of_size(w, bar_h), black);
            }
        }

        let caption = text.map_or_else(
            || {
                format!(
                    "{}-{}",
                    self.rng.gen_range(100_000..=999_999),
                    self.rng.gen_range(100..=999)
                )
            },
            str::to_string,
        );
        let px = (bar_h / 4).max(1) as f32;
        let font = self.font(false);
        let (tw, th) = measure(font, px, &caption);
        let tx = x0 + (bar_w as i32 - tw as i32) / 2;
        let ty = y0 + bar_h as i32 + 10;
        draw_text_mut(&mut self.image, black, tx, ty, px, font, &caption);

        let mut info = WatermarkInfo::new("barcode").with_detail("bars", bars);
        info.watermarks.push(WatermarkMark {
            final_text: caption,
            x: tx,
            y: ty,
            width: tw,
            height: th,
            angle: 0.0,
            opacity,
        });
        info
    }
}
