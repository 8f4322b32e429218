//! Image handling for artmark: discovering and loading images, and drawing
//! synthetic watermarks for training data.

mod error;
mod fonts;
mod images;
mod progress;
pub mod watermark;

pub use error::{Error, Result};
pub use fonts::{system_font_dirs, FontBook};
pub use images::{discover_images, is_image, load_rgb, IMAGE_EXTENSIONS};
pub use progress::IterWithProgress;
pub use watermark::{
    Corner, WatermarkGenerator, WatermarkKind, WatermarkOptions, WatermarkOutput,
    WatermarkSummary,
};
