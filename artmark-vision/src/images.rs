use std::path::{Path, PathBuf};

use image::DynamicImage;
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Extensions treated as images, compared case-insensitively.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tif", "tiff", "webp"];

pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.iter().any(|x| x.eq_ignore_ascii_case(e)))
}

/// Image files directly inside `dir`, sorted by path.
pub fn discover_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut images = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            Error::io(path, e.into())
        })?;
        if entry.file_type().is_file() && is_image(entry.path()) {
            images.push(entry.into_path());
        }
    }
    images.sort();
    Ok(images)
}

/// Decode `path` and convert it to 8-bit RGB.
pub fn load_rgb(path: &Path) -> Result<DynamicImage> {
    let image = image::open(path).map_err(|e| Error::image(path, e))?;
    Ok(DynamicImage::ImageRgb8(image.to_rgb8()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_images_case_insensitively_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.PNG", "a.jpg", "c.txt", "d.WebP", "e.tiff"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.png")).unwrap();
        std::fs::write(dir.path().join("nested.png/inner.jpg"), b"").unwrap();

        let found: Vec<String> = discover_images(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(found, vec!["a.jpg", "b.PNG", "d.WebP", "e.tiff"]);
    }

    #[test]
    fn missing_directory_is_an_error() {
        assert!(discover_images(Path::new("/definitely/not/here")).is_err());
    }

    #[test]
    fn load_converts_to_rgb() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gray.png");
        image::GrayImage::new(4, 3).save(&path).unwrap();
        let image = load_rgb(&path).unwrap();
        assert!(matches!(image, DynamicImage::ImageRgb8(_)));
        assert_eq!((image.width(), image.height()), (4, 3));
    }
}
