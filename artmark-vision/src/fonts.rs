use std::path::{Path, PathBuf};

use ab_glyph::FontVec;
use rand::{seq::SliceRandom, Rng};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{Error, Result};

const MAX_SYSTEM_FONTS: usize = 20;

/// Directories searched for fonts when none are given.
pub fn system_font_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![
        PathBuf::from("/usr/share/fonts"),
        PathBuf::from("/usr/local/share/fonts"),
    ];
    if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
        dirs.push(home.join(".fonts"));
        dirs.push(home.join(".local/share/fonts"));
    }
    dirs
}

struct LoadedFont {
    path: PathBuf,
    font: FontVec,
}

/// The fonts watermarks are drawn with.
pub struct FontBook {
    fonts: Vec<LoadedFont>,
}

impl FontBook {
    /// Load exactly the given fonts. Any unreadable font is an error.
    pub fn from_paths(paths: &[PathBuf]) -> Result<Self> {
        let fonts = paths
            .iter()
            .map(|path| load_font(path))
            .collect::<Result<Vec<_>>>()?;
        Self::from_loaded(fonts)
    }

    /// Up to 20 readable `.ttf`/`.otf` files found under `dirs`.
    pub fn discover(dirs: &[PathBuf]) -> Result<Self> {
        let mut candidates: Vec<PathBuf> = dirs
            .iter()
            .filter(|d| d.is_dir())
            .flat_map(|d| WalkDir::new(d).follow_links(true))
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| {
                path.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("ttf") || e.eq_ignore_ascii_case("otf"))
            })
            .collect();
        candidates.sort();

        let fonts: Vec<LoadedFont> = candidates
            .iter()
            .filter_map(|path| match load_font(path) {
                Ok(font) => Some(font),
                Err(e) => {
                    debug!("Skipping font: {e}");
                    None
                }
            })
            .take(MAX_SYSTEM_FONTS)
            .collect();
        info!("Found {} fonts for watermarks", fonts.len());
        Self::from_loaded(fonts)
    }

    pub fn system() -> Result<Self> {
        Self::discover(&system_font_dirs())
    }

    fn from_loaded(fonts: Vec<LoadedFont>) -> Result<Self> {
        if fonts.is_empty() {
            return Err(Error::NoFonts);
        }
        Ok(Self { fonts })
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.fonts.iter().map(|f| f.path.as_path())
    }

    /// A random font, preferring ones whose file name mentions "bold" when
    /// `bold` is set and any exist.
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R, bold: bool) -> &FontVec {
        let bold_fonts: Vec<&LoadedFont> = if bold {
            self.fonts
                .iter()
                .filter(|f| f.path.to_string_lossy().to_lowercase().contains("bold"))
                .collect()
        } else {
            Vec::new()
        };
        let pick = if bold_fonts.is_empty() {
            self.fonts.choose(rng)
        } else {
            bold_fonts.choose(rng).copied()
        };
        // `fonts` is never empty, see `from_loaded`.
        &pick.unwrap_or(&self.fonts[0]).font
    }
}

fn load_font(path: &Path) -> Result<LoadedFont> {
    let bytes = std::fs::read(path).map_err(|e| Error::io(path, e))?;
    let font = FontVec::try_from_vec(bytes).map_err(|_| Error::InvalidFont {
        path: path.to_path_buf(),
    })?;
    Ok(LoadedFont {
        path: path.to_path_buf(),
        font,
    })
}
