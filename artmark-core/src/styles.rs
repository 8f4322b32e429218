//! The closed WikiArt style vocabulary.
//!
//! The set is closed for curation (indices in the source dataset map onto
//! it) but unenforced for predictions: a model may emit any string and it
//! is simply scored as a mismatch.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Style names in dataset index order.
pub const STYLE_LABELS: [&str; 27] = [
    "Abstract_Expressionism",
    "Action_painting",
    "Analytical_Cubism",
    "Art_Nouveau",
    "Baroque",
    "Color_Field_Painting",
    "Contemporary_Realism",
    "Cubism",
    "Early_Renaissance",
    "Expressionism",
    "Fauvism",
    "High_Renaissance",
    "Impressionism",
    "Mannerism_Late_Renaissance",
    "Minimalism",
    "Naive_Art_Primitivism",
    "New_Realism",
    "Northern_Renaissance",
    "Pointillism",
    "Pop_Art",
    "Post_Impressionism",
    "Realism",
    "Rococo",
    "Romanticism",
    "Symbolism",
    "Synthetic_Cubism",
    "Ukiyo_e",
];

/// Label used when a dataset index falls outside [`STYLE_LABELS`].
pub const UNKNOWN_STYLE: &str = "Unknown_Style";

/// A member of the closed style set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StyleLabel(u8);

impl StyleLabel {
    pub fn from_index(index: u32) -> Option<Self> {
        (index < STYLE_LABELS.len() as u32).then_some(Self(index as u8))
    }

    /// Case-insensitive lookup; spaces, hyphens and underscores are equivalent.
    pub fn from_name(name: &str) -> Option<Self> {
        let wanted = normalize_label(name);
        STYLE_LABELS
            .iter()
            .position(|label| normalize_label(label) == wanted)
            .map(|i| Self(i as u8))
    }

    pub fn index(self) -> u32 {
        self.0 as u32
    }

    pub fn name(self) -> &'static str {
        STYLE_LABELS[self.0 as usize]
    }

    pub fn all() -> impl Iterator<Item = StyleLabel> {
        (0..STYLE_LABELS.len() as u8).map(Self)
    }
}

impl Display for StyleLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A style as it appears in curation inputs: either a dataset index or a name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StyleRef {
    Index(u32),
    Name(String),
}

impl StyleRef {
    /// Canonical label text. Known names are canonicalized, unknown names
    /// are kept verbatim, unknown indices become [`UNKNOWN_STYLE`].
    pub fn resolve(&self) -> String {
        match self {
            Self::Index(i) => StyleLabel::from_index(*i)
                .map(|label| label.name().to_string())
                .unwrap_or_else(|| UNKNOWN_STYLE.to_string()),
            Self::Name(name) => StyleLabel::from_name(name)
                .map(|label| label.name().to_string())
                .unwrap_or_else(|| name.trim().to_string()),
        }
    }
}

/// Lowercase, trimmed, with spaces and hyphens folded into underscores.
pub fn normalize_label(label: &str) -> String {
    label
        .trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

/// Whether two style strings name the same label.
pub fn labels_match(a: &str, b: &str) -> bool {
    normalize_label(a) == normalize_label(b)
}
