use std::path::Path;

use indexmap::IndexMap;
use rand::{seq::SliceRandom, Rng};
use tracing::info;

use crate::{
    error::{Error, Result},
    io::{create_dir_all, write_jsonl},
    prompt::INSTRUCTION,
    styles::StyleRef,
};

use super::{AnnotationEntry, CatalogEntry, EntryMeta, EntryOutput};

/// Group used for catalog entries without a style.
pub const UNKNOWN_GROUP: &str = "unknown";

/// Placeholder subject written before an image is tagged.
pub const DEFAULT_MAIN_OBJECT: &str = "painting";

/// Pick up to `target_total` catalog indices spread evenly over styles.
///
/// Every style contributes `target_total / n_styles` random entries (all of
/// them when it has fewer). Styles are visited in order of first
/// appearance and the result is truncated to `target_total`.
pub fn select_balanced_subset<R: Rng + ?Sized>(
    catalog: &[CatalogEntry],
    target_total: usize,
    rng: &mut R,
) -> Vec<usize> {
    let mut by_style: IndexMap<&str, Vec<usize>> = IndexMap::new();
    for (i, entry) in catalog.iter().enumerate() {
        let style = entry
            .style
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(UNKNOWN_GROUP);
        by_style.entry(style).or_default().push(i);
    }
    if by_style.is_empty() {
        return Vec::new();
    }

    let per_style = target_total / by_style.len();
    info!(
        "Found {} styles, selecting ~{per_style} images per style",
        by_style.len()
    );

    let mut selected = Vec::with_capacity(target_total);
    for indices in by_style.values() {
        if indices.len() <= per_style {
            selected.extend_from_slice(indices);
        } else {
            selected.extend(indices.choose_multiple(rng, per_style).copied());
        }
    }
    selected.truncate(target_total);
    info!("Selected {} images in total", selected.len());
    selected
}

/// Copy the selected images into `image_dir` as `wikiart_00000.<ext>`, ... and
/// write one untagged [`AnnotationEntry`] per image to `out`.
///
/// Relative catalog paths are resolved against `catalog_root`.
pub fn write_subset(
    catalog: &[CatalogEntry],
    selected: &[usize],
    catalog_root: &Path,
    image_dir: &Path,
    out: &Path,
) -> Result<Vec<AnnotationEntry>> {
    create_dir_all(image_dir)?;

    let mut entries = Vec::with_capacity(selected.len());
    for (new_id, &idx) in selected.iter().enumerate() {
        let source = catalog.get(idx).ok_or_else(|| {
            Error::Dataset(format!(
                "subset index {idx} is outside the catalog ({} entries)",
                catalog.len()
            ))
        })?;
        let source_path = catalog_root.join(&source.image_path);
        let extension = source_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("jpg")
            .to_ascii_lowercase();
        let target = image_dir.join(format!("wikiart_{new_id:05}.{extension}"));
        std::fs::copy(&source_path, &target).map_err(|e| Error::io(&source_path, e))?;

        let style = source.style.clone().filter(|s| !s.is_empty());
        entries.push(AnnotationEntry {
            image_path: target.display().to_string(),
            instruction: INSTRUCTION.to_string(),
            output: EntryOutput {
                watermarks: 0,
                text: String::new(),
                main_object: DEFAULT_MAIN_OBJECT.to_string(),
                style: Some(StyleRef::Name(
                    style.clone().unwrap_or_else(|| UNKNOWN_GROUP.to_string()),
                )),
            },
            meta: EntryMeta {
                artist: source.artist.clone(),
                genre: source.genre.clone(),
                style_raw: style,
            },
        });

        if new_id > 0 && new_id % 500 == 0 {
            info!("Saved {new_id} / {} images", selected.len());
        }
    }

    write_jsonl(out, &entries)?;
    info!(
        "Finished: {} images saved to {}, metadata in {}",
        entries.len(),
        image_dir.display(),
        out.display()
    );
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn catalog(styles: &[(&str, usize)]) -> Vec<CatalogEntry> {
        styles
            .iter()
            .flat_map(|&(style, n)| {
                (0..n).map(move |i| CatalogEntry {
                    image_path: format!("{style}_{i}.jpg"),
                    style: (!style.is_empty()).then(|| style.to_string()),
                    artist: None,
                    genre: None,
                })
            })
            .collect()
    }

    #[test]
    fn balances_across_styles() {
        let catalog = catalog(&[("Baroque", 10), ("Rococo", 10), ("Cubism", 10)]);
        let mut rng = StdRng::seed_from_u64(0);
        let selected = select_balanced_subset(&catalog, 6, &mut rng);
        assert_eq!(selected.len(), 6);
        for style in ["Baroque", "Rococo", "Cubism"] {
            let n = selected
                .iter()
                .filter(|&&i| catalog[i].style.as_deref() == Some(style))
                .count();
            assert_eq!(n, 2, "{style}");
        }
    }

    #[test]
    fn small_styles_contribute_everything() {
        let catalog = catalog(&[("Baroque", 1), ("Rococo", 10), ("", 2)]);
        let mut rng = StdRng::seed_from_u64(7);
        let selected = select_balanced_subset(&catalog, 9, &mut rng);
        // 3 per style: Baroque gives its only entry, unknown gives both.
        assert_eq!(selected.len(), 6);
        assert_eq!(selected[0], 0);
        assert!(selected[4..].iter().all(|&i| catalog[i].style.is_none()));
    }

    #[test]
    fn same_seed_same_subset() {
        let catalog = catalog(&[("Baroque", 50), ("Rococo", 50)]);
        let a = select_balanced_subset(&catalog, 10, &mut StdRng::seed_from_u64(42));
        let b = select_balanced_subset(&catalog, 10, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn empty_catalog() {
        assert!(select_balanced_subset(&[], 10, &mut StdRng::seed_from_u64(0)).is_empty());
    }
}
