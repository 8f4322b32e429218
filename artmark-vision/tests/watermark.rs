use std::path::Path;

use artmark_core::dataset::{build_metadata, WatermarkSidecar};
use artmark_vision::{
    watermark::SUMMARY_FILE, FontBook, WatermarkGenerator, WatermarkKind, WatermarkOptions,
};
use image::{Rgb, RgbImage};
use rand::{rngs::StdRng, SeedableRng};

/// Rendering needs a real font; machines without any skip these tests.
fn generator(seed: u64) -> Option<WatermarkGenerator<StdRng>> {
    let fonts = match FontBook::system() {
        Ok(fonts) => fonts,
        Err(e) => {
            eprintln!("skipping: {e}");
            return None;
        }
    };
    let options = WatermarkOptions {
        quiet: true,
        ..Default::default()
    };
    Some(WatermarkGenerator::new(
        fonts,
        StdRng::seed_from_u64(seed),
        options,
    ))
}

fn write_image(path: &Path, width: u32, height: u32) {
    RgbImage::from_pixel(width, height, Rgb([40, 90, 160]))
        .save(path)
        .unwrap();
}

#[test]
fn every_kind_writes_image_and_sidecar() {
    let Some(mut generator) = generator(7) else {
        return;
    };
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("wikiart_00001.jpg");
    write_image(&source, 320, 240);

    for kind in WatermarkKind::ALL {
        let out = dir.path().join(kind.as_str());
        let output = generator
            .apply_watermark(&source, &out, kind)
            .unwrap()
            .expect("image is large enough");

        assert!(output.image_path.ends_with("wikiart_00001.png"));
        let marked = image::open(&output.image_path).unwrap();
        assert_eq!((marked.width(), marked.height()), (320, 240));

        let sidecar: WatermarkSidecar =
            serde_json::from_str(&std::fs::read_to_string(&output.sidecar_path).unwrap()).unwrap();
        assert_eq!(sidecar.source_image, "wikiart_00001.jpg");
        assert_eq!(sidecar.output_image.as_deref(), Some("wikiart_00001.png"));
        assert_eq!(sidecar.image_size.width, 320);

        let marks = sidecar.watermark.watermarks.len();
        match kind {
            WatermarkKind::Text => assert!(marks <= 5, "{marks}"),
            WatermarkKind::Random => assert!(marks <= 5, "{marks}"),
            _ => assert_eq!(marks, 1, "{kind}"),
        }
    }
}

#[test]
fn fixed_text_is_recorded() {
    let Ok(fonts) = FontBook::system() else {
        return;
    };
    let options = WatermarkOptions {
        text: Some("ANNUAL".to_string()),
        quiet: true,
        ..Default::default()
    };
    let mut generator = WatermarkGenerator::new(fonts, StdRng::seed_from_u64(3), options);
    let (_, layer, info) = generator.render(WatermarkKind::Text, 640, 480);
    assert_eq!(layer.dimensions(), (640, 480));
    for mark in &info.watermarks {
        let (word, number) = mark.final_text.rsplit_once(' ').unwrap();
        assert_eq!(word, "ANNUAL");
        assert!((1..=5).contains(&number.parse::<u32>().unwrap()));
    }
}

#[test]
fn small_images_are_skipped() {
    let Some(mut generator) = generator(0) else {
        return;
    };
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("tiny.png");
    write_image(&source, 99, 400);
    let out = dir.path().join("out");
    assert!(generator
        .apply_watermark(&source, &out, WatermarkKind::Corner)
        .unwrap()
        .is_none());
    assert!(!out.join("tiny.png").exists());
}

#[test]
fn folder_summary_and_sidecars_merge() {
    let Some(mut generator) = generator(11) else {
        return;
    };
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in");
    std::fs::create_dir_all(&input).unwrap();
    write_image(&input.join("a.jpg"), 200, 150);
    write_image(&input.join("b.png"), 300, 300);
    write_image(&input.join("c.bmp"), 50, 50);
    std::fs::write(input.join("notes.txt"), b"ignored").unwrap();

    let out = dir.path().join("out");
    let summary = generator
        .process_folder(&input, &out, WatermarkKind::Random, None)
        .unwrap();
    assert_eq!(summary.total_images, 3);
    assert_eq!(summary.successful, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.watermark_types.values().sum::<usize>(), 2);
    assert!(out.join(SUMMARY_FILE).exists());

    let metadata = build_metadata(&out).unwrap();
    assert_eq!(metadata.len(), 2);
    assert!(metadata.contains_key("a.jpg"));
    assert!(metadata["b.png"].image_path.ends_with("b.png"));
}

#[test]
fn max_images_limits_the_batch() {
    let Some(mut generator) = generator(5) else {
        return;
    };
    let dir = tempfile::tempdir().unwrap();
    for name in ["a.png", "b.png", "c.png"] {
        write_image(&dir.path().join(name), 120, 120);
    }
    let out = dir.path().join("out");
    let summary = generator
        .process_folder(dir.path(), &out, WatermarkKind::Grid, Some(2))
        .unwrap();
    assert_eq!(summary.total_images, 2);
    assert_eq!(summary.watermark_types.get("grid"), Some(&2));
    assert!(!out.join("c.png").exists());
}

#[test]
fn missing_input_creates_nothing() {
    let Some(mut generator) = generator(0) else {
        return;
    };
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    assert!(generator
        .process_folder(&dir.path().join("missing"), &out, WatermarkKind::Text, None)
        .is_err());
    assert!(!out.exists());
}
