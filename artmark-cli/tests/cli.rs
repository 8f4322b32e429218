use std::{path::Path, process::Command};

fn artmark() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_artmark"));
    cmd.env("RUST_LOG", "warn");
    cmd
}

fn records(path: &Path, n: usize) {
    let lines: Vec<String> = (0..n)
        .map(|i| {
            format!(
                r#"{{"image_path": "img_{i}.png", "watermarks": {}, "text": "DRAFT {i}", "main_object": "Girl", "style": "Realism"}}"#,
                i % 3
            )
        })
        .collect();
    std::fs::write(path, lines.join("\n")).unwrap();
}

#[test]
fn split_writes_three_files() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("records.jsonl");
    records(&input, 20);
    let out = dir.path().join("splits");

    let status = artmark()
        .args(["dataset", "split", "--input"])
        .arg(&input)
        .arg("--output-dir")
        .arg(&out)
        .status()
        .unwrap();
    assert!(status.success());

    let count = |name: &str| {
        let text = std::fs::read_to_string(out.join(name)).unwrap();
        serde_json::from_str::<Vec<serde_json::Value>>(&text).unwrap().len()
    };
    assert_eq!(count("train.json"), 16);
    assert_eq!(count("val.json"), 2);
    assert_eq!(count("test.json"), 2);
}

#[test]
fn infer_with_missing_image_fails_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("predictions.json");
    let output = artmark()
        .args(["infer", "--image"])
        .arg(dir.path().join("missing.png"))
        .arg("--output")
        .arg(&out)
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("not found"));
    assert!(!out.exists());
}

#[test]
fn infer_needs_exactly_one_input() {
    let dir = tempfile::tempdir().unwrap();
    let status = artmark()
        .args(["infer", "--output"])
        .arg(dir.path().join("p.json"))
        .status()
        .unwrap();
    assert!(!status.success());
}

#[test]
fn recipe_reads_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("artmark.toml");
    std::fs::write(&config, "[lora]\nr = 8\nlora_alpha = 16.0\n").unwrap();

    let output = artmark()
        .arg("recipe")
        .arg("--config")
        .arg(&config)
        .args(["--dataset-size", "80"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("r = 8"), "{stdout}");
    assert!(stdout.contains("scaling = 2.0000"), "{stdout}");
    assert!(stdout.contains("total_steps = 10"), "{stdout}");
}

#[test]
fn invalid_config_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("artmark.toml");
    std::fs::write(&config, "[training]\nlearning_rate = 0.0\n").unwrap();
    let status = artmark()
        .arg("recipe")
        .arg("--config")
        .arg(&config)
        .status()
        .unwrap();
    assert!(!status.success());
}
