//! JSON and JSON Lines file helpers that attach the path to I/O errors.

use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{Error, Result};

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Write `value` as pretty JSON, creating parent directories as needed.
pub fn write_json_pretty<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    ensure_parent(path)?;
    let file = File::create(path).map_err(|e| Error::io(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush().map_err(|e| Error::io(path, e))
}

/// Read one JSON value per non-empty line.
pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let mut out = Vec::new();
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| Error::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let value = serde_json::from_str(&line).map_err(|e| {
            Error::Schema(format!("{}:{}: {e}", path.display(), i + 1))
        })?;
        out.push(value);
    }
    Ok(out)
}

pub fn write_jsonl<'a, T, I>(path: &Path, values: I) -> Result<usize>
where
    T: Serialize + 'a,
    I: IntoIterator<Item = &'a T>,
{
    ensure_parent(path)?;
    let file = File::create(path).map_err(|e| Error::io(path, e))?;
    let mut writer = BufWriter::new(file);
    let mut n = 0;
    for value in values {
        serde_json::to_writer(&mut writer, value)?;
        writer.write_all(b"\n").map_err(|e| Error::io(path, e))?;
        n += 1;
    }
    writer.flush().map_err(|e| Error::io(path, e))?;
    Ok(n)
}

pub fn create_dir_all(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|e| Error::io(path, e))
}

fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => create_dir_all(parent),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Annotation;

    #[test]
    fn jsonl_round_trip_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/records.jsonl");
        let records = vec![
            Annotation::new(0, "", "Tree", "Baroque"),
            Annotation::new(2, "DRAFT 1; COPY 3", "Harbor", "Impressionism"),
        ];
        assert_eq!(write_jsonl(&path, &records).unwrap(), 2);

        let mut text = std::fs::read_to_string(&path).unwrap();
        text.push_str("\n\n");
        std::fs::write(&path, text).unwrap();

        let back: Vec<Annotation> = read_jsonl(&path).unwrap();
        assert_eq!(back, records);
    }

    #[test]
    fn errors_name_the_file() {
        let err = read_json::<Vec<Annotation>>(Path::new("/definitely/missing.json")).unwrap_err();
        assert!(err.to_string().contains("/definitely/missing.json"));
    }
}
