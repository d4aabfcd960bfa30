//! Atomic JSON file helpers.
//!
//! Every cache file is written to a sibling temp file, flushed to disk and
//! renamed over the target, so a reader sees either the old file or the new
//! one. Output is pretty-printed with a trailing newline; with sorted maps
//! this makes unchanged data produce byte-identical files.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};

use camino::Utf8Path;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ScanError;

/// Writes `content` to `path` via temp file and rename.
///
/// # Errors
///
/// Returns [`ScanError::Write`] if the temp file cannot be written or
/// renamed. A leftover temp file is removed on failure.
pub fn atomic_write(path: &Utf8Path, content: &[u8]) -> Result<(), ScanError> {
    let file_name = path.file_name().unwrap_or("cache");
    let temp = path.with_file_name(format!(".{file_name}.tmp"));

    let written = File::create(&temp).and_then(|mut file| {
        file.write_all(content)?;
        file.sync_all()
    });
    if let Err(e) = written.and_then(|()| fs::rename(&temp, path)) {
        let _ = fs::remove_file(&temp);
        return Err(ScanError::write(path, e));
    }
    Ok(())
}

/// Serialises `value` and writes it atomically.
///
/// # Errors
///
/// Returns [`ScanError::Encode`] if serialisation fails, or
/// [`ScanError::Write`] if the write does.
pub fn write_json<T: Serialize + ?Sized>(path: &Utf8Path, value: &T) -> Result<(), ScanError> {
    let mut bytes = serde_json::to_vec_pretty(value).map_err(|source| ScanError::Encode {
        path: path.to_owned(),
        source,
    })?;
    bytes.push(b'\n');
    atomic_write(path, &bytes)
}

/// Reads and parses a JSON file. A missing file is `Ok(None)`.
///
/// # Errors
///
/// Returns [`ScanError::Read`] if the file exists but cannot be read, or
/// [`ScanError::Encode`] if it does not parse.
pub fn read_json<T: DeserializeOwned>(path: &Utf8Path) -> Result<Option<T>, ScanError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(ScanError::read(path, e)),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| ScanError::Encode {
            path: path.to_owned(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn dir() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        (dir, root)
    }

    #[test]
    fn test_round_trip_and_missing() {
        let (_dir, root) = dir();
        let path = root.join("table.json");
        assert_eq!(read_json::<BTreeMap<String, u32>>(&path).unwrap(), None);

        let table = BTreeMap::from([("b".to_owned(), 2), ("a".to_owned(), 1)]);
        write_json(&path, &table).unwrap();
        assert_eq!(read_json(&path).unwrap(), Some(table));
        insta::assert_snapshot!(fs::read_to_string(&path).unwrap(), @r#"
        {
          "a": 1,
          "b": 2
        }
        "#);
    }

    #[test]
    fn test_no_temp_file_left() {
        let (_dir, root) = dir();
        write_json(&root.join("x.json"), &[1, 2, 3]).unwrap();
        let names: Vec<_> = fs::read_dir(&root)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["x.json"]);
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let (_dir, root) = dir();
        let path = root.join("bad.json");
        fs::write(&path, "{ truncated").unwrap();
        let err = read_json::<BTreeMap<String, u32>>(&path).unwrap_err();
        assert!(matches!(err, ScanError::Encode { .. }));
    }

    #[test]
    fn test_write_into_missing_dir_fails() {
        let (_dir, root) = dir();
        let err = write_json(&root.join("nope/x.json"), &1).unwrap_err();
        assert!(matches!(err, ScanError::Write { .. }));
    }
}
