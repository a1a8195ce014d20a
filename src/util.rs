use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};

pub fn now_utc_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn utc_compact_string(ts: DateTime<Utc>) -> String {
    ts.format("%Y%m%dT%H%M%SZ").to_string()
}

pub fn ensure_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("failed to create directory: {}", path.display()))
}

pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .with_context(|| format!("failed to open file for hashing: {}", path.display()))?;

    let mut hasher = Sha256::new();
    let mut buf = [0_u8; 8192];

    loop {
        let count = file
            .read(&mut buf)
            .with_context(|| format!("failed to read file for hashing: {}", path.display()))?;
        if count == 0 {
            break;
        }
        hasher.update(&buf[..count]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

pub fn write_json_pretty<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        ensure_directory(parent)?;
    }

    let data = serde_json::to_vec_pretty(value)
        .with_context(|| format!("failed to serialize json: {}", path.display()))?;

    let mut file = File::create(path)
        .with_context(|| format!("failed to create json file: {}", path.display()))?;
    file.write_all(&data)
        .with_context(|| format!("failed to write json file: {}", path.display()))?;
    file.write_all(b"\n")
        .with_context(|| format!("failed to finalize json file: {}", path.display()))?;

    Ok(())
}

/// Reads a JSON artifact, returning `None` when the file does not exist.
pub fn read_json_optional<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read json file: {}", path.display()))?;
    let value = serde_json::from_str::<T>(&raw)
        .with_context(|| format!("failed to parse json file: {}", path.display()))?;
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn compact_timestamp_has_no_separators() {
        let ts = DateTime::parse_from_rfc3339("2026-10-17T08:09:10Z")
            .expect("valid timestamp")
            .with_timezone(&Utc);
        assert_eq!(utc_compact_string(ts), "20261017T080910Z");
    }

    #[test]
    fn json_round_trip_and_missing_file() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("a").join("b.json");
        assert!(
            read_json_optional::<BTreeMap<String, u32>>(&path)
                .expect("missing is not an error")
                .is_none()
        );

        let value = BTreeMap::from([("pairs".to_string(), 100_u32)]);
        write_json_pretty(&path, &value).expect("write json");
        let loaded = read_json_optional::<BTreeMap<String, u32>>(&path).expect("read json");
        assert_eq!(loaded, Some(value));
        assert_eq!(sha256_file(&path).expect("hash").len(), 64);
    }
}
