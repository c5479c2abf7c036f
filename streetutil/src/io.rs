use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub fn to_json<T: Serialize>(obj: &T) -> Result<String> {
    serde_json::to_string_pretty(obj).context("serializing to JSON")
}

pub fn write_json<T: Serialize>(path: &str, obj: &T) -> Result<()> {
    let contents = to_json(obj)?;
    fs_err::write(path, contents)?;
    log::info!("Wrote {}", path);
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &str) -> Result<T> {
    let raw = fs_err::read_to_string(path)?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path))
}
