use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use scriptlift_core::ArgOrder;
use serde::Deserialize;
use tracing::info;

pub const DEFAULT_MANIFEST: &str = "scriptlift.json";

/// Batch description for `scriptlift emit`.
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    #[serde(default = "default_target")]
    pub target: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub binary_order: Option<ArgOrder>,
    #[serde(default)]
    pub call_order: Option<ArgOrder>,
    pub scripts: Vec<ScriptEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScriptEntry {
    /// Output name; defaults to the file stem.
    #[serde(default)]
    pub name: Option<String>,
    pub path: PathBuf,
    /// Bare code bytes instead of an `FSCR` container.
    #[serde(default)]
    pub raw: bool,
    /// Entry offsets for raw scripts.
    #[serde(default)]
    pub entries: Vec<u32>,
}

fn default_target() -> String {
    "field".to_owned()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("out")
}

/// Find `scriptlift.json` by walking up from `start` through ancestor directories.
pub fn find_manifest_upward(start: &Path) -> Option<PathBuf> {
    let mut dir = if start.is_dir() {
        start.to_path_buf()
    } else {
        start.parent()?.to_path_buf()
    };
    loop {
        let candidate = dir.join(DEFAULT_MANIFEST);
        if candidate.exists() {
            return Some(candidate);
        }
        if !dir.pop() {
            return None;
        }
    }
}

/// Use `path` when it exists; for the default file name, fall back to
/// searching upward from the current directory.
pub fn resolve_manifest_path(path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return Ok(path.to_path_buf());
    }
    if path.file_name().and_then(|f| f.to_str()) == Some(DEFAULT_MANIFEST) {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        if let Some(found) = find_manifest_upward(&cwd) {
            info!(path = %found.display(), "found manifest");
            return Ok(found);
        }
    }
    bail!("manifest not found: {}", path.display())
}

/// Load a manifest and resolve its relative paths against its directory.
pub fn load_manifest(path: &Path) -> Result<Manifest> {
    let path = resolve_manifest_path(path)?;
    let file = File::open(&path).with_context(|| format!("failed to open manifest: {}", path.display()))?;
    let mut manifest: Manifest = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("failed to parse manifest: {}", path.display()))?;

    if let Some(base) = path.canonicalize()?.parent() {
        if manifest.output_dir.is_relative() {
            manifest.output_dir = base.join(&manifest.output_dir);
        }
        for script in &mut manifest.scripts {
            if script.path.is_relative() {
                script.path = base.join(&script.path);
            }
        }
    }
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn loads_and_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let manifest_path = dir.path().join(DEFAULT_MANIFEST);
        fs::write(
            &manifest_path,
            r#"{
                "call_order": "lifo",
                "scripts": [
                    { "path": "scripts/town.fscr" },
                    { "name": "boot", "path": "boot.bin", "raw": true, "entries": [0, 16] }
                ]
            }"#,
        )
        .unwrap();

        let manifest = load_manifest(&manifest_path).unwrap();
        let base = dir.path().canonicalize().unwrap();
        assert_eq!(manifest.target, "field");
        assert_eq!(manifest.output_dir, base.join("out"));
        assert_eq!(manifest.binary_order, None);
        assert_eq!(manifest.call_order, Some(ArgOrder::Lifo));
        assert_eq!(manifest.scripts[0].path, base.join("scripts/town.fscr"));
        assert!(!manifest.scripts[0].raw);
        assert_eq!(manifest.scripts[1].name.as_deref(), Some("boot"));
        assert_eq!(manifest.scripts[1].entries, [0, 16]);
    }

    #[test]
    fn finds_manifest_in_ancestor() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b/c");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join(DEFAULT_MANIFEST), r#"{ "scripts": [] }"#).unwrap();

        let found = find_manifest_upward(&nested).unwrap();
        assert_eq!(found, dir.path().join(DEFAULT_MANIFEST));
    }

    #[test]
    fn missing_manifest_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_manifest(&dir.path().join("other.json")).unwrap_err();
        assert!(err.to_string().contains("manifest not found"));
    }

    #[test]
    fn unknown_order_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.json");
        fs::write(&path, r#"{ "binary_order": "stack", "scripts": [] }"#).unwrap();
        assert!(load_manifest(&path).is_err());
    }
}
