use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).with_context(|| format!("creating directory {}", path.display()))
}

fn parent_dir(path: &Path) -> Option<&Path> {
    path.parent().filter(|p| !p.as_os_str().is_empty())
}

/// Hidden sibling of `path` that a crashed write leaves recognisable.
fn partial_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    path.with_file_name(format!(
        ".{}.{}-{}.partial",
        name,
        std::process::id(),
        Utc::now().timestamp_micros()
    ))
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// Readers of `path` see either the previous contents or all of `bytes`.
pub fn atomic_write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = parent_dir(path);
    if let Some(dir) = dir {
        ensure_dir(dir)?;
    }
    let partial = partial_path(path);
    write_synced(&partial, bytes).with_context(|| format!("writing {}", partial.display()))?;
    if let Err(err) = fs::rename(&partial, path) {
        let _ = fs::remove_file(&partial);
        return Err(err).with_context(|| format!("replacing {}", path.display()));
    }
    // Persist the rename itself; not every platform can open a directory.
    if let Some(handle) = dir.and_then(|d| fs::File::open(d).ok()) {
        let _ = handle.sync_all();
    }
    Ok(())
}

pub fn atomic_write_json_pretty<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    atomic_write_bytes(path, &bytes)
}

/// Copies everything below `src` into `dst`, creating `dst` as needed.
/// Symlinks are followed; dangling links are skipped.
pub fn copy_dir_contents(src: &Path, dst: &Path) -> Result<u64> {
    ensure_dir(dst)?;
    let mut copied = 0u64;
    for entry in walkdir::WalkDir::new(src).follow_links(true) {
        let entry = match entry {
            Ok(e) => e,
            Err(err) if err.io_error().map(|e| e.kind()) == Some(std::io::ErrorKind::NotFound) => {
                tracing::warn!(error = %err, "skipping dangling entry");
                continue;
            }
            Err(err) => return Err(err.into()),
        };
        let rel = entry.path().strip_prefix(src)?;
        if rel.as_os_str().is_empty() {
            continue;
        }
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            ensure_dir(&target)?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                ensure_dir(parent)?;
            }
            fs::copy(entry.path(), &target).with_context(|| {
                format!("copying {} to {}", entry.path().display(), target.display())
            })?;
            copied += 1;
        }
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scratch(label: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "hivex_fsutil_{}_{}_{}",
            label,
            std::process::id(),
            Utc::now().timestamp_micros()
        ));
        ensure_dir(&dir).expect("scratch dir");
        dir
    }

    #[test]
    fn atomic_json_write_replaces_file() {
        let root = scratch("json");
        let path = root.join("nested").join("out.json");
        atomic_write_json_pretty(&path, &json!({"a": 1})).expect("first write");
        atomic_write_json_pretty(&path, &json!({"a": 2})).expect("second write");
        let text = fs::read_to_string(&path).expect("read back");
        assert!(text.contains("\"a\": 2"), "unexpected contents: {}", text);
        let leftovers: Vec<_> = fs::read_dir(path.parent().expect("parent"))
            .expect("list")
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".partial"))
            .collect();
        assert!(leftovers.is_empty());
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn failed_replace_cleans_up_partial_file() {
        let root = scratch("replace");
        let target = root.join("occupied");
        ensure_dir(&target.join("inner")).expect("dir");
        let err = atomic_write_bytes(&target, b"data").expect_err("cannot replace a directory");
        assert!(format!("{:#}", err).contains("replacing"));
        let names: Vec<String> = fs::read_dir(&root)
            .expect("list")
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["occupied".to_string()]);
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn copy_dir_contents_copies_nested_tree() {
        let root = scratch("copy");
        let src = root.join("src");
        ensure_dir(&src.join("Agent")).expect("agent dir");
        fs::write(src.join("config.yaml"), "a: 1").expect("write");
        fs::write(src.join("Agent").join("Agent.onnx"), [1u8, 2, 3]).expect("write");
        let dst = root.join("dst");
        let copied = copy_dir_contents(&src, &dst).expect("copy");
        assert_eq!(copied, 2);
        assert_eq!(
            fs::read(dst.join("Agent").join("Agent.onnx")).expect("read"),
            vec![1u8, 2, 3]
        );
        assert!(dst.join("config.yaml").is_file());
        let _ = fs::remove_dir_all(root);
    }
}
