use anyhow::Result;
use hivex_core::copy_dir_contents;
use std::path::{Path, PathBuf};

pub fn training_run_dir(results_root: &Path, dataset: &str, original_train_name: &str) -> PathBuf {
    results_root.join(dataset).join("train").join(original_train_name)
}

/// Copies the winning training run (policies, checkpoints, event files) into
/// `dest`. A missing run is reported and yields `None`.
pub fn copy_training_artifacts(
    results_root: &Path,
    dataset: &str,
    original_train_name: &str,
    dest: &Path,
) -> Result<Option<u64>> {
    let src = training_run_dir(results_root, dataset, original_train_name);
    if !src.is_dir() {
        tracing::warn!(src = %src.display(), "training run not found, card written without artifacts");
        return Ok(None);
    }
    let copied = copy_dir_contents(&src, dest)?;
    tracing::debug!(src = %src.display(), dest = %dest.display(), files = copied, "copied training artifacts");
    Ok(Some(copied))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn missing_run_is_not_an_error() {
        let root = std::env::temp_dir().join(format!(
            "hivex_artifacts_test_{}_{}",
            std::process::id(),
            chrono::Utc::now().timestamp_micros()
        ));
        let dest = root.join("card");
        let copied = copy_training_artifacts(&root, "WindFarmControl", "nope_train", &dest).expect("copy");
        assert_eq!(copied, None);
        assert!(!dest.exists());

        let run = training_run_dir(&root, "WindFarmControl", "WindFarmControl_pattern_1_task_0_run_id_0_train");
        fs::create_dir_all(run.join("Agent").join("checkpoints")).expect("mkdir");
        fs::write(run.join("Agent").join("Agent.onnx"), b"x").expect("write");
        fs::write(run.join("Agent").join("checkpoints").join("Agent-10.pt"), b"y").expect("write");
        let copied = copy_training_artifacts(
            &root,
            "WindFarmControl",
            "WindFarmControl_pattern_1_task_0_run_id_0_train",
            &dest,
        )
        .expect("copy");
        assert_eq!(copied, Some(2));
        assert!(dest.join("Agent").join("checkpoints").join("Agent-10.pt").is_file());
        let _ = fs::remove_dir_all(root);
    }
}
