use crate::infrastructure::config::{ensure_default_configs, load_configs};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::storage::initialize_database;
use std::fs;
use std::path::{Path, PathBuf};

const DATABASE_FILE: &str = "scheduler.sqlite";

#[derive(Debug, Clone)]
pub struct WorkspacePaths {
    pub workspace_root: PathBuf,
    pub config_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub database_path: PathBuf,
}

pub fn bootstrap_workspace(workspace_root: &Path) -> Result<WorkspacePaths, InfraError> {
    let config_dir = workspace_root.join("config");
    let state_dir = workspace_root.join("state");
    let logs_dir = workspace_root.join("logs");
    let database_path = state_dir.join(DATABASE_FILE);

    for dir in [&config_dir, &state_dir, &logs_dir] {
        fs::create_dir_all(dir)?;
    }

    ensure_default_configs(&config_dir)?;
    load_configs(&config_dir)?;
    initialize_database(&database_path)?;

    Ok(WorkspacePaths {
        workspace_root: workspace_root.to_path_buf(),
        config_dir,
        logs_dir,
        database_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_creates_layout_and_is_repeatable() {
        let dir = tempfile::tempdir().expect("temp dir");
        let paths = bootstrap_workspace(dir.path()).expect("first bootstrap");
        assert!(paths.config_dir.join("app.json").is_file());
        assert!(paths.config_dir.join("presets.json").is_file());
        assert!(paths.logs_dir.is_dir());
        assert!(paths.database_path.is_file());

        bootstrap_workspace(dir.path()).expect("second bootstrap");
    }

    #[test]
    fn bootstrap_rejects_unsupported_config_schema() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config_dir = dir.path().join("config");
        fs::create_dir_all(&config_dir).expect("config dir");
        fs::write(config_dir.join("app.json"), r#"{"schema": 2}"#).expect("write app.json");

        let error = bootstrap_workspace(dir.path()).expect_err("schema 2");
        assert!(matches!(error, InfraError::InvalidConfig(_)));
    }
}
