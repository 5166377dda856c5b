// Project context: config, remote location and local store

use std::fs;
use std::path::{Path, PathBuf};

use locasync_io::csv::CsvGridSource;
use locasync_io::native;
use locasync_sync::{Database, SyncConfig, Syncer};

use crate::freshness::RemoteFreshness;
use crate::CliError;

pub type ProjectSyncer = Syncer<CsvGridSource, RemoteFreshness>;

pub struct Project {
    pub root: PathBuf,
    pub config: SyncConfig,
    pub remote_root: PathBuf,
    pub store: PathBuf,
}

impl Project {
    /// `config` is resolved against `root`. A missing config file means
    /// defaults; a broken one is an error.
    pub fn open(
        root: PathBuf,
        config: &Path,
        remote: Option<PathBuf>,
        store: Option<PathBuf>,
    ) -> Result<Self, CliError> {
        let config_path = root.join(config);
        let config = if config_path.exists() {
            let text = fs::read_to_string(&config_path)
                .map_err(|e| CliError::io(format!("{}: {e}", config_path.display())))?;
            SyncConfig::from_toml(&text)
                .map_err(|e| CliError::sync(e).with_hint(format!("check {}", config_path.display())))?
        } else {
            log::info!("no config at {}, using defaults", config_path.display());
            SyncConfig::default()
        };

        let remote_root = remote.unwrap_or_else(|| root.join("remote"));
        let store = store.unwrap_or_else(|| native::store_path(&root));
        log::debug!("remote {}, store {}", remote_root.display(), store.display());

        Ok(Self { root, config, remote_root, store })
    }

    pub fn syncer(&self) -> Result<ProjectSyncer, CliError> {
        let grids = CsvGridSource::new(&self.remote_root);
        let fallback = grids.freshness(&self.config.remote.spreadsheet);
        let freshness = RemoteFreshness::from_settings(&self.config.remote, fallback)?;
        Ok(Syncer::new(self.config.clone(), grids, freshness))
    }

    pub fn load_db(&self) -> Result<Database, CliError> {
        native::load_or_default(&self.store).map_err(CliError::sync)
    }

    pub fn save_db(&self, db: &Database) -> Result<(), CliError> {
        native::save(db, &self.store).map_err(CliError::sync)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes::EXIT_CONFIG;
    use tempfile::tempdir;

    #[test]
    fn missing_config_uses_defaults() {
        let dir = tempdir().unwrap();
        let project = Project::open(dir.path().to_path_buf(), Path::new("locasync.toml"), None, None).unwrap();
        assert_eq!(project.config.remote.sheets, vec!["Main"]);
        assert_eq!(project.remote_root, dir.path().join("remote"));
    }

    #[test]
    fn broken_config_is_a_config_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("locasync.toml"), "[remote]\nsheets = [\"Main\", \"Main\"]\n").unwrap();
        let err = Project::open(dir.path().to_path_buf(), Path::new("locasync.toml"), None, None)
            .err()
            .unwrap();
        assert_eq!(err.code, EXIT_CONFIG);
    }

    #[test]
    fn store_round_trip_creates_parent() {
        let dir = tempdir().unwrap();
        let store = dir.path().join("state/db.loca");
        let project =
            Project::open(dir.path().to_path_buf(), Path::new("none.toml"), None, Some(store.clone())).unwrap();

        let mut db = project.load_db().unwrap();
        assert!(db.is_empty());
        db.last_modified_online = 42;
        project.save_db(&db).unwrap();
        assert!(store.exists());
        assert_eq!(project.load_db().unwrap().last_modified_online, 42);
    }
}
