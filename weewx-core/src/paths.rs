use directories::ProjectDirs;
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;

use crate::error::ConfigError;

/// Locations of the durable config store and the resource cache.
///
/// Constructed once and handed to every component; nothing in the core
/// reads platform paths on its own.
#[derive(Debug, Clone)]
pub struct Paths {
    config_dir: PathBuf,
    cache_dir: PathBuf,
}

impl Paths {
    pub fn new(config_dir: impl Into<PathBuf>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            cache_dir: cache_dir.into(),
        }
    }

    /// Platform defaults, e.g. `~/.config/weewxapp` and `~/.cache/weewxapp` on Linux.
    pub fn discover() -> Result<Self, ConfigError> {
        let dirs = ProjectDirs::from("com", "odiousapps", "weewxapp")
            .ok_or(ConfigError::NoHomeDirectory)?;

        Ok(Self::new(dirs.config_dir(), dirs.cache_dir()))
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Create both directories if they do not exist yet.
    pub fn ensure(&self) -> io::Result<()> {
        fs::create_dir_all(&self.config_dir)?;
        fs::create_dir_all(&self.cache_dir)
    }
}

/// Write `bytes` to `path` through a sibling temp file and an atomic rename.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    write_beside(path, bytes)?
        .persist(path)
        .map_err(|e| e.error)?;

    Ok(())
}

/// Write `bytes` to a synced temp file in the directory of `path`, leaving
/// `path` itself untouched. Dropping the result deletes the temp file.
pub(crate) fn write_beside(path: &Path, bytes: &[u8]) -> io::Result<NamedTempFile> {
    use std::io::Write;

    let dir = path
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no parent"))?;
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;

    Ok(tmp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_atomic_replaces_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("data.txt");

        write_atomic(&target, b"first").unwrap();
        write_atomic(&target, b"second").unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"second");
        // only the target remains, no stray temp files
        let entries = fs::read_dir(target.parent().unwrap()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn write_beside_leaves_the_target_alone_until_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("radar.gif");
        fs::write(&target, b"old").unwrap();

        let staged = write_beside(&target, b"new").unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"old");
        drop(staged);

        assert_eq!(fs::read(&target).unwrap(), b"old");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn ensure_creates_both_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::new(dir.path().join("cfg"), dir.path().join("cache"));

        paths.ensure().unwrap();

        assert!(paths.config_dir().is_dir());
        assert!(paths.cache_dir().is_dir());
        assert_eq!(paths.config_file(), dir.path().join("cfg").join("config.toml"));
    }
}
