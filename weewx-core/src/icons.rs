//! Forecast icon bundle maintenance.
//!
//! Icons ship as one zip archive extracted into the cache directory. The set
//! counts as complete when every sentinel file below is present; the version
//! recorded in the config must be at least [`ICON_VERSION`]. Unlike the feed
//! banner, an outdated bundle is a hard error with no degraded mode.

use std::{io::Cursor, path::Path};
use tracing::info;

use crate::{
    cache::ResourceCache,
    config::Config,
    error::{CacheError, VersionError},
    model::{ResourceDescriptor, ResourceKind},
    paths::Paths,
};

pub const ICON_VERSION: u32 = 8;

pub const ICON_URL: &str =
    "https://github.com/evilbunny2008/weeWXWeatherApp/releases/download/0.8.21/icons.zip";

/// One icon per provider family; if any is missing the bundle is re-fetched.
pub const SENTINELS: &[&str] = &[
    "aemet_11_g.png",
    "apixu_113.png",
    "bom1.png",
    "bom2clear.png",
    "dwd_pic_0_8.png",
    "i1.png",
    "met0.png",
    "mf_j_w1_0_n_2.png",
    "ms_cloudy.png",
    "smn_wi_cloudy.png",
    "wca00.png",
    "wgovbkn.jpg",
    "wzclear.png",
    "y01d.png",
    "yrno01d.png",
    "yahoo0.gif",
    "yahoo-clear_day@2x.png",
];

/// First sentinel that is missing from `dir`, if any.
pub fn missing_icon(dir: &Path) -> Option<&'static str> {
    SENTINELS.iter().copied().find(|f| !dir.join(f).is_file())
}

/// Whether the bundle must be downloaded again.
pub fn needs_refresh(config: &Config, paths: &Paths) -> bool {
    config.icon_version < ICON_VERSION || missing_icon(paths.cache_dir()).is_some()
}

/// Gate consulted before icons are used.
pub fn check(config: &Config) -> Result<(), VersionError> {
    if config.icon_version < ICON_VERSION {
        return Err(VersionError::BundleTooOld {
            found: config.icon_version,
            required: ICON_VERSION,
        });
    }
    Ok(())
}

/// Download and unpack the bundle, returning the version to record.
pub async fn install(cache: &ResourceCache, paths: &Paths) -> Result<u32, CacheError> {
    let desc = ResourceDescriptor::new(ResourceKind::IconBundle, ICON_URL, paths);
    let archive = cache.obtain(&desc, true).await?;

    let target = paths.cache_dir().to_path_buf();
    tokio::task::spawn_blocking(move || extract(&archive, &target))
        .await
        .map_err(|e| CacheError::Archive(e.to_string()))??;

    if let Some(missing) = missing_icon(paths.cache_dir()) {
        return Err(CacheError::IncompleteBundle(missing.to_string()));
    }

    info!(version = ICON_VERSION, "icon bundle installed");
    Ok(ICON_VERSION)
}

fn extract(archive: &[u8], dir: &Path) -> Result<(), CacheError> {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive))
        .map_err(|e| CacheError::Archive(e.to_string()))?;
    zip.extract(dir)
        .map_err(|e| CacheError::Archive(e.to_string()))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::testing::FakeFetcher;
    use std::{io::Write, sync::Arc};

    /// Zip archive holding every sentinel icon.
    pub(crate) fn bundle() -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default();
        for name in SENTINELS {
            writer.start_file(*name, options).unwrap();
            writer.write_all(b"icon").unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn paths() -> (tempfile::TempDir, Paths) {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::new(dir.path().join("config"), dir.path().join("cache"));
        paths.ensure().unwrap();
        (dir, paths)
    }

    #[test]
    fn empty_dir_misses_first_sentinel() {
        let (_dir, paths) = paths();
        assert_eq!(missing_icon(paths.cache_dir()), Some("aemet_11_g.png"));
    }

    #[test]
    fn refresh_needed_when_outdated_or_incomplete() {
        let (_dir, paths) = paths();
        let mut cfg = Config {
            icon_version: ICON_VERSION,
            ..Config::default()
        };
        assert!(needs_refresh(&cfg, &paths));

        for name in SENTINELS {
            std::fs::write(paths.cache_dir().join(name), b"icon").unwrap();
        }
        assert!(!needs_refresh(&cfg, &paths));

        cfg.icon_version = ICON_VERSION - 1;
        assert!(needs_refresh(&cfg, &paths));
    }

    #[test]
    fn outdated_bundle_is_a_hard_error() {
        let cfg = Config {
            icon_version: 7,
            ..Config::default()
        };
        assert_eq!(
            check(&cfg),
            Err(VersionError::BundleTooOld {
                found: 7,
                required: ICON_VERSION
            })
        );

        let cfg = Config {
            icon_version: ICON_VERSION,
            ..Config::default()
        };
        assert!(check(&cfg).is_ok());
    }

    #[tokio::test]
    async fn install_extracts_every_icon() {
        let (_dir, paths) = paths();
        let fake = Arc::new(FakeFetcher::new().respond(ICON_URL, bundle()));
        let cache = ResourceCache::new(fake.clone());

        let version = install(&cache, &paths).await.unwrap();

        assert_eq!(version, ICON_VERSION);
        assert_eq!(missing_icon(paths.cache_dir()), None);
        assert_eq!(fake.calls(), vec![ICON_URL]);
    }

    #[tokio::test]
    async fn corrupt_archive_is_reported() {
        let (_dir, paths) = paths();
        let fake = Arc::new(FakeFetcher::new().respond(ICON_URL, b"definitely not a zip"));
        let cache = ResourceCache::new(fake);

        let err = install(&cache, &paths).await.unwrap_err();
        assert!(matches!(err, CacheError::Archive(_)));
    }

    #[tokio::test]
    async fn archive_without_sentinels_is_incomplete() {
        let (_dir, paths) = paths();
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("readme.txt", zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"nothing here").unwrap();
        let archive = writer.finish().unwrap().into_inner();

        let fake = Arc::new(FakeFetcher::new().respond(ICON_URL, archive));
        let cache = ResourceCache::new(fake);

        let err = install(&cache, &paths).await.unwrap_err();
        assert!(matches!(err, CacheError::IncompleteBundle(_)));
    }
}
