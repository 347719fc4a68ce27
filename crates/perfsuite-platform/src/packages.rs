use anyhow::Context;
use async_trait::async_trait;
use perfsuite_core::providers::{AppDescriptor, AppPackageRegistry};
use std::path::{Path, PathBuf};

/// Android packages are `.apk` files, simulator builds are `.app` bundles.
pub const PACKAGE_EXTENSIONS: [&str; 2] = ["apk", "app"];

/// `<dir>/<app>-<version>.<ext>`
pub fn package_path(dir: &Path, app: &str, version: &str, ext: &str) -> PathBuf {
    dir.join(format!("{}-{}.{}", app, version, ext))
}

/// Package directory laid out as `<app>-<version>.apk|.app`.
pub struct FolderPackageRegistry {
    dir: PathBuf,
}

impl FolderPackageRegistry {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    async fn file_names(&self) -> anyhow::Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .with_context(|| format!("failed to read packages dir {}", self.dir.display()))?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }
}

/// Splits `shop-5.2.0.apk` into `("shop", "5.2.0")`. The version is the part
/// after the last `-`, so app names may contain dashes.
pub fn split_package_name(file_name: &str) -> Option<(&str, &str)> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if !PACKAGE_EXTENSIONS.contains(&ext) {
        return None;
    }
    let (app, version) = stem.rsplit_once('-')?;
    (!app.is_empty() && !version.is_empty()).then_some((app, version))
}

#[async_trait]
impl AppPackageRegistry for FolderPackageRegistry {
    async fn get_app_by_name_from_folder(&self, name: &str) -> anyhow::Result<Option<AppDescriptor>> {
        let found = self
            .file_names()
            .await?
            .iter()
            .any(|f| split_package_name(f).is_some_and(|(app, _)| app == name));
        Ok(found.then(|| AppDescriptor {
            name: name.to_string(),
        }))
    }

    async fn get_app_version_by_name_from_folder(
        &self,
        name: &str,
        version: &str,
    ) -> anyhow::Result<Option<String>> {
        for ext in PACKAGE_EXTENSIONS {
            let path = package_path(&self.dir, name, version, ext);
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                return Ok(Some(version.to_string()));
            }
        }
        Ok(None)
    }
}
