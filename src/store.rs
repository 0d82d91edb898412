//! JSON profile documents on disk.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Deserialize;
use uuid::Uuid;

use crate::connector::{BulbConnector, ScanPolicy};
use crate::errors::Error;
use crate::item::BulbItem;
use crate::profile::Profile;

type Result<T> = std::result::Result<T, Error>;

/// How a [`ProfileStore`] finds documents and resolves their bulbs.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Suffix of profile documents. The leading dot is optional; an empty
    /// string matches every file.
    pub extension: String,
    /// Bulbs resolved at the same time while loading.
    pub concurrency: usize,
    pub scan: ScanPolicy,
}

impl Default for StoreOptions {
    fn default() -> Self {
        StoreOptions {
            extension: ProfileStore::DEFAULT_EXTENSION.to_string(),
            concurrency: 8,
            scan: ScanPolicy::default(),
        }
    }
}

impl StoreOptions {
    fn suffix(&self) -> String {
        let ext = self.extension.trim_start_matches('.');
        if ext.is_empty() {
            String::new()
        } else {
            format!(".{ext}")
        }
    }
}

/// Reads and writes one profile document and lists documents in directories.
///
/// Loading resolves every bulb in the profile before returning, so the
/// profile comes back with live handles attached wherever a bulb answered.
///
/// # Example
///
/// ```no_run
/// use wiz_profiles::{BulbRegistry, ProfileStore};
///
/// # async fn run() -> Result<(), wiz_profiles::Error> {
/// let mut store = ProfileStore::default();
/// let paths = store.enumerate("/home/me/.config/wiz")?;
/// store.set_path(paths.first().cloned());
///
/// let profile = store.load(&BulbRegistry::new()).await?;
/// for bulb in profile.live_bulbs() {
///     println!("{} is {}", bulb.ip(), if bulb.pilot().is_some_and(|p| p.is_on()) { "on" } else { "off" });
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ProfileStore {
    path: Option<PathBuf>,
    options: StoreOptions,
    last_directory: Option<PathBuf>,
}

#[derive(Deserialize)]
struct ProfileDocument {
    id: Option<Uuid>,
    name: Option<String>,
    bulbs: Option<Vec<BulbItem>>,
}

impl ProfileStore {
    pub const DEFAULT_EXTENSION: &'static str = ".wizj";

    pub fn new(path: impl Into<PathBuf>) -> Self {
        ProfileStore {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn with_options(mut self, options: StoreOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn set_path(&mut self, path: Option<PathBuf>) {
        self.path = path;
    }

    /// The directory of the last successful [`ProfileStore::enumerate`].
    pub fn last_directory(&self) -> Option<&Path> {
        self.last_directory.as_deref()
    }

    /// `dir/name` plus the configured extension.
    pub fn profile_path(&self, dir: impl AsRef<Path>, name: &str) -> PathBuf {
        dir.as_ref().join(format!("{name}{}", self.options.suffix()))
    }

    /// Read the profile document and resolve its bulbs.
    ///
    /// Bulbs that cannot be reached stay in the profile without a handle.
    pub async fn load<C: BulbConnector>(&self, connector: &C) -> Result<Profile> {
        let mut profile: Profile = self.read_document()?;
        self.resolve(&mut profile, connector).await;
        Ok(profile)
    }

    /// Like [`ProfileStore::load`], but overwrites the fields present in the
    /// document onto an existing profile.
    ///
    /// The document is fully parsed before `profile` is touched, so on error
    /// `profile` is unchanged. A `bulbs` list in the document replaces the
    /// existing entries.
    pub async fn load_into<C: BulbConnector>(&self, profile: &mut Profile, connector: &C) -> Result<()> {
        let doc: ProfileDocument = self.read_document()?;
        if let Some(id) = doc.id {
            profile.set_id(id);
        }
        if let Some(name) = doc.name {
            profile.set_name(&name);
        }
        if let Some(bulbs) = doc.bulbs {
            profile.replace_bulbs(bulbs);
        }
        self.resolve(profile, connector).await;
        Ok(())
    }

    /// Write `profile`, replacing the document if it exists.
    ///
    /// Only identities are written; live handles are not persisted.
    pub fn save(&self, profile: &Profile) -> Result<()> {
        let path = self.target()?;
        let json = serde_json::to_string_pretty(profile).map_err(Error::JsonDump)?;
        fs::write(path, json).map_err(|e| Error::io(path, e))?;
        debug!("saved profile {:?} to {}", profile.name(), path.display());
        Ok(())
    }

    /// List profile documents in `dir`, sorted by path.
    ///
    /// Remembers `dir` for [`ProfileStore::enumerate_last`].
    pub fn enumerate(&mut self, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        let found = list_documents(dir, &self.options.suffix())?;
        self.last_directory = Some(dir.to_path_buf());
        Ok(found)
    }

    /// List profile documents in the directory last passed to
    /// [`ProfileStore::enumerate`].
    pub fn enumerate_last(&self) -> Result<Vec<PathBuf>> {
        let dir = self.last_directory.as_deref().ok_or(Error::UnspecifiedTarget)?;
        list_documents(dir, &self.options.suffix())
    }

    fn target(&self) -> Result<&Path> {
        self.path.as_deref().ok_or(Error::UnspecifiedTarget)
    }

    fn read_document<T: for<'de> Deserialize<'de>>(&self) -> Result<T> {
        let path = self.target()?;
        if !path.is_file() {
            return Err(Error::NotFound(path.to_path_buf()));
        }
        let json = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        serde_json::from_str(&json).map_err(Error::JsonLoad)
    }

    async fn resolve<C: BulbConnector>(&self, profile: &mut Profile, connector: &C) {
        let live = profile
            .resolve_all(connector, self.options.scan, self.options.concurrency)
            .await;
        info!(
            "loaded profile {:?}: {}/{} bulbs reachable",
            profile.name(),
            live,
            profile.bulbs().len()
        );
    }
}

fn list_documents(dir: &Path, suffix: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::DirectoryNotFound(dir.to_path_buf()));
    }

    let suffix = suffix.to_ascii_lowercase();
    let mut found = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
        let path = entry.map_err(|e| Error::io(dir, e))?.path();
        if !path.is_file() {
            continue;
        }
        let matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.to_ascii_lowercase().ends_with(&suffix));
        if matches {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}
