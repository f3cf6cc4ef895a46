use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::grid::Grid;
use crate::store::{GRID_DIR, SCENARIO_DIR, WORK_DIR, atomic_write};

pub const DESCRIPTOR_FILE: &str = "campaign.json";
pub const ICON_FILE: &str = "icon.pix";
pub const DESCRIPTOR_FORMAT_VERSION: u32 = 1;
/// Unpacked campaigns live in `<root>/temp/campaign`, apart from the level
/// edits `DirStore` keeps in `<root>/temp/scen` and `<root>/temp/pix`.
pub const UNPACK_DIR: &str = "campaign";

pub const DEFAULT_CAMPAIGN_TITLE: &str = "New Campaign";
pub const DEFAULT_CAMPAIGN_VERSION: &str = "1.0";
pub const DEFAULT_DESCRIPTION: &str = "No description.";

/// Archive operations a campaign needs. At most one campaign is mounted at
/// a time; reads go to the mounted one.
pub trait CampaignPackages {
    fn mounted(&self) -> Option<String>;
    fn mount(&mut self, id: &str) -> io::Result<()>;
    fn unmount(&mut self, id: &str);
    fn read_file(&self, name: &str) -> io::Result<Vec<u8>>;
    /// Scenario ids present in the mounted campaign, ascending.
    fn list_levels(&self) -> io::Result<Vec<i32>>;
    fn unpack(&mut self, id: &str) -> io::Result<()>;
    fn write_unpacked(&mut self, name: &str, bytes: &[u8]) -> io::Result<()>;
    fn repack(&mut self, id: &str) -> io::Result<()>;
    fn cleanup_unpacked(&mut self) -> io::Result<()>;
}

/// Campaigns stored as plain directories under `<root>/campaigns/<id>/`,
/// unpacked into `<root>/temp/campaign/` for editing. Unpacking overlays the
/// level edits saved under `<root>/temp/`, so a repack carries them.
#[derive(Debug, Clone)]
pub struct DirPackages {
    root: PathBuf,
    mounted: Option<String>,
}

impl DirPackages {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            mounted: None,
        }
    }

    pub fn campaign_dir(&self, id: &str) -> PathBuf {
        self.root.join("campaigns").join(id)
    }

    pub fn unpacked_dir(&self) -> PathBuf {
        self.root.join(WORK_DIR).join(UNPACK_DIR)
    }

    /// Where `DirStore` writes edited scenarios and grids.
    fn edits_dir(&self) -> PathBuf {
        self.root.join(WORK_DIR)
    }

    fn mounted_dir(&self) -> io::Result<PathBuf> {
        match &self.mounted {
            Some(id) => Ok(self.campaign_dir(id)),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                "no campaign is mounted",
            )),
        }
    }
}

impl CampaignPackages for DirPackages {
    fn mounted(&self) -> Option<String> {
        self.mounted.clone()
    }

    fn mount(&mut self, id: &str) -> io::Result<()> {
        let dir = self.campaign_dir(id);
        if !dir.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("campaign {id} not found at {}", dir.display()),
            ));
        }
        if let Some(old) = self.mounted.replace(id.to_string()) {
            log::warn!("mounting campaign {id} replaced mounted campaign {old}");
        }
        Ok(())
    }

    fn unmount(&mut self, id: &str) {
        if self.mounted.as_deref() == Some(id) {
            self.mounted = None;
        }
    }

    fn read_file(&self, name: &str) -> io::Result<Vec<u8>> {
        fs::read(self.mounted_dir()?.join(name))
    }

    fn list_levels(&self) -> io::Result<Vec<i32>> {
        let dir = self.mounted_dir()?.join(SCENARIO_DIR);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let name = entry?.file_name();
            if let Some(id) = name.to_str().and_then(scenario_id_of) {
                ids.push(id);
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }

    fn unpack(&mut self, id: &str) -> io::Result<()> {
        let source = self.campaign_dir(id);
        if !source.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("campaign {id} not found at {}", source.display()),
            ));
        }
        let unpacked = self.unpacked_dir();
        copy_dir_all(&source, &unpacked)?;

        let edits = self.edits_dir();
        for dir in [SCENARIO_DIR, GRID_DIR] {
            let edited = edits.join(dir);
            if edited.is_dir() {
                log::debug!("unpack {id}: overlaying edits from {}", edited.display());
                copy_dir_all(&edited, &unpacked.join(dir))?;
            }
        }
        Ok(())
    }

    fn write_unpacked(&mut self, name: &str, bytes: &[u8]) -> io::Result<()> {
        atomic_write(&self.unpacked_dir().join(name), bytes)
    }

    /// Copy the working tree into a staging directory, then swap it in for
    /// `<root>/campaigns/<id>`.
    fn repack(&mut self, id: &str) -> io::Result<()> {
        let target = self.campaign_dir(id);
        let mut staging_name = target.as_os_str().to_os_string();
        staging_name.push(".tmp");
        let staging = PathBuf::from(staging_name);

        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        if let Err(err) = copy_dir_all(&self.unpacked_dir(), &staging) {
            let _ = fs::remove_dir_all(&staging);
            return Err(err);
        }
        if target.exists() {
            fs::remove_dir_all(&target)?;
        }
        fs::rename(&staging, &target)
    }

    fn cleanup_unpacked(&mut self) -> io::Result<()> {
        let dir = self.unpacked_dir();
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        Ok(())
    }
}

/// `scen12.fss` -> 12
fn scenario_id_of(file_name: &str) -> Option<i32> {
    file_name
        .strip_prefix("scen")?
        .strip_suffix(".fss")?
        .parse()
        .ok()
}

fn copy_dir_all(from: &Path, to: &Path) -> io::Result<()> {
    fs::create_dir_all(to)?;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let dest = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_all(&entry.path(), &dest)?;
        } else {
            fs::copy(entry.path(), &dest)?;
        }
    }
    Ok(())
}

/// Unmounts the campaign it mounted and remounts whatever was mounted
/// before, on every exit path.
struct MountGuard<'a, P: CampaignPackages + ?Sized> {
    packages: &'a mut P,
    previous: Option<String>,
    mounted: Option<String>,
}

impl<'a, P: CampaignPackages + ?Sized> MountGuard<'a, P> {
    fn mount(packages: &'a mut P, id: &str) -> io::Result<Self> {
        let previous = packages.mounted();
        if let Some(old) = &previous {
            packages.unmount(old);
        }
        let mut guard = Self {
            packages,
            previous,
            mounted: None,
        };
        guard.packages.mount(id)?;
        guard.mounted = Some(id.to_string());
        Ok(guard)
    }
}

impl<P: CampaignPackages + ?Sized> Drop for MountGuard<'_, P> {
    fn drop(&mut self) {
        if let Some(id) = self.mounted.take() {
            self.packages.unmount(&id);
        }
        if let Some(old) = self.previous.take() {
            if let Err(err) = self.packages.mount(&old) {
                log::warn!("could not remount campaign {old}: {err}");
            }
        }
    }
}

/// On-disk descriptor. Missing keys keep their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CampaignDescriptor {
    pub format_version: u32,
    pub title: String,
    pub version: String,
    pub first_level: i32,
    pub suggested_power: i32,
    pub authors: String,
    pub contributors: String,
    /// Lines joined by `\n`.
    pub description: String,
}

impl Default for CampaignDescriptor {
    fn default() -> Self {
        Self {
            format_version: DESCRIPTOR_FORMAT_VERSION,
            title: DEFAULT_CAMPAIGN_TITLE.to_string(),
            version: DEFAULT_CAMPAIGN_VERSION.to_string(),
            first_level: 1,
            suggested_power: 0,
            authors: String::new(),
            contributors: String::new(),
            description: DEFAULT_DESCRIPTION.to_string(),
        }
    }
}

/// Shared metadata of a scenario batch.
#[derive(Debug, Clone, Serialize)]
pub struct CampaignData {
    pub id: String,
    pub title: String,
    pub version: String,
    pub authors: String,
    pub contributors: String,
    pub description: Vec<String>,
    pub suggested_power: i32,
    pub first_level: i32,
    pub num_levels: usize,
    /// No rating source exists yet, so this stays 0.
    pub rating: f32,
    #[serde(skip)]
    pub icon: Option<Grid>,
}

impl CampaignData {
    pub fn new(id: impl Into<String>) -> Self {
        let mut data = Self {
            id: id.into(),
            title: String::new(),
            version: String::new(),
            authors: String::new(),
            contributors: String::new(),
            description: Vec::new(),
            suggested_power: 0,
            first_level: 1,
            num_levels: 0,
            rating: 0.0,
            icon: None,
        };
        data.apply(CampaignDescriptor::default());
        data
    }

    fn apply(&mut self, descriptor: CampaignDescriptor) {
        self.title = descriptor.title;
        self.version = descriptor.version;
        self.authors = descriptor.authors;
        self.contributors = descriptor.contributors;
        self.description = descriptor.description.split('\n').map(str::to_string).collect();
        self.suggested_power = descriptor.suggested_power;
        self.first_level = descriptor.first_level;
    }

    pub fn descriptor(&self) -> CampaignDescriptor {
        CampaignDescriptor {
            format_version: DESCRIPTOR_FORMAT_VERSION,
            title: self.title.clone(),
            version: self.version.clone(),
            first_level: self.first_level,
            suggested_power: self.suggested_power,
            authors: self.authors.clone(),
            contributors: self.contributors.clone(),
            description: self.description.join("\n"),
        }
    }

    /// Read the descriptor, icon and level count of this campaign. Whatever
    /// campaign was mounted before is mounted again afterwards.
    pub fn load<P: CampaignPackages + ?Sized>(&mut self, packages: &mut P) -> Result<(), CoreError> {
        let label = format!("campaign {}", self.id);
        let guard = MountGuard::mount(packages, &self.id)
            .map_err(|e| CoreError::from_stream(&label, &e))?;

        let bytes = guard
            .packages
            .read_file(DESCRIPTOR_FILE)
            .map_err(|e| CoreError::from_stream(&format!("{label}: {DESCRIPTOR_FILE}"), &e))?;
        let descriptor: CampaignDescriptor = serde_json::from_slice(&bytes).map_err(|e| {
            CoreError::format(format!("{label}: {DESCRIPTOR_FILE}: {e}"))
        })?;
        if descriptor.format_version != DESCRIPTOR_FORMAT_VERSION {
            log::warn!(
                "{label}: descriptor format_version {} (expected {DESCRIPTOR_FORMAT_VERSION})",
                descriptor.format_version
            );
        }

        let icon = match guard.packages.read_file(ICON_FILE) {
            Ok(bytes) => match Grid::parse(&bytes) {
                Ok(grid) => Some(grid),
                Err(err) => {
                    log::warn!("{label}: ignoring unreadable {ICON_FILE}: {err}");
                    None
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(err) => return Err(CoreError::from_stream(&format!("{label}: {ICON_FILE}"), &err)),
        };

        let levels = guard
            .packages
            .list_levels()
            .map_err(|e| CoreError::from_stream(&format!("{label}: levels"), &e))?;
        drop(guard);

        self.apply(descriptor);
        self.rating = 0.0;
        self.icon = icon;
        self.num_levels = levels.len();
        log::info!("loaded {label}: {} levels", self.num_levels);
        Ok(())
    }

    pub fn save<P: CampaignPackages + ?Sized>(&mut self, packages: &mut P) -> Result<(), CoreError> {
        let id = self.id.clone();
        self.save_as(packages, &id)
    }

    /// Rewrite the descriptor and repack the campaign under `new_id`. The
    /// unpacked working copy is removed whether or not this succeeds.
    pub fn save_as<P: CampaignPackages + ?Sized>(
        &mut self,
        packages: &mut P,
        new_id: &str,
    ) -> Result<(), CoreError> {
        if let Err(err) = packages.cleanup_unpacked() {
            log::warn!("could not clear unpacked campaign: {err}");
        }

        let result = self.repack_with_descriptor(packages, new_id);

        if let Err(err) = packages.cleanup_unpacked() {
            log::warn!("could not clear unpacked campaign: {err}");
        }

        result?;
        self.id = new_id.to_string();
        log::info!("campaign saved as {new_id}");
        Ok(())
    }

    fn repack_with_descriptor<P: CampaignPackages + ?Sized>(
        &self,
        packages: &mut P,
        new_id: &str,
    ) -> Result<(), CoreError> {
        let label = format!("campaign {}", self.id);
        packages
            .unpack(&self.id)
            .map_err(|e| CoreError::from_stream(&format!("{label}: unpack"), &e))?;

        let json = serde_json::to_vec_pretty(&self.descriptor())
            .map_err(|e| CoreError::format(format!("{label}: {DESCRIPTOR_FILE}: {e}")))?;
        packages
            .write_unpacked(DESCRIPTOR_FILE, &json)
            .map_err(|e| CoreError::from_stream(&format!("{label}: {DESCRIPTOR_FILE}"), &e))?;

        packages
            .repack(new_id)
            .map_err(|e| CoreError::from_stream(&format!("{label}: repack as {new_id}"), &e))
    }

    /// Line `index` of the description, empty past the end.
    pub fn description_line(&self, index: usize) -> &str {
        self.description.get(index).map_or("", String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_a_fresh_campaign() {
        let data = CampaignData::new("org.example.c");
        assert_eq!(data.title, "New Campaign");
        assert_eq!(data.version, "1.0");
        assert_eq!(data.first_level, 1);
        assert_eq!(data.description, vec!["No description.".to_string()]);
        assert_eq!(data.description_line(1), "");
    }

    #[test]
    fn descriptor_keeps_defaults_for_missing_keys() {
        let descriptor: CampaignDescriptor =
            serde_json::from_str(r#"{"title": "Moors", "description": "a\nb"}"#).unwrap();
        assert_eq!(descriptor.title, "Moors");
        assert_eq!(descriptor.version, "1.0");
        assert_eq!(descriptor.first_level, 1);

        let mut data = CampaignData::new("x");
        data.apply(descriptor);
        assert_eq!(data.description, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn scenario_ids_come_from_file_names() {
        assert_eq!(scenario_id_of("scen12.fss"), Some(12));
        assert_eq!(scenario_id_of("scen.fss"), None);
        assert_eq!(scenario_id_of("scen3.pix"), None);
    }
}
