use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Where scenario and grid files come from and go to.
pub trait LevelStore {
    fn read_scenario(&self, id: i32) -> io::Result<Vec<u8>>;
    fn read_grid(&self, file_name: &str) -> io::Result<Vec<u8>>;
    fn write_scenario(&mut self, id: i32, bytes: &[u8]) -> io::Result<()>;
    fn write_grid(&mut self, file_name: &str, bytes: &[u8]) -> io::Result<()>;
}

pub const SCENARIO_DIR: &str = "scen";
pub const GRID_DIR: &str = "pix";
pub const WORK_DIR: &str = "temp";

pub fn scenario_file_name(id: i32) -> String {
    format!("scen{id}.fss")
}

/// Files on disk. Reads search each root in order; writes land under the
/// write root.
///
/// `DirStore::new(root)` searches `<root>/temp` then `<root>` and writes to
/// `<root>/temp`, so edits shadow the shipped files without replacing them.
#[derive(Debug, Clone)]
pub struct DirStore {
    search_roots: Vec<PathBuf>,
    write_root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let work = root.join(WORK_DIR);
        Self {
            search_roots: vec![work.clone(), root.to_path_buf()],
            write_root: work,
        }
    }

    pub fn with_roots(search_roots: Vec<PathBuf>, write_root: PathBuf) -> Self {
        Self {
            search_roots,
            write_root,
        }
    }

    pub fn search_roots(&self) -> &[PathBuf] {
        &self.search_roots
    }

    pub fn write_root(&self) -> &Path {
        &self.write_root
    }

    /// First existing `<root>/<dir>/<name>` across the search roots.
    pub fn locate(&self, dir: &str, name: &str) -> Option<PathBuf> {
        self.search_roots
            .iter()
            .map(|root| root.join(dir).join(name))
            .find(|path| path.is_file())
    }

    fn read(&self, dir: &str, name: &str) -> io::Result<Vec<u8>> {
        match self.locate(dir, name) {
            Some(path) => {
                log::debug!("reading {}", path.display());
                fs::read(&path)
            }
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{dir}/{name} not found under {} root(s)", self.search_roots.len()),
            )),
        }
    }

    fn write(&self, dir: &str, name: &str, bytes: &[u8]) -> io::Result<()> {
        let path = self.write_root.join(dir).join(name);
        atomic_write(&path, bytes)?;
        log::debug!("wrote {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }
}

impl LevelStore for DirStore {
    fn read_scenario(&self, id: i32) -> io::Result<Vec<u8>> {
        self.read(SCENARIO_DIR, &scenario_file_name(id))
    }

    fn read_grid(&self, file_name: &str) -> io::Result<Vec<u8>> {
        self.read(GRID_DIR, file_name)
    }

    fn write_scenario(&mut self, id: i32, bytes: &[u8]) -> io::Result<()> {
        self.write(SCENARIO_DIR, &scenario_file_name(id), bytes)
    }

    fn write_grid(&mut self, file_name: &str, bytes: &[u8]) -> io::Result<()> {
        self.write(GRID_DIR, file_name, bytes)
    }
}

/// Write to `<path>.tmp`, sync, then rename over `path`. A failure before
/// the rename leaves any existing file untouched.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut tmp_name = path.as_os_str().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    let result = File::create(&tmp_path).and_then(|mut file| {
        file.write_all(bytes)?;
        file.sync_all()
    });
    if let Err(err) = result {
        let _ = fs::remove_file(&tmp_path);
        return Err(err);
    }
    fs::rename(&tmp_path, path)
}

/// Files held in memory, keyed the same way `DirStore` names them.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    scenarios: HashMap<i32, Vec<u8>>,
    grids: HashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_scenario(&mut self, id: i32, bytes: Vec<u8>) {
        self.scenarios.insert(id, bytes);
    }

    pub fn insert_grid(&mut self, file_name: impl Into<String>, bytes: Vec<u8>) {
        self.grids.insert(file_name.into(), bytes);
    }

    pub fn scenario(&self, id: i32) -> Option<&[u8]> {
        self.scenarios.get(&id).map(Vec::as_slice)
    }

    pub fn grid(&self, file_name: &str) -> Option<&[u8]> {
        self.grids.get(file_name).map(Vec::as_slice)
    }
}

fn missing(what: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, what.into())
}

impl LevelStore for MemoryStore {
    fn read_scenario(&self, id: i32) -> io::Result<Vec<u8>> {
        self.scenarios
            .get(&id)
            .cloned()
            .ok_or_else(|| missing(format!("scenario {id} not in store")))
    }

    fn read_grid(&self, file_name: &str) -> io::Result<Vec<u8>> {
        self.grids
            .get(file_name)
            .cloned()
            .ok_or_else(|| missing(format!("grid {file_name} not in store")))
    }

    fn write_scenario(&mut self, id: i32, bytes: &[u8]) -> io::Result<()> {
        self.scenarios.insert(id, bytes.to_vec());
        Ok(())
    }

    fn write_grid(&mut self, file_name: &str, bytes: &[u8]) -> io::Result<()> {
        self.grids.insert(file_name.to_string(), bytes.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::*;

    fn temp_root(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("fss_store_{name}_{nanos}"));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn atomic_write_replaces_and_leaves_no_tmp() {
        let root = temp_root("atomic");
        let path = root.join("nested/file.bin");
        atomic_write(&path, b"one").unwrap();
        atomic_write(&path, b"two").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"two");
        assert!(!root.join("nested/file.bin.tmp").exists());
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn work_dir_shadows_base_root() {
        let root = temp_root("shadow");
        fs::create_dir_all(root.join("scen")).unwrap();
        fs::write(root.join("scen/scen1.fss"), b"base").unwrap();

        let mut store = DirStore::new(&root);
        assert_eq!(store.read_scenario(1).unwrap(), b"base");

        store.write_scenario(1, b"edited").unwrap();
        assert_eq!(store.read_scenario(1).unwrap(), b"edited");
        assert_eq!(fs::read(root.join("scen/scen1.fss")).unwrap(), b"base");
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn missing_files_are_not_found() {
        let root = temp_root("missing");
        let store = DirStore::new(&root);
        let err = store.read_grid("nothing.pix").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        let _ = fs::remove_dir_all(&root);

        let err = MemoryStore::new().read_scenario(4).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
