//! File-backed directory storage.
//!
//! Layout under the root directory:
//!
//! ```text
//! blobs/<hash>        raw blob bytes
//! infra/<hash>.rec    one framed record per lookup
//! deploy/<hash>.rec
//! dev/<hash>.rec
//! ```
//!
//! `<hash>` is the hex BLAKE3 digest of the blob key or of the lookup's
//! canonical encoding. Record files are framed as:
//!
//! ```text
//! [4 bytes: CRC32 of payload (little-endian u32)]
//! [N bytes: payload (bincode-serialized record)]
//! ```
//!
//! Every write goes to a temporary file in the target directory and is
//! renamed into place, so readers see either the old or the new file and a
//! failed write leaves the previous record intact.

use std::fs::{self, File};
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use hangar_types::{Deploy, DeployLookup, Dev, DevLookup, Entity, Infra, InfraLookup, Lookup};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::blob::{validate_key, BlobData};
use crate::config::FileBackendConfig;
use crate::error::{StoreError, StoreResult};
use crate::identity::{assign_id, PutOutcome};
use crate::traits::Backend;

const BLOB_DIR: &str = "blobs";
const RECORD_EXT: &str = "rec";
/// CRC32 prefix of a record file.
const HEADER_SIZE: usize = 4;

/// Directory backend persisting each record and blob as its own file.
///
/// Puts are serialized per record class by a mutex; gets read without
/// locking since files are only ever replaced by rename.
pub struct FileBackend {
    root: PathBuf,
    sync: bool,
    infra_lock: Mutex<()>,
    deploy_lock: Mutex<()>,
    dev_lock: Mutex<()>,
}

impl FileBackend {
    /// Open (or create) a backend rooted at `config.root`.
    pub fn open(config: &FileBackendConfig) -> StoreResult<Self> {
        let root = config.root.clone();
        for dir in [BLOB_DIR, InfraLookup::KIND, DeployLookup::KIND, DevLookup::KIND] {
            fs::create_dir_all(root.join(dir))?;
        }
        debug!(root = %root.display(), sync = config.sync, "opened file backend");
        Ok(Self {
            root,
            sync: config.sync,
            infra_lock: Mutex::new(()),
            deploy_lock: Mutex::new(()),
            dev_lock: Mutex::new(()),
        })
    }

    /// Open a backend at `root` with default settings.
    pub fn open_dir(root: impl Into<PathBuf>) -> StoreResult<Self> {
        Self::open(&FileBackendConfig::new(root))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file holding the record for `lookup`.
    pub fn record_path<L: Lookup>(&self, lookup: &L) -> PathBuf {
        let digest = blake3::hash(&lookup.canonical_bytes());
        self.root
            .join(L::KIND)
            .join(format!("{}.{RECORD_EXT}", hex::encode(digest.as_bytes())))
    }

    /// Path of the file holding the blob stored under `key`.
    pub fn blob_path(&self, key: &str) -> PathBuf {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"hangar-blob-v1:");
        hasher.update(key.as_bytes());
        self.root
            .join(BLOB_DIR)
            .join(hex::encode(hasher.finalize().as_bytes()))
    }

    fn get_record<E: Entity>(&self, lookup: &E::Lookup) -> StoreResult<Option<E>> {
        lookup.validate()?;
        read_record(&self.record_path(lookup), lookup)
    }

    fn put_record<E: Entity>(&self, lock: &Mutex<()>, record: E) -> StoreResult<E> {
        record.lookup().validate()?;
        let path = self.record_path(record.lookup());

        let _guard = lock.lock()?;
        let existing: Option<E> = read_record(&path, record.lookup())?;
        let (record, outcome) = assign_id(existing.as_ref(), record)?;
        self.write_atomic(&path, &encode_record(&record)?)?;

        debug!(
            kind = E::kind(),
            lookup = %record.lookup(),
            id = ?record.id(),
            created = outcome == PutOutcome::Created,
            "stored record"
        );
        Ok(record)
    }

    fn delete_record<L: Lookup>(&self, lock: &Mutex<()>, lookup: &L) -> StoreResult<()> {
        lookup.validate()?;
        let path = self.record_path(lookup);

        let _guard = lock.lock()?;
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(kind = L::KIND, %lookup, "deleted record");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write `bytes` to a temp file beside `path`, then rename over `path`.
    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> StoreResult<()> {
        let mut tmp = self.temp_beside(path)?;
        tmp.write_all(bytes)?;
        self.finish(tmp, path)
    }

    fn temp_beside(&self, path: &Path) -> StoreResult<NamedTempFile> {
        let dir = path.parent().unwrap_or(&self.root);
        Ok(NamedTempFile::new_in(dir)?)
    }

    fn finish(&self, mut tmp: NamedTempFile, path: &Path) -> StoreResult<()> {
        tmp.flush()?;
        if self.sync {
            tmp.as_file().sync_all()?;
        }
        tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }
}

impl Backend for FileBackend {
    fn get_blob(&self, key: &str) -> StoreResult<Option<BlobData>> {
        validate_key(key)?;
        match File::open(self.blob_path(key)) {
            Ok(file) => Ok(Some(BlobData::new(key, BufReader::new(file)))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put_blob(&self, key: &str, data: &mut dyn Read) -> StoreResult<()> {
        validate_key(key)?;
        let path = self.blob_path(key);
        let mut tmp = self.temp_beside(&path)?;
        let len = io::copy(data, &mut tmp)?;
        self.finish(tmp, &path)?;
        debug!(key, len, "stored blob");
        Ok(())
    }

    fn get_infra(&self, lookup: &InfraLookup) -> StoreResult<Option<Infra>> {
        self.get_record(lookup)
    }

    fn put_infra(&self, infra: Infra) -> StoreResult<Infra> {
        self.put_record(&self.infra_lock, infra)
    }

    fn get_deploy(&self, lookup: &DeployLookup) -> StoreResult<Option<Deploy>> {
        self.get_record(lookup)
    }

    fn put_deploy(&self, deploy: Deploy) -> StoreResult<Deploy> {
        self.put_record(&self.deploy_lock, deploy)
    }

    fn get_dev(&self, lookup: &DevLookup) -> StoreResult<Option<Dev>> {
        self.get_record(lookup)
    }

    fn put_dev(&self, dev: Dev) -> StoreResult<Dev> {
        self.put_record(&self.dev_lock, dev)
    }

    fn delete_dev(&self, lookup: &DevLookup) -> StoreResult<()> {
        self.delete_record(&self.dev_lock, lookup)
    }
}

impl std::fmt::Debug for FileBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileBackend")
            .field("root", &self.root)
            .field("sync", &self.sync)
            .finish()
    }
}

fn encode_record<E: Entity>(record: &E) -> StoreResult<Vec<u8>> {
    let payload =
        bincode::serialize(record).map_err(|e| StoreError::Serialization(e.to_string()))?;
    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
    out.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    out.extend_from_slice(&payload);
    Ok(out)
}

fn decode_record<E: Entity>(path: &Path, bytes: &[u8]) -> StoreResult<E> {
    let corrupt = |reason: String| {
        warn!(path = %path.display(), %reason, "corrupt record file");
        StoreError::Corrupt {
            location: path.display().to_string(),
            reason,
        }
    };

    if bytes.len() < HEADER_SIZE {
        return Err(corrupt(format!("truncated header ({} bytes)", bytes.len())));
    }
    let (header, payload) = bytes.split_at(HEADER_SIZE);
    let expected = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
    let actual = crc32fast::hash(payload);
    if expected != actual {
        return Err(corrupt(format!(
            "CRC mismatch: expected {expected:#010x}, got {actual:#010x}"
        )));
    }
    bincode::deserialize(payload).map_err(|e| corrupt(format!("undecodable payload: {e}")))
}

/// Read the record at `path`, or `None` if the file does not exist.
fn read_record<E: Entity>(path: &Path, lookup: &E::Lookup) -> StoreResult<Option<E>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let record: E = decode_record(path, &bytes)?;
    if record.lookup() != lookup {
        return Err(StoreError::Corrupt {
            location: path.display().to_string(),
            reason: format!("file holds {} but {lookup} was requested", record.lookup()),
        });
    }
    Ok(Some(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conformance;
    use hangar_types::{DeployState, InfraState};

    fn open_temp() -> (tempfile::TempDir, FileBackend) {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::open_dir(dir.path()).unwrap();
        (dir, backend)
    }

    // -----------------------------------------------------------------------
    // Conformance
    // -----------------------------------------------------------------------

    #[test]
    fn passes_conformance_suite() {
        let (_dir, backend) = open_temp();
        conformance::check_backend(&backend);
    }

    #[test]
    fn passes_conformance_suite_without_sync() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = FileBackendConfig::new(dir.path());
        config.sync = false;
        let backend = FileBackend::open(&config).unwrap();
        conformance::check_backend(&backend);
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    #[test]
    fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let lookup = InfraLookup::new("aws").with_foundation("consul");
        let stored = {
            let backend = FileBackend::open_dir(dir.path()).unwrap();
            backend
                .put_infra(
                    Infra::new(lookup.clone())
                        .with_state(InfraState::Ready)
                        .with_output("addr", "10.0.0.1"),
                )
                .unwrap()
        };

        let reopened = FileBackend::open_dir(dir.path()).unwrap();
        assert_eq!(reopened.get_infra(&lookup).unwrap(), Some(stored.clone()));

        // Update after reopen keeps the original id.
        let updated = reopened
            .put_infra(Infra::new(lookup.clone()).with_state(InfraState::Partial))
            .unwrap();
        assert_eq!(updated.id, stored.id);
    }

    #[test]
    fn blobs_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        FileBackend::open_dir(dir.path())
            .unwrap()
            .put_blob_bytes("artifact", b"contents")
            .unwrap();
        let reopened = FileBackend::open_dir(dir.path()).unwrap();
        let blob = reopened.get_blob("artifact").unwrap().expect("present");
        assert_eq!(blob.read_to_vec().unwrap(), b"contents");
    }

    #[test]
    fn layout_places_records_by_kind() {
        let (dir, backend) = open_temp();
        let lookup = DeployLookup::new("app", "aws", "simple");
        backend.put_deploy(Deploy::new(lookup.clone())).unwrap();

        let path = backend.record_path(&lookup);
        assert!(path.starts_with(dir.path().join("deploy")));
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("rec"));
        assert!(path.exists());
    }

    #[test]
    fn no_temp_files_left_behind() {
        let (dir, backend) = open_temp();
        backend.put_dev(Dev::new(DevLookup::new("a"))).unwrap();
        backend.put_blob_bytes("b", b"x").unwrap();
        for sub in ["dev", "blobs"] {
            let names: Vec<_> = fs::read_dir(dir.path().join(sub))
                .unwrap()
                .map(|e| e.unwrap().file_name())
                .collect();
            assert_eq!(names.len(), 1, "unexpected files in {sub}: {names:?}");
        }
    }

    #[test]
    fn large_blob_streams() {
        let (_dir, backend) = open_temp();
        let data: Vec<u8> = (0..256 * 1024).map(|i| (i % 251) as u8).collect();
        backend.put_blob("large", &mut data.as_slice()).unwrap();
        let mut blob = backend.get_blob("large").unwrap().expect("present");
        let mut first = [0u8; 4];
        blob.read_exact(&mut first).unwrap();
        assert_eq!(first, [0, 1, 2, 3]);
        blob.close();
        let all = backend.get_blob("large").unwrap().unwrap().read_to_vec().unwrap();
        assert_eq!(all, data);
    }

    // -----------------------------------------------------------------------
    // Corruption is a fault, not an absence
    // -----------------------------------------------------------------------

    #[test]
    fn crc_mismatch_is_reported() {
        let (_dir, backend) = open_temp();
        let lookup = DevLookup::new("app");
        backend.put_dev(Dev::new(lookup.clone())).unwrap();

        let path = backend.record_path(&lookup);
        let mut bytes = fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        fs::write(&path, bytes).unwrap();

        let err = backend.get_dev(&lookup).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }), "got {err}");
    }

    #[test]
    fn truncated_record_is_reported() {
        let (_dir, backend) = open_temp();
        let lookup = DevLookup::new("app");
        backend.put_dev(Dev::new(lookup.clone())).unwrap();
        fs::write(backend.record_path(&lookup), [0u8; 2]).unwrap();

        assert!(matches!(
            backend.get_dev(&lookup),
            Err(StoreError::Corrupt { .. })
        ));
        // A put over a corrupt record fails instead of minting a second id.
        assert!(backend.put_dev(Dev::new(lookup)).is_err());
    }

    #[test]
    fn misplaced_record_is_reported() {
        let (_dir, backend) = open_temp();
        let a = DeployLookup::new("a", "aws", "simple");
        let b = DeployLookup::new("b", "aws", "simple");
        backend
            .put_deploy(Deploy::new(a.clone()).with_state(DeployState::Deployed))
            .unwrap();
        fs::copy(backend.record_path(&a), backend.record_path(&b)).unwrap();

        assert!(matches!(
            backend.get_deploy(&b),
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn encode_decode_preserves_record() {
        let mut deploy = Deploy::new(DeployLookup::new("app", "aws", "simple"))
            .with_state(DeployState::Deployed);
        deploy.deploy_id = Some("d-123".into());
        deploy.opaque = vec![9, 8, 7];
        let bytes = encode_record(&deploy).unwrap();
        let decoded: Deploy = decode_record(Path::new("mem"), &bytes).unwrap();
        assert_eq!(decoded, deploy);
    }
}
