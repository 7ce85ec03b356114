use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::{BundleFiles, BundlePaths, CaRepository, StoredCa};
use crate::error::{CertDeskError, Result};
use crate::name::validate_name;

const CAS_DIRNAME: &str = "cas";
const CLIENTS_DIRNAME: &str = "clients";
const CA_KEY_FILENAME: &str = "ca.key";
const CA_CERT_FILENAME: &str = "ca.crt";
const SERIAL_FILENAME: &str = "ca.srl";
const CLIENT_KEY_FILENAME: &str = "client.key";
const CLIENT_CSR_FILENAME: &str = "client.csr";
const CLIENT_CERT_FILENAME: &str = "client.crt";
const CLIENT_P12_FILENAME: &str = "client.p12";
const STAGING_PREFIX: &str = ".staging-";

/// Stores CAs as directories under `<root>/cas` and bundles under `<root>/clients`.
///
/// CA and bundle directories appear under their final names only once every
/// file is on disk: files are written into a hidden staging directory which
/// is then renamed into place.
#[derive(Debug, Clone)]
pub struct FileRepository {
    root: PathBuf,
}

impl FileRepository {
    /// Opens (creating if needed) a repository rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let repository = FileRepository { root: root.into() };
        for dir in [repository.cas_dir(), repository.clients_dir()] {
            fs::create_dir_all(&dir).map_err(|e| {
                CertDeskError::store(&format!("creating {}", dir.display()), e)
            })?;
        }
        info!(root = %repository.root.display(), "opened certificate store");
        Ok(repository)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn cas_dir(&self) -> PathBuf {
        self.root.join(CAS_DIRNAME)
    }

    fn clients_dir(&self) -> PathBuf {
        self.root.join(CLIENTS_DIRNAME)
    }

    fn ca_dir(&self, name: &str) -> Result<PathBuf> {
        validate_name("CA name", name)?;
        Ok(self.cas_dir().join(name))
    }

    fn is_complete(dir: &Path) -> bool {
        dir.join(CA_KEY_FILENAME).is_file() && dir.join(CA_CERT_FILENAME).is_file()
    }
}

impl CaRepository for FileRepository {
    fn list_names(&self) -> Result<Vec<String>> {
        let cas_dir = self.cas_dir();
        let entries =
            fs::read_dir(&cas_dir).map_err(|e| CertDeskError::store("listing CAs", e))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| CertDeskError::store("listing CAs", e))?;
            if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            // Staging directories and anything not created through this store.
            if validate_name("CA name", &name).is_err() {
                continue;
            }
            if Self::is_complete(&entry.path()) {
                names.push(name);
            } else {
                debug!(ca = %name, "skipping incomplete CA directory");
            }
        }
        Ok(names)
    }

    fn load(&self, name: &str) -> Result<Option<StoredCa>> {
        let dir = self.ca_dir(name)?;
        if !Self::is_complete(&dir) {
            return Ok(None);
        }
        let read = |file: &str| {
            fs::read_to_string(dir.join(file))
                .map_err(|e| CertDeskError::store(&format!("reading {file} of CA {name}"), e))
        };
        Ok(Some(StoredCa {
            key_pem: read(CA_KEY_FILENAME)?,
            certificate_pem: read(CA_CERT_FILENAME)?,
        }))
    }

    fn insert(&self, name: &str, ca: &StoredCa) -> Result<()> {
        let final_dir = self.ca_dir(name)?;
        if final_dir.exists() {
            if Self::is_complete(&final_dir) {
                return Err(CertDeskError::AlreadyExists(name.to_string()));
            }
            return Err(CertDeskError::StoreError(format!(
                "directory for CA {name} exists but is incomplete"
            )));
        }

        let staging = staging_dir(&self.cas_dir(), name);
        let committed = commit_staged(&staging, &final_dir, |dir| {
            write_private(&dir.join(CA_KEY_FILENAME), ca.key_pem.as_bytes())?;
            fs::write(dir.join(CA_CERT_FILENAME), &ca.certificate_pem)?;
            fs::write(dir.join(SERIAL_FILENAME), "")
        });

        if let Err(e) = committed {
            if Self::is_complete(&final_dir) {
                return Err(CertDeskError::AlreadyExists(name.to_string()));
            }
            return Err(CertDeskError::store(&format!("persisting CA {name}"), e));
        }

        debug!(ca = %name, dir = %final_dir.display(), "persisted CA material");
        Ok(())
    }

    fn record_serial(&self, ca_name: &str, serial_hex: &str) -> Result<bool> {
        let dir = self.ca_dir(ca_name)?;
        if !Self::is_complete(&dir) {
            return Err(CertDeskError::NotFound(ca_name.to_string()));
        }

        let path = dir.join(SERIAL_FILENAME);
        let ledger = match fs::read_to_string(&path) {
            Ok(ledger) => ledger,
            Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
            Err(e) => return Err(CertDeskError::store(&format!("reading serial ledger of CA {ca_name}"), e)),
        };
        if ledger.lines().any(|line| line.trim() == serial_hex) {
            return Ok(false);
        }

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .and_then(|mut file| writeln!(file, "{serial_hex}").map(|()| file))
            .map_err(|e| CertDeskError::store(&format!("appending to serial ledger of CA {ca_name}"), e))?;
        file.flush()?;
        Ok(true)
    }

    fn store_bundle(&self, files: &BundleFiles<'_>) -> Result<Option<BundlePaths>> {
        validate_name("CA name", files.ca_name)?;
        validate_name("client name", files.client_name)?;
        if files.serial_hex.is_empty() || !files.serial_hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CertDeskError::InvalidInput(
                "serial must be hexadecimal".to_string(),
            ));
        }

        let ca_clients = self.clients_dir().join(files.ca_name);
        let directory = ca_clients.join(format!("{}-{}", files.client_name, files.serial_hex));
        let paths = BundlePaths {
            key: directory.join(CLIENT_KEY_FILENAME),
            csr: directory.join(CLIENT_CSR_FILENAME),
            certificate: directory.join(CLIENT_CERT_FILENAME),
            package: directory.join(CLIENT_P12_FILENAME),
            directory,
        };
        let context = format!(
            "writing bundle for {} under CA {}",
            files.client_name, files.ca_name
        );
        if paths.directory.exists() {
            return Err(CertDeskError::StoreError(format!(
                "{context}: {} already exists",
                paths.directory.display()
            )));
        }

        fs::create_dir_all(&ca_clients).map_err(|e| CertDeskError::store(&context, e))?;
        let staging = staging_dir(
            &ca_clients,
            &format!("{}-{}", files.client_name, files.serial_hex),
        );
        commit_staged(&staging, &paths.directory, |dir| {
            write_private(&dir.join(CLIENT_KEY_FILENAME), files.key_pem.as_bytes())?;
            fs::write(dir.join(CLIENT_CSR_FILENAME), files.csr_pem)?;
            fs::write(dir.join(CLIENT_CERT_FILENAME), files.certificate_pem)?;
            write_private(&dir.join(CLIENT_P12_FILENAME), files.package)
        })
        .map_err(|e| CertDeskError::store(&context, e))?;

        debug!(
            ca = %files.ca_name,
            client = %files.client_name,
            dir = %paths.directory.display(),
            "persisted client bundle"
        );
        Ok(Some(paths))
    }
}

fn staging_dir(parent: &Path, label: &str) -> PathBuf {
    parent.join(format!("{STAGING_PREFIX}{label}-{:016x}", rand::random::<u64>()))
}

/// Fills a fresh `staging` directory and renames it to `target`.
///
/// On any failure the staging directory is removed, so `target` either
/// appears complete or not at all.
fn commit_staged<F>(staging: &Path, target: &Path, fill: F) -> std::io::Result<()>
where
    F: FnOnce(&Path) -> std::io::Result<()>,
{
    fs::create_dir(staging)?;
    let result = fill(staging).and_then(|()| fs::rename(staging, target));
    if result.is_err() {
        if let Err(cleanup) = fs::remove_dir_all(staging) {
            warn!(
                dir = %staging.display(),
                error = %cleanup,
                "failed to remove staging directory"
            );
        }
    }
    result
}

/// Writes a file readable only by its owner (on unix).
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(contents)?;
    file.sync_all()
}
