//! Plain-text identity persistence.
//!
//! The file holds `KEY=VALUE` lines, the same shape as a dotenv file:
//!
//! ```text
//! PRIVATE_KEY=0x…
//! ADDRESS=0x…
//! ```
//!
//! Lookups follow dotenv precedence: a variable set in the process
//! environment wins over the same key in the file.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::account::identity::Identity;
use crate::account::{AccountError, AccountResult};

pub const PRIVATE_KEY_FIELD: &str = "PRIVATE_KEY";
pub const ADDRESS_FIELD: &str = "ADDRESS";

/// Raw persisted identity fields, before key parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredIdentity {
    pub private_key: String,
    pub address: Option<String>,
}

/// Environment variable lookup consulted before the file.
pub type EnvLookup = fn(&str) -> Option<String>;

fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Reads and writes the identity file.
#[derive(Debug, Clone)]
pub struct IdentityStore {
    path: PathBuf,
    env: EnvLookup,
}

impl IdentityStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            env: process_env,
        }
    }

    /// Replace the process environment lookup.
    pub fn with_env(mut self, env: EnvLookup) -> Self {
        self.env = env;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Value of `key`, from the environment first, then the file.
    pub fn lookup(&self, key: &str) -> AccountResult<Option<String>> {
        if let Some(value) = self.env_value(key) {
            return Ok(Some(value));
        }
        Ok(self
            .read_fields()?
            .and_then(|mut fields| fields.remove(key))
            .filter(|v| !v.is_empty()))
    }

    /// Load the identity, or `None` when neither the environment nor a file
    /// provides one.
    pub fn load(&self) -> AccountResult<Option<StoredIdentity>> {
        let mut fields = self.read_fields()?;
        let mut field = |key: &str| {
            self.env_value(key).or_else(|| {
                fields
                    .as_mut()
                    .and_then(|f| f.remove(key))
                    .filter(|v| !v.is_empty())
            })
        };
        let private_key = field(PRIVATE_KEY_FIELD);
        let address = field(ADDRESS_FIELD);

        match private_key {
            Some(private_key) => Ok(Some(StoredIdentity {
                private_key,
                address,
            })),
            None if fields.is_some() => Err(AccountError::MissingField {
                path: self.path.clone(),
                field: PRIVATE_KEY_FIELD,
            }),
            None => Ok(None),
        }
    }

    fn env_value(&self, key: &str) -> Option<String> {
        (self.env)(key).filter(|v| !v.trim().is_empty())
    }

    /// Parsed file contents, `None` when the file does not exist.
    fn read_fields(&self) -> AccountResult<Option<HashMap<String, String>>> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(parse_fields(&content))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AccountError::Io(e)),
        }
    }

    /// Persist an identity. Refuses to overwrite an existing file.
    pub fn save(&self, identity: &Identity) -> AccountResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(0o600))?;
        }

        writeln!(file, "{}={}", PRIVATE_KEY_FIELD, identity.private_key_hex())?;
        writeln!(file, "{}={}", ADDRESS_FIELD, identity.address())?;
        file.sync_all()?;
        Ok(())
    }
}

fn parse_fields(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let line = line.strip_prefix("export ").unwrap_or(line);
            let (key, value) = line.split_once('=')?;
            let value = value.trim().trim_matches('"').trim_matches('\'');
            Some((key.trim().to_string(), value.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENV_KEY: &str = "0x9bf49a6a0755f953811fce125f2683d50429c3bb49e074147e0089a52eae155f";

    fn empty_env(_: &str) -> Option<String> {
        None
    }

    fn exported_key(key: &str) -> Option<String> {
        match key {
            PRIVATE_KEY_FIELD => Some(ENV_KEY.to_string()),
            "APTOS_NETWORK" => Some("testnet".to_string()),
            _ => None,
        }
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = IdentityStore::new(dir.path().join(".env")).with_env(empty_env);
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_environment_wins_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        fs::write(&path, "PRIVATE_KEY=0x01\nAPTOS_NETWORK=devnet\n").unwrap();
        let store = IdentityStore::new(&path).with_env(exported_key);

        let stored = store.load().unwrap().unwrap();
        assert_eq!(stored.private_key, ENV_KEY);
        assert_eq!(stored.address, None);
        assert_eq!(store.lookup("APTOS_NETWORK").unwrap().as_deref(), Some("testnet"));
    }

    #[test]
    fn test_environment_alone_provides_identity() {
        let dir = tempfile::tempdir().unwrap();
        let store = IdentityStore::new(dir.path().join(".env")).with_env(exported_key);
        assert_eq!(store.load().unwrap().unwrap().private_key, ENV_KEY);
    }

    #[test]
    fn test_lookup_falls_back_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        fs::write(&path, "APTOS_NETWORK=local\n").unwrap();
        let store = IdentityStore::new(&path).with_env(empty_env);

        assert_eq!(store.lookup("APTOS_NETWORK").unwrap().as_deref(), Some("local"));
        assert_eq!(store.lookup("MISSING").unwrap(), None);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = IdentityStore::new(dir.path().join("nested").join(".env")).with_env(empty_env);
        let identity = Identity::generate();

        store.save(&identity).unwrap();
        let stored = store.load().unwrap().unwrap();

        assert_eq!(stored.private_key, identity.private_key_hex());
        assert_eq!(stored.address, Some(identity.address().to_string()));
    }

    #[test]
    fn test_save_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = IdentityStore::new(dir.path().join(".env"));
        store.save(&Identity::generate()).unwrap();
        assert!(matches!(store.save(&Identity::generate()), Err(AccountError::Io(_))));
    }

    #[test]
    fn test_parse_tolerates_dotenv_noise() {
        let fields = parse_fields(
            "# generated\n\nexport PRIVATE_KEY=\"0xabc\"\nADDRESS = '0x1'\nAPTOS_NETWORK=devnet\n",
        );
        assert_eq!(fields.get("PRIVATE_KEY").map(String::as_str), Some("0xabc"));
        assert_eq!(fields.get("ADDRESS").map(String::as_str), Some("0x1"));
        assert_eq!(fields.get("APTOS_NETWORK").map(String::as_str), Some("devnet"));
    }

    #[test]
    fn test_missing_private_key_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        fs::write(&path, "ADDRESS=0x1\n").unwrap();

        let result = IdentityStore::new(&path).with_env(empty_env).load();
        assert!(matches!(
            result,
            Err(AccountError::MissingField { field: PRIVATE_KEY_FIELD, .. })
        ));
    }
}
