//! Persisted user record and bearer-token lookup.
//!
//! The signed-in user is stored as a JSON object under the key `"user"`.
//! The token field may be named `token`, `accessToken` or `access_token`.

use std::sync::Mutex;

use serde::Deserialize;

/// Storage key of the signed-in user record.
pub const USER_KEY: &str = "user";

/// Error raised by a [`TokenStore`] backend.
#[derive(Debug, thiserror::Error)]
pub enum TokenStoreError {
    #[error("token store io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored user record is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("token store lock poisoned")]
    Poisoned,
}

#[derive(Debug, Deserialize)]
struct UserRecord {
    #[serde(default, alias = "accessToken", alias = "access_token")]
    token: Option<String>,
}

/// Local key/value storage for the signed-in user record.
pub trait TokenStore: Send + Sync {
    /// Returns the raw user record, or `None` if nobody is signed in.
    fn load_user(&self) -> Result<Option<String>, TokenStoreError>;

    /// Replaces the stored user record.
    fn save_user(&self, record: &str) -> Result<(), TokenStoreError>;

    /// Deletes the stored user record. Deleting a missing record is not an error.
    fn remove_user(&self) -> Result<(), TokenStoreError>;

    /// Extracts the bearer token from the stored record.
    ///
    /// A record without a token field, or with a blank one, yields `None`.
    fn load_token(&self) -> Result<Option<String>, TokenStoreError> {
        let Some(raw) = self.load_user()? else {
            return Ok(None);
        };
        let record: UserRecord = serde_json::from_str(&raw)?;
        Ok(record
            .token
            .map(|token| token.trim().to_owned())
            .filter(|token| !token.is_empty()))
    }
}

/// In-memory store; the record lives as long as the store.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    user: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds `record`.
    pub fn with_user(record: impl Into<String>) -> Self {
        Self {
            user: Mutex::new(Some(record.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load_user(&self) -> Result<Option<String>, TokenStoreError> {
        let user = self.user.lock().map_err(|_| TokenStoreError::Poisoned)?;
        Ok(user.clone())
    }

    fn save_user(&self, record: &str) -> Result<(), TokenStoreError> {
        let mut user = self.user.lock().map_err(|_| TokenStoreError::Poisoned)?;
        *user = Some(record.to_owned());
        Ok(())
    }

    fn remove_user(&self) -> Result<(), TokenStoreError> {
        let mut user = self.user.lock().map_err(|_| TokenStoreError::Poisoned)?;
        *user = None;
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileTokenStore;

#[cfg(not(target_arch = "wasm32"))]
mod file {
    use std::{
        fs, io,
        path::{Path, PathBuf},
    };

    use super::{TokenStore, TokenStoreError, USER_KEY};

    /// Stores the user record as `<dir>/user.json`.
    ///
    /// **Not available on `wasm32` targets.**
    #[derive(Clone, Debug)]
    pub struct FileTokenStore {
        dir: PathBuf,
    }

    impl FileTokenStore {
        pub fn new(dir: impl Into<PathBuf>) -> Self {
            Self { dir: dir.into() }
        }

        pub fn path(&self) -> PathBuf {
            self.dir.join(format!("{USER_KEY}.json"))
        }

        pub fn dir(&self) -> &Path {
            &self.dir
        }
    }

    impl TokenStore for FileTokenStore {
        fn load_user(&self) -> Result<Option<String>, TokenStoreError> {
            match fs::read_to_string(self.path()) {
                Ok(raw) => Ok(Some(raw)),
                Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
                Err(err) => Err(err.into()),
            }
        }

        fn save_user(&self, record: &str) -> Result<(), TokenStoreError> {
            fs::create_dir_all(&self.dir)?;
            fs::write(self.path(), record)?;
            Ok(())
        }

        fn remove_user(&self) -> Result<(), TokenStoreError> {
            match fs::remove_file(self.path()) {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(err) => Err(err.into()),
            }
        }
    }
}
