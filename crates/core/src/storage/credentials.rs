#[cfg(not(target_arch = "wasm32"))]
use std::path::PathBuf;

use crate::errors::CoreError;
use crate::models::user::Credential;

/// Where the auth credential lives between runs.
pub trait CredentialStore: Send + Sync {
    /// The persisted credential, if any.
    fn load(&self) -> Result<Option<Credential>, CoreError>;

    fn save(&mut self, credential: &Credential) -> Result<(), CoreError>;

    /// Forget the credential. Clearing an empty store is not an error.
    fn clear(&mut self) -> Result<(), CoreError>;
}

/// Keeps the credential for the lifetime of the process only.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    credential: Option<Credential>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a credential already present, as if restored from a previous run.
    pub fn with_credential(credential: Credential) -> Self {
        Self {
            credential: Some(credential),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<Credential>, CoreError> {
        Ok(self.credential.clone())
    }

    fn save(&mut self, credential: &Credential) -> Result<(), CoreError> {
        self.credential = Some(credential.clone());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), CoreError> {
        self.credential = None;
        Ok(())
    }
}

/// Persists the credential as a JSON file (native only, not WASM).
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<Credential>, CoreError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let credential = serde_json::from_slice(&bytes).map_err(|e| {
            CoreError::Storage(format!(
                "corrupted credential file {}: {e}",
                self.path.display()
            ))
        })?;
        Ok(Some(credential))
    }

    fn save(&mut self, credential: &Credential) -> Result<(), CoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_vec_pretty(credential)
            .map_err(|e| CoreError::Storage(format!("failed to serialize credential: {e}")))?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), CoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
