use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use parking_lot::Mutex;

/// Fixed key of the one durable slot that holds the bearer token.
pub const TOKEN_STORAGE_KEY: &str = "campus_portal.token";

/// Durable client storage for the bearer token. Only `SessionStore` writes it.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<Option<String>>;
    fn save(&self, token: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Token slot backed by a single file named after `TOKEN_STORAGE_KEY`.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self { path: dir.as_ref().join(TOKEN_STORAGE_KEY) }
    }

    pub fn path(&self) -> &Path { &self.path }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() { return Ok(None); }
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading token slot {}", self.path.display()))?;
        let tok = raw.trim();
        if tok.is_empty() { Ok(None) } else { Ok(Some(tok.to_string())) }
    }

    fn save(&self, token: &str) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir).with_context(|| format!("creating token dir {}", dir.display()))?;
        }
        // write-then-rename so a crash never leaves a half token behind
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, token).with_context(|| format!("writing {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path).with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("removing {}", self.path.display())),
        }
    }
}

#[derive(Default)]
pub struct MemoryTokenStore {
    slot: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self { Self::default() }

    pub fn with_token<S: Into<String>>(token: S) -> Self {
        Self { slot: Mutex::new(Some(token.into())) }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<String>> { Ok(self.slot.lock().clone()) }
    fn save(&self, token: &str) -> Result<()> {
        *self.slot.lock() = Some(token.to_string());
        Ok(())
    }
    fn clear(&self) -> Result<()> {
        *self.slot.lock() = None;
        Ok(())
    }
}
