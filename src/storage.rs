// Durable string key-value storage backing the persisted session.
use crate::context::AppContext;
use crate::error::{ClientError, ClientResult};
use anyhow::Result;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

// --- Android Specific Imports ---
#[cfg(target_os = "android")]
use std::collections::HashMap;
#[cfg(target_os = "android")]
use std::sync::OnceLock;

// --- Desktop Specific Imports ---
#[cfg(not(target_os = "android"))]
use fs2::FileExt;

/// Async string key-value store.
///
/// Values are UTF-8 strings; structured values are JSON-encoded by the
/// caller. A missing key is `Ok(None)`, never an error.
#[async_trait::async_trait]
pub trait KeyValueStore: Send + Sync + std::fmt::Debug {
    async fn get(&self, key: &str) -> ClientResult<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> ClientResult<()>;
    async fn remove(&self, key: &str) -> ClientResult<()>;

    /// Sets several keys in one write where the backend supports it.
    async fn set_many(&self, entries: &[(&str, &str)]) -> ClientResult<()> {
        for (key, value) in entries {
            self.set(key, value).await?;
        }
        Ok(())
    }

    async fn remove_many(&self, keys: &[&str]) -> ClientResult<()> {
        for key in keys {
            self.remove(key).await?;
        }
        Ok(())
    }
}

// --- File locking ---

#[cfg(target_os = "android")]
static ANDROID_FILE_LOCKS: OnceLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();

#[cfg(not(target_os = "android"))]
fn get_lock_path(file_path: &Path) -> PathBuf {
    let mut lock_path = file_path.to_path_buf();
    if let Some(ext) = lock_path.extension() {
        let mut ext = ext.to_os_string();
        ext.push(".lock");
        lock_path.set_extension(ext);
    } else {
        lock_path.set_extension("lock");
    }
    lock_path
}

/// Runs `f` while holding an exclusive lock on `file_path`.
#[cfg(not(target_os = "android"))]
pub fn with_lock<F, T>(file_path: &Path, f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let lock_path = get_lock_path(file_path);
    let file = fs::OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)?;

    file.lock_exclusive()?;
    let result = f();
    file.unlock()?;
    result
}

// Advisory file locks are unreliable in the Android sandbox; only this
// process touches the files there, so a per-path mutex is enough.
#[cfg(target_os = "android")]
pub fn with_lock<F, T>(file_path: &Path, f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    let map_mutex = ANDROID_FILE_LOCKS.get_or_init(|| Mutex::new(HashMap::new()));
    let key = file_path.canonicalize().unwrap_or(file_path.to_path_buf());

    let file_mutex = {
        let mut map = map_mutex.lock().unwrap_or_else(|e| e.into_inner());
        map.entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    };

    let _guard = file_mutex.lock().unwrap_or_else(|e| e.into_inner());
    f()
}

/// Atomic write: write to a .tmp sibling, then rename over the target.
pub fn atomic_write<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, contents: C) -> Result<()> {
    let path = path.as_ref();
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, contents)?;
    fs::rename(tmp_path, path)?;
    Ok(())
}

// --- File backend ---

type Entries = BTreeMap<String, String>;

/// Keeps every key in one JSON object on disk.
///
/// Each operation re-reads the file under the lock, so several processes
/// (the app and the terminal binary) see each other's writes.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The session file inside the context's data directory.
    pub fn for_context(ctx: &dyn AppContext) -> Result<Self> {
        Ok(Self::new(ctx.get_session_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(path: &Path) -> Result<Entries> {
        if !path.exists() {
            return Ok(Entries::new());
        }
        let json = fs::read_to_string(path)?;
        if json.trim().is_empty() {
            return Ok(Entries::new());
        }
        Ok(serde_json::from_str(&json)?)
    }

    fn write_entries(path: &Path, entries: &Entries) -> Result<()> {
        let json = serde_json::to_string_pretty(entries)?;
        atomic_write(path, json)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    async fn read(&self) -> ClientResult<Entries> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || with_lock(&path, || Self::read_entries(&path)))
            .await
            .map_err(|e| ClientError::StorageRead(e.to_string()))?
            .map_err(|e| ClientError::StorageRead(e.to_string()))
    }

    async fn update<F>(&self, f: F) -> ClientResult<()>
    where
        F: FnOnce(&mut Entries) + Send + 'static,
    {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            with_lock(&path, || {
                let mut entries = Self::read_entries(&path)?;
                f(&mut entries);
                Self::write_entries(&path, &entries)
            })
        })
        .await
        .map_err(|e| ClientError::StorageWrite(e.to_string()))?
        .map_err(|e| ClientError::StorageWrite(e.to_string()))
    }
}

#[async_trait::async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> ClientResult<Option<String>> {
        Ok(self.read().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> ClientResult<()> {
        let (key, value) = (key.to_string(), value.to_string());
        self.update(move |entries| {
            entries.insert(key, value);
        })
        .await
    }

    async fn remove(&self, key: &str) -> ClientResult<()> {
        let key = key.to_string();
        self.update(move |entries| {
            entries.remove(&key);
        })
        .await
    }

    async fn set_many(&self, pairs: &[(&str, &str)]) -> ClientResult<()> {
        let pairs: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.update(move |entries| entries.extend(pairs)).await
    }

    async fn remove_many(&self, keys: &[&str]) -> ClientResult<()> {
        let keys: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        self.update(move |entries| {
            for key in &keys {
                entries.remove(key);
            }
        })
        .await
    }
}

// --- In-memory backend ---

/// Process-local store for tests and sessions that should not outlive the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<Entries>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let entries = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            entries: Arc::new(Mutex::new(entries)),
        }
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait::async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> ClientResult<Option<String>> {
        Ok(self.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> ClientResult<()> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> ClientResult<()> {
        self.lock().remove(key);
        Ok(())
    }
}
