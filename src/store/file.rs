use std::{
    collections::BTreeMap,
    fs,
    io::Write,
    path::{Path, PathBuf},
    thread,
    time::Duration,
};

use crossbeam_channel::{bounded, select, unbounded, Receiver, Sender};
use log::{debug, warn};

use super::KvStore;
use crate::error::Result;

const DEBOUNCE: Duration = Duration::from_millis(150);

enum WriterMsg {
    Data(Vec<u8>),
    Flush(Sender<()>),
}

/// All records in one JSON object file.
///
/// Reads are served from memory. Writes serialize the whole map and hand it to
/// a debounced writer thread which replaces the file atomically.
pub struct FileStore {
    path: PathBuf,
    map: BTreeMap<String, String>,
    tx: Sender<WriterMsg>,
}

impl FileStore {
    /// Opens `path`. A missing, unreadable or malformed file yields an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let map = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!("storage file {:?} is malformed, starting empty: {}", path, e);
                BTreeMap::new()
            }),
            Err(e) => {
                debug!("storage file {:?} not read: {}", path, e);
                BTreeMap::new()
            }
        };
        let (tx, rx) = unbounded();
        spawn_writer(path.clone(), rx);
        Self { path, map, tx }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Blocks until every write issued so far is on disk.
    pub fn flush(&self) {
        let (ack_tx, ack_rx) = bounded(1);
        if self.tx.send(WriterMsg::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.recv();
        }
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.map.insert(key.to_string(), value);
        match serde_json::to_vec_pretty(&self.map) {
            Ok(bytes) => {
                if self.tx.send(WriterMsg::Data(bytes)).is_err() {
                    warn!("storage writer for {:?} is gone; {} not persisted", self.path, key);
                }
            }
            Err(e) => warn!("serialize storage: {}", e),
        }
    }
}

impl Drop for FileStore {
    fn drop(&mut self) {
        self.flush();
    }
}

fn spawn_writer(path: PathBuf, rx: Receiver<WriterMsg>) {
    thread::spawn(move || {
        let mut pending: Option<Vec<u8>> = None;
        while let Ok(msg) = rx.recv() {
            let mut acks = Vec::new();
            match msg {
                WriterMsg::Data(bytes) => pending = Some(bytes),
                WriterMsg::Flush(ack) => acks.push(ack),
            }
            // debounce window, cut short by a flush request
            while acks.is_empty() {
                let timeout = crossbeam_channel::after(DEBOUNCE);
                let more = select! {
                    recv(rx) -> msg => msg.ok(),
                    recv(timeout) -> _ => None,
                };
                match more {
                    Some(WriterMsg::Data(b)) => pending = Some(b),
                    Some(WriterMsg::Flush(ack)) => acks.push(ack),
                    None => break,
                }
            }
            if let Some(bytes) = pending.take() {
                if let Err(e) = atomic_write(&path, &bytes) {
                    warn!("write error for {:?}: {}", path, e);
                }
            }
            for ack in acks {
                let _ = ack.send(());
            }
        }
        if let Some(bytes) = pending.take() {
            if let Err(e) = atomic_write(&path, &bytes) {
                warn!("write error for {:?}: {}", path, e);
            }
        }
    });
}

fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let mut tmp = PathBuf::from(path);
    tmp.set_extension("tmp");
    let mut f = fs::File::create(&tmp)?;
    f.write_all(data)?;
    f.flush()?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = fs::set_permissions(&tmp, fs::Permissions::from_mode(0o644));
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_survive_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("storage.json");
        {
            let mut store = FileStore::open(&path);
            store.set("order", r#"["b_a","b_b"]"#.to_string());
            store.set("order", r#"["b_b","b_a"]"#.to_string());
            store.flush();
        }
        let store = FileStore::open(&path);
        assert_eq!(store.get("order").as_deref(), Some(r#"["b_b","b_a"]"#));
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn malformed_file_opens_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("storage.json");
        fs::write(&path, b"{not json").expect("write");
        let store = FileStore::open(&path);
        assert_eq!(store.get("order"), None);
    }
}
