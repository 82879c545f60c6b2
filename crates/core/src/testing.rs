//! In-memory backend and recording observer used by the engine tests

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use crate::entry::FileEntry;
use crate::error::{Error, Result};
use crate::sync::progress::{ItemAction, Progress, SyncEvent, SyncObserver, SyncState};
use crate::traits::Backend;

#[derive(Default)]
struct MemoryState {
    exists: bool,
    // None marks a folder
    entries: Vec<(String, Option<Vec<u8>>)>,
    failures: HashMap<String, u32>,
    calls: Vec<String>,
}

/// Backend keeping its container in memory, with injectable write failures
pub struct MemoryBackend {
    name: String,
    streaming: bool,
    state: Mutex<MemoryState>,
}

impl MemoryBackend {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            streaming: true,
            state: Mutex::new(MemoryState {
                exists: true,
                ..Default::default()
            }),
        }
    }

    pub fn with_file(self, name: &str, size: usize) -> Self {
        self.upsert(name, vec![b'x'; size]);
        self
    }

    pub fn with_folder(self, name: &str) -> Self {
        self.lock().entries.push((name.to_string(), None));
        self
    }

    pub fn missing(self) -> Self {
        self.lock().exists = false;
        self
    }

    pub fn without_streaming(mut self) -> Self {
        self.streaming = false;
        self
    }

    /// Make the next `count` writes or deletes of `name` fail
    pub fn fail_next(&self, name: &str, count: u32) {
        self.lock().failures.insert(name.to_string(), count);
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Files as (name, size), in listing order
    pub fn listing(&self) -> Vec<(String, usize)> {
        self.lock()
            .entries
            .iter()
            .filter_map(|(n, d)| d.as_ref().map(|d| (n.clone(), d.len())))
            .collect()
    }

    pub fn size_of(&self, name: &str) -> Option<usize> {
        self.listing()
            .into_iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap()
    }

    fn record(&self, call: String) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(call);
        if state.exists {
            Ok(())
        } else {
            Err(Error::FolderMissing(self.name.clone()))
        }
    }

    fn inject_failure(&self, name: &str) -> Result<()> {
        let mut state = self.lock();
        match state.failures.get_mut(name) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Err(Error::Response {
                    message: format!("Service error: SlowDown ({name})"),
                    status: Some(503),
                    body: Some("<Error><Code>SlowDown</Code></Error>".into()),
                })
            }
            _ => Ok(()),
        }
    }

    fn upsert(&self, name: &str, data: Vec<u8>) {
        let mut state = self.lock();
        match state.entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = Some(data),
            None => state.entries.push((name.to_string(), Some(data))),
        }
    }

    fn read(&self, name: &str) -> Result<Vec<u8>> {
        self.lock()
            .entries
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, d)| d.clone())
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    fn protocol(&self) -> &str {
        "memory"
    }

    fn display_name(&self) -> String {
        format!("memory://{}", self.name)
    }

    async fn list(&self) -> Result<Vec<FileEntry>> {
        self.record("list".into())?;
        Ok(self
            .lock()
            .entries
            .iter()
            .map(|(n, d)| match d {
                Some(d) => FileEntry::file(n.clone(), d.len() as i64),
                None => FileEntry::folder(n.clone()),
            })
            .collect())
    }

    async fn test(&self) -> Result<()> {
        self.record("test".into())
    }

    async fn create_folder(&self) -> Result<()> {
        let mut state = self.lock();
        state.calls.push("create_folder".into());
        state.exists = true;
        Ok(())
    }

    async fn get(&self, name: &str, local: &Path) -> Result<()> {
        self.record(format!("get:{name}"))?;
        std::fs::write(local, self.read(name)?)?;
        Ok(())
    }

    async fn put(&self, name: &str, local: &Path) -> Result<()> {
        self.record(format!("put:{name}"))?;
        self.inject_failure(name)?;
        self.upsert(name, std::fs::read(local)?);
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<()> {
        self.record(format!("delete:{name}"))?;
        self.inject_failure(name)?;
        let mut state = self.lock();
        let before = state.entries.len();
        state.entries.retain(|(n, d)| n != name || d.is_none());
        if state.entries.len() == before {
            return Err(Error::NotFound(name.to_string()));
        }
        Ok(())
    }

    fn supports_streaming(&self) -> bool {
        self.streaming
    }

    async fn get_bytes(&self, name: &str) -> Result<Bytes> {
        self.record(format!("get_bytes:{name}"))?;
        Ok(Bytes::from(self.read(name)?))
    }

    async fn put_bytes(&self, name: &str, data: Bytes) -> Result<()> {
        self.record(format!("put_bytes:{name}"))?;
        self.inject_failure(name)?;
        self.upsert(name, data.to_vec());
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum Recorded {
    State(SyncState),
    Started(ItemAction, u32, String, Progress),
    Failed(u32, String),
    Creating,
    Other,
}

/// Observer that keeps every event it sees
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<Recorded>>,
}

impl RecordingObserver {
    fn events(&self) -> Vec<Recorded> {
        self.events.lock().unwrap().clone()
    }

    pub fn states(&self) -> Vec<SyncState> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Recorded::State(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub fn started(&self) -> Vec<(ItemAction, u32, String)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Recorded::Started(action, attempt, name, _) => Some((action, attempt, name)),
                _ => None,
            })
            .collect()
    }

    pub fn progress(&self) -> Vec<Progress> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Recorded::Started(_, _, _, p) => Some(p),
                _ => None,
            })
            .collect()
    }

    pub fn failures(&self) -> Vec<(u32, String)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Recorded::Failed(attempt, name) => Some((attempt, name)),
                _ => None,
            })
            .collect()
    }

    pub fn saw_create(&self) -> bool {
        self.events()
            .iter()
            .any(|e| matches!(e, Recorded::Creating))
    }
}

impl SyncObserver for RecordingObserver {
    fn on_event(&self, event: &SyncEvent<'_>) {
        let recorded = match event {
            SyncEvent::StateChanged { to, .. } => Recorded::State(*to),
            SyncEvent::ItemStarted {
                action,
                attempt,
                entry,
                progress,
                ..
            } => Recorded::Started(*action, *attempt, entry.name.clone(), *progress),
            SyncEvent::AttemptFailed { attempt, entry, .. } => {
                Recorded::Failed(*attempt, entry.name.clone())
            }
            SyncEvent::CreatingDestination => Recorded::Creating,
            _ => Recorded::Other,
        };
        self.events.lock().unwrap().push(recorded);
    }
}
