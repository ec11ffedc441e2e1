use anyhow::{Context, Result};
use chime_core::{AlarmId, WakeupError, WakeupRequest, WakeupService};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::PathBuf;

/// File-backed registration table standing in for the OS wake-up service.
///
/// At most one registration per alarm id, persisted at
/// `~/.chime/wakeups.json`. `dispatch`/`watch` consume due entries and
/// route them through the lifecycle controller; registrations never fire
/// early, only at-or-after their instant.
pub struct FileWakeupService {
    path: PathBuf,
}

impl FileWakeupService {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn open_default() -> Result<Self> {
        Ok(Self::new(crate::state::wakeups_path()?))
    }

    fn read_table(&self) -> Result<BTreeMap<AlarmId, WakeupRequest>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let s = fs::read_to_string(&self.path)
            .with_context(|| format!("read {}", self.path.display()))?;
        if s.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&s).with_context(|| format!("parse {}", self.path.display()))
    }

    fn write_table(&self, table: &BTreeMap<AlarmId, WakeupRequest>) -> Result<(), WakeupError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(map_io)?;
        }
        let json =
            serde_json::to_string_pretty(table).map_err(|e| WakeupError::Backend(e.into()))?;
        fs::write(&self.path, json).map_err(map_io)
    }

    /// All pending registrations, soonest first.
    pub fn registrations(&self) -> Result<Vec<WakeupRequest>> {
        let mut regs: Vec<WakeupRequest> = self.read_table()?.into_values().collect();
        regs.sort_by_key(|r| r.due_at_utc);
        Ok(regs)
    }

    pub fn next_due(&self) -> Result<Option<WakeupRequest>> {
        Ok(self.registrations()?.into_iter().next())
    }

    /// Remove and return every registration whose instant has elapsed,
    /// soonest first. Firing a one-shot registration consumes it.
    pub fn take_due(&mut self, now_utc: DateTime<Utc>) -> Result<Vec<WakeupRequest>> {
        let mut table = self.read_table()?;
        let due_ids: Vec<AlarmId> = table
            .values()
            .filter(|r| r.due_at_utc <= now_utc)
            .map(|r| r.alarm_id)
            .collect();
        if due_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut due: Vec<WakeupRequest> =
            due_ids.iter().filter_map(|id| table.remove(id)).collect();
        due.sort_by_key(|r| r.due_at_utc);
        self.write_table(&table).map_err(anyhow::Error::from)?;
        Ok(due)
    }
}

fn map_io(err: io::Error) -> WakeupError {
    if err.kind() == io::ErrorKind::PermissionDenied {
        WakeupError::PermissionDenied
    } else {
        WakeupError::Backend(err.into())
    }
}

impl WakeupService for FileWakeupService {
    fn register_one_shot(&mut self, request: WakeupRequest) -> Result<(), WakeupError> {
        let mut table = self.read_table()?;
        table.insert(request.alarm_id, request);
        self.write_table(&table)
    }

    fn cancel(&mut self, alarm_id: AlarmId) -> Result<(), WakeupError> {
        let mut table = self.read_table()?;
        if table.remove(&alarm_id).is_some() {
            self.write_table(&table)?;
        }
        Ok(())
    }
}
