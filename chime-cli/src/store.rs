use anyhow::{Context, Result};
use chime_core::{Alarm, AlarmId, AlarmStore};
use std::fs;
use std::path::PathBuf;

/// Alarm records persisted as pretty JSON at `~/.chime/alarms.json`.
///
/// Each operation re-reads the file, so concurrent short-lived invocations
/// see each other's writes; the last writer wins on a same-id race.
pub struct JsonAlarmStore {
    path: PathBuf,
}

impl JsonAlarmStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn open_default() -> Result<Self> {
        Ok(Self::new(crate::state::alarms_path()?))
    }

    fn read(&self) -> Result<Vec<Alarm>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let s = fs::read_to_string(&self.path)
            .with_context(|| format!("read {}", self.path.display()))?;
        if s.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&s).with_context(|| format!("parse {}", self.path.display()))
    }

    fn write(&self, alarms: &[Alarm]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(alarms)?;
        fs::write(&self.path, json).with_context(|| format!("write {}", self.path.display()))?;
        Ok(())
    }
}

impl AlarmStore for JsonAlarmStore {
    fn get(&self, id: AlarmId) -> Result<Option<Alarm>> {
        Ok(self.read()?.into_iter().find(|a| a.id == id))
    }

    fn put(&mut self, alarm: &Alarm) -> Result<AlarmId> {
        let mut alarms = self.read()?;
        let id = if alarm.id == 0 {
            alarms.iter().map(|a| a.id).max().unwrap_or(0) + 1
        } else {
            alarm.id
        };
        let mut stored = alarm.clone();
        stored.id = id;
        match alarms.iter_mut().find(|a| a.id == id) {
            Some(slot) => *slot = stored,
            None => alarms.push(stored),
        }
        self.write(&alarms)?;
        Ok(id)
    }

    fn delete(&mut self, id: AlarmId) -> Result<()> {
        let mut alarms = self.read()?;
        alarms.retain(|a| a.id != id);
        self.write(&alarms)
    }

    fn list_all(&self) -> Result<Vec<Alarm>> {
        let mut alarms = self.read()?;
        // Newest first, the listing order users see in the editor.
        alarms.sort_by(|a, b| b.created_at_utc.cmp(&a.created_at_utc));
        Ok(alarms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc, Weekday};

    fn store() -> (tempfile::TempDir, JsonAlarmStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonAlarmStore::new(dir.path().join("alarms.json"));
        (dir, store)
    }

    #[test]
    fn put_assigns_sequential_ids_to_drafts() {
        let (_dir, mut store) = store();
        let a = store.put(&Alarm::new(7, 0)).unwrap();
        let b = store.put(&Alarm::new(8, 0)).unwrap();
        assert_eq!((a, b), (1, 2));
    }

    #[test]
    fn round_trip_preserves_every_field() {
        let (_dir, mut store) = store();
        let alarm = Alarm::new(6, 45)
            .with_label("Gym")
            .with_repeat_days(&[Weekday::Tue, Weekday::Thu])
            .repeating()
            .disabled();
        let id = store.put(&alarm).unwrap();

        let mut expected = alarm;
        expected.id = id;
        assert_eq!(store.get(id).unwrap(), Some(expected));
    }

    #[test]
    fn put_with_existing_id_replaces_the_record() {
        let (_dir, mut store) = store();
        let id = store.put(&Alarm::new(7, 0).with_label("old")).unwrap();

        let mut updated = store.get(id).unwrap().unwrap();
        updated.label = "new".to_string();
        assert_eq!(store.put(&updated).unwrap(), id);

        let alarms = store.list_all().unwrap();
        assert_eq!(alarms.len(), 1);
        assert_eq!(alarms[0].label, "new");
    }

    #[test]
    fn delete_removes_only_the_given_id() {
        let (_dir, mut store) = store();
        let a = store.put(&Alarm::new(7, 0)).unwrap();
        let b = store.put(&Alarm::new(8, 0)).unwrap();
        store.delete(a).unwrap();
        assert_eq!(store.get(a).unwrap(), None);
        assert!(store.get(b).unwrap().is_some());
    }

    #[test]
    fn list_is_newest_first() {
        let (_dir, mut store) = store();
        let older = Alarm::new(7, 0)
            .with_created_at(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
        let newer = Alarm::new(8, 0)
            .with_created_at(Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap());
        store.put(&older).unwrap();
        store.put(&newer).unwrap();

        let hours: Vec<u32> = store.list_all().unwrap().iter().map(|a| a.hour).collect();
        assert_eq!(hours, vec![8, 7]);
    }
}
