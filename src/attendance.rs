/*
Asistencia: A daily attendance tracker and absence reporter for one class group.
Copyright (C) 2024 Asistencia contributors

This program is free software: you can redistribute it and/or modify
it under the terms of the GNU General Public License as published by
the Free Software Foundation, either version 3 of the License, or
(at your option) any later version.

This program is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
GNU General Public License for more details.

You should have received a copy of the GNU General Public License
along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/
use std::collections::BTreeMap;

use anyhow::Context;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    roster::{Roster, StudentId},
    storage::KeyValueStore,
};

/// Presence flag per student for one date. `true` means present.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttendanceMap(BTreeMap<StudentId, bool>);

impl AttendanceMap {
    /// Every roster id set to `value`, regardless of any previous state.
    pub fn filled(roster: &Roster, value: bool) -> Self {
        Self(roster.ids().map(|id| (id.clone(), value)).collect())
    }

    pub fn get(&self, id: &str) -> Option<bool> {
        self.0.get(id).copied()
    }

    /// A missing flag counts as absent for display.
    pub fn is_present(&self, id: &str) -> bool {
        self.get(id).unwrap_or(false)
    }

    pub fn is_absent(&self, id: &str) -> bool {
        self.get(id) == Some(false)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Inverts the flag of `id`; a missing flag becomes `true`.
    pub fn toggled(&self, id: &StudentId) -> Self {
        let mut next = self.clone();
        let flag = next.0.entry(id.clone()).or_insert(false);
        *flag = !*flag;
        next
    }
}

impl FromIterator<(StudentId, bool)> for AttendanceMap {
    fn from_iter<T: IntoIterator<Item = (StudentId, bool)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

pub fn snapshot_key(group: &str, date: NaiveDate) -> String {
    format!("attendance:{}:{}", group, date.format("%Y-%m-%d"))
}

/// Per-date attendance snapshots for one fixed group.
pub struct AttendanceStore {
    group: String,
    backend: Box<dyn KeyValueStore>,
}

impl AttendanceStore {
    pub fn new(group: impl Into<String>, backend: Box<dyn KeyValueStore>) -> Self {
        Self {
            group: group.into(),
            backend,
        }
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    /// Returns the stored snapshot for `date`, or everyone present when there is
    /// none or it cannot be read.
    pub fn load(&self, date: NaiveDate, roster: &Roster) -> AttendanceMap {
        let key = snapshot_key(&self.group, date);

        let raw = match self.backend.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("No snapshot under {}, defaulting to all present", key);
                return AttendanceMap::filled(roster, true);
            }
            Err(e) => {
                warn!("Could not read snapshot {}: {:#}", key, e);
                return AttendanceMap::filled(roster, true);
            }
        };

        match serde_json::from_str::<AttendanceMap>(&raw) {
            Ok(map) => map,
            Err(e) => {
                warn!("Ignoring malformed snapshot {}: {}", key, e);
                AttendanceMap::filled(roster, true)
            }
        }
    }

    pub fn save(&mut self, date: NaiveDate, map: &AttendanceMap) -> anyhow::Result<()> {
        let key = snapshot_key(&self.group, date);
        let value = serde_json::to_string(map).context("Failed to serialize attendance")?;
        self.backend
            .set(&key, value)
            .with_context(|| format!("Failed to persist snapshot {}", key))?;

        debug!("Saved {} flags under {}", map.len(), key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{roster::Student, storage::MemoryStore};

    fn roster() -> Roster {
        Roster::new(vec![
            Student { id: 1u64.into(), name: "Ana Gómez".into() },
            Student { id: 2u64.into(), name: "Luis Pérez".into() },
            Student { id: 3u64.into(), name: "Carla Ruiz".into() },
        ])
        .unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn store() -> AttendanceStore {
        AttendanceStore::new("4-2", Box::new(MemoryStore::default()))
    }

    #[test]
    fn key_uses_group_and_iso_date() {
        assert_eq!(snapshot_key("4-2", date("2024-03-05")), "attendance:4-2:2024-03-05");
    }

    #[test]
    fn missing_snapshot_means_everyone_present() {
        let roster = roster();
        let map = store().load(date("2024-03-15"), &roster);

        assert_eq!(map.len(), 3);
        assert!(roster.ids().all(|id| map.get(id.as_str()) == Some(true)));
    }

    #[test]
    fn save_then_load_returns_same_map() {
        let roster = roster();
        let mut store = store();
        let d = date("2024-03-15");
        let map = AttendanceMap::filled(&roster, true).toggled(&2u64.into());

        store.save(d, &map).unwrap();
        assert_eq!(store.load(d, &roster), map);
    }

    #[test]
    fn snapshots_for_different_dates_are_isolated() {
        let roster = roster();
        let mut store = store();
        let monday = date("2024-03-11");
        let tuesday = date("2024-03-12");

        let absent_all = AttendanceMap::filled(&roster, false);
        store.save(monday, &absent_all).unwrap();
        let tuesday_map = AttendanceMap::filled(&roster, true).toggled(&1u64.into());
        store.save(tuesday, &tuesday_map).unwrap();

        assert_eq!(store.load(monday, &roster), absent_all);
        assert_eq!(store.load(tuesday, &roster), tuesday_map);
    }

    #[test]
    fn malformed_snapshot_falls_back_to_default() {
        let roster = roster();
        let d = date("2024-03-15");
        let mut backend = MemoryStore::default();
        backend.set(&snapshot_key("4-2", d), "{\"1\": \"yes\"".to_string()).unwrap();
        let store = AttendanceStore::new("4-2", Box::new(backend));

        assert_eq!(store.load(d, &roster), AttendanceMap::filled(&roster, true));
    }

    #[test]
    fn snapshot_wire_format_is_plain_object() {
        let roster = roster();
        let map = AttendanceMap::filled(&roster, true).toggled(&3u64.into());
        let json = serde_json::to_value(&map).unwrap();

        assert_eq!(json, serde_json::json!({"1": true, "2": true, "3": false}));
    }

    #[test]
    fn toggle_flips_one_entry_and_is_an_involution() {
        let roster = roster();
        let map = AttendanceMap::filled(&roster, true);
        let id: StudentId = 2u64.into();

        let once = map.toggled(&id);
        assert_eq!(once.get("2"), Some(false));
        assert_eq!(once.get("1"), Some(true));
        assert_eq!(once.get("3"), Some(true));
        assert_eq!(once.toggled(&id), map);
    }

    #[test]
    fn toggle_of_missing_flag_marks_present() {
        let map: AttendanceMap = [(StudentId::from(1u64), false)].into_iter().collect();
        let next = map.toggled(&2u64.into());

        assert_eq!(next.get("2"), Some(true));
        assert!(!map.is_present("2"));
        assert!(!map.is_absent("2"));
    }

    #[test]
    fn filled_ignores_previous_contents() {
        let roster = roster();
        let map = AttendanceMap::filled(&roster, false);
        assert!(roster.ids().all(|id| map.is_absent(id.as_str())));
    }
}
