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
use std::{borrow::Borrow, collections::HashSet, fmt, path::Path};

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Stable identifier of a student. The roster file may use integers or strings,
/// both end up as the same string key used by the attendance snapshots.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "RawStudentId", into = "String")]
pub struct StudentId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawStudentId {
    Number(u64),
    Text(String),
}

impl From<RawStudentId> for StudentId {
    fn from(raw: RawStudentId) -> Self {
        match raw {
            RawStudentId::Number(n) => StudentId(n.to_string()),
            RawStudentId::Text(s) => StudentId(s),
        }
    }
}

impl From<StudentId> for String {
    fn from(id: StudentId) -> Self {
        id.0
    }
}

impl From<&str> for StudentId {
    fn from(s: &str) -> Self {
        StudentId(s.to_string())
    }
}

impl From<u64> for StudentId {
    fn from(n: u64) -> Self {
        StudentId(n.to_string())
    }
}

impl Borrow<str> for StudentId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl StudentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub name: String,
}

/// The fixed, ordered list of students of the group. Display order is roster order.
#[derive(Clone, Debug)]
pub struct Roster {
    students: Vec<Student>,
}

impl Roster {
    pub fn new(students: Vec<Student>) -> anyhow::Result<Self> {
        let mut seen = HashSet::new();
        for student in &students {
            if student.name.trim().is_empty() {
                return Err(anyhow!("Student {} has an empty name", student.id));
            }
            if !seen.insert(&student.id) {
                return Err(anyhow!("Duplicate student id {} in roster", student.id));
            }
        }

        Ok(Self { students })
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read roster from {}", path.display()))?;
        let students: Vec<Student> =
            serde_json::from_str(&content).context("Failed to parse roster into Vec<Student>")?;

        debug!("Loaded {} students from {}", students.len(), path.display());
        Self::new(students)
    }

    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn ids(&self) -> impl Iterator<Item = &StudentId> {
        self.students.iter().map(|s| &s.id)
    }

    pub fn len(&self) -> usize {
        self.students.len()
    }
}
