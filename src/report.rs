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
use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::{
    attendance::AttendanceMap,
    roster::{Roster, Student},
};

pub const NO_ABSENTEES: &str = "No hay ausentes.";

/// The text handed to the email template as `{{subject}}` and `{{body}}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Report {
    pub subject: String,
    pub body: String,
}

/// Students explicitly marked absent, in roster order.
pub fn absentees<'a>(roster: &'a Roster, attendance: &AttendanceMap) -> Vec<&'a Student> {
    roster
        .students()
        .iter()
        .filter(|s| attendance.is_absent(s.id.as_str()))
        .collect()
}

/// es-CO numeric date, e.g. `15/3/2024`.
pub fn format_date(date: NaiveDate) -> String {
    format!("{}/{}/{}", date.day(), date.month(), date.year())
}

pub fn build_report(
    group: &str,
    date: NaiveDate,
    roster: &Roster,
    attendance: &AttendanceMap,
) -> Report {
    let fecha = format_date(date);
    let subject = format!("Reporte de inasistencia grupo {}", group);

    let mut body = format!(
        "Reporte de inasistencia\nGrupo: {}\nFecha: {}\n\n",
        group, fecha
    );
    body.push_str(&format_absentee_list(&absentees(roster, attendance)));

    Report { subject, body }
}

fn format_absentee_list(list: &[&Student]) -> String {
    if list.is_empty() {
        return NO_ABSENTEES.to_string();
    }

    list.iter()
        .enumerate()
        .map(|(i, student)| format!("{}. {}", i + 1, student.name))
        .collect::<Vec<_>>()
        .join("\n")
}
