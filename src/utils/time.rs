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
use anyhow::Context;
use chrono::{NaiveDate, Utc};
use chrono_tz::America::Bogota;

/// The calendar date the class is in right now.
pub fn today() -> NaiveDate {
    Utc::now().with_timezone(&Bogota).date_naive()
}

/// Parses an ISO `YYYY-MM-DD` date as a plain calendar date, with no time zone attached.
pub fn parse_iso_date(s: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .with_context(|| format!("'{}' is not a YYYY-MM-DD date", s))
}
