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
use chrono::NaiveDate;
use tokio::sync::Mutex;
use tracing::{debug, info, trace, warn};

use crate::{
    attendance::{AttendanceMap, AttendanceStore},
    dispatch::{DispatchError, Dispatcher},
    report::{absentees, build_report},
    roster::{Roster, StudentId},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SendState {
    Idle,
    Sending,
    Sent,
    Failed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DeskError {
    #[error("No hay ausentes para reportar.")]
    NothingToReport,

    #[error("Ya hay un reporte enviándose, espera a que termine.")]
    SendInProgress,

    #[error("No hay ningún estudiante con id {0}.")]
    UnknownStudent(String),

    #[error("No se pudo guardar la asistencia: {0:#}")]
    Storage(#[from] anyhow::Error),

    #[error("{}", .0.user_message())]
    Dispatch(#[from] DispatchError),
}

#[derive(Clone, Debug)]
pub struct Row {
    pub number: usize,
    pub id: StudentId,
    pub name: String,
    pub present: bool,
}

/// Everything the operator needs to render the table and the current modal.
#[derive(Clone, Debug)]
pub struct DeskView {
    pub group: String,
    pub date: NaiveDate,
    pub rows: Vec<Row>,
    pub absentees: usize,
    pub state: SendState,
}

impl DeskView {
    pub fn can_send(&self) -> bool {
        self.absentees > 0 && self.state != SendState::Sending
    }
}

struct Session {
    store: AttendanceStore,
    date: NaiveDate,
    attendance: AttendanceMap,
    state: SendState,
}

impl Session {
    fn ensure_not_sending(&self) -> Result<(), DeskError> {
        if self.state == SendState::Sending {
            return Err(DeskError::SendInProgress);
        }
        Ok(())
    }

    /// Persists `next` for the current date, and only then makes it current.
    fn commit(&mut self, next: AttendanceMap) -> Result<(), DeskError> {
        self.store.save(self.date, &next)?;
        self.attendance = next;
        Ok(())
    }
}

pub const SEND_INTERRUPTED: &str = "El envío se interrumpió antes de terminar.";

/// Leaves `Sending` for `Failed` if a send is dropped before the dispatcher answers.
struct InFlight<'a> {
    session: &'a Mutex<Session>,
    armed: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match self.session.try_lock() {
            Ok(mut session) if session.state == SendState::Sending => {
                warn!("Send for {} was dropped while in flight", session.date);
                session.state = SendState::Failed(SEND_INTERRUPTED.to_string());
            }
            Ok(_) => {}
            Err(_) => warn!("Could not reset an interrupted send, the session is busy"),
        }
    }
}

/// Attendance for the selected date plus the send workflow around it.
pub struct Desk {
    roster: Roster,
    dispatcher: Box<dyn Dispatcher>,
    session: Mutex<Session>,
}

impl Desk {
    pub fn new(
        roster: Roster,
        store: AttendanceStore,
        dispatcher: Box<dyn Dispatcher>,
        date: NaiveDate,
    ) -> Self {
        let attendance = store.load(date, &roster);
        Self {
            roster,
            dispatcher,
            session: Mutex::new(Session {
                store,
                date,
                attendance,
                state: SendState::Idle,
            }),
        }
    }

    pub async fn view(&self) -> DeskView {
        let session = self.session.lock().await;
        self.render(&session)
    }

    fn render(&self, session: &Session) -> DeskView {
        let rows = self
            .roster
            .students()
            .iter()
            .enumerate()
            .map(|(i, s)| Row {
                number: i + 1,
                id: s.id.clone(),
                name: s.name.clone(),
                present: session.attendance.is_present(s.id.as_str()),
            })
            .collect();

        DeskView {
            group: session.store.group().to_string(),
            date: session.date,
            rows,
            absentees: absentees(&self.roster, &session.attendance).len(),
            state: session.state.clone(),
        }
    }

    pub async fn select_date(&self, date: NaiveDate) -> Result<DeskView, DeskError> {
        let mut session = self.session.lock().await;
        session.ensure_not_sending()?;

        debug!("Switching to {}", date);
        let attendance = session.store.load(date, &self.roster);
        session.store.save(date, &attendance)?;
        session.date = date;
        session.attendance = attendance;

        Ok(self.render(&session))
    }

    pub async fn toggle(&self, id: &str) -> Result<DeskView, DeskError> {
        let mut session = self.session.lock().await;
        session.ensure_not_sending()?;

        let Some(student) = self.roster.students().iter().find(|s| s.id.as_str() == id) else {
            return Err(DeskError::UnknownStudent(id.to_string()));
        };

        let next = session.attendance.toggled(&student.id);
        trace!("Toggled {} to {:?}", student.id, next.get(id));
        session.commit(next)?;

        Ok(self.render(&session))
    }

    pub async fn mark_all(&self, present: bool) -> Result<DeskView, DeskError> {
        let mut session = self.session.lock().await;
        session.ensure_not_sending()?;

        session.commit(AttendanceMap::filled(&self.roster, present))?;
        Ok(self.render(&session))
    }

    /// Builds the report for the current date and dispatches it once.
    /// Attendance cannot change while the dispatch is in flight.
    pub async fn send(&self) -> Result<(), DeskError> {
        let report = {
            let mut session = self.session.lock().await;
            session.ensure_not_sending()?;

            if absentees(&self.roster, &session.attendance).is_empty() {
                session.state = SendState::Failed(DeskError::NothingToReport.to_string());
                return Err(DeskError::NothingToReport);
            }

            session.state = SendState::Sending;
            build_report(
                session.store.group(),
                session.date,
                &self.roster,
                &session.attendance,
            )
        };

        let mut guard = InFlight {
            session: &self.session,
            armed: true,
        };
        let result = self.dispatcher.send(&report).await;

        let mut session = self.session.lock().await;
        guard.armed = false;
        match result {
            Ok(()) => {
                info!("Absence report for {} sent", session.date);
                session.state = SendState::Sent;
                Ok(())
            }
            Err(e) => {
                warn!("Absence report for {} failed: {}", session.date, e);
                session.state = SendState::Failed(e.user_message().to_string());
                Err(e.into())
            }
        }
    }

    /// Closes the success or error modal. An in-flight send cannot be dismissed.
    pub async fn dismiss(&self) -> DeskView {
        let mut session = self.session.lock().await;
        if matches!(session.state, SendState::Sent | SendState::Failed(_)) {
            session.state = SendState::Idle;
        }
        self.render(&session)
    }
}
