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
//! Outbound delivery of an absence [`Report`].
//!
//! Exactly one attempt is made per call. Retrying is left to the operator, who can
//! dismiss the error and send again.
mod emailjs;

pub use emailjs::{EmailJsConfig, EmailJsDispatcher, DEFAULT_API_URL, DEFAULT_TIMEOUT};

use async_trait::async_trait;

use crate::report::Report;

pub const DISPATCH_FAILED_MESSAGE: &str =
    "No se pudo enviar el correo. Revisa Service/Template/Public Key y la plantilla.";

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Could not reach the email service: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Email service answered {status}: {message}")]
    Rejected { status: u16, message: String },
}

impl DispatchError {
    /// What the operator sees. The technical detail only goes to the log.
    pub fn user_message(&self) -> &'static str {
        DISPATCH_FAILED_MESSAGE
    }
}

#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn send(&self, report: &Report) -> Result<(), DispatchError>;
}
