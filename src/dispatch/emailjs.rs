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
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, error};

use super::{DispatchError, Dispatcher};
use crate::report::Report;

pub const DEFAULT_API_URL: &str = "https://api.emailjs.com/api/v1.0/email/send";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
pub struct EmailJsConfig {
    pub service_id: String,
    pub template_id: String,
    pub public_key: String,
    pub private_key: Option<String>,
    pub api_url: String,
    /// Upper bound for the whole request, so a hung connection cannot keep a send in flight.
    pub timeout: Duration,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    service_id: &'a str,
    template_id: &'a str,
    user_id: &'a str,
    template_params: &'a Report,
    #[serde(rename = "accessToken", skip_serializing_if = "Option::is_none")]
    access_token: Option<&'a str>,
}

/// Sends the report through the EmailJS REST API. The recipient is fixed in the template.
pub struct EmailJsDispatcher {
    config: EmailJsConfig,
    client: reqwest::Client,
}

impl EmailJsDispatcher {
    pub fn new(config: EmailJsConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to build the EmailJS HTTP client")?;

        Ok(Self { config, client })
    }

    fn request<'a>(&'a self, report: &'a Report) -> SendRequest<'a> {
        SendRequest {
            service_id: &self.config.service_id,
            template_id: &self.config.template_id,
            user_id: &self.config.public_key,
            template_params: report,
            access_token: self.config.private_key.as_deref(),
        }
    }
}

#[async_trait]
impl Dispatcher for EmailJsDispatcher {
    async fn send(&self, report: &Report) -> Result<(), DispatchError> {
        debug!(
            "Sending report '{}' with template {}",
            report.subject, self.config.template_id
        );
        let response = self
            .client
            .post(&self.config.api_url)
            .json(&self.request(report))
            .send()
            .await
            .map_err(|e| {
                error!("Failed to post report to EmailJS: {}", e);
                DispatchError::Transport(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            error!("EmailJS responded with {:?}: {}", status, message);
            return Err(DispatchError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        debug!("EmailJS accepted the report");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::net::TcpListener;

    fn config(api_url: &str, private_key: Option<&str>) -> EmailJsConfig {
        EmailJsConfig {
            service_id: "service_x".into(),
            template_id: "template_y".into(),
            public_key: "public_z".into(),
            private_key: private_key.map(str::to_string),
            api_url: api_url.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    fn report() -> Report {
        Report {
            subject: "Reporte de inasistencia grupo 4-2".into(),
            body: "Reporte de inasistencia\nGrupo: 4-2\nFecha: 15/3/2024\n\n1. Luis Pérez".into(),
        }
    }

    #[test]
    fn request_carries_credentials_and_template_variables() {
        let dispatcher = EmailJsDispatcher::new(config(DEFAULT_API_URL, None)).unwrap();
        let report = report();
        let json = serde_json::to_value(dispatcher.request(&report)).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "service_id": "service_x",
                "template_id": "template_y",
                "user_id": "public_z",
                "template_params": {
                    "subject": report.subject,
                    "body": report.body,
                },
            })
        );
    }

    #[test]
    fn private_key_is_sent_as_access_token() {
        let dispatcher = EmailJsDispatcher::new(config(DEFAULT_API_URL, Some("secret"))).unwrap();
        let report = report();
        let json = serde_json::to_value(dispatcher.request(&report)).unwrap();

        assert_eq!(json["accessToken"], "secret");
    }

    #[tokio::test]
    async fn unreachable_service_is_a_transport_error() {
        let dispatcher = EmailJsDispatcher::new(config("http://127.0.0.1:9/api/v1.0/email/send", None)).unwrap();

        let err = dispatcher.send(&report()).await.unwrap_err();
        assert!(matches!(err, DispatchError::Transport(_)));
        assert_eq!(err.user_message(), crate::dispatch::DISPATCH_FAILED_MESSAGE);
    }

    #[tokio::test]
    async fn silent_service_times_out() {
        // Accepted by the kernel backlog but never answered.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let mut config = config(&format!("http://{}/api/v1.0/email/send", addr), None);
        config.timeout = Duration::from_millis(200);
        let dispatcher = EmailJsDispatcher::new(config).unwrap();

        let err = dispatcher.send(&report()).await.unwrap_err();
        match err {
            DispatchError::Transport(e) => assert!(e.is_timeout()),
            other => panic!("expected a timeout, got {other:?}"),
        }
        drop(listener);
    }
}
