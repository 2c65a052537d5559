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
use std::{path::PathBuf, time::Duration};

use anyhow::Context;

use crate::dispatch::{EmailJsConfig, DEFAULT_API_URL, DEFAULT_TIMEOUT};

const DEFAULT_GROUP_NAME: &str = "4-2";
const DEFAULT_ROSTER_PATH: &str = "data/students.json";
const DEFAULT_STORAGE_PATH: &str = "data/attendance.json";

pub struct Config {
    pub discord_token: String,
    pub owner_id: u64,
    pub group_name: String,
    pub roster_path: PathBuf,
    pub storage_path: PathBuf,
    pub emailjs: EmailJsConfig,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let discord_token =
            std::env::var("DISCORD_TOKEN").context("DISCORD_TOKEN was not found in the ENV")?;
        let owner_id: u64 = std::env::var("OWNER_ID")
            .context("OWNER_ID was not found in the ENV")?
            .parse()
            .context("Failed to parse OWNER_ID")?;

        let timeout = match optional("EMAILJS_TIMEOUT_SECS") {
            Some(secs) => Duration::from_secs(
                secs.parse()
                    .context("Failed to parse EMAILJS_TIMEOUT_SECS")?,
            ),
            None => DEFAULT_TIMEOUT,
        };

        let emailjs = EmailJsConfig {
            service_id: required("EMAILJS_SERVICE_ID")?,
            template_id: required("EMAILJS_TEMPLATE_ID")?,
            public_key: required("EMAILJS_PUBLIC_KEY")?,
            private_key: optional("EMAILJS_PRIVATE_KEY"),
            api_url: optional("EMAILJS_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            timeout,
        };

        Ok(Self {
            discord_token,
            owner_id,
            group_name: optional("GROUP_NAME").unwrap_or_else(|| DEFAULT_GROUP_NAME.to_string()),
            roster_path: optional("ROSTER_PATH")
                .unwrap_or_else(|| DEFAULT_ROSTER_PATH.to_string())
                .into(),
            storage_path: optional("STORAGE_PATH")
                .unwrap_or_else(|| DEFAULT_STORAGE_PATH.to_string())
                .into(),
            emailjs,
        })
    }
}

fn required(name: &str) -> anyhow::Result<String> {
    std::env::var(name).with_context(|| format!("{} was not found in the ENV", name))
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
