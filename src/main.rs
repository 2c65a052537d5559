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
mod attendance;
/// Owner-only commands that render the attendance table and drive the send workflow.
mod commands;
mod config;
/// Ties the roster, the per-date store and the dispatcher into the operator's workflow.
mod desk;
mod dispatch;
mod report;
mod roster;
mod storage;
mod utils;

use anyhow::Context as _;
use poise::{Context as PoiseContext, Framework, FrameworkOptions, PrefixFrameworkOptions};
use serenity::{all::UserId, model::gateway::GatewayIntents};
use tokio::sync::RwLock;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, reload, EnvFilter, Registry};

use std::{collections::HashSet, fs::File, sync::Arc};

use attendance::AttendanceStore;
use config::Config;
use desk::Desk;
use dispatch::EmailJsDispatcher;
use roster::Roster;
use storage::JsonFileStore;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = PoiseContext<'a, Data, Error>;
pub type ReloadHandle = Arc<RwLock<reload::Handle<EnvFilter, Registry>>>;

pub struct Data {
    pub desk: Desk,
    pub log_reload_handle: ReloadHandle,
}

fn setup_tracing() -> anyhow::Result<ReloadHandle> {
    let env = std::env::var("ASISTENCIA_ENV").context("ASISTENCIA_ENV was not found in the ENV")?;
    let enable_debug_libraries_string = std::env::var("ENABLE_DEBUG_LIBRARIES")
        .context("ENABLE_DEBUG_LIBRARIES was not found in the ENV")?;
    let enable_debug_libraries: bool = enable_debug_libraries_string
        .parse()
        .context("Failed to parse ENABLE_DEBUG_LIBRARIES")?;
    let crate_name = env!("CARGO_CRATE_NAME");

    let (filter, reload_handle) = reload::Layer::new(EnvFilter::new(
        if env == "production" && enable_debug_libraries {
            "info".to_string()
        } else if env == "production" && !enable_debug_libraries {
            format!("{crate_name}=info")
        } else if enable_debug_libraries {
            "trace".to_string()
        } else {
            format!("{crate_name}=trace")
        },
    ));

    let log_file = File::create("asistencia.log").context("Failed to create log file")?;

    if env != "production" {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().pretty().with_writer(std::io::stdout))
            .with(fmt::layer().pretty().with_ansi(false).with_writer(log_file));

        tracing::subscriber::set_global_default(subscriber).context("Failed to set subscriber")?;
    } else {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().pretty().with_ansi(false).with_writer(log_file));

        tracing::subscriber::set_global_default(subscriber).context("Failed to set subscriber")?;
    }

    Ok(Arc::new(RwLock::new(reload_handle)))
}

fn build_desk(config: &Config) -> anyhow::Result<Desk> {
    let roster = Roster::load(&config.roster_path).context("Failed to load the roster")?;
    let backend = JsonFileStore::open(&config.storage_path)
        .context("Failed to open the attendance store")?;
    info!(
        "Loaded {} students for group {}, snapshots in {}",
        roster.len(),
        config.group_name,
        backend.path().display()
    );

    let store = AttendanceStore::new(config.group_name.clone(), Box::new(backend));
    let dispatcher = EmailJsDispatcher::new(config.emailjs.clone())?;

    Ok(Desk::new(
        roster,
        store,
        Box::new(dispatcher),
        utils::time::today(),
    ))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenv::dotenv().ok();
    let reload_handle = setup_tracing().context("Failed to setup tracing")?;

    info!("Tracing initialized. Continuing main...");
    let config = Config::from_env().context("Failed to read configuration")?;
    let data = Data {
        desk: build_desk(&config)?,
        log_reload_handle: reload_handle,
    };
    let owner_user_id = UserId::from(config.owner_id);

    let framework = Framework::builder()
        .options(FrameworkOptions {
            commands: commands::get_commands(),
            prefix_options: PrefixFrameworkOptions {
                prefix: Some(String::from("$")),
                ..Default::default()
            },
            owners: HashSet::from([owner_user_id]),
            ..Default::default()
        })
        .setup(|ctx, _ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                Ok(data)
            })
        })
        .build();

    let mut client = serenity::client::ClientBuilder::new(
        config.discord_token,
        GatewayIntents::non_privileged() | GatewayIntents::MESSAGE_CONTENT,
    )
    .framework(framework)
    .await
    .context("Failed to create the Serenity client")?;

    info!("Starting asistencia...");
    client
        .start()
        .await
        .context("Failed to start the Serenity client")?;

    Ok(())
}
