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
use poise::CreateReply;
use serenity::all::{Colour, CreateEmbed, CreateEmbedFooter};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::{
    desk::{DeskError, DeskView, SendState},
    utils::time::parse_iso_date,
    Context, Data, Error,
};

const DISMISS_HINT: &str = "Usa /dismiss para cerrar";

pub fn get_commands() -> Vec<poise::Command<Data, Error>> {
    vec![
        attendance(),
        toggle(),
        mark_all(),
        send(),
        dismiss(),
        log_level(),
    ]
}

/// Shows the attendance table, optionally switching to another date.
#[poise::command(slash_command, prefix_command, owners_only)]
async fn attendance(
    ctx: Context<'_>,
    #[description = "Fecha en formato AAAA-MM-DD"] date: Option<String>,
) -> Result<(), Error> {
    let data = ctx.data();
    let view = match date {
        Some(date) => {
            let date = match parse_iso_date(&date) {
                Ok(date) => date,
                Err(e) => {
                    ctx.say(format!("Fecha inválida: {e}")).await?;
                    return Ok(());
                }
            };
            match data.desk.select_date(date).await {
                Ok(view) => view,
                Err(e) => return report_error(ctx, e).await,
            }
        }
        None => data.desk.view().await,
    };

    ctx.send(CreateReply::default().embed(table_embed(&view)))
        .await?;
    Ok(())
}

/// Flips one student between present and absent.
#[poise::command(slash_command, prefix_command, owners_only)]
async fn toggle(
    ctx: Context<'_>,
    #[description = "Id del estudiante"] student_id: String,
) -> Result<(), Error> {
    let data = ctx.data();
    match data.desk.toggle(student_id.trim()).await {
        Ok(view) => {
            ctx.send(CreateReply::default().embed(table_embed(&view)))
                .await?;
            Ok(())
        }
        Err(e) => report_error(ctx, e).await,
    }
}

/// Marks every student present or absent.
#[poise::command(slash_command, prefix_command, owners_only)]
async fn mark_all(
    ctx: Context<'_>,
    #[description = "true: Asistieron, false: Faltaron"] present: bool,
) -> Result<(), Error> {
    let data = ctx.data();
    match data.desk.mark_all(present).await {
        Ok(view) => {
            ctx.send(CreateReply::default().embed(table_embed(&view)))
                .await?;
            Ok(())
        }
        Err(e) => report_error(ctx, e).await,
    }
}

/// Emails the absence report for the selected date.
#[poise::command(slash_command, prefix_command, owners_only)]
async fn send(ctx: Context<'_>) -> Result<(), Error> {
    let data = ctx.data();

    let view = data.desk.view().await;
    if view.state == SendState::Sending {
        ctx.say(DeskError::SendInProgress.to_string()).await?;
        return Ok(());
    }
    let handle = if view.can_send() {
        Some(
            ctx.send(CreateReply::default().embed(sending_embed()))
                .await?,
        )
    } else {
        None
    };

    let reply = match data.desk.send().await {
        Ok(()) => CreateReply::default().embed(sent_embed()),
        Err(DeskError::SendInProgress) => {
            CreateReply::default().content(DeskError::SendInProgress.to_string())
        }
        Err(e) => CreateReply::default().embed(failed_embed(&e.to_string())),
    };

    match handle {
        Some(handle) => handle.edit(ctx, reply).await?,
        None => {
            ctx.send(reply).await?;
        }
    }
    Ok(())
}

/// Closes the success or error message and goes back to the table.
#[poise::command(slash_command, prefix_command, owners_only)]
async fn dismiss(ctx: Context<'_>) -> Result<(), Error> {
    let data = ctx.data();
    let view = data.desk.dismiss().await;

    let reply = match view.state {
        SendState::Sending => CreateReply::default().embed(sending_embed()),
        _ => CreateReply::default().embed(table_embed(&view)),
    };
    ctx.send(reply).await?;
    Ok(())
}

/// Replaces the active log filter, e.g. `asistencia=trace`.
#[poise::command(slash_command, prefix_command, owners_only)]
async fn log_level(
    ctx: Context<'_>,
    #[description = "Directiva de EnvFilter"] filter: String,
) -> Result<(), Error> {
    let data = ctx.data();
    let new_filter = EnvFilter::try_new(&filter)?;
    data.log_reload_handle.read().await.reload(new_filter)?;

    info!("Log filter changed to {}", filter);
    ctx.say(format!("Filtro de logs: `{filter}`")).await?;
    Ok(())
}

async fn report_error(ctx: Context<'_>, e: DeskError) -> Result<(), Error> {
    if let DeskError::Storage(ref cause) = e {
        error!("Failed to persist attendance: {:#}", cause);
    }
    ctx.say(e.to_string()).await?;
    Ok(())
}

fn table_embed(view: &DeskView) -> CreateEmbed {
    let mut description = String::from("**# · Nombre · Asistencia**\n");
    for row in &view.rows {
        let badge = if row.present { "✅ Asistió" } else { "❌ Faltó" };
        description.push_str(&format!(
            "{}. {} `{}` · {}\n",
            row.number, row.name, row.id, badge
        ));
    }

    let send_hint = if view.can_send() {
        "Enviar reporte: disponible"
    } else {
        "Enviar reporte: no disponible"
    };

    let colour = if view.absentees == 0 {
        Colour::DARK_GREEN
    } else {
        Colour::GOLD
    };

    CreateEmbed::new()
        .title(format!("Asistencia {}", view.group))
        .field("Fecha", view.date.format("%Y-%m-%d").to_string(), true)
        .field("Ausentes", view.absentees.to_string(), true)
        .description(description)
        .color(colour)
        .footer(CreateEmbedFooter::new(send_hint))
}

fn sending_embed() -> CreateEmbed {
    CreateEmbed::new()
        .title("Enviando reporte...")
        .color(Colour::GOLD)
}

fn sent_embed() -> CreateEmbed {
    CreateEmbed::new()
        .title("✅ Mensaje enviado")
        .description("El reporte se envió correctamente.")
        .color(Colour::DARK_GREEN)
        .footer(CreateEmbedFooter::new(DISMISS_HINT))
}

fn failed_embed(message: &str) -> CreateEmbed {
    CreateEmbed::new()
        .title("❌ Error al enviar")
        .description(message)
        .color(Colour::RED)
        .footer(CreateEmbedFooter::new(DISMISS_HINT))
}
