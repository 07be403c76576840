//! History command handlers
//!
//! Each handler drives a [`HistoryController`] and prints the notices it
//! publishes, so the terminal shows the same feedback an embedding UI would.

use crate::cli::Commands;
use crate::error::{ChathistError, Result};
use crate::history::{
    Bin, HistoryController, HistoryEvent, Notice, NoticeLevel, ShareOutcome,
};
use crate::storage::{ConversationRecord, ExportBundle};
use anyhow::Context;
use colored::Colorize;
use prettytable::{format, Table};
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;

/// Longest description shown in a table cell
const MAX_DESCRIPTION_WIDTH: usize = 40;

/// Handle history commands
pub async fn handle_history(controller: &mut HistoryController, command: Commands) -> Result<()> {
    let mut events = controller.subscribe();

    let result = match command {
        Commands::List { query, grouped } => list(controller, query, grouped).await,
        Commands::Delete { ids } => delete(controller, &ids).await,
        Commands::Duplicate { id } => duplicate(controller, &id).await,
        Commands::Export { id, output } => export(controller, &id, output.as_deref()).await,
        Commands::Rename { id, description } => rename(controller, &id, &description).await,
        Commands::Share { id } => share(controller, &id).await,
    };

    print_events(&mut events);
    result
}

async fn list(
    controller: &mut HistoryController,
    query: Option<String>,
    grouped: bool,
) -> Result<()> {
    controller.open().await?;
    if let Some(query) = query {
        controller.set_query(query);
    }

    let filtered = controller.filtered();
    if filtered.is_empty() {
        if controller.query().is_empty() {
            println!("{}", "No conversation history found.".yellow());
        } else {
            println!(
                "{}",
                format!("No conversations match \"{}\".", controller.query()).yellow()
            );
        }
        return Ok(());
    }

    if grouped {
        for bin in controller.grouped() {
            print_bin(&bin);
        }
    } else {
        println!("\nConversation History:");
        records_table(&filtered).printstd();
        println!();
    }
    Ok(())
}

async fn delete(controller: &mut HistoryController, ids: &[String]) -> Result<()> {
    controller.open().await?;

    if let [id] = ids {
        controller.delete_record(id).await?;
        return Ok(());
    }

    let report = controller.delete_records(ids).await?;
    tracing::info!(
        succeeded = report.succeeded,
        total = report.total,
        "Bulk delete finished"
    );
    if !report.is_complete() {
        tracing::warn!(failed = ?report.failed, "Some conversations were not deleted");
        return Err(ChathistError::Storage(format!(
            "{} of {} conversations could not be deleted",
            report.failed.len(),
            report.total
        ))
        .into());
    }
    Ok(())
}

async fn duplicate(controller: &mut HistoryController, id: &str) -> Result<()> {
    let copy = controller.duplicate(id).await?;
    println!(
        "Created {} ({})",
        copy.id.cyan(),
        copy.description.as_deref().unwrap_or_default()
    );
    Ok(())
}

async fn export(controller: &HistoryController, id: &str, output: Option<&Path>) -> Result<()> {
    let bundle = controller.export(id).await?;
    let json = serde_json::to_string_pretty(&bundle)?;

    match export_target(&bundle, output) {
        None => println!("{}", json),
        Some(path) => {
            std::fs::write(&path, json)
                .with_context(|| format!("Failed to write export to {}", path.display()))?;
            println!("Exported to {}", path.display().to_string().cyan());
        }
    }
    Ok(())
}

async fn rename(controller: &mut HistoryController, id: &str, description: &str) -> Result<()> {
    let record = controller.rename(id, description).await?;
    tracing::debug!(id = %record.id, "Renamed conversation");
    Ok(())
}

async fn share(controller: &mut HistoryController, id: &str) -> Result<()> {
    let record = controller.find(id).await?;
    let url_id = record.url_id.unwrap_or_default();

    match controller.share_link(&url_id).await? {
        ShareOutcome::Copied(url) => println!("{}", url),
        ShareOutcome::Fallback(url) => println!("Share link: {}", url.as_str().cyan()),
    }
    Ok(())
}

/// Where an export bundle goes; `None` means stdout
fn export_target(bundle: &ExportBundle, output: Option<&Path>) -> Option<PathBuf> {
    match output {
        Some(path) if path == Path::new("-") => None,
        Some(path) => Some(path.to_path_buf()),
        None => Some(PathBuf::from(bundle.file_name())),
    }
}

fn records_table(records: &[ConversationRecord]) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

    table.add_row(prettytable::row![
        "ID".bold(),
        "URL ID".bold(),
        "Description".bold(),
        "Messages".bold(),
        "Created".bold()
    ]);

    for record in records {
        let description = truncate(
            record.description.as_deref().unwrap_or_default(),
            MAX_DESCRIPTION_WIDTH,
        );
        let created = record
            .timestamp
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M")
            .to_string();

        table.add_row(prettytable::row![
            record.id.cyan(),
            record.url_id.as_deref().unwrap_or("-"),
            description,
            record.messages.len(),
            created
        ]);
    }

    table
}

fn print_bin(bin: &Bin) {
    println!("\n{}", bin.label().bold());
    for record in &bin.items {
        println!(
            "  {}  {}",
            record.id.cyan(),
            truncate(
                record.description.as_deref().unwrap_or_default(),
                MAX_DESCRIPTION_WIDTH
            )
        );
    }
}

fn print_events(events: &mut broadcast::Receiver<HistoryEvent>) {
    while let Ok(event) = events.try_recv() {
        match event {
            HistoryEvent::Notice(notice) => println!("{}", format_notice(&notice)),
            HistoryEvent::ActiveRecordRemoved(id) => {
                tracing::debug!(id = %id, "Active conversation removed")
            }
            HistoryEvent::HistoryChanged => tracing::debug!("History changed"),
        }
    }
}

fn format_notice(notice: &Notice) -> String {
    match notice.level {
        NoticeLevel::Success => notice.message.green().to_string(),
        NoticeLevel::Info => notice.message.normal().to_string(),
        NoticeLevel::Warning => notice.message.yellow().to_string(),
        NoticeLevel::Error => notice.message.red().to_string(),
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}
