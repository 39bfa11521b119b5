//! Read-only views of persisted state, plus position reset

use satsang_core::KeyValueStore;
use satsang_diagnostics::{DiagnosticLog, LogEntry};
use satsang_storage::last_played;
use satsang_storage::positions::PositionStore;
use satsang_storage::snapshot::SnapshotStore;
use std::sync::Arc;

pub async fn status(store: &Arc<dyn KeyValueStore>) -> anyhow::Result<()> {
    match SnapshotStore::new(Arc::clone(store)).load().await? {
        Some(snapshot) if !snapshot.is_empty() => {
            println!("Saved queue ({} tracks):", snapshot.len());
            for (index, track) in snapshot.tracks.iter().enumerate() {
                let marker = if index == snapshot.current_index { '>' } else { ' ' };
                println!("{marker} {index:>3}  {}  <{}>", track.title, track.url);
            }
        }
        _ => println!("No saved queue"),
    }

    match last_played::load(store).await? {
        Some(last) => println!(
            "Last played: {} at {}",
            last.url,
            format_position(last.position_ms)
        ),
        None => println!("Nothing stopped from the lock screen"),
    }
    Ok(())
}

pub async fn positions(store: &Arc<dyn KeyValueStore>) -> anyhow::Result<()> {
    let mut records = PositionStore::new(Arc::clone(store)).all().await?;
    if records.is_empty() {
        println!("No saved positions");
        return Ok(());
    }

    records.sort_by(|a, b| a.song.title.cmp(&b.song.title));
    for record in records {
        println!(
            "{:>10}  {}  <{}>",
            format_position(record.position),
            record.song.title,
            record.song.url
        );
    }
    Ok(())
}

pub async fn logs(store: &Arc<dyn KeyValueStore>, limit: Option<usize>) -> anyhow::Result<()> {
    let entries = DiagnosticLog::load_persisted(store.as_ref()).await?;
    if entries.is_empty() {
        println!("Diagnostic log is empty");
        return Ok(());
    }

    let skip = limit.map_or(0, |limit| entries.len().saturating_sub(limit));
    for entry in entries.iter().skip(skip) {
        println!("{}", format_entry(entry));
    }
    Ok(())
}

pub async fn reset_position(store: &Arc<dyn KeyValueStore>, url: &str) -> anyhow::Result<()> {
    PositionStore::new(Arc::clone(store)).reset(url).await?;
    println!("Position reset for {url}");
    Ok(())
}

/// `h:mm:ss` or `m:ss`
pub fn format_position(ms: u64) -> String {
    let secs = ms / 1000;
    let (h, m, s) = (secs / 3600, (secs / 60) % 60, secs % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

fn format_entry(entry: &LogEntry) -> String {
    let mut line = format!(
        "{}  {:<5}  {}",
        entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
        format!("{:?}", entry.level).to_uppercase(),
        entry.message
    );
    if let Some(source) = &entry.source {
        line.push_str(&format!("  [{source}]"));
    }
    if let Some(data) = &entry.data {
        line.push_str(&format!("  {data}"));
    }
    line
}
