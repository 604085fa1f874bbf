//! Persistence of transposition tables as a JSON document.
//!
//! Layout: one root object carrying an optional `gameType` and `savedAt`
//! timestamp plus an `entries` array. Every entry attribute is written as a
//! string (`fingerprint`, `type`, `value`, `depth`, `bestMove`) so the format
//! stays a flat attribute list. An empty `bestMove` means no move recorded.
//!
//! Loading is all-or-nothing: the first missing or unparseable attribute
//! fails the whole import.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::cache::transposition_table::{BoundType, TranspositionTable, TranspositionTableEntry};
use crate::errors::{TableFormatError, TableFormatResult};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TableDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    game_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    saved_at: Option<DateTime<Utc>>,
    entries: Vec<EntryRecord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntryRecord {
    #[serde(default)]
    fingerprint: Option<String>,
    #[serde(default, rename = "type")]
    bound: Option<String>,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    depth: Option<String>,
    #[serde(default)]
    best_move: Option<String>,
}

/// Metadata read back from a persisted table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableHeader {
    pub game_type: Option<String>,
    pub saved_at: Option<DateTime<Utc>>,
}

/// Options controlling what `export_table` writes.
pub struct ExportOptions<'a, M> {
    pub game_type: Option<&'a str>,
    pub filter: Option<&'a dyn Fn(&TranspositionTableEntry<M>) -> bool>,
}

impl<M> Default for ExportOptions<'_, M> {
    fn default() -> Self {
        Self {
            game_type: None,
            filter: None,
        }
    }
}

/// Write one entry per cached fingerprint, oldest first.
///
/// Returns the number of entries written.
pub fn export_table<M, W>(
    table: &TranspositionTable<M>,
    writer: W,
    options: &ExportOptions<'_, M>,
) -> TableFormatResult<usize>
where
    M: Clone + ToString,
    W: Write,
{
    let entries: Vec<EntryRecord> = table
        .iter()
        .filter(|&(_, entry)| options.filter.map_or(true, |keep| keep(entry)))
        .map(|(key, entry)| EntryRecord {
            fingerprint: Some(key.to_string()),
            bound: Some(entry.bound.name().to_owned()),
            value: Some(entry.value.to_string()),
            depth: Some(entry.depth.to_string()),
            best_move: Some(
                entry
                    .best_move
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_default(),
            ),
        })
        .collect();

    let written = entries.len();
    let document = TableDocument {
        game_type: options.game_type.map(str::to_owned),
        saved_at: Some(Utc::now()),
        entries,
    };
    serde_json::to_writer_pretty(writer, &document)?;
    debug!("exported {written} of {} table entries", table.len());
    Ok(written)
}

/// Read a table written by `export_table` into a fresh table sized from
/// `budget_bytes`.
///
/// Entries are stored in document order, so if the document holds more
/// entries than the new table's capacity the earliest ones are evicted.
pub fn import_table<M, R>(
    reader: R,
    budget_bytes: u64,
) -> TableFormatResult<(TranspositionTable<M>, TableHeader)>
where
    M: Clone + FromStr,
    M::Err: std::fmt::Display,
    R: Read,
{
    let document: TableDocument = serde_json::from_reader(reader)?;
    let parsed = document
        .entries
        .iter()
        .enumerate()
        .map(|(index, record)| parse_record::<M>(index, record))
        .collect::<TableFormatResult<Vec<_>>>()?;

    let mut table = TranspositionTable::with_budget(budget_bytes)?;
    if parsed.len() > table.capacity() {
        warn!(
            "table document holds {} entries but capacity is {}; oldest entries will be evicted",
            parsed.len(),
            table.capacity()
        );
    }
    for (key, entry) in parsed {
        table.store(key, entry);
    }
    debug!("imported {} table entries", table.len());

    Ok((
        table,
        TableHeader {
            game_type: document.game_type,
            saved_at: document.saved_at,
        },
    ))
}

pub fn export_table_to_path<M, P>(
    table: &TranspositionTable<M>,
    path: P,
    options: &ExportOptions<'_, M>,
) -> TableFormatResult<usize>
where
    M: Clone + ToString,
    P: AsRef<Path>,
{
    let mut writer = BufWriter::new(File::create(path)?);
    let written = export_table(table, &mut writer, options)?;
    writer.flush()?;
    Ok(written)
}

pub fn import_table_from_path<M, P>(
    path: P,
    budget_bytes: u64,
) -> TableFormatResult<(TranspositionTable<M>, TableHeader)>
where
    M: Clone + FromStr,
    M::Err: std::fmt::Display,
    P: AsRef<Path>,
{
    import_table(BufReader::new(File::open(path)?), budget_bytes)
}

fn parse_record<M>(
    index: usize,
    record: &EntryRecord,
) -> TableFormatResult<(u64, TranspositionTableEntry<M>)>
where
    M: FromStr,
    M::Err: std::fmt::Display,
{
    let key: u64 = parse_attribute(index, "fingerprint", record.fingerprint.as_deref())?;
    let bound: BoundType = parse_attribute(index, "type", record.bound.as_deref())?;
    let value: f64 = parse_attribute(index, "value", record.value.as_deref())?;
    if !value.is_finite() {
        return Err(invalid(index, "value", value.to_string(), "score must be finite"));
    }
    let depth: u32 = parse_attribute(index, "depth", record.depth.as_deref())?;

    let raw_move = required(index, "bestMove", record.best_move.as_deref())?;
    let best_move = if raw_move.is_empty() {
        None
    } else {
        Some(
            raw_move
                .parse::<M>()
                .map_err(|e| invalid(index, "bestMove", raw_move.to_owned(), e.to_string()))?,
        )
    };

    Ok((
        key,
        TranspositionTableEntry {
            bound,
            value,
            depth,
            best_move,
        },
    ))
}

fn required<'a>(
    index: usize,
    attribute: &'static str,
    raw: Option<&'a str>,
) -> TableFormatResult<&'a str> {
    raw.ok_or(TableFormatError::MissingAttribute {
        entry: index,
        attribute,
    })
}

fn parse_attribute<T>(index: usize, attribute: &'static str, raw: Option<&str>) -> TableFormatResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = required(index, attribute, raw)?;
    raw.trim()
        .parse::<T>()
        .map_err(|e| invalid(index, attribute, raw.to_owned(), e.to_string()))
}

fn invalid(
    index: usize,
    attribute: &'static str,
    value: String,
    reason: impl Into<String>,
) -> TableFormatError {
    TableFormatError::InvalidAttribute {
        entry: index,
        attribute,
        value,
        reason: reason.into(),
    }
}
