//! Readers for the three activity logs and the joined CSV.
//!
//! The logs have no header row; columns are positional. A record missing a
//! required column aborts the load, while bad values inside a record are left
//! for the reducer to default.

use anyhow::{Context, Result, bail};
use csv::{ByteRecord, ReaderBuilder, StringRecord, Trim, WriterBuilder};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, error, info};

use crate::grading::ParticipationModel;
use crate::records::ActivityRow;

/// Column layout of the participation log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipationSchema {
    /// `student, rc_and_p, sprint_value[, comments]`
    Engagement,
    /// `student, attendance, discussion`
    Attendance,
}

impl From<&ParticipationModel> for ParticipationSchema {
    fn from(model: &ParticipationModel) -> Self {
        match model {
            ParticipationModel::Engagement => ParticipationSchema::Engagement,
            ParticipationModel::Attendance { .. } => ParticipationSchema::Attendance,
        }
    }
}

/// Reads a tab-delimited task export: `task_id, title, assignee, task_points, state`.
pub fn read_tasks<R: Read>(reader: R, source: &str) -> Result<Vec<ActivityRow>> {
    read_positional(reader, source, b'\t', 5, |r| ActivityRow {
        task_id: field(r, 0),
        assignee: field(r, 2),
        task_points: field(r, 3),
        state: field(r, 4),
        ..Default::default()
    })
}

/// Reads a pull-request log: `creator, pr_id, status[, reviewers]`.
pub fn read_pull_requests<R: Read>(reader: R, source: &str) -> Result<Vec<ActivityRow>> {
    read_positional(reader, source, b',', 3, |r| ActivityRow {
        assignee: field(r, 0),
        pr_id: field(r, 1),
        state: field(r, 2),
        reviewers: field(r, 3),
        ..Default::default()
    })
}

pub fn read_participation<R: Read>(
    reader: R,
    source: &str,
    schema: ParticipationSchema,
) -> Result<Vec<ActivityRow>> {
    match schema {
        ParticipationSchema::Engagement => read_positional(reader, source, b',', 3, |r| ActivityRow {
            assignee: field(r, 0),
            rc_and_p: field(r, 1),
            sprint_value: field(r, 2),
            comments: field(r, 3),
            ..Default::default()
        }),
        ParticipationSchema::Attendance => read_positional(reader, source, b',', 3, |r| ActivityRow {
            assignee: field(r, 0),
            attendance: field(r, 1),
            discussion: field(r, 2),
            ..Default::default()
        }),
    }
}

/// Columns of a joined CSV written without a header row. These are the first
/// eight [`ActivityRow`] fields, in order.
pub const LEGACY_JOINED_COLUMNS: [&str; 8] = [
    "task_id",
    "pr_id",
    "assignee",
    "state",
    "task_points",
    "reviewers",
    "attendance",
    "discussion",
];

/// Reads a joined CSV.
///
/// A first record starting with `task_id` is taken as the header row naming
/// the [`ActivityRow`] columns; otherwise the file is read positionally as
/// [`LEGACY_JOINED_COLUMNS`]. Records that do not decode are logged and skipped.
pub fn read_joined<R: Read>(reader: R, source: &str) -> Result<Vec<ActivityRow>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut headers: Option<StringRecord> = None;
    let mut rows = Vec::new();

    for result in rdr.byte_records() {
        let Some(record) = decode(result, source)? else {
            continue;
        };
        let line = record.position().map_or(0, |p| p.line());
        if record.iter().all(str::is_empty) {
            continue;
        }

        if headers.is_none() && record.get(0) == Some("task_id") {
            debug!(source, "Joined CSV has a header row");
            headers = Some(record);
            continue;
        }
        let header = headers.get_or_insert_with(|| {
            debug!(source, "Joined CSV has no header row, reading legacy columns");
            StringRecord::from(LEGACY_JOINED_COLUMNS.to_vec())
        });

        match record.deserialize::<ActivityRow>(Some(&*header)) {
            Ok(row) => rows.push(row),
            Err(e) => error!(source, line, error = %e, "Skipping malformed joined record"),
        }
    }

    debug!(source, rows = rows.len(), "Joined CSV read");
    Ok(rows)
}

/// Paths to the three logs of one cohort.
#[derive(Debug, Clone, Default)]
pub struct LogPaths<'a> {
    pub tasks: Option<&'a Path>,
    pub prs: Option<&'a Path>,
    pub participation: Option<&'a Path>,
}

/// Loads every log that was given, in task, PR, participation order.
#[tracing::instrument(skip(paths))]
pub fn load_logs(paths: &LogPaths<'_>, schema: ParticipationSchema) -> Result<Vec<ActivityRow>> {
    let mut rows = Vec::new();

    if let Some(path) = paths.tasks {
        rows.extend(read_tasks(open(path)?, &path.display().to_string())?);
    }
    if let Some(path) = paths.prs {
        rows.extend(read_pull_requests(open(path)?, &path.display().to_string())?);
    }
    if let Some(path) = paths.participation {
        rows.extend(read_participation(
            open(path)?,
            &path.display().to_string(),
            schema,
        )?);
    }

    info!(rows = rows.len(), "Activity logs loaded");
    Ok(rows)
}

pub fn load_joined(path: &Path) -> Result<Vec<ActivityRow>> {
    read_joined(open(path)?, &path.display().to_string())
}

/// Writes rows as a joined CSV with a header row naming every [`ActivityRow`] column.
pub fn write_joined(path: &Path, rows: &[ActivityRow]) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;

    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = rows.len(), "Joined CSV written");
    Ok(())
}

fn open(path: &Path) -> Result<File> {
    File::open(path).with_context(|| format!("opening {}", path.display()))
}

fn read_positional<R, F>(
    reader: R,
    source: &str,
    delimiter: u8,
    required: usize,
    to_row: F,
) -> Result<Vec<ActivityRow>>
where
    R: Read,
    F: Fn(&StringRecord) -> ActivityRow,
{
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for result in rdr.byte_records() {
        let Some(record) = decode(result, source)? else {
            continue;
        };
        let line = record.position().map_or(0, |p| p.line());

        if record.iter().all(str::is_empty) {
            continue;
        }
        if record.len() < required {
            bail!(
                "{source}:{line}: expected at least {required} columns, found {}",
                record.len()
            );
        }
        rows.push(to_row(&record));
    }

    debug!(source, rows = rows.len(), "Log read");
    Ok(rows)
}

/// Decodes a raw record, replacing invalid UTF-8 rather than rejecting the
/// row. Unreadable records are logged and skipped; only I/O errors are fatal.
fn decode(result: csv::Result<ByteRecord>, source: &str) -> Result<Option<StringRecord>> {
    match result {
        Ok(raw) => {
            let mut record: StringRecord = raw.iter().map(String::from_utf8_lossy).collect();
            record.set_position(raw.position().cloned());
            Ok(Some(record))
        }
        Err(e) if e.is_io_error() => Err(e).with_context(|| format!("reading {source}")),
        Err(e) => {
            error!(source, error = %e, "Skipping unreadable record");
            Ok(None)
        }
    }
}

fn field(record: &StringRecord, index: usize) -> Option<String> {
    record
        .get(index)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
