//! Load account snapshots from CSV exports

use super::data::{parse_date, AccountRecord, AccountSnapshot};
use super::schema::{ColumnIndex, SnapshotKind, SnapshotSchema, ACCOUNT_KEY};
use crate::error::{MonitoringError, Result};
use crate::segment::{BinningPolicy, SizeClass};
use csv::{Reader, StringRecord};
use std::io::Read;
use std::path::Path;

/// Load a snapshot from a CSV file. A missing file is fatal.
pub fn load_snapshot<P: AsRef<Path>>(
    path: P,
    schema: &SnapshotSchema,
    policy: &BinningPolicy,
    kind: SnapshotKind,
) -> Result<AccountSnapshot> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(MonitoringError::InputNotFound(path.to_path_buf()));
    }
    let snapshot = read_snapshot(Reader::from_path(path)?, schema, policy, kind)?;
    log::info!(
        "Loaded {} accounts from {}",
        snapshot.len(),
        path.display()
    );
    Ok(snapshot)
}

/// Load a snapshot from any reader (e.g., string buffer)
pub fn load_snapshot_from_reader<R: Read>(
    reader: R,
    schema: &SnapshotSchema,
    policy: &BinningPolicy,
    kind: SnapshotKind,
) -> Result<AccountSnapshot> {
    read_snapshot(Reader::from_reader(reader), schema, policy, kind)
}

fn read_snapshot<R: Read>(
    mut reader: Reader<R>,
    schema: &SnapshotSchema,
    policy: &BinningPolicy,
    kind: SnapshotKind,
) -> Result<AccountSnapshot> {
    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
    let index = schema.resolve(&headers, policy, kind)?;

    let mut columns: Vec<String> = headers[..index.carried].to_vec();
    if let Some(pos) = index.account_no.filter(|&p| p < index.carried) {
        columns[pos] = ACCOUNT_KEY.to_string();
    }

    let mut records = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let row = result?;
        records.push(to_record(&row, &headers, &index, kind, i + 1)?);
    }

    Ok(AccountSnapshot { columns, records })
}

fn cell<'r>(row: &'r StringRecord, pos: Option<usize>) -> Option<&'r str> {
    pos.and_then(|p| row.get(p))
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn invalid(headers: &[String], pos: usize, row: usize, value: &str) -> MonitoringError {
    MonitoringError::InvalidValue {
        column: headers[pos].clone(),
        row,
        value: value.to_string(),
    }
}

fn to_record(
    row: &StringRecord,
    headers: &[String],
    index: &ColumnIndex,
    kind: SnapshotKind,
    row_no: usize,
) -> Result<AccountRecord> {
    let customer_id = cell(row, Some(index.customer_id))
        .ok_or_else(|| invalid(headers, index.customer_id, row_no, ""))?
        .to_string();

    let pd_score = match cell(row, index.score) {
        Some(raw) => Some(
            raw.parse::<f64>()
                .map_err(|_| invalid(headers, index.score.unwrap_or_default(), row_no, raw))?,
        ),
        None => None,
    };

    let size = match cell(row, index.size) {
        Some(raw) => Some(
            raw.parse::<SizeClass>()
                .map_err(|_| invalid(headers, index.size.unwrap_or_default(), row_no, raw))?,
        ),
        None => None,
    };

    let open_raw = cell(row, index.open_date);
    let open_date = open_raw.and_then(parse_date);
    if kind == SnapshotKind::Performance && open_date.is_none() {
        let pos = index.open_date.unwrap_or_default();
        return Err(invalid(headers, pos, row_no, open_raw.unwrap_or("")));
    }

    let account_no = cell(row, index.account_no).map(str::to_string);
    if kind == SnapshotKind::Performance && account_no.is_none() {
        return Err(invalid(headers, index.account_no.unwrap_or_default(), row_no, ""));
    }

    let carried = (0..index.carried)
        .map(|p| row.get(p).unwrap_or("").to_string())
        .collect();

    Ok(AccountRecord {
        customer_id,
        account_no,
        open_date,
        pd_score,
        grade: cell(row, index.grade).map(str::to_string),
        size,
        // Unparseable assessment dates sort as earliest during dedup
        final_pd_date: cell(row, index.final_pd_date).and_then(parse_date),
        carried,
    })
}
