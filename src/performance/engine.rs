//! Forward Max DPD join
//!
//! For each observation period the accounts opened in that month are joined
//! against the delinquency snapshots of the following twelve months. The
//! worst observed delinquency becomes Max DPD, and Max DPD above 90 days
//! marks the account bad.

use super::delinquency::{DelinquencySource, DelinquencyTable};
use super::{YearMonth, BAD_DPD_THRESHOLD, FORWARD_MONTHS};
use crate::account::{AccountRecord, AccountSnapshot};
use crate::error::{MonitoringError, Result};
use std::collections::{BTreeMap, HashMap};

/// One account with its forward delinquency window
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceRow {
    /// Observation period the row was built for (the "Sheet" column)
    pub period: YearMonth,
    pub account: AccountRecord,
    /// Days past due in each forward month; None where the account was not observed
    pub dpd: [Option<u32>; FORWARD_MONTHS],
    /// Worst observed days past due; None if never observed
    pub max_dpd: Option<u32>,
    pub bad_flag: u8,
}

impl PerformanceRow {
    fn join(period: YearMonth, account: &AccountRecord, window: &[Option<&DelinquencyTable>]) -> Self {
        let account_no = account.account_no.as_deref().unwrap_or_default();
        let dpd: [Option<u32>; FORWARD_MONTHS] =
            std::array::from_fn(|i| window[i].and_then(|table| table.get(account_no)));
        let max_dpd = dpd.iter().flatten().copied().max();

        Self {
            period,
            account: account.clone(),
            dpd,
            max_dpd,
            bad_flag: bad_flag(max_dpd),
        }
    }

    pub fn is_bad(&self) -> bool {
        self.bad_flag == 1
    }
}

/// Bad Flag from Max DPD. An account never observed is not bad.
pub fn bad_flag(max_dpd: Option<u32>) -> u8 {
    match max_dpd {
        Some(dpd) if dpd > BAD_DPD_THRESHOLD => 1,
        _ => 0,
    }
}

/// Performance rows for one observation period
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceTable {
    pub period: YearMonth,
    /// Calendar months of the twelve delinquency columns
    pub months: [YearMonth; FORWARD_MONTHS],
    pub rows: Vec<PerformanceRow>,
}

impl PerformanceTable {
    pub fn bad_count(&self) -> usize {
        self.rows.iter().filter(|r| r.is_bad()).count()
    }
}

/// The joined performance base across all selected periods
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceBase {
    /// Carried snapshot columns
    pub columns: Vec<String>,
    /// One table per observation period, in the order requested
    pub tables: Vec<PerformanceTable>,
    /// Forward months that had to be treated as empty
    pub missing_months: Vec<YearMonth>,
}

impl PerformanceBase {
    /// All rows across periods, the combined table
    pub fn rows(&self) -> impl Iterator<Item = &PerformanceRow> {
        self.tables.iter().flat_map(|t| t.rows.iter())
    }

    pub fn row_count(&self) -> usize {
        self.tables.iter().map(|t| t.rows.len()).sum()
    }

    /// The combined table as owned rows
    pub fn combined(&self) -> Vec<PerformanceRow> {
        self.rows().cloned().collect()
    }
}

/// Build the performance base for the selected observation periods.
///
/// Only the delinquency months listed in `dpd_months` are loaded, each once.
/// A forward month that was not selected or could not be loaded joins as
/// all-missing and is reported in `missing_months`.
pub fn build_performance_table<S: DelinquencySource + ?Sized>(
    snapshot: &AccountSnapshot,
    source: &S,
    periods: &[YearMonth],
    dpd_months: &[YearMonth],
) -> Result<PerformanceBase> {
    if periods.is_empty() {
        return Err(MonitoringError::config("no observation periods selected"));
    }

    let mut loaded: HashMap<YearMonth, DelinquencyTable> = HashMap::new();
    for &month in dpd_months {
        if loaded.contains_key(&month) {
            continue;
        }
        if let Some(table) = source.load_month(month) {
            loaded.insert(month, table);
        }
    }

    let by_open_month = group_by_open_month(snapshot)?;

    let mut missing_months: Vec<YearMonth> = Vec::new();
    let mut tables = Vec::with_capacity(periods.len());

    for &period in periods {
        let months = period.forward_window();
        let window: Vec<Option<&DelinquencyTable>> = months
            .iter()
            .map(|m| {
                let table = loaded.get(m);
                if table.is_none() && !missing_months.contains(m) {
                    log::warn!(
                        "Delinquency snapshot {} unavailable; month {} joins as missing",
                        m.mmyy(),
                        m
                    );
                    missing_months.push(*m);
                }
                table
            })
            .collect();

        let accounts = by_open_month.get(&period).map(Vec::as_slice).unwrap_or_default();
        if accounts.is_empty() {
            log::warn!("No accounts opened in observation period {}", period);
        }

        let rows: Vec<PerformanceRow> = accounts
            .iter()
            .map(|account| PerformanceRow::join(period, account, &window))
            .collect();

        let table = PerformanceTable { period, months, rows };
        log::info!(
            "Period {}: {} accounts, {} bad",
            period,
            table.rows.len(),
            table.bad_count()
        );
        tables.push(table);
    }

    missing_months.sort();

    Ok(PerformanceBase {
        columns: snapshot.columns.clone(),
        tables,
        missing_months,
    })
}

fn group_by_open_month(snapshot: &AccountSnapshot) -> Result<BTreeMap<YearMonth, Vec<&AccountRecord>>> {
    let mut groups: BTreeMap<YearMonth, Vec<&AccountRecord>> = BTreeMap::new();
    for (i, record) in snapshot.records.iter().enumerate() {
        let open_date = record.open_date.ok_or_else(|| MonitoringError::InvalidValue {
            column: "Open Date".to_string(),
            row: i + 1,
            value: String::new(),
        })?;
        groups.entry(YearMonth::from_date(open_date)).or_default().push(record);
    }
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ym(y: i32, m: u32) -> YearMonth {
        YearMonth::new(y, m).unwrap()
    }

    fn account(customer: &str, account_no: &str, open: (i32, u32, u32)) -> AccountRecord {
        let mut r = AccountRecord::new(customer, Some(0.02));
        r.account_no = Some(account_no.to_string());
        r.open_date = NaiveDate::from_ymd_opt(open.0, open.1, open.2);
        r
    }

    fn snapshot(records: Vec<AccountRecord>) -> AccountSnapshot {
        AccountSnapshot {
            columns: vec!["CSNO (CIF-CORE)".to_string(), "zacno".to_string()],
            records,
        }
    }

    /// Delinquency for 2023.02 through 2024.01, the window of period 2023.01
    fn full_year(values: &[(&str, [u32; 12])]) -> (HashMap<YearMonth, DelinquencyTable>, Vec<YearMonth>) {
        let months = ym(2023, 1).forward_window();
        let mut source = HashMap::new();
        for (i, m) in months.iter().enumerate() {
            let table: DelinquencyTable = values.iter().map(|(acc, v)| (*acc, v[i])).collect();
            source.insert(*m, table);
        }
        (source, months.to_vec())
    }

    #[test]
    fn test_all_observed_at_most_90_is_good() {
        let snap = snapshot(vec![account("C1", "A1", (2023, 1, 10))]);
        let (source, months) = full_year(&[("A1", [0, 5, 30, 60, 90, 90, 45, 0, 0, 0, 10, 20])]);

        let base = build_performance_table(&snap, &source, &[ym(2023, 1)], &months).unwrap();
        let row = &base.tables[0].rows[0];
        assert_eq!(row.max_dpd, Some(90));
        assert_eq!(row.bad_flag, 0);
        assert!(base.missing_months.is_empty());
    }

    #[test]
    fn test_any_month_over_90_is_bad() {
        let snap = snapshot(vec![account("C1", "A1", (2023, 1, 10))]);
        let (source, months) = full_year(&[("A1", [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 91])]);

        let base = build_performance_table(&snap, &source, &[ym(2023, 1)], &months).unwrap();
        let row = &base.tables[0].rows[0];
        assert_eq!(row.max_dpd, Some(91));
        assert_eq!(row.bad_flag, 1);
    }

    #[test]
    fn test_never_observed_is_missing_and_not_bad() {
        let snap = snapshot(vec![
            account("C1", "A1", (2023, 1, 10)),
            account("C2", "UNSEEN", (2023, 1, 20)),
        ]);
        let (source, months) = full_year(&[("A1", [120; 12])]);

        let base = build_performance_table(&snap, &source, &[ym(2023, 1)], &months).unwrap();
        let unseen = &base.tables[0].rows[1];
        assert_eq!(unseen.dpd, [None; FORWARD_MONTHS]);
        assert_eq!(unseen.max_dpd, None);
        assert_eq!(unseen.bad_flag, 0);
    }

    #[test]
    fn test_missing_month_is_ignored_not_zero() {
        let snap = snapshot(vec![account("C1", "A1", (2023, 1, 10))]);
        let (mut source, months) = full_year(&[("A1", [95, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0])]);
        source.remove(&ym(2023, 2));

        let base = build_performance_table(&snap, &source, &[ym(2023, 1)], &months).unwrap();
        let row = &base.tables[0].rows[0];
        assert_eq!(row.dpd[0], None);
        assert_eq!(row.dpd[1], Some(0));
        assert_eq!(row.max_dpd, Some(0));
        assert_eq!(base.missing_months, vec![ym(2023, 2)]);
    }

    #[test]
    fn test_unselected_month_is_missing() {
        let snap = snapshot(vec![account("C1", "A1", (2023, 1, 10))]);
        let (source, months) = full_year(&[("A1", [10; 12])]);

        let base = build_performance_table(&snap, &source, &[ym(2023, 1)], &months[..6]).unwrap();
        let row = &base.tables[0].rows[0];
        assert!(row.dpd[..6].iter().all(|d| *d == Some(10)));
        assert!(row.dpd[6..].iter().all(|d| d.is_none()));
        assert_eq!(base.missing_months.len(), 6);
    }

    #[test]
    fn test_accounts_grouped_by_open_month() {
        let snap = snapshot(vec![
            account("C1", "A1", (2023, 1, 10)),
            account("C2", "A2", (2023, 2, 1)),
            account("C3", "A3", (2023, 1, 31)),
        ]);
        let source: HashMap<YearMonth, DelinquencyTable> = HashMap::new();

        let base =
            build_performance_table(&snap, &source, &[ym(2023, 1), ym(2023, 2)], &[]).unwrap();
        assert_eq!(base.tables.len(), 2);
        assert_eq!(base.tables[0].rows.len(), 2);
        assert_eq!(base.tables[1].rows.len(), 1);
        assert_eq!(base.tables[1].months[0], ym(2023, 3));
        assert_eq!(base.row_count(), 3);
        assert!(base.rows().all(|r| r.bad_flag == 0));
    }

    #[test]
    fn test_period_without_accounts_is_empty() {
        let snap = snapshot(vec![account("C1", "A1", (2023, 1, 10))]);
        let source: HashMap<YearMonth, DelinquencyTable> = HashMap::new();

        let base = build_performance_table(&snap, &source, &[ym(2022, 6)], &[]).unwrap();
        assert!(base.tables[0].rows.is_empty());
    }

    #[test]
    fn test_no_periods_is_configuration_error() {
        let snap = snapshot(vec![]);
        let source: HashMap<YearMonth, DelinquencyTable> = HashMap::new();
        let err = build_performance_table(&snap, &source, &[], &[]).unwrap_err();
        assert!(matches!(err, MonitoringError::Configuration(_)));
    }

    #[test]
    fn test_bad_flag_threshold() {
        assert_eq!(bad_flag(None), 0);
        assert_eq!(bad_flag(Some(90)), 0);
        assert_eq!(bad_flag(Some(91)), 1);
    }
}
