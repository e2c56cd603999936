//! Collapse repeated customer rows to one canonical row
//!
//! Two rules are in use:
//! - latest assessment, for the stability snapshot: newest final-PD date wins
//! - worst case, for the performance base: bad before good, then highest
//!   Max DPD, then newest open date, then newest final-PD date

use crate::account::AccountRecord;
use crate::performance::PerformanceRow;
use std::cmp::Ordering;
use std::collections::HashSet;

/// Keep the most recently assessed row per customer.
///
/// Rows are ordered by final-PD date descending; a missing date sorts as
/// earliest, and ties go to the row that appears later in the input. Output
/// follows that sorted order, not the input order.
pub fn dedup_latest_assessment(records: &[AccountRecord]) -> Vec<AccountRecord> {
    let mut order: Vec<usize> = (0..records.len()).collect();
    order.sort_by(|&a, &b| {
        records[b]
            .final_pd_date
            .cmp(&records[a].final_pd_date)
            .then(b.cmp(&a))
    });

    let mut seen = HashSet::new();
    order
        .into_iter()
        .filter(|&i| seen.insert(records[i].customer_id.as_str()))
        .map(|i| records[i].clone())
        .collect()
}

/// Descending order with missing values last
fn desc_missing_last<T: Ord>(a: &Option<T>, b: &Option<T>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.cmp(x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Keep the worst-case, most recent performance row per customer.
///
/// Output is ordered by customer identifier. Rows that tie on every key keep
/// their input order, so the earlier one wins.
pub fn dedup_worst_case(rows: &[PerformanceRow]) -> Vec<PerformanceRow> {
    let mut sorted: Vec<&PerformanceRow> = rows.iter().collect();
    sorted.sort_by(|a, b| {
        let (ra, rb) = (&a.account, &b.account);
        ra.customer_id
            .cmp(&rb.customer_id)
            .then(b.bad_flag.cmp(&a.bad_flag))
            .then(desc_missing_last(&a.max_dpd, &b.max_dpd))
            .then(desc_missing_last(&ra.open_date, &rb.open_date))
            .then(desc_missing_last(&ra.final_pd_date, &rb.final_pd_date))
    });

    let mut kept: Vec<PerformanceRow> = Vec::new();
    for row in sorted {
        let duplicate = kept
            .last()
            .is_some_and(|prev| prev.account.customer_id == row.account.customer_id);
        if !duplicate {
            kept.push(row.clone());
        }
    }

    log::info!(
        "Deduplicated performance base: {} rows -> {} customers",
        rows.len(),
        kept.len()
    );
    kept
}
