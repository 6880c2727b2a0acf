use std::collections::BTreeMap;

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;
use thiserror::Error;

use crate::table::{Table, TableError};

pub const CUSTOMER_COLUMN: &str = "customer_id";
pub const DATE_COLUMNS: &[&str] = &["date", "txn_date"];
pub const AMOUNT_COLUMNS: &[&str] = &["amount", "revenue", "value"];

const NORMALIZE_EPSILON: f64 = 1e-6;
const RECENCY_WEIGHT: f64 = 0.5;
const FREQUENCY_WEIGHT: f64 = 0.25;
const MONETARY_WEIGHT: f64 = 0.25;

#[derive(Error, Debug)]
pub enum ChurnError {
    #[error("customer_id column required for churn scoring")]
    MissingCustomerId,
    #[error("need date and amount columns")]
    MissingColumns,
    #[error(transparent)]
    Table(#[from] TableError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Low,
    Medium,
    High,
}

impl Bucket {
    /// Right-closed bins: `(…, 0.33]`, `(0.33, 0.66]`, `(0.66, …)`.
    pub fn for_score(score: f64) -> Self {
        if score <= 0.33 {
            Bucket::Low
        } else if score <= 0.66 {
            Bucket::Medium
        } else {
            Bucket::High
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChurnScore {
    pub customer_id: String,
    pub churn_score: f64,
    pub bucket: Bucket,
}

/// Per-customer recency/frequency/monetary aggregate.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Rfm {
    last_seen: NaiveDateTime,
    frequency: f64,
    monetary: f64,
}

/// RFM churn scores, one per customer, ordered by customer id.
pub fn score_churn(table: &Table) -> Result<Vec<ChurnScore>, ChurnError> {
    let customer_col = table
        .exact_column(CUSTOMER_COLUMN)
        .ok_or(ChurnError::MissingCustomerId)?;
    let date_col = table.find_column(DATE_COLUMNS).ok_or(ChurnError::MissingColumns)?;
    let amount_col = table.find_column(AMOUNT_COLUMNS).ok_or(ChurnError::MissingColumns)?;

    let mut customers: BTreeMap<String, Rfm> = BTreeMap::new();
    for row in 0..table.len() {
        let customer = table.cell(row, customer_col);
        if customer.is_empty() {
            continue;
        }
        let Some(when) = table.datetime(row, date_col)? else {
            continue;
        };
        let amount = table.number(row, amount_col)?.unwrap_or(0.0);

        customers
            .entry(customer.to_string())
            .and_modify(|rfm| {
                rfm.last_seen = rfm.last_seen.max(when);
                rfm.frequency += 1.0;
                rfm.monetary += amount;
            })
            .or_insert(Rfm {
                last_seen: when,
                frequency: 1.0,
                monetary: amount,
            });
    }

    let Some(max_seen) = customers.values().map(|rfm| rfm.last_seen).max() else {
        return Ok(Vec::new());
    };
    let reference = max_seen + Duration::days(1);

    let recency: Vec<f64> = customers
        .values()
        .map(|rfm| (reference - rfm.last_seen).num_days() as f64)
        .collect();
    let frequency: Vec<f64> = customers.values().map(|rfm| rfm.frequency).collect();
    let monetary: Vec<f64> = customers.values().map(|rfm| rfm.monetary).collect();

    let recency = min_max(&recency);
    let frequency = min_max(&frequency);
    let monetary = min_max(&monetary);

    let scores: Vec<ChurnScore> = customers
        .into_keys()
        .enumerate()
        .map(|(i, customer_id)| {
            let churn_score = RECENCY_WEIGHT * recency[i]
                + FREQUENCY_WEIGHT * (1.0 - frequency[i])
                + MONETARY_WEIGHT * (1.0 - monetary[i]);
            ChurnScore {
                customer_id,
                churn_score,
                bucket: Bucket::for_score(churn_score),
            }
        })
        .collect();

    tracing::info!(customers = scores.len(), rows = table.len(), "churn scored");
    Ok(scores)
}

/// `(x − min) / (max − min + ε)`; a constant column maps to all zeros.
fn min_max(values: &[f64]) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min + NORMALIZE_EPSILON;
    values.iter().map(|v| (v - min) / range).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(csv: &str) -> Table {
        Table::from_csv(csv.as_bytes()).unwrap()
    }

    fn score_of<'a>(scores: &'a [ChurnScore], id: &str) -> &'a ChurnScore {
        scores.iter().find(|s| s.customer_id == id).unwrap()
    }

    #[test]
    fn engaged_customer_scores_lower() {
        let t = table(
            "customer_id,date,amount\n\
             loyal,2024-03-01,500\n\
             loyal,2024-03-20,450\n\
             loyal,2024-03-30,600\n\
             lapsed,2024-01-05,20\n",
        );
        let scores = score_churn(&t).unwrap();
        let loyal = score_of(&scores, "loyal");
        let lapsed = score_of(&scores, "lapsed");
        assert!(lapsed.churn_score > loyal.churn_score);
        assert_eq!(loyal.bucket, Bucket::Low);
        assert_eq!(lapsed.bucket, Bucket::High);
    }

    #[test]
    fn single_customer_is_finite_and_medium() {
        let t = table("customer_id,txn_date,value\nonly,2024-01-01,10\nonly,2024-01-03,5\n");
        let scores = score_churn(&t).unwrap();
        assert_eq!(scores.len(), 1);
        let s = &scores[0];
        assert!(s.churn_score.is_finite());
        assert!((0.0..=1.0).contains(&s.churn_score));
        assert!((s.churn_score - 0.5).abs() < 1e-9);
        assert_eq!(s.bucket, Bucket::Medium);
    }

    #[test]
    fn scores_stay_in_unit_interval() {
        let t = table(
            "customer_id,date,revenue\n\
             a,2024-01-01,1\nb,2024-02-01,100\nc,2024-03-01,50\nc,2024-03-02,50\nd,2023-06-01,0\n",
        );
        for s in score_churn(&t).unwrap() {
            assert!((0.0..=1.0).contains(&s.churn_score), "{s:?}");
        }
    }

    #[test]
    fn results_are_sorted_by_customer() {
        let t = table("customer_id,date,amount\nz,2024-01-01,1\na,2024-01-02,1\nm,2024-01-03,1\n");
        let ids: Vec<String> = score_churn(&t).unwrap().into_iter().map(|s| s.customer_id).collect();
        assert_eq!(ids, vec!["a", "m", "z"]);
    }

    #[test]
    fn customer_id_must_match_exactly() {
        let t = table("Customer_ID,date,amount\na,2024-01-01,1\n");
        assert!(matches!(score_churn(&t), Err(ChurnError::MissingCustomerId)));
    }

    #[test]
    fn missing_amount_column() {
        let t = table("customer_id,date,qty\na,2024-01-01,1\n");
        assert!(matches!(score_churn(&t), Err(ChurnError::MissingColumns)));
    }

    #[test]
    fn empty_amount_counts_as_zero() {
        let t = table("customer_id,date,amount\na,2024-01-01,\nb,2024-01-01,10\n");
        let scores = score_churn(&t).unwrap();
        assert!(score_of(&scores, "a").churn_score > score_of(&scores, "b").churn_score);
    }

    #[test]
    fn bad_date_is_table_error() {
        let t = table("customer_id,date,amount\na,someday,1\n");
        assert!(matches!(
            score_churn(&t),
            Err(ChurnError::Table(TableError::InvalidDate { .. }))
        ));
    }

    #[test]
    fn empty_table_scores_nobody() {
        let t = table("customer_id,date,amount\n");
        assert!(score_churn(&t).unwrap().is_empty());
    }

    #[test]
    fn bucket_edges() {
        assert_eq!(Bucket::for_score(0.0), Bucket::Low);
        assert_eq!(Bucket::for_score(0.33), Bucket::Low);
        assert_eq!(Bucket::for_score(0.331), Bucket::Medium);
        assert_eq!(Bucket::for_score(0.66), Bucket::Medium);
        assert_eq!(Bucket::for_score(0.9), Bucket::High);
    }

    #[test]
    fn serializes_bucket_lowercase() {
        let s = ChurnScore {
            customer_id: "a".into(),
            churn_score: 0.1,
            bucket: Bucket::Low,
        };
        assert_eq!(
            serde_json::to_value(&s).unwrap(),
            serde_json::json!({"customer_id": "a", "churn_score": 0.1, "bucket": "low"})
        );
    }
}
