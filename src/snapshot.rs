//! coercion of document-store snapshots into canonical loans

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

use crate::config::SnapshotConfig;
use crate::decimal::{Money, Rate};
use crate::errors::{LendingError, Result};
use crate::types::{Loan, LoanId, LoanRole, Payment};
use crate::warnings::{Warning, WarningSink};

/// a record that could not be turned into a loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarantinedRecord {
    pub index: usize,
    pub loan_id: Option<String>,
    pub reason: String,
}

/// outcome of ingesting one snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotIngest {
    pub loans: Vec<Loan>,
    pub quarantined: Vec<QuarantinedRecord>,
}

impl SnapshotIngest {
    pub fn is_clean(&self) -> bool {
        self.quarantined.is_empty()
    }
}

/// ingest snapshot text
pub fn ingest_json(
    json: &str,
    viewer_id: Option<&str>,
    config: &SnapshotConfig,
    warnings: &mut WarningSink,
) -> Result<SnapshotIngest> {
    let value: Value = serde_json::from_str(json)?;
    ingest_value(&value, viewer_id, config, warnings)
}

/// ingest a parsed snapshot
///
/// The snapshot is either an array of loan documents or an object keyed by
/// document id. With quarantine enabled, bad records are set aside and
/// reported; otherwise the first bad record fails the ingest.
pub fn ingest_value(
    snapshot: &Value,
    viewer_id: Option<&str>,
    config: &SnapshotConfig,
    warnings: &mut WarningSink,
) -> Result<SnapshotIngest> {
    let records: Vec<(Option<&str>, &Value)> = match snapshot {
        Value::Array(items) => items.iter().map(|v| (None, v)).collect(),
        Value::Object(docs) => docs.iter().map(|(k, v)| (Some(k.as_str()), v)).collect(),
        _ => {
            return Err(LendingError::MalformedRecord {
                index: 0,
                reason: "snapshot must be an array or an object of loan documents".to_string(),
            })
        }
    };

    let mut ingest = SnapshotIngest::default();

    for (index, (doc_id, record)) in records.into_iter().enumerate() {
        match coerce_record(record, doc_id, viewer_id, config) {
            Ok(loan) => ingest.loans.push(loan),
            Err(reason) if config.quarantine_malformed => {
                let loan_id = record_id(record, doc_id);
                warnings.emit(Warning::RecordQuarantined {
                    index,
                    loan_id: loan_id.clone(),
                    reason: reason.clone(),
                });
                ingest.quarantined.push(QuarantinedRecord { index, loan_id, reason });
            }
            Err(reason) => return Err(LendingError::MalformedRecord { index, reason }),
        }
    }

    tracing::debug!(
        accepted = ingest.loans.len(),
        quarantined = ingest.quarantined.len(),
        "snapshot ingested"
    );

    Ok(ingest)
}

/// coerce one document into a validated loan
pub fn coerce_record(
    record: &Value,
    doc_id: Option<&str>,
    viewer_id: Option<&str>,
    config: &SnapshotConfig,
) -> std::result::Result<Loan, String> {
    let obj = record.as_object().ok_or("record is not an object")?;

    let id = record_id(record, doc_id).ok_or("missing id")?;
    let principal = required(obj, &["principalAmount", "principal_amount"], decimal_value)?;
    let rate = required(obj, &["interestRate", "interest_rate"], decimal_value)?;
    let term = required(obj, &["termWeeks", "term_weeks"], integer_value)?;

    if term <= 0 {
        return Err(LendingError::InvalidTerm { term_weeks: term }.to_string());
    }
    if term > config.max_term_weeks as i64 {
        return Err(format!(
            "term of {} weeks exceeds the accepted maximum of {}",
            term, config.max_term_weeks
        ));
    }

    let role = role_of(obj, viewer_id)?;

    let payments_made = match field(obj, &["paymentsMade", "payments_made"]) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, p)| payment_value(p).map_err(|e| format!("payment {}: {}", i, e)))
            .collect::<std::result::Result<Vec<_>, _>>()?,
        Some(_) => return Err("paymentsMade is not an array".to_string()),
    };

    let start_date = match field(obj, &["startDate", "start_date", "createdAt", "created_at"]) {
        None | Some(Value::Null) => None,
        Some(v) => Some(timestamp_value(v).map_err(|e| format!("start date: {}", e))?),
    };

    let loan = Loan {
        id: LoanId::new(id),
        principal_amount: Money::from_decimal(principal),
        interest_rate: Rate::from_percent(rate),
        term_weeks: term as u32,
        role,
        payments_made,
        start_date,
    };
    loan.validate().map_err(|e| e.to_string())?;

    Ok(loan)
}

fn record_id(record: &Value, doc_id: Option<&str>) -> Option<String> {
    match record.get("id") {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => doc_id.map(str::to_string),
    }
}

fn field<'a>(obj: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| obj.get(*name))
}

fn required<T>(
    obj: &Map<String, Value>,
    names: &[&str],
    parse: fn(&Value) -> std::result::Result<T, String>,
) -> std::result::Result<T, String> {
    match field(obj, names) {
        None | Some(Value::Null) => Err(format!("missing {}", names[0])),
        Some(v) => parse(v).map_err(|e| format!("{}: {}", names[0], e)),
    }
}

/// json number or numeric string
fn decimal_value(value: &Value) -> std::result::Result<Decimal, String> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        other => return Err(format!("expected a number, found {}", other)),
    };

    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| format!("not a number: {:?}", text))
}

fn integer_value(value: &Value) -> std::result::Result<i64, String> {
    let d = decimal_value(value)?;
    if !d.fract().is_zero() {
        return Err(format!("expected a whole number, found {}", d));
    }
    d.to_i64().ok_or_else(|| format!("out of range: {}", d))
}

fn role_of(obj: &Map<String, Value>, viewer_id: Option<&str>) -> std::result::Result<LoanRole, String> {
    if let Some(role) = field(obj, &["role"]).and_then(Value::as_str) {
        return match role.trim().to_ascii_lowercase().as_str() {
            "owned" | "lender" => Ok(LoanRole::Owned),
            "owed" | "borrower" => Ok(LoanRole::Owed),
            other => Err(format!("unknown role {:?}", other)),
        };
    }

    let viewer = viewer_id.ok_or("missing role and no viewer to derive it from")?;
    let lender = field(obj, &["lenderId", "lender_id"]).and_then(Value::as_str);
    let borrower = field(obj, &["borrowerId", "borrower_id"]).and_then(Value::as_str);

    match (lender, borrower) {
        (Some(l), _) if l == viewer => Ok(LoanRole::Owned),
        (_, Some(b)) if b == viewer => Ok(LoanRole::Owed),
        _ => Err("viewer is neither lender nor borrower".to_string()),
    }
}

fn payment_value(value: &Value) -> std::result::Result<Payment, String> {
    let obj = value.as_object().ok_or("not an object")?;
    let week = required(obj, &["weekNumber", "week_number"], integer_value)?;
    let amount = required(obj, &["amount"], decimal_value)?;

    let week_number = u32::try_from(week)
        .ok()
        .filter(|w| *w >= 1)
        .ok_or_else(|| format!("week number {} must be at least 1", week))?;

    Ok(Payment::new(week_number, Money::from_decimal(amount)))
}

/// rfc 3339 string, epoch milliseconds, or a `{seconds, nanoseconds}` timestamp
fn timestamp_value(value: &Value) -> std::result::Result<DateTime<Utc>, String> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| e.to_string()),
        Value::Number(_) => {
            let millis = integer_value(value)?;
            Utc.timestamp_millis_opt(millis)
                .single()
                .ok_or_else(|| format!("timestamp out of range: {}", millis))
        }
        Value::Object(obj) => {
            let seconds = required(obj, &["seconds", "_seconds"], integer_value)?;
            let nanos = match field(obj, &["nanoseconds", "_nanoseconds"]) {
                Some(v) => integer_value(v)?,
                None => 0,
            };
            let nanos = u32::try_from(nanos).map_err(|_| format!("bad nanoseconds: {}", nanos))?;
            Utc.timestamp_opt(seconds, nanos)
                .single()
                .ok_or_else(|| format!("timestamp out of range: {}", seconds))
        }
        other => Err(format!("unsupported timestamp {}", other)),
    }
}
