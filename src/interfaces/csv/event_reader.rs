use crate::application::engine::LifecycleCommand;
use crate::domain::installment::InstallmentId;
use crate::domain::money::Amount;
use crate::domain::plan::PlanId;
use crate::domain::terms::parse_decimal;
use crate::error::{BnplError, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Pay,
    Sweep,
    Cancel,
}

/// A raw lifecycle events CSV row. Which columns are required depends on the
/// event type. The amount stays text so it is parsed as an exact decimal.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct EventRecord {
    pub r#type: EventType,
    pub plan: Option<u64>,
    pub installment: Option<u32>,
    pub amount: Option<String>,
    pub at: String,
}

impl TryFrom<EventRecord> for LifecycleCommand {
    type Error = BnplError;

    fn try_from(record: EventRecord) -> Result<Self> {
        let at = parse_timestamp(&record.at)?;
        match record.r#type {
            EventType::Pay => {
                let plan = require(record.plan, "pay", "plan")?;
                let sequence = require(record.installment, "pay", "installment")?;
                let raw = require(record.amount.filter(|a| !a.is_empty()), "pay", "amount")?;
                let amount = parse_decimal("amount", &raw)
                    .map_err(|e| BnplError::MalformedEvent(format!("amount: {}", e.reason)))?;
                Ok(LifecycleCommand::Pay {
                    installment: InstallmentId::new(PlanId(plan), sequence),
                    amount: Amount::new(amount)?,
                    at,
                })
            }
            EventType::Sweep => Ok(LifecycleCommand::Sweep { as_of: at }),
            EventType::Cancel => Ok(LifecycleCommand::Cancel {
                plan: PlanId(require(record.plan, "cancel", "plan")?),
                at,
            }),
        }
    }
}

fn require<T>(value: Option<T>, kind: &str, column: &str) -> Result<T> {
    value.ok_or_else(|| BnplError::MalformedEvent(format!("{kind} event without {column}")))
}

/// Accepts `YYYY-MM-DDTHH:MM:SS` (optionally with fractional seconds or a
/// space separator) or a bare date, read as midnight.
fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .or_else(|_| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d").map(|d| d.and_time(chrono::NaiveTime::MIN))
        })
        .map_err(|_| BnplError::MalformedEvent(format!("'{raw}' is not a timestamp")))
}

/// Reads lifecycle commands from a CSV source.
pub struct EventReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> EventReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes rows, in file order.
    pub fn commands(self) -> impl Iterator<Item = Result<LifecycleCommand>> {
        self.reader
            .into_deserialize::<EventRecord>()
            .map(|result| result.map_err(BnplError::from).and_then(LifecycleCommand::try_from))
    }
}
