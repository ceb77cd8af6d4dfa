use crate::domain::amortization::{Schedule, ScheduleLine};
use crate::domain::money::Money;
use crate::domain::plan::PlanSummary;
use chrono::NaiveDate;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct ScheduleRow {
    installment: u32,
    due_date: NaiveDate,
    total: Money,
    principal: Money,
    interest: Money,
}

impl From<&ScheduleLine> for ScheduleRow {
    fn from(line: &ScheduleLine) -> Self {
        Self {
            installment: line.sequence,
            due_date: line.due_date,
            total: line.total,
            principal: line.principal,
            interest: line.interest,
        }
    }
}

/// Writes schedules and plan summaries as CSV.
pub struct ReportWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_schedule(&mut self, schedule: &Schedule) -> csv::Result<()> {
        for line in &schedule.lines {
            self.writer.serialize(ScheduleRow::from(line))?;
        }
        self.writer.flush()?;
        Ok(())
    }

    pub fn write_summaries(&mut self, summaries: &[PlanSummary]) -> csv::Result<()> {
        for summary in summaries {
            self.writer.serialize(summary)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
