use crate::domain::installment::{Installment, InstallmentStatus};
use crate::domain::money::Money;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::io::Write;

/// Flat CSV view of an installment.
#[derive(Debug, Serialize)]
struct InstallmentRow {
    plan: u64,
    installment: u32,
    due_date: NaiveDate,
    total: Money,
    principal: Money,
    interest: Money,
    status: InstallmentStatus,
    paid_at: Option<NaiveDateTime>,
    paid_amount: Option<Money>,
}

impl From<&Installment> for InstallmentRow {
    fn from(i: &Installment) -> Self {
        Self {
            plan: i.id.plan.0,
            installment: i.id.sequence,
            due_date: i.due_date,
            total: i.total,
            principal: i.principal,
            interest: i.interest,
            status: i.status,
            paid_at: i.paid_at,
            paid_amount: i.paid_amount,
        }
    }
}

/// Writes final installment state as CSV.
pub struct InstallmentWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> InstallmentWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_installments<'a>(
        &mut self,
        installments: impl IntoIterator<Item = &'a Installment>,
    ) -> csv::Result<()> {
        for installment in installments {
            self.writer.serialize(InstallmentRow::from(installment))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
