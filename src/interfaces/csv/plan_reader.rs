use crate::domain::plan::{CustomerEmail, MerchantId, NewPlan, PlanId};
use crate::domain::terms::PlanTerms;
use crate::error::{BnplError, Result};
use serde::Deserialize;
use std::io::Read;

/// A raw plans CSV row. Numeric terms stay text until [`PlanTerms::parse`]
/// so non-finite spellings get a field-specific rejection.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct PlanRecord {
    pub plan: u64,
    pub merchant: String,
    pub customer: String,
    pub principal: String,
    pub rate: String,
    pub tenor: String,
    pub cadence: String,
    pub start: String,
}

impl TryFrom<PlanRecord> for NewPlan {
    type Error = BnplError;

    fn try_from(record: PlanRecord) -> Result<Self> {
        let terms = PlanTerms::parse(
            &record.principal,
            &record.rate,
            &record.tenor,
            &record.cadence,
            &record.start,
        )?;
        Ok(NewPlan {
            id: PlanId(record.plan),
            merchant: MerchantId(record.merchant),
            customer: CustomerEmail::parse(&record.customer)?,
            terms,
        })
    }
}

/// Reads plan requests from a CSV source.
pub struct PlanReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> PlanReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes rows into typed plan requests.
    pub fn plans(self) -> impl Iterator<Item = Result<NewPlan>> {
        self.reader
            .into_deserialize::<PlanRecord>()
            .map(|result| result.map_err(BnplError::from).and_then(NewPlan::try_from))
    }
}
