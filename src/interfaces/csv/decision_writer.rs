use crate::application::engine::AuthorizationOutcome;
use crate::error::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct DecisionRow<'a> {
    transaction_id: &'a str,
    status: &'static str,
    approved: bool,
    risk_score: f64,
    risk_level: &'static str,
    revenue_saved: Decimal,
    recorded: bool,
}

/// Writes one CSV row per authorization outcome, header first.
pub struct DecisionWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> DecisionWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_outcome(&mut self, outcome: &AuthorizationOutcome) -> Result<()> {
        let response = outcome.response();
        self.writer.serialize(DecisionRow {
            transaction_id: &response.transaction_id,
            status: response.status.as_str(),
            approved: response.approved,
            risk_score: response.risk_assessment.risk_score,
            risk_level: response.risk_assessment.risk_level.as_str(),
            revenue_saved: response.revenue_saved,
            recorded: outcome.is_recorded(),
        })?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
