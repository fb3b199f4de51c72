//! One-shot record submission.

use chrono::{NaiveDate, Utc};
use dailytracker_core::{Category, SymptomRecord};
use dailytracker_providers::AppendSummary;

use crate::app::App;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult, LOGIN_HINT};

/// Builds a record from command-line values.
///
/// The date defaults to today in UTC; categories not given count zero. A
/// category given twice keeps the last value.
pub fn build_record(
    date: Option<NaiveDate>,
    counts: &[(Category, u32)],
    overwhelm: bool,
    meltdown: bool,
) -> SymptomRecord {
    let date = date.unwrap_or_else(|| Utc::now().date_naive());
    counts
        .iter()
        .fold(SymptomRecord::new(date), |record, &(category, count)| {
            record.with_count(category, count)
        })
        .with_overwhelm(overwhelm)
        .with_meltdown(meltdown)
}

/// Signs in if needed and submits one record.
pub async fn run(
    date: Option<NaiveDate>,
    counts: Vec<(Category, u32)>,
    overwhelm: bool,
    meltdown: bool,
    config: &ClientConfig,
) -> ClientResult<()> {
    let record = build_record(date, &counts, overwhelm, meltdown);
    let app = App::from_config(config)?;

    if !app.session.restore_or_authenticate().await.is_signed_in() {
        return Err(ClientError::AuthRequired(format!("not signed in, {}", LOGIN_HINT)));
    }

    let summary = app.sync.submit(&record).await?;
    print_success(&record, &summary, &app.sync.config().name);
    Ok(())
}

pub(crate) fn print_success(record: &SymptomRecord, summary: &AppendSummary, sheet: &str) {
    match summary.updated_range {
        Some(ref range) => println!("Saved {} to \"{}\" ({}).", record.date, sheet, range),
        None => println!("Saved {} to \"{}\".", record.date, sheet),
    }
}
