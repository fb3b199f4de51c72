//! Interactive record entry.
//!
//! Prompts for one record at a time on stdin and submits it. A background
//! [`Refresher`] keeps the session token fresh while the form is open.

use std::io::{self, BufRead, Write};

use chrono::{NaiveDate, Utc};
use dailytracker_core::{Category, SymptomRecord, parse_count};
use dailytracker_sync::{Refresher, SyncError};
use tracing::{debug, warn};

use crate::app::App;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult, LOGIN_HINT};

/// Runs the form until end of input.
pub async fn run(config: &ClientConfig) -> ClientResult<()> {
    let app = App::from_config(config)?;

    if !app.session.restore_or_authenticate().await.is_signed_in() {
        return Err(ClientError::AuthRequired(format!("not signed in, {}", LOGIN_HINT)));
    }

    let refresher = Refresher::new(config.session.refresher_config(), app.session.clone());
    let refresher_handle = refresher.handle();
    let refresher_task = tokio::spawn(refresher.run());

    println!("Daily tracker form. Press Ctrl-D to finish.");

    loop {
        let today = Utc::now().date_naive();
        let record = tokio::task::spawn_blocking(move || {
            let stdin = io::stdin();
            let mut stdout = io::stdout();
            prompt_record(&mut stdin.lock(), &mut stdout, today)
        })
        .await
        .map_err(|e| ClientError::Io(io::Error::other(e)))??;

        let Some(record) = record else {
            break;
        };

        if !app.session.is_signed_in() {
            // Submitting is an explicit action, so consent may be shown again.
            app.session.restore_or_authenticate().await;
        }

        match app.sync.submit(&record).await {
            Ok(summary) => {
                super::submit::print_success(&record, &summary, &app.sync.config().name)
            }
            Err(e) => {
                warn!(error = %e, "submission failed");
                println!("{}", failure_notice(&record, &e));
            }
        }
        println!();
    }

    if let Err(e) = refresher_handle.stop().await {
        debug!(error = %e, "refresher already stopped");
    }
    if let Err(e) = refresher_task.await {
        warn!(error = %e, "refresher task failed");
    }
    Ok(())
}

/// What the user is told when a record could not be saved.
fn failure_notice(record: &SymptomRecord, err: &SyncError) -> String {
    if err.is_auth() {
        format!("Could not save {}: {}. To sign in, {}.", record.date, err, LOGIN_HINT)
    } else {
        format!("Could not save {}: {}", record.date, err)
    }
}

/// Reads one record from `input`, prompting on `output`.
///
/// Returns `Ok(None)` at end of input. Invalid answers are reported and
/// asked again.
pub fn prompt_record<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    today: NaiveDate,
) -> io::Result<Option<SymptomRecord>> {
    let date = loop {
        let Some(answer) = ask(input, output, &format!("Date [{}]", today))? else {
            return Ok(None);
        };
        if answer.is_empty() {
            break today;
        }
        match answer.parse::<NaiveDate>() {
            Ok(date) => break date,
            Err(_) => writeln!(output, "  enter a date as YYYY-MM-DD")?,
        }
    };

    let mut record = SymptomRecord::new(date);
    for category in Category::ALL {
        let count = loop {
            let Some(answer) = ask(input, output, &format!("{} [0]", category))? else {
                return Ok(None);
            };
            match parse_count(category.label(), &answer) {
                Ok(count) => break count,
                Err(e) => writeln!(output, "  {}", e)?,
            }
        };
        record = record.with_count(category, count);
    }

    let Some(overwhelm) = ask_yes_no(input, output, "Overwhelm")? else {
        return Ok(None);
    };
    let Some(meltdown) = ask_yes_no(input, output, "Meltdown")? else {
        return Ok(None);
    };

    Ok(Some(record.with_overwhelm(overwhelm).with_meltdown(meltdown)))
}

fn ask<R: BufRead, W: Write>(input: &mut R, output: &mut W, prompt: &str) -> io::Result<Option<String>> {
    write!(output, "{}: ", prompt)?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn ask_yes_no<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    prompt: &str,
) -> io::Result<Option<bool>> {
    loop {
        let Some(answer) = ask(input, output, &format!("{} [y/N]", prompt))? else {
            return Ok(None);
        };
        match answer.to_ascii_lowercase().as_str() {
            "" | "n" | "no" => return Ok(Some(false)),
            "y" | "yes" => return Ok(Some(true)),
            _ => writeln!(output, "  answer y or n")?,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn run_form(input: &str) -> (Option<SymptomRecord>, String) {
        let mut output = Vec::new();
        let record = prompt_record(&mut input.as_bytes(), &mut output, today()).unwrap();
        (record, String::from_utf8(output).unwrap())
    }

    #[test]
    fn blank_answers_take_defaults() {
        let (record, output) = run_form("\n\n\n\n\n\n\n\n\n\n\n");

        assert_eq!(record, Some(SymptomRecord::new(today())));
        assert!(output.contains("Date [2024-03-01]: "));
        assert!(output.contains("S/M [0]: "));
        assert!(output.contains("Meltdown [y/N]: "));
    }

    #[test]
    fn filled_form() {
        let (record, _) = run_form("2024-02-29\n2\n\n1\n\n\n\n\ny\nn\n");

        let expected = SymptomRecord::new(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())
            .with_count(Category::S, 2)
            .with_count(Category::M, 1)
            .with_overwhelm(true);
        assert_eq!(record, Some(expected));
    }

    #[test]
    fn invalid_answers_are_asked_again() {
        let (record, output) = run_form("yesterday\n\n-1\n3\n\n\n\n\n\n\n\nmaybe\nyes\n\n");

        let record = record.unwrap();
        assert_eq!(record.date, today());
        assert_eq!(record.counts.get(Category::S), 3);
        assert!(record.overwhelm);
        assert!(output.contains("YYYY-MM-DD"));
        assert!(output.contains("answer y or n"));
    }

    #[test]
    fn signed_out_failure_tells_user_to_sign_in() {
        let record = SymptomRecord::new(today());

        let notice = failure_notice(&record, &SyncError::Unauthenticated);
        assert!(notice.starts_with("Could not save 2024-03-01"));
        assert!(notice.contains("dailytracker auth login"));

        let notice = failure_notice(
            &record,
            &SyncError::remote(
                dailytracker_sync::RemoteOperation::AppendRecord,
                dailytracker_providers::ProviderError::server("backend error"),
            ),
        );
        assert!(!notice.contains("auth login"));
    }

    #[test]
    fn end_of_input_stops() {
        assert_eq!(run_form("").0, None);
        assert_eq!(run_form("2024-03-01\n1\n2\n").0, None);
    }
}
