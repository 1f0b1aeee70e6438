//! ## interop-engine::report
//! **Result reporter**
//!
//! Projects a [`ResultMatrix`] onto a comma-delimited, column-aligned table.
//! 🥳 is success, 🚧 a scenario an implementation does not support, 💔 a
//! failure or timeout.

use std::fmt::Write;

use crate::matrix::ResultMatrix;

const HEADER: [&str; 4] = ["scenario", "server", "client", "result"];

/// One row per run, header first.
pub fn render_table(matrix: &ResultMatrix) -> String {
    let rows: Vec<[String; 4]> = matrix
        .iter()
        .map(|r| {
            [
                r.scenario.to_string(),
                r.server.clone(),
                r.client.clone(),
                r.outcome.symbol().to_string(),
            ]
        })
        .collect();

    let mut widths = HEADER.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut table = String::new();
    write_row(&mut table, &HEADER.map(String::from), &widths);
    for row in &rows {
        write_row(&mut table, row, &widths);
    }
    table
}

fn write_row(out: &mut String, row: &[String; 4], widths: &[usize; 4]) {
    let _ = writeln!(
        out,
        "{:<w0$}, {:<w1$}, {:<w2$}, {}",
        row[0],
        row[1],
        row[2],
        row[3],
        w0 = widths[0],
        w1 = widths[1],
        w2 = widths[2],
    );
}

/// Outcome counts followed by the reason of every failed run.
pub fn render_summary(matrix: &ResultMatrix) -> String {
    let [success, unimplemented, failure, timeout] = matrix.tally();
    let mut summary = format!(
        "{} runs: {} success, {} unimplemented, {} failure, {} timeout\n",
        matrix.len(),
        success,
        unimplemented,
        failure,
        timeout
    );
    for result in matrix.iter().filter(|r| r.outcome.is_defect()) {
        let _ = writeln!(
            summary,
            "  {} {} -> {}: {} after {:.1}s",
            result.scenario,
            result.client,
            result.server,
            result.outcome,
            result.duration.as_secs_f64()
        );
    }
    summary
}

/// Table and summary.
pub fn render(matrix: &ResultMatrix) -> String {
    format!("{}\n{}", render_table(matrix), render_summary(matrix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::{Outcome, RunResult};
    use interop_core::ScenarioId;
    use std::time::Duration;

    fn sample() -> ResultMatrix {
        let mut matrix = ResultMatrix::new(
            vec![ScenarioId::Handshake, ScenarioId::LargeDataDownload],
            vec!["openssl".into()],
            vec!["rustls".into(), "go".into()],
        );
        let outcomes = [
            (ScenarioId::Handshake, "rustls", Outcome::Success),
            (ScenarioId::Handshake, "go", Outcome::Failure("handshake failed".into())),
            (ScenarioId::LargeDataDownload, "rustls", Outcome::Timeout),
            (ScenarioId::LargeDataDownload, "go", Outcome::Unimplemented),
        ];
        for (scenario, client, outcome) in outcomes {
            matrix.insert(RunResult {
                scenario,
                client: client.into(),
                server: "openssl".into(),
                outcome,
                duration: Duration::from_secs(2),
            });
        }
        matrix
    }

    #[test]
    fn table_rows_are_aligned_and_ordered() {
        let table = render_table(&sample());
        let lines: Vec<_> = table.lines().collect();
        assert_eq!(
            lines,
            vec![
                "scenario           , server , client, result",
                "handshake          , openssl, rustls, 🥳",
                "handshake          , openssl, go    , 💔",
                "large_data_download, openssl, rustls, 💔",
                "large_data_download, openssl, go    , 🚧",
            ]
        );
    }

    #[test]
    fn summary_lists_failure_reasons() {
        let summary = render_summary(&sample());
        assert!(summary.starts_with("4 runs: 1 success, 1 unimplemented, 1 failure, 1 timeout"));
        assert!(summary.contains("handshake go -> openssl: failure: handshake failed"));
        assert!(summary.contains("large_data_download rustls -> openssl: timeout"));
        assert!(!summary.contains("unimplemented after"));
    }
}
