use std::io::Write;

use citesync_core::{RecordOutcome, Reconciliation, SkipReason, SyncReport};
use owo_colors::OwoColorize;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// Print the run header before fetching.
pub fn print_run_header(
    w: &mut dyn Write,
    author_id: &str,
    source: &str,
    publications: &std::path::Path,
    color: ColorMode,
) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(
            w,
            "Syncing citations for {} from {}",
            author_id.bold(),
            source.cyan()
        )?;
    } else {
        writeln!(w, "Syncing citations for {} from {}", author_id, source)?;
    }
    writeln!(w, "Publications: {}", publications.display())?;
    writeln!(w)?;
    Ok(())
}

/// Print one line per record describing what the reconciler did.
pub fn print_record_outcomes(
    w: &mut dyn Write,
    reconciliation: &Reconciliation,
    color: ColorMode,
) -> std::io::Result<()> {
    let total = reconciliation.records.len();
    for (i, (record, outcome)) in reconciliation
        .records
        .iter()
        .zip(&reconciliation.outcomes)
        .enumerate()
    {
        let idx = i + 1;
        let title = truncate(record.title().unwrap_or("(untitled)"), 60);
        let fuzzy_note = |fuzzy: &Option<f64>| match fuzzy {
            Some(score) => format!(" [fuzzy {:.2}]", score),
            None => String::new(),
        };

        match outcome {
            RecordOutcome::Updated { old, new, fuzzy } => {
                let change = format!("{} -> {}", old, new);
                if color.enabled() {
                    writeln!(
                        w,
                        "[{}/{}] {} \"{}\" {}{}",
                        idx,
                        total,
                        "UPDATED".green(),
                        title,
                        change.bold(),
                        fuzzy_note(fuzzy).dimmed()
                    )?;
                } else {
                    writeln!(
                        w,
                        "[{}/{}] UPDATED \"{}\" {}{}",
                        idx,
                        total,
                        title,
                        change,
                        fuzzy_note(fuzzy)
                    )?;
                }
            }
            RecordOutcome::Unchanged { citations, fuzzy } => {
                if color.enabled() {
                    writeln!(
                        w,
                        "[{}/{}] {} \"{}\" ({}){}",
                        idx,
                        total,
                        "CHECKED".dimmed(),
                        title,
                        citations,
                        fuzzy_note(fuzzy).dimmed()
                    )?;
                } else {
                    writeln!(
                        w,
                        "[{}/{}] CHECKED \"{}\" ({}){}",
                        idx,
                        total,
                        title,
                        citations,
                        fuzzy_note(fuzzy)
                    )?;
                }
            }
            RecordOutcome::Skipped(reason) => {
                let why = match reason {
                    SkipReason::MissingTitle => "no title",
                    SkipReason::NoMatch => "no match",
                };
                if color.enabled() {
                    writeln!(
                        w,
                        "[{}/{}] {} \"{}\" ({})",
                        idx,
                        total,
                        "SKIPPED".yellow(),
                        title,
                        why
                    )?;
                } else {
                    writeln!(w, "[{}/{}] SKIPPED \"{}\" ({})", idx, total, title, why)?;
                }
            }
        }
    }
    if total > 0 {
        writeln!(w)?;
    }
    Ok(())
}

/// Print the most cited publications after the run.
pub fn print_top_cited(
    w: &mut dyn Write,
    reconciliation: &Reconciliation,
    n: usize,
    color: ColorMode,
) -> std::io::Result<()> {
    let top = reconciliation.top_cited(n);
    if top.is_empty() {
        return Ok(());
    }

    if color.enabled() {
        writeln!(w, "{}", "Top cited:".bold())?;
    } else {
        writeln!(w, "Top cited:")?;
    }
    for (i, record) in top.iter().enumerate() {
        writeln!(
            w,
            "  {}. {} citations: \"{}\"",
            i + 1,
            record.citations(),
            truncate(record.title().unwrap_or("(untitled)"), 60)
        )?;
    }
    writeln!(w)?;
    Ok(())
}

/// Print the final summary block, ending with the one-line counter summary.
pub fn print_summary(
    w: &mut dyn Write,
    report: &SyncReport,
    color: ColorMode,
) -> std::io::Result<()> {
    let reconciliation = &report.reconciliation;

    writeln!(
        w,
        "  Publications processed: {}",
        reconciliation.records.len()
    )?;
    writeln!(
        w,
        "  Total citations: {}",
        reconciliation.total_citations()
    )?;
    writeln!(w, "  Data source: {}", report.source)?;

    let status = if report.written {
        format!("Wrote {}", report.path.display())
    } else {
        format!("Dry run: {} not modified", report.path.display())
    };
    if color.enabled() {
        writeln!(w, "  {}", status.dimmed())?;
    } else {
        writeln!(w, "  {}", status)?;
    }
    writeln!(w)?;

    if color.enabled() {
        writeln!(w, "{}", reconciliation.stats.to_string().bold())?;
    } else {
        writeln!(w, "{}", reconciliation.stats)?;
    }
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let head: String = s.chars().take(max).collect();
        format!("{}...", head)
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use citesync_core::{CitationEntry, PublicationRecord, ReconcileOptions, build_citation_map};
    use std::path::PathBuf;
    use std::time::Duration;

    fn sample_report(written: bool) -> SyncReport {
        let map = build_citation_map(vec![
            CitationEntry::new("Deep Learning Basics", 42),
            CitationEntry::new("Graph Neural Networks Survey", 5),
        ]);
        let records: Vec<PublicationRecord> = serde_json::from_value(serde_json::json!([
            {"title": "Deep Learning Basics!", "citations": 10},
            {"title": "Graph Neural Network Survey", "citations": 5},
            {"title": ""},
        ]))
        .unwrap();
        let now = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        SyncReport {
            path: PathBuf::from("data/publications.json"),
            source: "SerpAPI".to_string(),
            reconciliation: citesync_core::reconcile(
                &map,
                records,
                now,
                &ReconcileOptions::default(),
            ),
            written,
            elapsed: Duration::from_millis(5),
        }
    }

    fn render(f: impl Fn(&mut dyn Write) -> std::io::Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn summary_ends_with_counter_line() {
        let report = sample_report(true);
        let out = render(|w| print_summary(w, &report, ColorMode(false)));
        assert!(out.contains("Total citations: 47"));
        assert!(out.contains("Wrote data/publications.json"));
        assert_eq!(
            out.lines().last().unwrap(),
            "Updated: 1 items, Skipped: 1 items, Fuzzy matched: 1 items, Total Scholar items: 2"
        );
    }

    #[test]
    fn summary_reports_dry_run() {
        let report = sample_report(false);
        let out = render(|w| print_summary(w, &report, ColorMode(false)));
        assert!(out.contains("Dry run: data/publications.json not modified"));
    }

    #[test]
    fn outcomes_listed_per_record() {
        let report = sample_report(true);
        let out = render(|w| print_record_outcomes(w, &report.reconciliation, ColorMode(false)));
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "[1/3] UPDATED \"Deep Learning Basics!\" 10 -> 42");
        assert!(
            lines[1].starts_with("[2/3] CHECKED \"Graph Neural Network Survey\" (5) [fuzzy 0.98]")
        );
        assert_eq!(lines[2], "[3/3] SKIPPED \"(untitled)\" (no title)");
    }

    #[test]
    fn top_cited_ranks_by_count() {
        let report = sample_report(true);
        let out = render(|w| print_top_cited(w, &report.reconciliation, 1, ColorMode(false)));
        assert!(out.contains("1. 42 citations: \"Deep Learning Basics!\""));
        assert!(!out.contains("Graph"));
    }

    #[test]
    fn truncate_is_char_safe() {
        assert_eq!(truncate("가나다라", 2), "가나...");
        assert_eq!(truncate("short", 10), "short");
    }
}
