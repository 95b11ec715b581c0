//! Plain-text cards for analysis results, decisions, state, and the decision log.

use std::fmt::Write;

use chrono::{DateTime, Utc};
use reviewlens_ai::DecisionOutcome;
use reviewlens_core::{AnalysisResult, DecisionLogEntry, IssueCategory, Provenance, SystemState};

const HEURISTIC_WARNING: &str = "LLM analysis failed. Displaying heuristic fallback results.";

pub fn render_analysis(analysis: &AnalysisResult) -> String {
    let mut out = String::new();
    let s = &analysis.sentiment_distribution;

    let _ = writeln!(out, "=== Review Analysis ({}) ===", analysis.source.as_str());
    if analysis.source == Provenance::Heuristic {
        let _ = writeln!(out, "! {HEURISTIC_WARNING}");
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Sentiment Overview");
    let _ = writeln!(out, "  {:<26} {}%", "positive", s.positive);
    let _ = writeln!(out, "  {:<26} {}%", "negative", s.negative);
    let _ = writeln!(out, "  {:<26} {}%", "neutral", s.neutral);
    let _ = writeln!(out, "  {:<26} {}", "urgency", analysis.urgency.as_str());
    let _ = writeln!(out);

    list_section(&mut out, "Key Themes", &analysis.key_themes);
    list_section(&mut out, "Top Customer Pain Points", &analysis.top_pain_points);
    list_section(&mut out, "What Customers Like", &analysis.top_positive_drivers);
    list_section(&mut out, "Recommended Actions", &analysis.recommended_actions);
    out
}

pub fn render_decision(outcome: &DecisionOutcome) -> String {
    let mut out = String::new();
    let d = &outcome.decision;
    let _ = writeln!(out, "=== Decision ===");
    let _ = writeln!(out, "  {:<26} {}", "category", d.issue_category.category);
    let _ = writeln!(out, "  {:<26} {:.2}", "confidence", d.issue_category.confidence);
    let _ = writeln!(out, "  {:<26} {}", "escalation", d.escalation.level);
    let _ = writeln!(out, "  {:<26} {}", "reason", d.escalation.reason);
    let _ = writeln!(out);
    out.push_str(&render_state(&outcome.state));
    out
}

pub fn render_state(state: &SystemState) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== System State ===");
    let _ = writeln!(out, "Issue Counts");
    for c in IssueCategory::ALL {
        let _ = writeln!(out, "  {:<26} {}", c.as_str(), state.issue_counts.get(c));
    }
    let _ = writeln!(out, "Escalation");
    let _ = writeln!(
        out,
        "  {:<26} {}",
        "has_been_escalated",
        if state.escalation.has_been_escalated { "yes" } else { "no" }
    );
    let _ = writeln!(out, "  {:<26} {}", "level", state.escalation.level);
    let updated = state
        .last_updated
        .map(format_ts)
        .unwrap_or_else(|| "never".to_string());
    let _ = writeln!(out, "  {:<26} {}", "last_updated", updated);
    out
}

pub fn render_log(entries: &[DecisionLogEntry]) -> String {
    let mut out = String::new();
    if entries.is_empty() {
        let _ = writeln!(out, "No decisions recorded.");
        return out;
    }
    let _ = writeln!(
        out,
        "{:<24} {:<10} {:>6}  {:<9} reason",
        "timestamp", "category", "conf", "level"
    );
    for e in entries {
        let _ = writeln!(
            out,
            "{:<24} {:<10} {:>6.2}  {:<9} {}",
            format_ts(e.timestamp),
            e.issue_category.category.as_str(),
            e.issue_category.confidence,
            e.escalation.level.as_str(),
            e.escalation.reason,
        );
    }
    out
}

fn list_section(out: &mut String, header: &str, items: &[String]) {
    let _ = writeln!(out, "{header}");
    for item in items {
        let _ = writeln!(out, "  - {item}");
    }
    let _ = writeln!(out);
}

fn format_ts(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use reviewlens_core::{categorize_issue, decide_escalation, estimate, Decision};

    #[test]
    fn heuristic_analysis_carries_warning() {
        let text = render_analysis(&AnalysisResult::heuristic(estimate("")));
        assert!(text.contains("(heuristic)"));
        assert!(text.contains(HEURISTIC_WARNING));
        assert!(text.contains("34%"));
        assert!(text.contains("  - Mixed feedback"));
    }

    #[test]
    fn llm_analysis_has_no_warning() {
        let mut analysis = AnalysisResult::heuristic(estimate("great"));
        analysis.source = Provenance::Llm;
        let text = render_analysis(&analysis);
        assert!(text.contains("(llm)"));
        assert!(!text.contains(HEURISTIC_WARNING));
    }

    #[test]
    fn fresh_state_never_updated() {
        let text = render_state(&SystemState::default());
        assert!(text.contains("never"));
        assert!(text.contains("has_been_escalated"));
        for c in IssueCategory::ALL {
            assert!(text.contains(c.as_str()));
        }
    }

    #[test]
    fn log_rows_in_order() {
        let d = Decision {
            issue_category: categorize_issue("billing", 0.5).unwrap(),
            escalation: decide_escalation("monitor", "double charge").unwrap(),
        };
        let ts = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
        let text = render_log(&[DecisionLogEntry::new(&d, ts)]);
        let row = text.lines().nth(1).unwrap();
        assert!(row.starts_with("2026-03-01 09:30:00 UTC"));
        assert!(row.contains("billing"));
        assert!(row.contains("0.50"));
        assert!(row.ends_with("double charge"));
    }

    #[test]
    fn empty_log() {
        assert_eq!(render_log(&[]), "No decisions recorded.\n");
    }
}
