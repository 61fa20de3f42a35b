//! Plain-text views of client state.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use client_core::{
    risk::FraudSeverity, ApplicationView, ImportSummary, ListSnapshot, Loadable, RiskPresentation,
    SubmissionOutcome, UserRow,
};
use shared::{
    domain::ReviewDecision,
    protocol::{ApplicationSummary, Comment, DashboardSummary, DocumentRecord, UserProfile},
};

fn timestamp(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn severity_label(severity: FraudSeverity) -> &'static str {
    match severity {
        FraudSeverity::Low => "low",
        FraudSeverity::Moderate => "moderate",
        FraudSeverity::Elevated => "elevated",
    }
}

pub fn file_size(bytes: u64) -> String {
    if bytes >= 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{bytes} B")
    }
}

pub fn risk_lines(risk: &RiskPresentation) -> Vec<String> {
    let mut lines = vec![format!(
        "Risk score:  {}",
        risk.risk_score_label().unwrap_or_else(|| "-".to_string())
    )];
    match (risk.verdict, risk.fraud_score_label(), risk.severity()) {
        (Some(verdict), Some(label), Some(severity)) => {
            lines.push(format!(
                "Fraud score: {label} ({} severity)",
                severity_label(severity)
            ));
            let headline = if verdict.is_fraud {
                "FRAUD DETECTED"
            } else {
                "No fraud detected"
            };
            lines.push(format!(
                "Verdict:     {headline}, {} risk",
                verdict.risk_level.as_str().to_ascii_uppercase()
            ));
        }
        _ => lines.push("Fraud score: not scored".to_string()),
    }
    lines
}

pub fn dashboard(summary: &DashboardSummary) -> String {
    format!(
        "Total: {}  Pending: {}  Approved: {}  Flagged: {}  Avg risk: {:.1}",
        summary.total, summary.pending, summary.approved, summary.flagged, summary.avg_risk_score
    )
}

fn summary_row(application: &ApplicationSummary) -> String {
    let risk = RiskPresentation::from_summary(application);
    format!(
        "#{:<5} {:<30} {:<15} risk {:>5}  fraud {:>6}  {}",
        application.id,
        application.company_name,
        application.status.label(),
        risk.risk_score_label().unwrap_or_else(|| "-".into()),
        risk.fraud_score_label().unwrap_or_else(|| "-".into()),
        timestamp(application.submitted_date),
    )
}

pub fn application_list(snapshot: &ListSnapshot) -> String {
    match &snapshot.results {
        Loadable::NotLoaded => "Applications not loaded".to_string(),
        Loadable::Loaded(applications) if applications.is_empty() => {
            "No applications found".to_string()
        }
        Loadable::Loaded(applications) => applications
            .iter()
            .map(summary_row)
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

fn comment_line(comment: &Comment) -> String {
    format!(
        "  [{}] {}: {}",
        timestamp(comment.created_at),
        comment.username.as_deref().unwrap_or("unknown"),
        comment.text
    )
}

fn document_line(document: &DocumentRecord) -> String {
    format!(
        "  #{:<5} {:<30} {:<12} {:>9}  {}",
        document.id,
        document.filename,
        document.file_type.as_str(),
        file_size(document.file_size),
        timestamp(document.uploaded_at)
    )
}

pub fn documents(documents: &Loadable<Vec<DocumentRecord>>) -> String {
    match documents {
        Loadable::NotLoaded => "  (not loaded)".to_string(),
        Loadable::Loaded(documents) if documents.is_empty() => {
            "  No documents uploaded".to_string()
        }
        Loadable::Loaded(documents) => documents
            .iter()
            .map(document_line)
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

fn comments(comments: &Loadable<Vec<Comment>>) -> String {
    match comments {
        Loadable::NotLoaded => "  (not loaded)".to_string(),
        Loadable::Loaded(comments) if comments.is_empty() => "  No comments yet".to_string(),
        Loadable::Loaded(comments) => comments
            .iter()
            .map(comment_line)
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

pub fn application_detail(view: &ApplicationView, actions: &[ReviewDecision]) -> String {
    let app = &view.application;
    let mut out = String::new();
    let _ = writeln!(out, "#{} {} [{}]", app.id, app.company_name, app.status.label());
    let _ = writeln!(out, "Email:       {}", app.email);
    for (label, value) in [
        ("Phone:", &app.phone),
        ("Address:", &app.address),
        ("City:", &app.city),
        ("State:", &app.state),
        ("Zip:", &app.zip),
        ("Tax ID:", &app.tax_id),
        ("Industry:", &app.industry),
        ("About:", &app.description),
    ] {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            let _ = writeln!(out, "{label:<12} {value}");
        }
    }
    let _ = writeln!(out, "Submitted:   {}", timestamp(app.submitted_date));
    for line in risk_lines(&view.risk) {
        let _ = writeln!(out, "{line}");
    }

    let enabled: Vec<String> = app
        .security_controls
        .iter()
        .flat_map(|(category, controls)| {
            controls
                .iter()
                .filter(|(_, value)| value.as_bool() == Some(true))
                .map(move |(control, _)| format!("{category}.{control}"))
        })
        .collect();
    if !enabled.is_empty() {
        let _ = writeln!(out, "Controls:    {}", enabled.join(", "));
    }

    let _ = writeln!(out, "Comments:");
    let _ = writeln!(out, "{}", comments(&view.comments));
    let _ = writeln!(out, "Documents:");
    let _ = writeln!(out, "{}", documents(&view.documents));

    if !app.audit_logs.is_empty() {
        let _ = writeln!(out, "Audit log:");
        for entry in &app.audit_logs {
            let _ = writeln!(
                out,
                "  [{}] {} {}",
                timestamp(entry.timestamp),
                entry.action,
                entry.details.as_deref().unwrap_or_default()
            );
        }
    }

    let actions = if actions.is_empty() {
        "none".to_string()
    } else {
        actions
            .iter()
            .map(|action| match action {
                ReviewDecision::Approve => "approve",
                ReviewDecision::Flag => "flag",
            })
            .collect::<Vec<_>>()
            .join(", ")
    };
    let _ = write!(out, "Actions:     {actions}");
    out
}

pub fn submission(outcome: &SubmissionOutcome) -> String {
    let mut lines = vec![format!(
        "Application #{} submitted [{}]",
        outcome.application_id,
        outcome.status.label()
    )];
    lines.extend(risk_lines(&outcome.risk));
    lines.join("\n")
}

pub fn import(summary: &ImportSummary) -> String {
    let mut out = format!(
        "Imported {} of {} records ({} skipped)",
        summary.imported, summary.total, summary.skipped
    );
    if let Some(breakdown) = summary.status_breakdown {
        let _ = write!(
            out,
            "\nPending: {}  Approved: {}  Flagged: {}",
            breakdown.pending, breakdown.approved, breakdown.flagged
        );
    }
    out
}

pub fn whoami(user: Option<&UserProfile>) -> String {
    match user {
        Some(user) => format!("{} <{}> ({})", user.username, user.email, user.role),
        None => "Signed in (profile unavailable)".to_string(),
    }
}

pub fn users(rows: &[UserRow]) -> String {
    if rows.is_empty() {
        return "No users".to_string();
    }
    rows.iter()
        .map(|row| {
            format!(
                "#{:<5} {:<20} {:<30} {:<9}{}",
                row.user.id,
                row.user.username,
                row.user.email,
                row.user.role.as_str(),
                if row.is_self { " (you)" } else { "" }
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
