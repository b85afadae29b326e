//! Plain-text rendering of a [`SessionView`].

use std::fmt::Write;

use postes_core::{Feedback, GroupView, IndicatorState, JobLabel, SessionView, SubmissionStatus};

pub fn render_session(view: &SessionView) -> String {
    let mut out = String::new();
    if let Some(establishment) = &view.establishment {
        let _ = writeln!(out, "Establishment {establishment}");
    }
    out.push_str(&render_groups(&view.groups));
    out.push_str(&render_catalog(&view.catalog));
    out.push_str(&render_indicators(view));
    out.push_str(&render_status(view));
    out
}

pub fn render_groups(groups: &[GroupView]) -> String {
    let mut out = String::new();
    if groups.is_empty() {
        out.push_str("No merged jobs.\n");
        return out;
    }
    out.push_str("Merged jobs:\n");
    for group in groups {
        let canonical = group.canonical.as_deref().unwrap_or("(empty)");
        let _ = write!(out, "  [{}] {}: {}", group.group_id, canonical, labels(&group.members));
        if !group.effective {
            out.push_str(" (not saved: fewer than two jobs)");
        }
        if !group.conflicting.is_empty() {
            let _ = write!(out, " (conflict on {:?})", group.conflicting);
        }
        out.push('\n');
    }
    out
}

pub fn render_catalog(catalog: &[JobLabel]) -> String {
    let mut out = String::from("Jobs:\n");
    for label in catalog {
        let marker = if label.is_merged_result { " *" } else { "" };
        let _ = writeln!(out, "  {:>6}  {}{}", label.id, label.text, marker);
    }
    out
}

pub fn render_suggestions(view: &SessionView) -> String {
    if view.suggestions.is_empty() {
        return "No suggestions.\n".to_string();
    }
    let mut out = String::from("Suggestions:\n");
    for suggestion in &view.suggestions {
        let _ = write!(out, "  ({}) {}", suggestion.index, labels(&suggestion.members));
        if suggestion.already_applied {
            out.push_str(" (applied)");
        } else if !suggestion.usable() {
            let _ = write!(out, " (conflicts with {:?})", suggestion.conflicts);
        }
        out.push('\n');
    }
    out
}

pub fn render_options(options: &[JobLabel]) -> String {
    let mut out = String::from("Available jobs:\n");
    for label in options {
        let _ = writeln!(out, "  {:>6}  {}", label.id, label.text);
    }
    out
}

pub fn render_indicators(view: &SessionView) -> String {
    let mut out = String::from("Indicators:\n");
    for (kind, state) in &view.indicators {
        let text = match state {
            IndicatorState::Idle => "-".to_string(),
            IndicatorState::Loading => "loading".to_string(),
            IndicatorState::Ready(value) => value.to_string(),
            IndicatorState::Failed(message) => format!("failed: {message}"),
            IndicatorState::Cancelled => "cancelled".to_string(),
        };
        let _ = writeln!(out, "  {kind}: {text}");
    }
    out
}

pub fn render_status(view: &SessionView) -> String {
    let mut out = String::new();
    match view.submission {
        SubmissionStatus::Idle => {}
        SubmissionStatus::InFlight => out.push_str("Saving...\n"),
        SubmissionStatus::Saved => out.push_str("Saved.\n"),
        SubmissionStatus::Failed => out.push_str("Save failed.\n"),
    }
    if let Some(feedback) = &view.feedback {
        out.push_str(&render_feedback(feedback));
        out.push('\n');
    }
    out
}

pub fn render_feedback(feedback: &Feedback) -> String {
    match feedback {
        Feedback::Conflict { labels, .. } => {
            format!("Jobs belong to several groups: {}", labels.join(", "))
        }
        Feedback::SuggestionRefused { index, labels, .. } => format!(
            "Suggestion ({index}) overlaps existing groups: {}",
            labels.join(", ")
        ),
        Feedback::EditRejected(message) => format!("Edit rejected: {message}"),
        Feedback::SubmitFailed(message) => format!("Could not save: {message}"),
        Feedback::LoadFailed(message) => format!("Could not load: {message}"),
        Feedback::Saved => "Grouping saved.".to_string(),
    }
}

fn labels(members: &[JobLabel]) -> String {
    members
        .iter()
        .map(|label| label.text.as_str())
        .collect::<Vec<_>>()
        .join(" | ")
}
