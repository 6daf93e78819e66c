use chrono::DateTime;
use folio_core::{AppViewModel, JobStatus, Role, SessionSummary, Turn};
use folio_engine::{ActionableItem, ActionablesStatus};

/// Lines to print for the change from `previous` to `view`.
pub fn render(previous: &AppViewModel, view: &AppViewModel) -> Vec<String> {
    let mut lines = Vec::new();
    render_extraction(previous, view, &mut lines);
    render_navigation(previous, view, &mut lines);
    render_session(previous, view, &mut lines);
    lines
}

fn render_extraction(previous: &AppViewModel, view: &AppViewModel, lines: &mut Vec<String>) {
    let (before, now) = (&previous.extraction, &view.extraction);
    match &now.status {
        JobStatus::Idle => {}
        JobStatus::Running => {
            if before.status != JobStatus::Running {
                if let Some(document_id) = &now.document_id {
                    lines.push(format!("Extracting actionables from {document_id}"));
                }
            }
            if now.label != before.label || now.percent != before.percent {
                lines.push(format!("[{:>3}%] {}", now.percent, now.label));
            }
            if now.current_sections != before.current_sections && !now.current_sections.is_empty()
            {
                lines.push(format!("       {}", now.current_sections.join(", ")));
            }
        }
        JobStatus::Succeeded if before.status != JobStatus::Succeeded => {
            lines.push(format!("[100%] Extraction complete: {}", now.label));
        }
        JobStatus::Failed { reason } if before.status != now.status => {
            lines.push(format!(
                "Extraction failed: {reason} (retry with `folio extract --force`)"
            ));
        }
        JobStatus::Succeeded | JobStatus::Failed { .. } => {}
    }
}

fn render_navigation(previous: &AppViewModel, view: &AppViewModel, lines: &mut Vec<String>) {
    if view.navigation_pending && !previous.navigation_pending {
        if let Some(document_id) = &view.active_document {
            lines.push(format!("Opening {document_id}"));
        }
    }
}

fn render_session(previous: &AppViewModel, view: &AppViewModel, lines: &mut Vec<String>) {
    let (before, now) = (&previous.session, &view.session);

    let same_session = before.scope_key == now.scope_key
        && before.conversation_id.is_some()
        && before.conversation_id == now.conversation_id;
    let extends = !before.turns.is_empty() && now.turns.starts_with(&before.turns);
    let continues = same_session || extends;
    let first_new = if continues {
        before.turns.len().min(now.turns.len())
    } else {
        0
    };
    if !continues && !now.turns.is_empty() {
        if let Some(conversation_id) = &now.conversation_id {
            lines.push(format!("Session {conversation_id}"));
        }
    }
    for turn in &now.turns[first_new..] {
        lines.extend(render_turn(turn));
    }

    if now.awaiting_answer && !before.awaiting_answer {
        lines.push("  (waiting for answer)".to_string());
    }
    if now.error != before.error {
        if let Some(error) = &now.error {
            lines.push(format!("error: {error}"));
        }
    }
}

fn render_turn(turn: &Turn) -> Vec<String> {
    let speaker = match turn.role {
        Role::User => "you",
        Role::Assistant => "folio",
    };
    let mut lines = vec![format!("{speaker}> {}", turn.content)];
    for (index, citation) in turn.citations.iter().enumerate() {
        let page = citation
            .page_number()
            .map(|page| format!(" (p. {page})"))
            .unwrap_or_default();
        lines.push(format!("  [{}] {}{}", index + 1, citation.title, page));
    }
    if let Some(record_id) = &turn.record_id {
        lines.push(format!("  record {record_id}"));
    }
    lines
}

pub fn render_sessions(sessions: &[SessionSummary], active: Option<&str>) -> Vec<String> {
    if sessions.is_empty() {
        return vec!["No stored sessions".to_string()];
    }
    sessions
        .iter()
        .map(|session| {
            let marker = if active == Some(session.conversation_id.as_str()) {
                '*'
            } else {
                ' '
            };
            format!(
                "{marker} {}  {}  {} messages  {}",
                session.conversation_id,
                format_timestamp(&session.updated_at),
                session.message_count,
                session.title
            )
        })
        .collect()
}

pub fn render_actionables(status: &ActionablesStatus) -> Vec<String> {
    let result = match status {
        ActionablesStatus::NotExtracted => {
            return vec!["Not extracted yet (run `folio extract`)".to_string()];
        }
        ActionablesStatus::Extracted(result) => result,
    };
    let mut lines = vec![format!(
        "{} actionables ({} validated, {} flagged)",
        result.actionables.len(),
        result.total_validated,
        result.total_flagged
    )];
    lines.extend(
        result
            .actionables
            .iter()
            .enumerate()
            .map(|(index, item)| render_actionable(index + 1, item)),
    );
    lines
}

fn render_actionable(number: usize, item: &ActionableItem) -> String {
    let review = if item.needs_legal_review {
        " [legal review]"
    } else {
        ""
    };
    let page = item
        .source_page_number()
        .map(|page| format!(" (p. {page})"))
        .unwrap_or_default();
    format!(
        "{number:>3}. [{}] {} {} {}{}{}",
        item.modality, item.actor, item.action, item.object, page, review
    )
}

fn format_timestamp(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw)
        .map(|time| time.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|_| raw.to_string())
}
