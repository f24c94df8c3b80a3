//! Prompt assembly for the summarization endpoint.
//!
//! Builds one bounded completion request: supervisor preamble, serialized
//! telemetry context, operator question.

use vigil_common::record::StoredRecord;

/// Maximum records serialized per section. Keeps the prompt bounded when a
/// busy window holds more telemetry than the model needs.
const MAX_RECORDS_PER_SECTION: usize = 50;

/// Fixed instruction preamble for the supervisor role.
pub fn supervisor_preamble(lookback_secs: u64) -> String {
    format!(
        "You are a server supervisor. You are given the system metrics, logs, \
and process snapshots collected from the server over the last {} seconds. \
Answer the operator's question using only this telemetry. Be concise and \
direct; if the data does not contain the answer, say exactly what is missing.",
        lookback_secs
    )
}

/// Build the user-facing part of the completion request: serialized
/// context followed by the operator's question.
pub fn build_context_prompt(
    metrics: &[StoredRecord],
    logs: &[StoredRecord],
    processes: &[StoredRecord],
    question: &str,
) -> String {
    let mut prompt = String::new();
    push_section(&mut prompt, "SYSTEM METRICS", metrics);
    push_section(&mut prompt, "LOGS", logs);
    push_section(&mut prompt, "PROCESS SNAPSHOTS", processes);
    prompt.push_str("Operator question: ");
    prompt.push_str(question);
    prompt
}

/// Serialize one telemetry section as labeled JSON lines.
fn push_section(out: &mut String, title: &str, records: &[StoredRecord]) {
    out.push_str(&format!("=== {} ===\n", title));

    if records.is_empty() {
        out.push_str("(none)\n");
    }

    for record in records.iter().take(MAX_RECORDS_PER_SECTION) {
        out.push_str(&record.to_json().to_string());
        out.push('\n');
    }

    if records.len() > MAX_RECORDS_PER_SECTION {
        out.push_str(&format!(
            "... ({} more records)\n",
            records.len() - MAX_RECORDS_PER_SECTION
        ));
    }

    out.push('\n');
}
