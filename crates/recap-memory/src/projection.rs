//! Filtered view of the transcript handed to the generation backend

use recap_core::{Message, MessageId, SummarizationState};

pub const SUMMARY_SPEAKER: &str = "Conversation Summary";
pub const SUMMARY_MESSAGE_ID: &str = "recap-summary";

/// Drops summarized messages and injects a single system message carrying every summary.
///
/// The summary message goes right after the leading run of system messages.
/// Nothing is injected when there are no summaries or nothing survives the filter.
pub fn project(live: &[Message], state: &SummarizationState) -> Vec<Message> {
    let mut projected: Vec<Message> = live
        .iter()
        .filter(|m| !state.is_summarized(&m.key()))
        .cloned()
        .collect();

    if projected.is_empty() {
        return projected;
    }

    if let Some(summary) = summary_message(state) {
        let insert_at = projected
            .iter()
            .position(|m| !m.is_system)
            .unwrap_or(projected.len());
        projected.insert(insert_at, summary);
    }

    projected
}

/// The synthetic system message for `state`, if it has any summaries.
pub fn summary_message(state: &SummarizationState) -> Option<Message> {
    let newest = state.summaries.last()?;

    let text = state
        .summaries
        .iter()
        .enumerate()
        .map(|(i, s)| format!("Summary {}: {}", i + 1, s.text))
        .collect::<Vec<_>>()
        .join("\n\n");

    Some(Message {
        id: Some(MessageId::new(SUMMARY_MESSAGE_ID)),
        is_user: false,
        is_system: true,
        speaker_name: SUMMARY_SPEAKER.to_string(),
        text,
        sent_at: newest.created_at,
    })
}
