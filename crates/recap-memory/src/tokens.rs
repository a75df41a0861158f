//! Approximate token estimation

use recap_core::Message;

/// Rough token count: one token per four characters, rounded up.
///
/// Counts Unicode scalar values, so the estimate never decreases when text is appended.
pub fn estimate_tokens(text: &str) -> u32 {
    let chars = text.chars().count();
    chars.div_ceil(4).min(u32::MAX as usize) as u32
}

pub fn estimate_batch_tokens(messages: &[Message]) -> u32 {
    messages
        .iter()
        .map(|m| estimate_tokens(&m.text))
        .fold(0u32, u32::saturating_add)
}
