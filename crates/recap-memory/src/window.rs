//! Batch window selection over unsummarized messages

use std::collections::HashSet;

use recap_core::{Message, MessageId, WindowPolicy};

use crate::tokens::estimate_tokens;

/// A contiguous chronological run of unsummarized messages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Window {
    pub messages: Vec<Message>,
    pub tokens: u32,
    /// Unsummarized messages left after the window.
    pub remaining: usize,
}

impl Window {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn reaches(&self, threshold: u32) -> bool {
        !self.messages.is_empty() && self.tokens >= threshold
    }
}

/// Walks `unsummarized` in order and returns the leading run sized against `threshold`.
///
/// The first message is always taken, even when it alone exceeds the
/// threshold. Accumulation stops once the total reaches the threshold.
/// A message whose key is already in the window is skipped.
pub fn select_window<'a, I>(unsummarized: I, threshold: u32, policy: WindowPolicy) -> Window
where
    I: IntoIterator<Item = &'a Message>,
{
    let mut iter = unsummarized.into_iter();
    let mut window = Window::default();
    let mut keys: HashSet<MessageId> = HashSet::new();

    for message in iter.by_ref() {
        let key = message.key();
        if keys.contains(&key) {
            continue;
        }
        let tokens = estimate_tokens(&message.text);

        if window.messages.is_empty() {
            window.tokens = tokens;
            keys.insert(key);
            window.messages.push(message.clone());
        } else if window.tokens >= threshold {
            window.remaining += 1;
            break;
        } else {
            let total = window.tokens.saturating_add(tokens);
            if total <= threshold {
                window.tokens = total;
                keys.insert(key);
                window.messages.push(message.clone());
                continue;
            }

            let admit = match policy {
                WindowPolicy::Ceiling => false,
                WindowPolicy::Nearest => total - threshold < threshold - window.tokens,
            };
            if admit {
                window.tokens = total;
                keys.insert(key);
                window.messages.push(message.clone());
            } else {
                window.remaining += 1;
            }
            break;
        }
    }

    window.remaining += iter.filter(|m| !keys.contains(&m.key())).count();
    window
}

/// `batch` with later repeats of a key dropped, order kept.
pub fn unique_by_key(batch: &[Message]) -> Vec<Message> {
    let mut seen = HashSet::new();
    batch
        .iter()
        .filter(|m| seen.insert(m.key()))
        .cloned()
        .collect()
}
