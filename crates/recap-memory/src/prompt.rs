//! Summarization prompt rendering

use minijinja::{Environment, context};
use serde::Serialize;

use recap_core::{Message, Result, SummarizationConfig, SummarizationError, SummaryRecord};

pub const DEFAULT_PROMPT_TEMPLATE: &str = r#"Please provide a concise summary (2-3 sentences) of the following conversation:

{% if summaries %}
Previous summaries:
{% for summary in summaries %}
Summary {{ summary.ordinal }}: {{ summary.text }}
{% endfor %}

{% endif %}
Messages to summarize:
{% for message in messages %}
{{ message.speaker }}: {{ message.text }}
{% endfor %}

Generate a whole entire summary of what happened in the entire story, sectioning them by chapters. Only create chapters on sections where there are no summary yet. Be very generous with the paragraphs, details, and responses.
Previous chapters, if exists, will give clues on how the story has been.
At the end of the summary, have a separate section for key highlights in bullet points.
Never be afraid to be in detail and explicit.
Goal response count: 500 to 1000 words
If summaries and chapters already exist, continue on top of it.
REMINDER OF FORBIDDEN RULES:
- Do not invent scenes that never happened
- Do not add fillers just to achieve the word count. If only a few words will do, so be it."#;

#[derive(Serialize)]
struct PriorSummary<'a> {
    ordinal: usize,
    text: &'a str,
}

#[derive(Serialize)]
struct PromptMessage<'a> {
    speaker: &'a str,
    text: String,
}

/// Renders the request sent to the generation backend.
pub struct PromptBuilder {
    env: Environment<'static>,
    template: String,
    system_instruction: String,
    preview_chars: usize,
}

impl PromptBuilder {
    pub fn new(config: &SummarizationConfig) -> Result<Self> {
        let template = config
            .prompt_template
            .clone()
            .unwrap_or_else(|| DEFAULT_PROMPT_TEMPLATE.to_string());

        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_auto_escape_callback(|_| minijinja::AutoEscape::None);
        env.template_from_str(&template)
            .map_err(|e| SummarizationError::Template(format!("Failed to parse template: {}", e)))?;

        Ok(Self {
            env,
            template,
            system_instruction: config.system_instruction.clone(),
            preview_chars: config.preview_chars,
        })
    }

    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    /// Prior summaries are labeled by ordinal; batch messages are truncated to the preview length.
    pub fn render(&self, summaries: &[SummaryRecord], batch: &[Message]) -> Result<String> {
        let summaries: Vec<PriorSummary<'_>> = summaries
            .iter()
            .enumerate()
            .map(|(i, s)| PriorSummary {
                ordinal: i + 1,
                text: &s.text,
            })
            .collect();

        let messages: Vec<PromptMessage<'_>> = batch
            .iter()
            .map(|m| PromptMessage {
                speaker: m.display_speaker(),
                text: truncate_preview(&m.text, self.preview_chars),
            })
            .collect();

        let tmpl = self
            .env
            .template_from_str(&self.template)
            .map_err(|e| SummarizationError::Template(e.to_string()))?;

        tmpl.render(context! { summaries => summaries, messages => messages })
            .map_err(|e| SummarizationError::Template(format!("Failed to render template: {}", e)))
    }
}

/// Cuts `text` to at most `max_chars` characters, marking the cut with `...`.
pub fn truncate_preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}
