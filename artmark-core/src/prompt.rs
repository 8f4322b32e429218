//! Instruction prompts sent alongside each image.

use crate::styles::STYLE_LABELS;

/// The instruction the adapter was fine-tuned on. Training conversations and
/// inference requests must use the same text.
pub const INSTRUCTION: &str = "Analyze this image and provide the following information in JSON format: watermarks count, text in the image, main object, and visual style.";

/// A longer instruction spelling out the schema and the style vocabulary.
/// Useful with the base model before fine-tuning.
pub fn schema_instruction() -> String {
    let styles = STYLE_LABELS
        .iter()
        .map(|s| format!("\"{s}\""))
        .collect::<Vec<_>>()
        .join(",");
    format!(
        r#"You are an image analysis system. Analyze the provided image and return only a valid JSON object that exactly follows this schema including the exact key names:
{{
  "watermarks": integer,
  "text": string,
  "main_object": string,
  "style": string
}}

Rules:
- Output must be strictly valid JSON (no comments, no explanations, no text outside braces).
- "watermarks" = integer (use 0 if none).
- "text" = any detected text in the image (empty string if none).
- "main_object" = the primary subject of the image in plain English.
- "style" = choose exactly one from the following list:
[{styles}]"#
    )
}

/// Which instruction to send.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PromptKind {
    #[default]
    FineTuned,
    Schema,
}

impl PromptKind {
    pub fn text(self) -> String {
        match self {
            Self::FineTuned => INSTRUCTION.to_string(),
            Self::Schema => schema_instruction(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_instruction_lists_every_style() {
        let text = schema_instruction();
        for style in STYLE_LABELS {
            assert!(text.contains(&format!("\"{style}\"")), "missing {style}");
        }
        assert!(text.contains("\"main_object\": string"));
    }
}
