//! Recovering the annotation record from a free-text generation.
//!
//! The fine-tuned model usually answers with a single JSON object, but it
//! may wrap it in chatter, repeat it, emit literal `\n` sequences between
//! tokens (the training targets were serialized that way), escape its
//! quotes, or stop mid-object when it runs out of tokens. Extraction walks
//! every balanced `{...}` candidate from the end of the text backwards and
//! keeps the first one that yields all four fields. If none does, the last
//! parseable object contributes whatever fields it has.

use serde_json::{Map, Value};

use crate::{
    error::{Error, Result},
    schema::{Annotation, Prediction},
    styles::normalize_label,
};

/// Outcome of [`extract_prediction`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Extraction {
    /// All four fields were recovered from one object.
    Complete(Annotation),
    /// A JSON object was found but only some fields were usable.
    Partial(Prediction),
    /// No JSON object could be recovered.
    Unparsed,
}

impl Extraction {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete(_))
    }

    /// Convert into a [`Prediction`], keeping `raw_output` unless extraction
    /// was clean.
    pub fn into_prediction(self, raw_output: &str) -> Prediction {
        match self {
            Self::Complete(annotation) => annotation.into(),
            Self::Partial(mut prediction) => {
                prediction.raw_output = Some(raw_output.to_string());
                prediction
            }
            Self::Unparsed => Prediction {
                raw_output: Some(raw_output.to_string()),
                ..Default::default()
            },
        }
    }
}

/// Extract the four-field record from a raw generation.
pub fn extract_prediction(raw: &str) -> Extraction {
    let trimmed = raw.trim();
    let mut variants = vec![trimmed.to_string()];
    if trimmed.contains("\\\"") {
        variants.push(trimmed.replace("\\\"", "\""));
    }

    let mut fallback: Option<Fields> = None;
    for variant in &variants {
        for candidate in object_candidates(variant).iter().rev() {
            let Some(object) = parse_object(&candidate.text) else {
                continue;
            };
            let fields = Fields::from_object(&object);
            if let Some(annotation) = fields.complete() {
                return Extraction::Complete(annotation);
            }
            if fallback.is_none() && fields.any() {
                fallback = Some(fields);
            }
        }
    }

    match fallback {
        Some(fields) => Extraction::Partial(fields.into_prediction()),
        None => Extraction::Unparsed,
    }
}

/// Strictly parse an annotation stored as text, as found in the assistant
/// turn of a training conversation. Literal `\n` separators between tokens
/// are tolerated; every field must be present with the right type.
pub fn parse_annotation_text(text: &str) -> Result<Annotation> {
    let candidate = object_candidates(text.trim())
        .into_iter()
        .find(|c| c.closed)
        .ok_or_else(|| Error::Schema(format!("no JSON object in `{}`", text.trim())))?;
    serde_json::from_str(&candidate.text).map_err(|e| Error::Schema(e.to_string()))
}

#[derive(Debug)]
struct Candidate {
    text: String,
    /// False when the text ended before the object closed; the text then has
    /// the missing closers appended.
    closed: bool,
}

/// Scan `text` for top-level `{...}` objects. Brace matching is aware of
/// JSON strings and escapes. Outside strings, literal `\n`, `\t` and `\r`
/// escape sequences become spaces.
fn object_candidates(text: &str) -> Vec<Candidate> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    // End of the last complete top-level member in `current`.
    let mut boundary = 0usize;
    let mut brackets = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if depth == 0 {
            if c == '{' {
                depth = 1;
                current.clear();
                current.push(c);
                boundary = current.len();
                brackets = 0;
            }
            continue;
        }

        if in_string {
            current.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                current.push(c);
            }
            '{' => {
                depth += 1;
                current.push(c);
            }
            '}' => {
                depth -= 1;
                current.push(c);
                if depth == 0 {
                    out.push(Candidate {
                        text: std::mem::take(&mut current),
                        closed: true,
                    });
                }
            }
            '[' => {
                brackets += 1;
                current.push(c);
            }
            ']' => {
                brackets = brackets.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 1 && brackets == 0 => {
                boundary = current.len();
                current.push(c);
            }
            '\\' if matches!(chars.peek(), Some('n' | 't' | 'r')) => {
                chars.next();
                current.push(' ');
            }
            c => current.push(c),
        }
    }

    if depth > 0 {
        // Fallback for a cut inside a key or before a value: keep only the
        // members that were fully written.
        let mut members = current[..boundary].to_string();
        members.push('}');

        if in_string {
            if escaped {
                current.pop();
            }
            current.push('"');
        }
        let keep = current
            .trim_end_matches(|c: char| c.is_whitespace() || c == ',')
            .len();
        current.truncate(keep);
        current.extend(std::iter::repeat('}').take(depth));
        if members != current {
            out.push(Candidate {
                text: members,
                closed: false,
            });
        }
        out.push(Candidate {
            text: current,
            closed: false,
        });
    }
    out
}

fn parse_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

#[derive(Debug, Default)]
struct Fields {
    watermarks: Option<u32>,
    text: Option<String>,
    main_object: Option<String>,
    style: Option<String>,
}

impl Fields {
    fn from_object(object: &Map<String, Value>) -> Self {
        let mut fields = Self::default();
        for (key, value) in object {
            match canonical_key(key) {
                Some(Key::Watermarks) => {
                    fields.watermarks = fields.watermarks.or_else(|| coerce_count(value))
                }
                Some(Key::Text) => fields.text = fields.text.take().or_else(|| coerce_text(value, true)),
                Some(Key::MainObject) => {
                    fields.main_object = fields.main_object.take().or_else(|| coerce_text(value, false))
                }
                Some(Key::Style) => {
                    fields.style = fields.style.take().or_else(|| coerce_text(value, false))
                }
                None => {}
            }
        }
        fields
    }

    fn complete(&self) -> Option<Annotation> {
        Some(Annotation {
            watermarks: self.watermarks?,
            text: self.text.clone()?,
            main_object: self.main_object.clone()?,
            style: self.style.clone()?,
        })
    }

    fn any(&self) -> bool {
        self.watermarks.is_some()
            || self.text.is_some()
            || self.main_object.is_some()
            || self.style.is_some()
    }

    fn into_prediction(self) -> Prediction {
        Prediction {
            watermarks: self.watermarks,
            text: self.text,
            main_object: self.main_object,
            style: self.style,
            ..Default::default()
        }
    }
}

enum Key {
    Watermarks,
    Text,
    MainObject,
    Style,
}

fn canonical_key(key: &str) -> Option<Key> {
    match normalize_label(key).as_str() {
        "watermarks" | "watermark" | "watermark_count" | "watermarks_count"
        | "num_watermarks" => Some(Key::Watermarks),
        "text" | "texts" => Some(Key::Text),
        "main_object" | "mainobject" | "object" | "main_subject" | "subject" => {
            Some(Key::MainObject)
        }
        "style" | "visual_style" => Some(Key::Style),
        _ => None,
    }
}

fn coerce_count(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => {
            if let Some(n) = n.as_u64() {
                u32::try_from(n).ok()
            } else {
                let f = n.as_f64()?;
                (f >= 0.0 && f.fract() == 0.0 && f <= u32::MAX as f64).then_some(f as u32)
            }
        }
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_text(value: &Value, null_as_empty: bool) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => null_as_empty.then(String::new),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()
            .map(|parts| parts.join("; ")),
        Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn girl() -> Annotation {
        Annotation::new(3, "ANNUAL 2", "Girl", "Realism")
    }

    #[test]
    fn clean_object() {
        let raw = r#"{"watermarks": 3, "text": "ANNUAL 2", "main_object": "Girl", "style": "Realism"}"#;
        assert_eq!(extract_prediction(raw), Extraction::Complete(girl()));
    }

    #[test]
    fn spaced_key_and_chatter() {
        let raw = "system\nYou are helpful.\nuser\nAnalyze this image.\nassistant\n\
                   {\"watermarks\": 3, \"text\": \"ANNUAL 2\", \"main object\": \"Girl\", \"style\": \"Realism\"}";
        assert_eq!(extract_prediction(raw), Extraction::Complete(girl()));
    }

    #[test]
    fn literal_newline_escapes_between_tokens() {
        let raw = r#"{\n"watermarks": 3,\n"text": "ANNUAL 2",\n"main object": "Girl",\n"style": "Realism"\n}"#;
        assert_eq!(extract_prediction(raw), Extraction::Complete(girl()));
    }

    #[test]
    fn newline_escape_inside_string_is_kept() {
        let raw = r#"{"watermarks": 2, "text": "VOID 4\nCOPY 1", "main_object": "City", "style": "Cubism"}"#;
        let Extraction::Complete(annotation) = extract_prediction(raw) else {
            panic!("expected a complete extraction");
        };
        assert_eq!(annotation.text, "VOID 4\nCOPY 1");
    }

    #[test]
    fn escaped_quotes() {
        let raw = r#"\"{\"watermarks\": 3, \"text\": \"ANNUAL 2\", \"main_object\": \"Girl\", \"style\": \"Realism\"}\""#;
        assert_eq!(extract_prediction(raw), Extraction::Complete(girl()));
    }

    #[test]
    fn last_complete_object_wins() {
        let raw = r#"Example: {"watermarks": 0, "text": "", "main_object": "Tree", "style": "Baroque"}
Answer: {"watermarks": 3, "text": "ANNUAL 2", "main_object": "Girl", "style": "Realism"}"#;
        assert_eq!(extract_prediction(raw), Extraction::Complete(girl()));
    }

    #[test]
    fn invalid_trailing_object_falls_back_to_earlier_one() {
        let raw = r#"{"watermarks": 3, "text": "ANNUAL 2", "main_object": "Girl", "style": "Realism"} {"watermarks": "many"}"#;
        assert_eq!(extract_prediction(raw), Extraction::Complete(girl()));
    }

    #[test]
    fn braces_inside_strings() {
        let raw = r#"{"watermarks": 1, "text": "{SAMPLE} 3", "main_object": "Vase", "style": "Cubism"}"#;
        let Extraction::Complete(annotation) = extract_prediction(raw) else {
            panic!("expected a complete extraction");
        };
        assert_eq!(annotation.text, "{SAMPLE} 3");
    }

    #[test]
    fn lenient_field_types() {
        let raw = r#"{"Watermarks": "2", "text": null, "mainObject": "Ship", "style": "Romanticism"}"#;
        assert_eq!(
            extract_prediction(raw),
            Extraction::Complete(Annotation::new(2, "", "Ship", "Romanticism"))
        );
        let raw = r#"{"watermarks": 4.0, "text": ["DRAFT 1", "COPY 2"], "main_object": "Bridge", "style": "Impressionism"}"#;
        assert_eq!(
            extract_prediction(raw),
            Extraction::Complete(Annotation::new(4, "DRAFT 1; COPY 2", "Bridge", "Impressionism"))
        );
    }

    #[test]
    fn partial_object_keeps_valid_fields() {
        let raw = r#"{"watermarks": "several", "text": "PROOF 5", "style": "Rococo"}"#;
        let prediction = extract_prediction(raw).into_prediction(raw);
        assert_eq!(prediction.watermarks, None);
        assert_eq!(prediction.text.as_deref(), Some("PROOF 5"));
        assert_eq!(prediction.main_object, None);
        assert_eq!(prediction.style.as_deref(), Some("Rococo"));
        assert_eq!(prediction.raw_output.as_deref(), Some(raw));
    }

    #[test]
    fn truncated_generation_is_partial() {
        let raw = r#"{"watermarks": 5, "text": "CONFIDENTIAL 1; DRAFT 3; COP"#;
        let Extraction::Partial(prediction) = extract_prediction(raw) else {
            panic!("expected a partial extraction");
        };
        assert_eq!(prediction.watermarks, Some(5));
        assert_eq!(prediction.text.as_deref(), Some("CONFIDENTIAL 1; DRAFT 3; COP"));
        assert_eq!(prediction.style, None);

        for raw in [
            r#"{"watermarks": 3, "text": "ANNUAL 2", "main_ob"#,
            r#"{"watermarks": 3, "text": "ANNUAL 2", "main_object""#,
            r#"{"watermarks": 3, "text": "ANNUAL 2", "main_object": "#,
            r#"{"watermarks": 3, "text": "ANNUAL 2", "main_object": {"name"#,
        ] {
            let Extraction::Partial(prediction) = extract_prediction(raw) else {
                panic!("expected a partial extraction for {raw}");
            };
            assert_eq!(prediction.watermarks, Some(3), "{raw}");
            assert_eq!(prediction.text.as_deref(), Some("ANNUAL 2"), "{raw}");
            assert_eq!(prediction.main_object, None, "{raw}");
        }

        assert_eq!(extract_prediction(r#"{"watermarks"#), Extraction::Unparsed);
    }

    #[test]
    fn no_json_is_unparsed() {
        let raw = "The painting shows a girl in a field.";
        assert_eq!(extract_prediction(raw), Extraction::Unparsed);
        let prediction = Extraction::Unparsed.into_prediction(raw);
        assert_eq!(prediction.raw_output.as_deref(), Some(raw));
        assert_eq!(prediction.watermarks, None);

        assert_eq!(extract_prediction(r#"{"foo": 1}"#), Extraction::Unparsed);
    }

    #[test]
    fn strict_ground_truth_parsing() {
        let text = r#"{\n"watermarks": 3,\n"text": "ANNUAL 2",\n"main object": "Girl",\n"style": "Realism"\n}"#;
        assert_eq!(parse_annotation_text(text).unwrap(), girl());

        let err = parse_annotation_text(r#"{"watermarks": 3, "text": "", "main object": "Girl"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("style"), "{err}");

        assert!(parse_annotation_text("no object").is_err());
    }
}
