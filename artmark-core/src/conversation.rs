//! The Qwen chat format used for training splits and as the evaluation
//! ground truth.
//!
//! ```json
//! {"messages": [
//!   {"role": "user", "content": [{"type": "image", "image": "a.png"},
//!                                {"type": "text", "text": "Analyze ..."}]},
//!   {"role": "assistant", "content": [{"type": "text", "text": "{\"watermarks\": 0, ...}"}]}
//! ]}
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    extract::parse_annotation_text,
    io::read_json,
    prompt::INSTRUCTION,
    schema::{Annotation, GroundTruth},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub messages: Vec<Message>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentPart>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentPart {
    Image { image: String },
    Text { text: String },
}

impl Conversation {
    /// A training example: the user sends the image and the instruction, the
    /// assistant answers with the annotation as compact JSON.
    pub fn training_example(image: impl Into<String>, annotation: &Annotation) -> Result<Self> {
        Ok(Self {
            messages: vec![
                Message {
                    role: Role::User,
                    content: vec![
                        ContentPart::Image {
                            image: image.into(),
                        },
                        ContentPart::Text {
                            text: INSTRUCTION.to_string(),
                        },
                    ],
                },
                Message {
                    role: Role::Assistant,
                    content: vec![ContentPart::Text {
                        text: serde_json::to_string(annotation)?,
                    }],
                },
            ],
        })
    }

    /// Every image referenced by any message, in order.
    pub fn images(&self) -> impl Iterator<Item = &str> {
        self.messages
            .iter()
            .flat_map(|m| m.content.iter())
            .filter_map(|part| match part {
                ContentPart::Image { image } => Some(image.as_str()),
                ContentPart::Text { .. } => None,
            })
    }

    fn first_text(&self, role: Role) -> Option<&str> {
        self.messages
            .iter()
            .filter(|m| m.role == role)
            .flat_map(|m| m.content.iter())
            .find_map(|part| match part {
                ContentPart::Text { text } => Some(text.as_str()),
                ContentPart::Image { .. } => None,
            })
    }

    /// The ground truth this conversation encodes: its first image and the
    /// annotation in the assistant turn.
    pub fn ground_truth(&self) -> Result<GroundTruth> {
        let image = self
            .images()
            .next()
            .ok_or_else(|| Error::Schema("conversation has no image part".to_string()))?;
        let answer = self.first_text(Role::Assistant).ok_or_else(|| {
            Error::Schema(format!("conversation for `{image}` has no assistant text"))
        })?;
        let annotation = parse_annotation_text(answer)
            .map_err(|e| Error::Schema(format!("ground truth for `{image}`: {e}")))?;
        Ok(GroundTruth {
            image: image.to_string(),
            annotation,
        })
    }
}

/// Load a split file (a JSON list of conversations).
pub fn load_conversations(path: &Path) -> Result<Vec<Conversation>> {
    read_json(path)
}

/// Load the ground truth of every conversation in a split file.
pub fn load_ground_truth(path: &Path) -> Result<Vec<GroundTruth>> {
    load_conversations(path)?
        .iter()
        .map(Conversation::ground_truth)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SPLIT: &str = r#"[{"messages": [
        {"role": "user", "content": [
            {"type": "image", "image": "watermark_new/wikiart_00007.png"},
            {"type": "text", "text": "Analyze this image and provide the following information in JSON format: watermarks count, text in the image, main object, and visual style."}]},
        {"role": "assistant", "content": [
            {"type": "text", "text": "{\\n\"watermarks\": 3,\\n\"text\": \"ANNUAL 2\",\\n\"main object\": \"Girl\",\\n\"style\": \"Realism\"\\n}"}]}
    ]}]"#;

    #[test]
    fn reads_exported_split() {
        let conversations: Vec<Conversation> = serde_json::from_str(SPLIT).unwrap();
        assert_eq!(conversations.len(), 1);
        let gt = conversations[0].ground_truth().unwrap();
        assert_eq!(gt.image, "watermark_new/wikiart_00007.png");
        assert_eq!(gt.annotation, Annotation::new(3, "ANNUAL 2", "Girl", "Realism"));
    }

    #[test]
    fn training_example_round_trips_to_ground_truth() {
        let annotation = Annotation::new(1, "COPYRIGHT", "Landscape with mountains", "Post_Impressionism");
        let conversation = Conversation::training_example("x.png", &annotation).unwrap();
        assert_eq!(conversation.images().collect::<Vec<_>>(), vec!["x.png"]);
        assert_eq!(conversation.ground_truth().unwrap().annotation, annotation);

        let json = serde_json::to_value(&conversation).unwrap();
        assert_eq!(json["messages"][0]["content"][0]["type"], "image");
        assert_eq!(json["messages"][1]["role"], "assistant");
    }

    #[test]
    fn missing_assistant_turn_is_an_error() {
        let conversation = Conversation {
            messages: vec![Message {
                role: Role::User,
                content: vec![ContentPart::Image {
                    image: "y.png".into(),
                }],
            }],
        };
        let err = conversation.ground_truth().unwrap_err();
        assert!(err.to_string().contains("y.png"));
    }
}
