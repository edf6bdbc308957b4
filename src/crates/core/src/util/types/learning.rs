use serde::{Deserialize, Serialize};

/// External learning material attached to a skill-tree node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub title: String,
    pub url: String,
    #[serde(rename = "type", default)]
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
}

/// Multiple-choice question with options A-D
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    /// One of "A", "B", "C", "D"
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: String,
}

impl QuizQuestion {
    pub fn option(&self, letter: &str) -> Option<&str> {
        match letter.trim().to_ascii_uppercase().as_str() {
            "A" => Some(&self.option_a),
            "B" => Some(&self.option_b),
            "C" => Some(&self.option_c),
            "D" => Some(&self.option_d),
            _ => None,
        }
    }
}
