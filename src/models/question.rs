// src/models/question.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// One lettered answer option, e.g. `{ "id": "A", "text": "12" }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionOption {
    pub id: String,
    pub text: String,
}

/// Represents one record in the 'sman1_questions' collection.
///
/// Questions live in a per-teacher bank; a question attached to an exam
/// carries that exam's id and is served to students taking it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,

    #[serde(default)]
    pub exam_id: Option<String>,

    pub text: String,

    #[serde(default)]
    pub subject: Option<String>,

    /// Question kind, e.g. 'pilihan-ganda'.
    #[serde(rename = "type", default)]
    pub question_type: Option<String>,

    /// 'mudah', 'sedang' or 'sulit'.
    #[serde(default)]
    pub difficulty: Option<String>,

    pub options: Vec<QuestionOption>,

    /// Letter of the correct option.
    pub correct_answer: String,

    /// Points awarded, 1-100. Shown to the teacher; exam scoring uses
    /// the plain correct/total percentage.
    pub score: u32,

    #[serde(default)]
    pub explanation: Option<String>,

    /// Name of the owning teacher.
    pub teacher: String,

    pub created_at: DateTime<Utc>,
}

/// DTO for serving a question to an exam taker (excludes the answer key,
/// score and explanation).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    pub id: String,
    pub text: String,
    pub options: Vec<QuestionOption>,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id.clone(),
            text: q.text.clone(),
            options: q.options.clone(),
        }
    }
}

/// DTO for adding a question to the bank. Options are sent as bare
/// texts and lettered by position.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 2000, message = "Question text must not be empty."))]
    pub text: String,
    pub exam_id: Option<String>,
    pub subject: Option<String>,
    #[serde(rename = "type")]
    pub question_type: Option<String>,
    pub difficulty: Option<String>,
    #[validate(custom(function = validate_option_texts))]
    pub options: Vec<String>,
    #[validate(length(min = 1, max = 1, message = "Pick the correct answer."))]
    pub correct_answer: String,
    #[validate(range(min = 1, max = 100, message = "Question score must be between 1 and 100."))]
    pub score: u32,
    #[validate(length(max = 2000))]
    pub explanation: Option<String>,
}

/// DTO for updating a question. Fields are optional; replacing the
/// options re-letters them from A.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuestionRequest {
    #[validate(length(min = 1, max = 2000))]
    pub text: Option<String>,
    pub exam_id: Option<String>,
    pub subject: Option<String>,
    #[serde(rename = "type")]
    pub question_type: Option<String>,
    pub difficulty: Option<String>,
    pub options: Option<Vec<String>>,
    pub correct_answer: Option<String>,
    #[validate(range(min = 1, max = 100, message = "Question score must be between 1 and 100."))]
    pub score: Option<u32>,
    #[validate(length(max = 2000))]
    pub explanation: Option<String>,
}

fn validate_option_texts(options: &[String]) -> Result<(), validator::ValidationError> {
    if options.is_empty() {
        return Err(validator::ValidationError::new("options_cannot_be_empty"));
    }
    for opt in options {
        if opt.trim().is_empty() {
            return Err(validator::ValidationError::new("option_cannot_be_blank"));
        }
        if opt.len() > 500 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}

/// Letter for the option at `index`: A, B, C, ...
pub fn option_letter(index: usize) -> String {
    char::from(b'A' + (index as u8 % 26)).to_string()
}

/// Letters a list of option texts by position.
pub fn letter_options(texts: &[String]) -> Vec<QuestionOption> {
    texts
        .iter()
        .enumerate()
        .map(|(i, text)| QuestionOption {
            id: option_letter(i),
            text: text.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_are_lettered_from_a() {
        let options = letter_options(&[
            "merah".to_string(),
            "kuning".to_string(),
            "hijau".to_string(),
        ]);
        let letters: Vec<&str> = options.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(letters, vec!["A", "B", "C"]);
        assert_eq!(options[1].text, "kuning");
    }

    #[test]
    fn blank_option_text_fails_validation() {
        assert!(validate_option_texts(&["ok".to_string(), "  ".to_string()]).is_err());
        assert!(validate_option_texts(&[]).is_err());
        assert!(validate_option_texts(&["a".to_string(), "b".to_string()]).is_ok());
    }

    #[test]
    fn public_question_hides_the_answer_key() {
        let q = Question {
            id: "question_1".to_string(),
            exam_id: None,
            text: "Ibukota Indonesia?".to_string(),
            subject: Some("Geografi".to_string()),
            question_type: None,
            difficulty: None,
            options: letter_options(&["Jakarta".to_string(), "Bandung".to_string()]),
            correct_answer: "A".to_string(),
            score: 10,
            explanation: None,
            teacher: "Diana Sari, S.Pd.".to_string(),
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(PublicQuestion::from(&q)).unwrap();
        assert!(json.get("correctAnswer").is_none());
        assert!(json.get("score").is_none());
        assert_eq!(json["options"][0]["id"], "A");
    }
}
