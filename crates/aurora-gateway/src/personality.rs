//! Personality-type domain: questions, answers and four-letter type scoring.
//!
//! Every answer is a signed score on one dimension. Positive values lean to
//! the first pole (`E`, `S`, `T`, `J`), negative to the second (`I`, `N`,
//! `F`, `P`). A dimension whose sum is zero resolves to the first pole.

use aurora_kernel::llm::ChatMessage;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

/// Largest magnitude a single answer may carry.
pub const MAX_ANSWER_SCORE: i32 = 3;
/// Bounds on AI-generated question batches.
pub const MAX_GENERATED_QUESTIONS: usize = 40;
pub const DEFAULT_GENERATED_QUESTIONS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Dimension {
    #[serde(rename = "EI")]
    EnergyFocus,
    #[serde(rename = "SN")]
    Perception,
    #[serde(rename = "TF")]
    Judgement,
    #[serde(rename = "JP")]
    Lifestyle,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::EnergyFocus,
        Dimension::Perception,
        Dimension::Judgement,
        Dimension::Lifestyle,
    ];

    pub fn poles(self) -> (char, char) {
        match self {
            Dimension::EnergyFocus => ('E', 'I'),
            Dimension::Perception => ('S', 'N'),
            Dimension::Judgement => ('T', 'F'),
            Dimension::Lifestyle => ('J', 'P'),
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Dimension::EnergyFocus => "EI",
            Dimension::Perception => "SN",
            Dimension::Judgement => "TF",
            Dimension::Lifestyle => "JP",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    pub dimension: Dimension,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub dimension: Dimension,
    pub score: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionScore {
    pub dimension: Dimension,
    /// Winning pole letter.
    pub pole: char,
    /// Share of the first pole, 0..=100.
    pub first_percent: u8,
    /// Share of the second pole, `100 - first_percent`.
    pub second_percent: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeResult {
    pub mbti_type: String,
    pub dimensions: Vec<DimensionScore>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PersonalityError {
    #[error("at least one answer is required")]
    NoAnswers,
    #[error("answer score {0} is outside -{MAX_ANSWER_SCORE}..={MAX_ANSWER_SCORE}")]
    ScoreOutOfRange(i32),
    #[error("'{0}' is not a four-letter personality type")]
    InvalidType(String),
    #[error("question bank is invalid: {0}")]
    InvalidBank(String),
    #[error("no usable questions in the AI response")]
    NoQuestionsParsed,
}

/// Score a set of answers into a four-letter type.
pub fn compute_type(answers: &[Answer]) -> Result<TypeResult, PersonalityError> {
    if answers.is_empty() {
        return Err(PersonalityError::NoAnswers);
    }
    let mut first: BTreeMap<Dimension, i64> = BTreeMap::new();
    let mut second: BTreeMap<Dimension, i64> = BTreeMap::new();
    for answer in answers {
        if !(-MAX_ANSWER_SCORE..=MAX_ANSWER_SCORE).contains(&answer.score) {
            return Err(PersonalityError::ScoreOutOfRange(answer.score));
        }
        let bucket = if answer.score >= 0 { &mut first } else { &mut second };
        *bucket.entry(answer.dimension).or_default() += i64::from(answer.score.unsigned_abs());
    }

    let dimensions: Vec<DimensionScore> = Dimension::ALL
        .into_iter()
        .map(|dimension| {
            let a = first.get(&dimension).copied().unwrap_or_default();
            let b = second.get(&dimension).copied().unwrap_or_default();
            let first_percent = if a + b == 0 {
                50
            } else {
                ((a * 100 + (a + b) / 2) / (a + b)) as u8
            };
            let (p1, p2) = dimension.poles();
            DimensionScore {
                dimension,
                pole: if a >= b { p1 } else { p2 },
                first_percent,
                second_percent: 100 - first_percent,
            }
        })
        .collect();

    Ok(TypeResult {
        mbti_type: dimensions.iter().map(|d| d.pole).collect(),
        dimensions,
    })
}

/// Uppercased type if `raw` names one of the sixteen types.
pub fn normalize_type(raw: &str) -> Result<String, PersonalityError> {
    let upper = raw.trim().to_ascii_uppercase();
    let valid = upper.chars().count() == 4
        && upper.chars().zip(Dimension::ALL).all(|(c, d)| {
            let (a, b) = d.poles();
            c == a || c == b
        });
    if valid {
        Ok(upper)
    } else {
        Err(PersonalityError::InvalidType(raw.to_string()))
    }
}

/// Structural checks for an admin-supplied question bank.
pub fn validate_bank(questions: &[Question]) -> Result<(), PersonalityError> {
    if questions.is_empty() {
        return Err(PersonalityError::InvalidBank("no questions".into()));
    }
    let mut seen = HashSet::new();
    for q in questions {
        if q.id.trim().is_empty() || q.text.trim().is_empty() {
            return Err(PersonalityError::InvalidBank(
                "every question needs an id and text".into(),
            ));
        }
        if !seen.insert(q.id.as_str()) {
            return Err(PersonalityError::InvalidBank(format!(
                "duplicate question id '{}'",
                q.id
            )));
        }
    }
    Ok(())
}

/// Built-in English bank used until an admin stores one.
pub fn default_questions() -> Vec<Question> {
    const BANK: &[(&str, Dimension)] = &[
        ("I feel energized after spending time with a large group.", Dimension::EnergyFocus),
        ("I prefer to think out loud rather than reflect quietly.", Dimension::EnergyFocus),
        ("I enjoy meeting new people at social events.", Dimension::EnergyFocus),
        ("I trust concrete facts more than hunches.", Dimension::Perception),
        ("I focus on present realities rather than future possibilities.", Dimension::Perception),
        ("I prefer step-by-step instructions over open-ended ideas.", Dimension::Perception),
        ("I make decisions based on logic rather than feelings.", Dimension::Judgement),
        ("I value honesty over tact when giving feedback.", Dimension::Judgement),
        ("I find it easy to stay objective in an argument.", Dimension::Judgement),
        ("I like to plan my days in advance.", Dimension::Lifestyle),
        ("I finish tasks well before the deadline.", Dimension::Lifestyle),
        ("I feel uneasy when plans change at the last minute.", Dimension::Lifestyle),
    ];
    BANK.iter()
        .enumerate()
        .map(|(i, (text, dimension))| Question {
            id: format!("q{}", i + 1),
            text: (*text).to_string(),
            dimension: *dimension,
        })
        .collect()
}

#[derive(Deserialize)]
struct GeneratedQuestion {
    text: String,
    dimension: Dimension,
}

/// Extract the JSON question array from a completion, tolerating prose or
/// code fences around it.
pub fn parse_generated_questions(completion: &str) -> Result<Vec<Question>, PersonalityError> {
    let start = completion.find('[').ok_or(PersonalityError::NoQuestionsParsed)?;
    let end = completion.rfind(']').ok_or(PersonalityError::NoQuestionsParsed)?;
    if end < start {
        return Err(PersonalityError::NoQuestionsParsed);
    }
    let raw: Vec<serde_json::Value> = serde_json::from_str(&completion[start..=end])
        .map_err(|_| PersonalityError::NoQuestionsParsed)?;

    let questions: Vec<Question> = raw
        .into_iter()
        .filter_map(|v| serde_json::from_value::<GeneratedQuestion>(v).ok())
        .filter(|q| !q.text.trim().is_empty())
        .enumerate()
        .map(|(i, q)| Question {
            id: format!("ai-{}", i + 1),
            text: q.text.trim().to_string(),
            dimension: q.dimension,
        })
        .collect();
    if questions.is_empty() {
        return Err(PersonalityError::NoQuestionsParsed);
    }
    Ok(questions)
}

fn language(locale: &str) -> &'static str {
    match locale {
        "zh" => "Simplified Chinese",
        _ => "English",
    }
}

pub fn question_prompt(count: usize, locale: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(
            "You write statements for a Myers-Briggs style personality questionnaire. \
             Respond with a JSON array only.",
        ),
        ChatMessage::user(format!(
            "Write {count} agree/disagree statements in {lang}, balanced across the four \
             dimensions. Return a JSON array of objects with fields \"text\" and \
             \"dimension\", where dimension is one of \"EI\", \"SN\", \"TF\", \"JP\" and \
             agreeing with the statement leans towards E, S, T or J respectively.",
            lang = language(locale)
        )),
    ]
}

pub fn analysis_prompt(mbti_type: &str, locale: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(
            "You are a thoughtful personality coach. Write warm, practical analyses \
             without clinical claims.",
        ),
        ChatMessage::user(format!(
            "Write an analysis of the {mbti_type} personality type in {lang}: core traits, \
             strengths, blind spots, relationships and career suggestions. Use short \
             paragraphs.",
            lang = language(locale)
        )),
    ]
}
