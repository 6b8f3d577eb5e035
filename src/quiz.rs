//! Embedded quiz banks and random draw

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::constants::QUIZ_SIZE;

const CAT_QUIZ: &str = include_str!("../assets/cat_quiz.json");
const DOG_QUIZ: &str = include_str!("../assets/dog_quiz.json");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
    pub options: Vec<String>,
    pub answer: String,
}

/// A question as served, with a per-draw id
#[derive(Debug, Clone, Serialize)]
pub struct QuizQuestion {
    pub id: u32,
    #[serde(flatten)]
    pub question: Question,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PetType {
    Cat,
    Dog,
}

impl PetType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cat" => Some(PetType::Cat),
            "dog" => Some(PetType::Dog),
            _ => None,
        }
    }
}

/// Draw up to QUIZ_SIZE questions uniformly at random, ids fresh per draw.
pub fn draw(pet_type: PetType) -> Vec<QuizQuestion> {
    let bank = match pet_type {
        PetType::Cat => CAT_QUIZ,
        PetType::Dog => DOG_QUIZ,
    };

    // Banks are compiled in; a parse failure is a build defect, not runtime input
    let mut questions: Vec<Question> = serde_json::from_str(bank).unwrap_or_default();
    questions.shuffle(&mut rand::rng());
    questions
        .into_iter()
        .take(QUIZ_SIZE)
        .enumerate()
        .map(|(i, question)| QuizQuestion {
            id: i as u32 + 1,
            question,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_banks_parse() {
        for bank in [CAT_QUIZ, DOG_QUIZ] {
            let questions: Vec<Question> = serde_json::from_str(bank).unwrap();
            assert!(questions.len() >= QUIZ_SIZE);
            for q in &questions {
                assert!(q.options.contains(&q.answer), "answer missing from options");
            }
        }
    }

    #[test]
    fn test_draw_returns_quiz_size_distinct_questions() {
        let drawn = draw(PetType::Dog);
        assert_eq!(drawn.len(), QUIZ_SIZE);
        let texts: HashSet<&str> = drawn.iter().map(|q| q.question.question.as_str()).collect();
        assert_eq!(texts.len(), QUIZ_SIZE);
    }

    #[test]
    fn test_pet_type_parse() {
        assert_eq!(PetType::parse("CAT"), Some(PetType::Cat));
        assert_eq!(PetType::parse("dog"), Some(PetType::Dog));
        assert_eq!(PetType::parse("hamster"), None);
    }
}
