//! 测验模型、校验规则与评分
//!
//! 评分是纯函数，尝试次数、报名状态等规则在 `services::grading` 中处理

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::validation::ValidationErrors;

/// 题目类型
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
}

/// 单题分值上限
pub const MAX_QUESTION_POINTS: u32 = 1000;

fn default_points() -> u32 {
    1
}

/// 测验题目
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// 缺省时由服务端生成
    #[serde(default)]
    pub id: String,
    pub prompt: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_answer: String,
    #[serde(default = "default_points")]
    pub points: u32,
    #[serde(default)]
    pub explanation: Option<String>,
}

impl Question {
    fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.require_text(&self.prompt, "prompt", 2000);
        errors.check(
            (1..=MAX_QUESTION_POINTS).contains(&self.points),
            "points",
            format!("points must be between 1 and {}", MAX_QUESTION_POINTS),
        );

        match self.question_type {
            QuestionType::MultipleChoice => {
                errors.check(
                    self.options.len() >= 2,
                    "options",
                    "multiple choice questions need at least 2 options",
                );
                let unique: HashSet<&str> = self.options.iter().map(|o| o.trim()).collect();
                errors.check(
                    unique.len() == self.options.len(),
                    "options",
                    "options must be unique",
                );
                errors.check(
                    self.options.iter().any(|o| o == &self.correct_answer),
                    "correctAnswer",
                    "correctAnswer must be one of the options",
                );
            }
            QuestionType::TrueFalse => {
                let answer = self.correct_answer.trim().to_lowercase();
                errors.check(
                    answer == "true" || answer == "false",
                    "correctAnswer",
                    "correctAnswer must be \"true\" or \"false\"",
                );
            }
            QuestionType::ShortAnswer => {
                errors.check(
                    !self.correct_answer.trim().is_empty(),
                    "correctAnswer",
                    "correctAnswer is required",
                );
            }
        }

        errors
    }

    /// 判断答案是否正确
    pub fn is_correct(&self, answer: &str) -> bool {
        match self.question_type {
            QuestionType::MultipleChoice => answer == self.correct_answer,
            QuestionType::TrueFalse => answer.trim().eq_ignore_ascii_case(self.correct_answer.trim()),
            QuestionType::ShortAnswer => {
                normalize_short_answer(answer) == normalize_short_answer(&self.correct_answer)
            }
        }
    }
}

/// 简答题比较：去首尾空白、折叠内部空白、小写
fn normalize_short_answer(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// 测验
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub questions: Vec<Question>,
    pub passing_score: u32,
    #[serde(default)]
    pub time_limit_minutes: Option<u32>,
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

impl Quiz {
    /// 为缺少 id 的题目生成 id
    pub fn assign_question_ids(&mut self) {
        for q in self.questions.iter_mut() {
            if q.id.trim().is_empty() {
                q.id = uuid::Uuid::new_v4().to_string();
            }
        }
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(
            !self.questions.is_empty(),
            "questions",
            "a quiz needs at least one question",
        );
        errors.check(
            self.passing_score <= 100,
            "passingScore",
            "passingScore must be between 0 and 100",
        );
        errors.check(
            self.max_attempts.map_or(true, |n| n >= 1),
            "maxAttempts",
            "maxAttempts must be at least 1",
        );
        errors.check(
            self.time_limit_minutes.map_or(true, |n| n >= 1),
            "timeLimitMinutes",
            "timeLimitMinutes must be at least 1",
        );

        let mut seen = HashSet::new();
        for (i, q) in self.questions.iter().enumerate() {
            if !q.id.is_empty() && !seen.insert(q.id.as_str()) {
                errors.add(format!("questions[{}].id", i), "question ids must be unique");
            }
            errors.merge_prefixed(&format!("questions[{}]", i), q.validate());
        }

        errors.finish()
    }

    pub fn total_points(&self) -> u64 {
        self.questions.iter().map(|q| u64::from(q.points)).sum()
    }

    /// 评分
    pub fn grade(&self, answers: &HashMap<String, String>) -> QuizResult {
        let mut earned = 0u64;
        let results: Vec<QuestionResult> = self
            .questions
            .iter()
            .map(|q| {
                let correct = answers.get(&q.id).map_or(false, |a| q.is_correct(a));
                let earned_points = if correct { q.points } else { 0 };
                earned += u64::from(earned_points);
                QuestionResult {
                    question_id: q.id.clone(),
                    correct,
                    earned_points,
                    correct_answer: q.correct_answer.clone(),
                    explanation: q.explanation.clone(),
                }
            })
            .collect();

        let total = self.total_points();
        let score = if total == 0 {
            0
        } else {
            ((earned as f64 / total as f64 * 100.0).round() as u32).min(100)
        };

        QuizResult {
            score,
            passed: score >= self.passing_score,
            earned_points: earned,
            total_points: total,
            passing_score: self.passing_score,
            results,
        }
    }

    /// 学生可见的测验视图（隐藏答案与解析）
    pub fn public_view(&self) -> PublicQuiz {
        PublicQuiz {
            questions: self
                .questions
                .iter()
                .map(|q| PublicQuestion {
                    id: q.id.clone(),
                    prompt: q.prompt.clone(),
                    question_type: q.question_type,
                    options: match q.question_type {
                        QuestionType::TrueFalse if q.options.is_empty() => {
                            vec!["true".to_string(), "false".to_string()]
                        }
                        _ => q.options.clone(),
                    },
                    points: q.points,
                })
                .collect(),
            passing_score: self.passing_score,
            time_limit_minutes: self.time_limit_minutes,
            max_attempts: self.max_attempts,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    pub id: String,
    pub prompt: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub options: Vec<String>,
    pub points: u32,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuiz {
    pub questions: Vec<PublicQuestion>,
    pub passing_score: u32,
    pub time_limit_minutes: Option<u32>,
    pub max_attempts: Option<u32>,
}

/// 单题评分结果
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResult {
    pub question_id: String,
    pub correct: bool,
    pub earned_points: u32,
    pub correct_answer: String,
    pub explanation: Option<String>,
}

/// 测验评分结果
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    pub score: u32,
    pub passed: bool,
    pub earned_points: u64,
    pub total_points: u64,
    pub passing_score: u32,
    pub results: Vec<QuestionResult>,
}

/// 存储在报名记录上的一次测验尝试
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizAttempt {
    pub lesson_id: String,
    pub score: u32,
    pub passed: bool,
    pub attempted_at: DateTime<Utc>,
}

/// 提交测验请求
#[derive(Debug, Deserialize)]
pub struct SubmitQuizRequest {
    pub answers: HashMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mc(id: &str, options: &[&str], correct: &str) -> Question {
        Question {
            id: id.to_string(),
            prompt: "Which namespace holds drafts?".into(),
            question_type: QuestionType::MultipleChoice,
            options: options.iter().map(|s| s.to_string()).collect(),
            correct_answer: correct.to_string(),
            points: 1,
            explanation: None,
        }
    }

    fn quiz(questions: Vec<Question>, passing_score: u32) -> Quiz {
        Quiz {
            questions,
            passing_score,
            time_limit_minutes: None,
            max_attempts: None,
        }
    }

    #[test]
    fn test_multiple_choice_answer_must_be_an_option() {
        let q = quiz(vec![mc("q1", &["Draft", "User"], "Talk")], 70);
        let errors = q.validate().unwrap_err();
        assert_eq!(errors.errors()[0].field, "questions[0].correctAnswer");

        let q = quiz(vec![mc("q1", &["Draft", "User"], "Draft")], 70);
        assert!(q.validate().is_ok());
    }

    #[test]
    fn test_multiple_choice_needs_two_unique_options() {
        assert!(quiz(vec![mc("q1", &["Draft"], "Draft")], 50).validate().is_err());
        assert!(quiz(vec![mc("q1", &["Draft", "Draft"], "Draft")], 50)
            .validate()
            .is_err());
    }

    #[test]
    fn test_passing_score_range() {
        let q = quiz(vec![mc("q1", &["a", "b"], "a")], 101);
        let errors = q.validate().unwrap_err();
        assert_eq!(errors.errors()[0].field, "passingScore");

        assert!(quiz(vec![mc("q1", &["a", "b"], "a")], 0).validate().is_ok());
        assert!(quiz(vec![mc("q1", &["a", "b"], "a")], 100).validate().is_ok());
    }

    #[test]
    fn test_empty_quiz_and_duplicate_ids_rejected() {
        assert!(quiz(vec![], 50).validate().is_err());
        let q = quiz(vec![mc("q1", &["a", "b"], "a"), mc("q1", &["a", "b"], "b")], 50);
        assert!(q.validate().is_err());
    }

    #[test]
    fn test_true_false_answer_values() {
        let mut q = mc("q1", &[], "maybe");
        q.question_type = QuestionType::TrueFalse;
        assert!(quiz(vec![q.clone()], 50).validate().is_err());
        q.correct_answer = "True".into();
        assert!(quiz(vec![q.clone()], 50).validate().is_ok());
        assert!(q.is_correct("true"));
    }

    #[test]
    fn test_grade_weighted_score() {
        let mut short = mc("q2", &[], "Neutral point of view");
        short.question_type = QuestionType::ShortAnswer;
        short.points = 3;
        let q = quiz(vec![mc("q1", &["a", "b"], "a"), short], 70);

        let mut answers = HashMap::new();
        answers.insert("q2".to_string(), "  neutral   POINT of view ".to_string());
        let result = q.grade(&answers);
        assert_eq!(result.earned_points, 3);
        assert_eq!(result.total_points, 4);
        assert_eq!(result.score, 75);
        assert!(result.passed);
        assert!(!result.results[0].correct);

        answers.insert("q1".to_string(), "b".to_string());
        answers.insert("q2".to_string(), "nope".to_string());
        let result = q.grade(&answers);
        assert_eq!(result.score, 0);
        assert!(!result.passed);
    }

    #[test]
    fn test_points_capped_and_summed_without_overflow() {
        let mut big = mc("q1", &[], "Verifiability");
        big.question_type = QuestionType::ShortAnswer;
        big.points = 3_000_000_000;
        let mut other = big.clone();
        other.id = "q2".into();
        let q = quiz(vec![big, other], 50);

        let err = q.validate().unwrap_err();
        assert!(err.errors().iter().any(|e| e.field == "questions[0].points"));

        let mut answers = HashMap::new();
        answers.insert("q1".to_string(), "verifiability".to_string());
        let result = q.grade(&answers);
        assert_eq!(result.total_points, 6_000_000_000);
        assert_eq!(result.earned_points, 3_000_000_000);
        assert_eq!(result.score, 50);
        assert!(result.passed);
    }

    #[test]
    fn test_public_view_hides_answers() {
        let mut q = quiz(vec![mc("", &["a", "b"], "a")], 50);
        q.assign_question_ids();
        assert!(!q.questions[0].id.is_empty());
        let json = serde_json::to_value(q.public_view()).unwrap();
        assert!(json["questions"][0].get("correctAnswer").is_none());
        assert_eq!(json["questions"][0]["type"], "MULTIPLE_CHOICE");
    }
}
