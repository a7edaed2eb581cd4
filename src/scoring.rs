// src/scoring.rs

//! Question-by-question scoring of one attempt.
//!
//! Point overrides are staged in memory and only reach the backend as a
//! single aggregate through `PUT /attempts/{id}/score`.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
    error::AppError,
    models::{
        attempt::{AttemptDetail, RecordedAnswer, ScoringQuestion},
        question::QuestionType,
    },
};

/// Weight given to a synthesised question whose answer reports none.
const DEFAULT_QUESTION_POINTS: f64 = 10.0;

#[derive(Debug, Clone)]
pub struct ScoringWorkbench {
    detail: AttemptDetail,
    answers: Vec<RecordedAnswer>,
    current: usize,
    /// Staged overrides keyed by question id.
    staged: BTreeMap<i64, f64>,
}

/// One question as shown to the scorer.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionView {
    pub index: usize,
    pub total: usize,
    pub question: ScoringQuestion,
    pub answer: Option<RecordedAnswer>,
    /// Points the aggregate would count for this question right now.
    pub effective_points: f64,
    pub staged: Option<f64>,
    pub has_previous: bool,
    pub has_next: bool,
}

impl ScoringWorkbench {
    pub fn new(mut detail: AttemptDetail, answers: Vec<RecordedAnswer>) -> Self {
        if detail.questions.is_empty() {
            detail.questions = synthesise_questions(&answers);
        }
        Self {
            detail,
            answers,
            current: 0,
            staged: BTreeMap::new(),
        }
    }

    pub fn detail(&self) -> &AttemptDetail {
        &self.detail
    }

    pub fn answers(&self) -> &[RecordedAnswer] {
        &self.answers
    }

    pub fn questions(&self) -> &[ScoringQuestion] {
        &self.detail.questions
    }

    pub fn index(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> Option<QuestionView> {
        self.view_at(self.current)
    }

    pub fn next(&mut self) -> Option<QuestionView> {
        if self.current + 1 < self.detail.questions.len() {
            self.current += 1;
        }
        self.current()
    }

    pub fn previous(&mut self) -> Option<QuestionView> {
        self.current = self.current.saturating_sub(1);
        self.current()
    }

    pub fn go_to(&mut self, index: usize) -> Result<QuestionView, AppError> {
        let view = self.view_at(index).ok_or_else(|| {
            AppError::BadRequest(format!(
                "Question {} out of range (1-{})",
                index + 1,
                self.detail.questions.len()
            ))
        })?;
        self.current = index;
        Ok(view)
    }

    /// Stages an override for `question_id`. Points must lie within
    /// `0..=question.points`.
    pub fn stage(&mut self, question_id: i64, points: f64) -> Result<(), AppError> {
        let question = self
            .question(question_id)
            .ok_or_else(|| AppError::BadRequest(format!("Unknown question {}", question_id)))?;

        if !points.is_finite() || points < 0.0 || points > question.points {
            return Err(AppError::BadRequest(format!(
                "Score for question {} must be between 0 and {}",
                question_id, question.points
            )));
        }

        self.staged.insert(question_id, points);
        Ok(())
    }

    pub fn staged(&self) -> &BTreeMap<i64, f64> {
        &self.staged
    }

    pub fn discard(&mut self) {
        self.staged.clear();
    }

    pub fn has_changes(&self) -> bool {
        !self.staged.is_empty()
    }

    /// Points counted for one question: staged override, else recorded
    /// points earned, else full points if correct, else zero.
    pub fn points_for(&self, question: &ScoringQuestion) -> f64 {
        if let Some(points) = self.staged.get(&question.id) {
            return *points;
        }
        match self.answer(question.id) {
            Some(RecordedAnswer {
                points_earned: Some(points),
                ..
            }) => *points,
            Some(RecordedAnswer {
                is_correct: Some(true),
                ..
            }) => question.points,
            _ => 0.0,
        }
    }

    /// Total score of the attempt with the staged overrides applied.
    pub fn aggregate(&self) -> f64 {
        self.detail
            .questions
            .iter()
            .map(|q| self.points_for(q))
            .sum()
    }

    /// Folds staged overrides into the recorded answers after a successful save.
    pub fn commit(&mut self, total: f64) {
        for (question_id, points) in std::mem::take(&mut self.staged) {
            match self.answers.iter_mut().find(|a| a.question_id == question_id) {
                Some(answer) => answer.points_earned = Some(points),
                // Unanswered question scored by hand
                None => self.answers.push(RecordedAnswer {
                    question_id,
                    answer: String::new(),
                    is_correct: None,
                    points_earned: Some(points),
                    score: None,
                }),
            }
        }
        self.detail.total_score = Some(total);
    }

    fn question(&self, id: i64) -> Option<&ScoringQuestion> {
        self.detail.questions.iter().find(|q| q.id == id)
    }

    fn answer(&self, question_id: i64) -> Option<&RecordedAnswer> {
        self.answers.iter().find(|a| a.question_id == question_id)
    }

    fn view_at(&self, index: usize) -> Option<QuestionView> {
        let question = self.detail.questions.get(index)?;
        let total = self.detail.questions.len();
        Some(QuestionView {
            index,
            total,
            question: question.clone(),
            answer: self.answer(question.id).cloned(),
            effective_points: self.points_for(question),
            staged: self.staged.get(&question.id).copied(),
            has_previous: index > 0,
            has_next: index + 1 < total,
        })
    }
}

/// Builds placeholder questions when the attempt detail has none.
fn synthesise_questions(answers: &[RecordedAnswer]) -> Vec<ScoringQuestion> {
    answers
        .iter()
        .enumerate()
        .map(|(i, answer)| ScoringQuestion {
            id: answer.question_id,
            number: format!("Q{}", i + 1),
            text: format!("Question {}", i + 1),
            question_type: QuestionType::MultipleChoice,
            options: Vec::new(),
            correct_answer: answer
                .is_correct
                .unwrap_or(false)
                .then(|| answer.answer.clone()),
            points: answer
                .score
                .filter(|s| *s > 0.0)
                .unwrap_or(DEFAULT_QUESTION_POINTS),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: i64, points: f64) -> ScoringQuestion {
        ScoringQuestion {
            id,
            number: format!("Q{}", id),
            text: String::new(),
            question_type: QuestionType::Essay,
            options: vec![],
            correct_answer: None,
            points,
        }
    }

    fn answer(question_id: i64, is_correct: Option<bool>, points_earned: Option<f64>) -> RecordedAnswer {
        RecordedAnswer {
            question_id,
            answer: "A".into(),
            is_correct,
            points_earned,
            score: None,
        }
    }

    fn detail(questions: Vec<ScoringQuestion>) -> AttemptDetail {
        AttemptDetail {
            id: 42,
            participant: None,
            delivery: None,
            started_at: None,
            ended_at: None,
            status: "completed".into(),
            total_score: None,
            questions,
        }
    }

    /// Q1 correct, Q2 has recorded points, Q3 wrong, Q4 unanswered.
    fn workbench() -> ScoringWorkbench {
        ScoringWorkbench::new(
            detail(vec![question(1, 10.0), question(2, 5.0), question(3, 4.0), question(4, 6.0)]),
            vec![
                answer(1, Some(true), None),
                answer(2, Some(false), Some(3.0)),
                answer(3, Some(false), None),
            ],
        )
    }

    #[test]
    fn test_aggregate_with_defaults() {
        assert_eq!(workbench().aggregate(), 13.0);
    }

    #[test]
    fn test_aggregate_all_overridden() {
        let mut wb = workbench();
        wb.stage(1, 2.0).unwrap();
        wb.stage(2, 5.0).unwrap();
        wb.stage(3, 4.0).unwrap();
        wb.stage(4, 1.5).unwrap();
        assert_eq!(wb.aggregate(), 12.5);
    }

    #[test]
    fn test_aggregate_mixed() {
        let mut wb = workbench();
        wb.stage(2, 0.0).unwrap();
        wb.stage(4, 6.0).unwrap();
        // Q1 full credit, Q2 override 0, Q3 zero, Q4 override 6
        assert_eq!(wb.aggregate(), 16.0);
    }

    #[test]
    fn test_recorded_points_beat_correctness() {
        let wb = ScoringWorkbench::new(
            detail(vec![question(1, 10.0)]),
            vec![answer(1, Some(true), Some(7.0))],
        );
        assert_eq!(wb.aggregate(), 7.0);
    }

    #[test]
    fn test_stage_rejects_out_of_range() {
        let mut wb = workbench();
        assert!(matches!(wb.stage(2, 5.5), Err(AppError::BadRequest(_))));
        assert!(matches!(wb.stage(2, -1.0), Err(AppError::BadRequest(_))));
        assert!(matches!(wb.stage(99, 1.0), Err(AppError::BadRequest(_))));
        assert!(!wb.has_changes());
    }

    #[test]
    fn test_navigation_is_bounded() {
        let mut wb = workbench();
        assert!(!wb.current().unwrap().has_previous);
        wb.previous();
        assert_eq!(wb.index(), 0);

        for _ in 0..10 {
            wb.next();
        }
        let last = wb.current().unwrap();
        assert_eq!(last.index, 3);
        assert!(!last.has_next);

        assert!(wb.go_to(4).is_err());
        assert_eq!(wb.go_to(1).unwrap().effective_points, 3.0);
    }

    #[test]
    fn test_commit_folds_overrides() {
        let mut wb = workbench();
        wb.stage(3, 2.0).unwrap();
        let total = wb.aggregate();
        wb.commit(total);

        assert!(!wb.has_changes());
        assert_eq!(wb.detail().total_score, Some(15.0));
        assert_eq!(wb.answers()[2].points_earned, Some(2.0));
        assert_eq!(wb.aggregate(), 15.0);
    }

    #[test]
    fn test_commit_keeps_override_on_unanswered_question() {
        let mut wb = workbench();
        wb.stage(4, 6.0).unwrap();
        let total = wb.aggregate();
        assert_eq!(total, 19.0);

        wb.commit(total);

        assert_eq!(wb.aggregate(), total);
        assert_eq!(wb.detail().total_score, Some(19.0));
        assert_eq!(wb.current().unwrap().answer.map(|a| a.question_id), Some(1));
        assert_eq!(wb.go_to(3).unwrap().effective_points, 6.0);
    }

    #[test]
    fn test_discard_restores_recorded_scores() {
        let mut wb = workbench();
        wb.stage(1, 0.0).unwrap();
        wb.discard();
        assert_eq!(wb.aggregate(), 13.0);
    }

    #[test]
    fn test_questions_synthesised_from_answers() {
        let mut scored = answer(7, Some(true), None);
        scored.score = Some(4.0);
        let wb = ScoringWorkbench::new(detail(vec![]), vec![scored, answer(9, None, None)]);

        let questions = wb.questions();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].number, "Q1");
        assert_eq!(questions[0].points, 4.0);
        assert_eq!(questions[0].correct_answer.as_deref(), Some("A"));
        assert_eq!(questions[1].points, 10.0);
        assert_eq!(wb.aggregate(), 4.0);
    }
}
