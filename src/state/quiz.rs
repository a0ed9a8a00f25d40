use serde::Deserialize;

/// Number of questions requested from the generator.
pub const QUESTION_COUNT: usize = 5;
/// Correct answers needed to win a quiz.
pub const PASSING_SCORE: u32 = 3;

/// One generated question and its expected short answer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QuizQuestion {
    /// Question text.
    #[serde(alias = "question")]
    pub q: String,
    /// Expected answer.
    #[serde(alias = "answer")]
    pub a: String,
}

impl QuizQuestion {
    /// Question with its expected answer.
    pub fn new(prompt: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            q: prompt.into(),
            a: answer.into(),
        }
    }

    /// Question text.
    pub fn prompt(&self) -> &str {
        &self.q
    }

    /// Expected answer.
    pub fn answer(&self) -> &str {
        &self.a
    }
}

/// Trimmed, case-insensitive comparison of a reply with the expected answer.
pub fn answers_match(reply: &str, expected: &str) -> bool {
    reply.trim().to_lowercase() == expected.trim().to_lowercase()
}

/// Result of grading one reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerGrade {
    /// Whether the reply matched.
    pub correct: bool,
    /// The expected answer, shown after a miss.
    pub expected: String,
}

/// Final tally of a completed quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizOutcome {
    /// Correct answers.
    pub score: u32,
    /// Questions asked.
    pub total: usize,
    /// Whether the pass mark was reached.
    pub passed: bool,
}

/// Next thing the ask loop has to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizStep {
    /// Present question `number` (1-based).
    Ask {
        /// Position in the quiz.
        number: usize,
        /// Question text.
        prompt: String,
    },
    /// Every question has been answered.
    Finished(QuizOutcome),
}

/// In-progress quiz of one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizSession {
    score: u32,
    questions: Vec<QuizQuestion>,
    current_index: usize,
    passing_score: u32,
}

impl QuizSession {
    /// Quiz with the default pass mark.
    pub fn new(questions: Vec<QuizQuestion>) -> Self {
        Self::with_passing_score(questions, PASSING_SCORE)
    }

    /// Quiz passed with `passing_score` correct answers.
    pub fn with_passing_score(questions: Vec<QuizQuestion>, passing_score: u32) -> Self {
        Self {
            score: 0,
            questions,
            current_index: 0,
            passing_score,
        }
    }

    /// Correct answers so far.
    pub fn score(&self) -> u32 {
        self.score
    }

    /// Zero-based index of the question being asked.
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Every question of the quiz.
    pub fn questions(&self) -> &[QuizQuestion] {
        &self.questions
    }

    /// Short generated sets simply finish early.
    pub fn is_finished(&self) -> bool {
        self.current_index >= self.questions.len()
    }

    /// What the ask loop does next.
    pub fn step(&self) -> QuizStep {
        match self.questions.get(self.current_index) {
            Some(question) => QuizStep::Ask {
                number: self.current_index + 1,
                prompt: question.q.clone(),
            },
            None => QuizStep::Finished(self.outcome()),
        }
    }

    /// Grade `reply` against the current question and move on. `None` once finished.
    pub fn answer(&mut self, reply: &str) -> Option<AnswerGrade> {
        let question = self.questions.get(self.current_index)?;
        let correct = answers_match(reply, &question.a);
        let grade = AnswerGrade {
            correct,
            expected: question.a.clone(),
        };
        if correct {
            self.score += 1;
        }
        self.current_index += 1;
        Some(grade)
    }

    /// Tally so far; final once every question is answered.
    pub fn outcome(&self) -> QuizOutcome {
        QuizOutcome {
            score: self.score,
            total: self.questions.len(),
            passed: self.score >= self.passing_score,
        }
    }
}
