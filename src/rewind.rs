use crate::session::Question;

/// Where to resume when the user rewinds: the question to ask again, its
/// position in the session, and the answer it was given last time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResumePoint {
    step: usize,
    question: Question,
    answer: Option<String>,
}

impl ResumePoint {
    pub fn new(step: usize, question: Question, answer: Option<String>) -> Self {
        Self {
            step,
            question,
            answer,
        }
    }

    /// Index of the question among the answers collected so far.
    pub fn step(&self) -> usize {
        self.step
    }

    pub fn question(&self) -> &Question {
        &self.question
    }

    pub fn answer(&self) -> Option<&str> {
        self.answer.as_deref()
    }

    /// The question to re-issue, with the recorded answer as its default.
    pub fn into_question(self) -> Question {
        match self.answer {
            Some(answer) => self.question.default(answer),
            None => self.question,
        }
    }
}

/// Questions answered so far in one session, most recent last.
#[derive(Debug, Default)]
pub struct RewindStack {
    points: Vec<ResumePoint>,
}

impl RewindStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remember(&mut self, point: ResumePoint) {
        self.points.push(point);
    }

    pub fn rewind_once(&mut self) -> Option<ResumePoint> {
        self.points.pop()
    }

    /// Forget everything. Called once earlier answers have been acted upon.
    pub fn reset(&mut self) {
        self.points.clear();
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{ResumePoint, RewindStack};
    use crate::session::Question;
    use pretty_assertions::assert_eq;

    #[test]
    fn pops_most_recent_first() {
        let mut stack = RewindStack::new();
        stack.remember(ResumePoint::new(0, Question::new("Name"), Some("ann".into())));
        stack.remember(ResumePoint::new(1, Question::new("Age"), Some("3".into())));
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.rewind_once().map(|p| p.step()), Some(1));
        assert_eq!(stack.rewind_once().map(|p| p.step()), Some(0));
        assert_eq!(stack.rewind_once(), None);
    }

    #[test]
    fn reset_clears() {
        let mut stack = RewindStack::new();
        stack.remember(ResumePoint::new(0, Question::new("Name"), None));
        stack.reset();
        assert!(stack.is_empty());
    }

    #[test]
    fn recorded_answer_becomes_default() {
        let point = ResumePoint::new(0, Question::new("Name").default("bob"), Some("ann".into()));
        assert_eq!(point.into_question().default_answer(), Some("ann"));

        let forgotten = ResumePoint::new(0, Question::new("Name").default("bob"), None);
        assert_eq!(forgotten.into_question().default_answer(), Some("bob"));
    }
}
