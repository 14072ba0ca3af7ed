//! Classification of transcript fragments and interview progress.
//!
//! The model tags its speech with the markers from [`super::prompt`].
//! Each transcript fragment is classified on its own; a marker split
//! across two fragments is not recognized.

use std::collections::VecDeque;

use super::prompt::{FEEDBACK_MARKER, QUESTION_MARKER, TERMINATION_PHRASE};

/// What a transcript fragment asks the session to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// The interview is over.
    Conclude { text: String },
    /// A new question was asked.
    Question { text: String },
    /// Feedback on the previous answer.
    Feedback { text: String },
}

/// Classify one transcript fragment. The termination phrase wins over a
/// question marker, which wins over a feedback marker. Fragments with
/// neither carry no directive.
pub fn classify(fragment: &str) -> Option<Directive> {
    if fragment.contains(TERMINATION_PHRASE) {
        return Some(Directive::Conclude {
            text: fragment.trim().to_string(),
        });
    }
    if let Some(idx) = fragment.find(QUESTION_MARKER) {
        return Some(Directive::Question {
            text: fragment[idx + QUESTION_MARKER.len()..].trim().to_string(),
        });
    }
    if let Some(idx) = fragment.find(FEEDBACK_MARKER) {
        return Some(Directive::Feedback {
            text: fragment[idx + FEEDBACK_MARKER.len()..].trim().to_string(),
        });
    }
    None
}

/// Running state of one interview, driven by [`Directive`]s.
#[derive(Debug, Clone)]
pub struct InterviewProgress {
    question_count: u32,
    total_questions: u32,
    current_question: Option<String>,
    feedback: VecDeque<String>,
    feedback_limit: usize,
    concluded: bool,
}

impl InterviewProgress {
    pub fn new(total_questions: u32, feedback_limit: usize) -> Self {
        Self {
            question_count: 0,
            total_questions,
            current_question: None,
            feedback: VecDeque::new(),
            feedback_limit,
            concluded: false,
        }
    }

    /// Apply a directive. Returns true when the interview concluded.
    pub fn apply(&mut self, directive: Directive) -> bool {
        match directive {
            Directive::Conclude { .. } => {
                self.concluded = true;
                true
            }
            Directive::Question { text } => {
                if self.question_count < self.total_questions {
                    self.question_count += 1;
                }
                self.current_question = Some(text);
                false
            }
            Directive::Feedback { text } => {
                if self.feedback.len() == self.feedback_limit {
                    self.feedback.pop_front();
                }
                self.feedback.push_back(text);
                false
            }
        }
    }

    pub fn question_count(&self) -> u32 {
        self.question_count
    }

    pub fn current_question(&self) -> Option<&str> {
        self.current_question.as_deref()
    }

    pub fn feedback(&self) -> &VecDeque<String> {
        &self.feedback
    }

    pub fn concluded(&self) -> bool {
        self.concluded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn termination_phrase_beats_markers() {
        let fragment = "QUESTION: ignored. That concludes our mock interview. Well done.";
        let directive = classify(fragment);
        assert!(matches!(directive, Some(Directive::Conclude { .. })));
    }

    #[test]
    fn question_marker_beats_feedback_marker() {
        let fragment = "FEEDBACK: good. QUESTION: what next?";
        match classify(fragment) {
            Some(Directive::Question { text }) => assert_eq!(text, "what next?"),
            other => panic!("expected question, got {other:?}"),
        }
    }

    #[test]
    fn extracts_payload_after_marker() {
        match classify("Well then. QUESTION:   Tell me about yourself.  ") {
            Some(Directive::Question { text }) => {
                assert_eq!(text, "Tell me about yourself.");
            }
            other => panic!("expected question, got {other:?}"),
        }
        match classify("FEEDBACK: Clear and concise.") {
            Some(Directive::Feedback { text }) => assert_eq!(text, "Clear and concise."),
            other => panic!("expected feedback, got {other:?}"),
        }
    }

    #[test]
    fn empty_payload_is_still_a_directive() {
        match classify("QUESTION: ") {
            Some(Directive::Question { text }) => assert_eq!(text, ""),
            other => panic!("expected question, got {other:?}"),
        }
    }

    #[test]
    fn split_marker_is_not_recognized() {
        assert_eq!(classify("QUES"), None);
        assert_eq!(classify("TION: what is this?"), None);
        assert_eq!(classify("plain narration with no tags"), None);
    }

    #[test]
    fn feedback_keeps_newest_five_in_order() {
        let mut progress = InterviewProgress::new(10, 5);
        for i in 1..=7 {
            progress.apply(Directive::Feedback {
                text: format!("f{i}"),
            });
        }
        let feedback: Vec<&str> = progress.feedback().iter().map(String::as_str).collect();
        assert_eq!(feedback, ["f3", "f4", "f5", "f6", "f7"]);
    }

    #[test]
    fn question_count_is_monotonic_and_clamped() {
        let mut progress = InterviewProgress::new(3, 5);
        for i in 1..=5 {
            progress.apply(Directive::Question {
                text: format!("q{i}"),
            });
        }
        assert_eq!(progress.question_count(), 3);
        assert_eq!(progress.current_question(), Some("q5"));
    }

    #[test]
    fn conclude_flips_the_flag() {
        let mut progress = InterviewProgress::new(10, 5);
        assert!(!progress.concluded());
        let done = progress.apply(Directive::Conclude {
            text: "That concludes our mock interview.".to_string(),
        });
        assert!(done);
        assert!(progress.concluded());
    }
}
