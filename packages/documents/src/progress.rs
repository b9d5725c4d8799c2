// ABOUTME: Immutable progress snapshots for a batch generation run
// ABOUTME: Each update returns a new snapshot; attempts stay in document order

use serde::{Deserialize, Serialize};

use doculens_core::Section;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    Pending,
    Generating,
    Completed,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationAttempt {
    pub section_id: String,
    pub title: String,
    pub status: AttemptStatus,
    pub error: Option<String>,
    pub used_placeholder: bool,
}

impl GenerationAttempt {
    fn pending(section: &Section) -> Self {
        Self {
            section_id: section.id.clone(),
            title: section.title.clone(),
            status: AttemptStatus::Pending,
            error: None,
            used_placeholder: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationProgress {
    attempts: Vec<GenerationAttempt>,
}

impl GenerationProgress {
    /// One pending attempt per section, in the order given
    pub fn start<'a>(sections: impl IntoIterator<Item = &'a Section>) -> Self {
        Self {
            attempts: sections.into_iter().map(GenerationAttempt::pending).collect(),
        }
    }

    pub fn attempts(&self) -> &[GenerationAttempt] {
        &self.attempts
    }

    pub fn attempt(&self, section_id: &str) -> Option<&GenerationAttempt> {
        self.attempts.iter().find(|a| a.section_id == section_id)
    }

    pub fn mark_generating(&self, section_id: &str) -> Self {
        self.updated(section_id, |attempt| {
            attempt.status = AttemptStatus::Generating;
            attempt.error = None;
        })
    }

    pub fn mark_completed(&self, section_id: &str, used_placeholder: bool) -> Self {
        self.updated(section_id, |attempt| {
            attempt.status = AttemptStatus::Completed;
            attempt.used_placeholder = used_placeholder;
            attempt.error = None;
        })
    }

    pub fn mark_error(&self, section_id: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        self.updated(section_id, move |attempt| {
            attempt.status = AttemptStatus::Error;
            attempt.used_placeholder = false;
            attempt.error = Some(message);
        })
    }

    fn updated(&self, section_id: &str, apply: impl FnOnce(&mut GenerationAttempt)) -> Self {
        let mut next = self.clone();
        if let Some(attempt) = next.attempts.iter_mut().find(|a| a.section_id == section_id) {
            apply(attempt);
        }
        next
    }

    pub fn total(&self) -> usize {
        self.attempts.len()
    }

    pub fn count(&self, status: AttemptStatus) -> usize {
        self.attempts.iter().filter(|a| a.status == status).count()
    }

    pub fn error_count(&self) -> usize {
        self.count(AttemptStatus::Error)
    }

    pub fn placeholder_count(&self) -> usize {
        self.attempts
            .iter()
            .filter(|a| a.status == AttemptStatus::Completed && a.used_placeholder)
            .count()
    }

    /// Attempts that have reached a terminal state
    pub fn finished_count(&self) -> usize {
        self.count(AttemptStatus::Completed) + self.error_count()
    }

    pub fn current(&self) -> Option<&GenerationAttempt> {
        self.attempts
            .iter()
            .find(|a| a.status == AttemptStatus::Generating)
    }

    pub fn failed(&self) -> impl Iterator<Item = &GenerationAttempt> {
        self.attempts
            .iter()
            .filter(|a| a.status == AttemptStatus::Error)
    }

    pub fn percent_complete(&self) -> u8 {
        if self.attempts.is_empty() {
            return 100;
        }
        ((self.finished_count() * 100) / self.total()) as u8
    }

    pub fn is_finished(&self) -> bool {
        self.finished_count() == self.total()
    }
}
