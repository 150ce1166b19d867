// Per-subject pending slot: at most one open transition at a time.

use statig::prelude::*;

use crate::state::{SubjectId, TransitionId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotEvent {
    Open { transition: TransitionId },
    Complete { transition: TransitionId },
}

pub struct PendingSlot {
    subject: SubjectId,
    pending: Option<TransitionId>,
}

impl PendingSlot {
    pub fn new(subject: SubjectId) -> Self {
        Self {
            subject,
            pending: None,
        }
    }
}

#[state_machine(initial = "State::no_transition_pending()")]
impl PendingSlot {
    #[state]
    fn no_transition_pending(&mut self, event: &SlotEvent) -> Outcome<State> {
        match event {
            SlotEvent::Open { transition } => {
                self.pending = Some(*transition);
                tracing::debug!(subject = %self.subject, transition = %transition, "Transition pending");
                Transition(State::transition_pending())
            }
            SlotEvent::Complete { transition } => {
                tracing::warn!(
                    subject = %self.subject,
                    transition = %transition,
                    "Completion ignored: nothing pending"
                );
                Handled
            }
        }
    }

    #[state]
    fn transition_pending(&mut self, event: &SlotEvent) -> Outcome<State> {
        match event {
            SlotEvent::Complete { transition } if self.pending == Some(*transition) => {
                self.pending = None;
                tracing::debug!(subject = %self.subject, transition = %transition, "Pending transition closed");
                Transition(State::no_transition_pending())
            }
            SlotEvent::Complete { transition } => {
                tracing::warn!(
                    subject = %self.subject,
                    transition = %transition,
                    pending = ?self.pending,
                    "Completion ignored: another transition is pending"
                );
                Handled
            }
            SlotEvent::Open { transition } => {
                tracing::error!(
                    subject = %self.subject,
                    transition = %transition,
                    pending = ?self.pending,
                    "Open rejected: a transition is already pending"
                );
                Handled
            }
        }
    }
}

impl PendingSlot {
    pub fn pending(&self) -> Option<TransitionId> {
        self.pending
    }

    pub fn is_free(&self) -> bool {
        self.pending.is_none()
    }
}
