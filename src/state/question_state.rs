use thiserror::Error;

/// Lifecycle of one question inside a session. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionStatus {
    /// Not shown to the players yet.
    Hidden,
    /// Clue on screen, waiting for an answer.
    Revealed,
    /// Answered; terminal.
    Answered,
}

impl QuestionStatus {
    /// Derive the status from the persisted flags.
    pub fn from_flags(is_revealed: bool, is_answered: bool) -> Self {
        match (is_revealed, is_answered) {
            (_, true) => QuestionStatus::Answered,
            (true, false) => QuestionStatus::Revealed,
            (false, false) => QuestionStatus::Hidden,
        }
    }
}

/// Requested change of a question flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionEvent {
    /// `isRevealed = true`
    Reveal,
    /// `isRevealed = false`
    Hide,
    /// `isAnswered = true`
    Answer,
    /// `isAnswered = false`
    Unanswer,
}

/// Error returned when a flag update would move a question backwards.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot apply {event:?} to a question in state {from:?}")]
pub struct InvalidTransition {
    pub from: QuestionStatus,
    pub event: QuestionEvent,
}

/// Compute the state reached by applying `event` to `from`.
pub fn compute_transition(
    from: QuestionStatus,
    event: QuestionEvent,
) -> Result<QuestionStatus, InvalidTransition> {
    use QuestionEvent as E;
    use QuestionStatus as S;

    let next = match (from, event) {
        (S::Hidden, E::Reveal) | (S::Revealed, E::Reveal) => S::Revealed,
        (S::Answered, E::Reveal) => S::Answered,
        (S::Hidden, E::Hide) => S::Hidden,
        (S::Hidden, E::Answer) | (S::Revealed, E::Answer) => S::Answered,
        (S::Hidden, E::Unanswer) => S::Hidden,
        (S::Revealed, E::Unanswer) => S::Revealed,
        (from, event) => return Err(InvalidTransition { from, event }),
    };

    Ok(next)
}

/// Outcome of validating a flag update against the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionPlan {
    pub from: QuestionStatus,
    pub to: QuestionStatus,
}

impl QuestionPlan {
    /// Whether the update answers the question.
    pub fn answers(&self) -> bool {
        self.from != QuestionStatus::Answered && self.to == QuestionStatus::Answered
    }

    /// Whether the update reveals a hidden question without answering it.
    pub fn reveals(&self) -> bool {
        self.from == QuestionStatus::Hidden && self.to == QuestionStatus::Revealed
    }
}

/// Validate the optional `isRevealed`/`isAnswered` flags of an update request.
///
/// The reveal flag is applied first, then the answer flag.
pub fn plan_update(
    from: QuestionStatus,
    is_revealed: Option<bool>,
    is_answered: Option<bool>,
) -> Result<QuestionPlan, InvalidTransition> {
    let mut to = from;
    if let Some(revealed) = is_revealed {
        let event = if revealed {
            QuestionEvent::Reveal
        } else {
            QuestionEvent::Hide
        };
        to = compute_transition(to, event)?;
    }
    if let Some(answered) = is_answered {
        let event = if answered {
            QuestionEvent::Answer
        } else {
            QuestionEvent::Unanswer
        };
        // Answering twice must fail so the question can only be scored once.
        to = compute_transition(to, event)?;
    }
    Ok(QuestionPlan { from, to })
}
