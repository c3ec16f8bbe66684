use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use generation_backend::{
    CancelSignal, GenerationBackend, GenerationOptions, GenerationRequest, TurnId,
};
use tracing::debug;

use crate::error::{ChatError, GenerationError};
use crate::prompt::PromptAssembler;
use crate::session::ChatSession;

/// Reply used when the submitted message is too short to answer.
pub const CLARIFICATION_REPLY: &str =
    "Hi I'm AI assistant! Here to help you. Could you please elaborate more?";

/// Substring marking a completion where the model disclaimed knowledge.
///
/// Such completions are still recorded verbatim as the visible reply; the
/// marker only raises the `unknown_answer` flag on the outcome.
pub const UNKNOWN_ANSWER_MARKER: &str = "do not know";

/// Reply recorded when the backend fails; the turn still settles.
pub const GENERATION_FAILED_REPLY: &str = "Generation failed. Please try again.";

/// Reply recorded when an in-flight answer is cancelled.
pub const CANCELLED_REPLY: &str = "Generation cancelled.";

/// Maximum trimmed length treated as noise instead of a real question.
const DEGENERATE_INPUT_MAX_LEN: usize = 1;

/// True when the trimmed message is too short to send to the backend.
#[must_use]
pub fn is_degenerate(message: &str) -> bool {
    message.trim().chars().count() <= DEGENERATE_INPUT_MAX_LEN
}

/// Outcome of answering one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The backend produced a completion, recorded as the visible reply.
    Answered { reply: String, unknown_answer: bool },
    /// Degenerate input short-circuited to the clarification reply.
    Clarified,
    /// The answer was cancelled before completion.
    Cancelled,
}

/// The turn state machine: accepts user messages, invokes generation, and
/// writes replies back into transcript state.
///
/// Holds one long-lived backend handle passed in at construction; there is no
/// process-global model state.
#[derive(Clone)]
pub struct ConversationController {
    backend: Arc<dyn GenerationBackend>,
    assembler: PromptAssembler,
    options: GenerationOptions,
}

impl ConversationController {
    #[must_use]
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        assembler: PromptAssembler,
        options: GenerationOptions,
    ) -> Self {
        Self {
            backend,
            assembler,
            options,
        }
    }

    #[must_use]
    pub fn assembler(&self) -> &PromptAssembler {
        &self.assembler
    }

    #[must_use]
    pub fn options(&self) -> &GenerationOptions {
        &self.options
    }

    /// Appends `user_message` as a pending turn.
    pub fn submit(&self, session: &mut ChatSession, user_message: &str) -> Result<TurnId, ChatError> {
        session.submit(user_message)
    }

    /// Answers the pending turn, blocking until the reply is written.
    ///
    /// Every path settles the turn: degenerate input short-circuits to the
    /// clarification reply without touching the backend, a set `cancel`
    /// signal records the cancellation marker, and backend failures are
    /// recorded as a visible failure reply before being surfaced as
    /// [`GenerationError`]. Only backend-produced replies are committed to
    /// the memory window.
    pub fn answer(
        &self,
        session: &mut ChatSession,
        cancel: &CancelSignal,
    ) -> Result<TurnOutcome, ChatError> {
        let (turn_id, question) = session.begin_answer()?;

        if is_degenerate(&question) {
            debug!(turn_id, "short-circuiting degenerate input");
            session.complete_answer(turn_id, CLARIFICATION_REPLY, false);
            return Ok(TurnOutcome::Clarified);
        }

        match self.generate(turn_id, &question, cancel) {
            RawOutcome::Completed {
                reply,
                unknown_answer,
            } => {
                session.complete_answer(turn_id, reply.as_str(), true);
                Ok(TurnOutcome::Answered {
                    reply,
                    unknown_answer,
                })
            }
            RawOutcome::Cancelled => {
                session.complete_answer(turn_id, CANCELLED_REPLY, false);
                Ok(TurnOutcome::Cancelled)
            }
            RawOutcome::Failed(error) => {
                session.complete_answer(turn_id, GENERATION_FAILED_REPLY, false);
                Err(ChatError::Generation(error))
            }
        }
    }

    /// Resets transcript and memory window. Idempotent.
    pub fn clear(&self, session: &mut ChatSession) {
        session.clear();
    }

    /// Runs one backend call for `question` and classifies the result.
    ///
    /// Panics inside the backend are caught here so a misbehaving backend
    /// cannot take down the turn loop.
    pub(crate) fn generate(
        &self,
        turn_id: TurnId,
        question: &str,
        cancel: &CancelSignal,
    ) -> RawOutcome {
        let request = GenerationRequest {
            turn_id,
            prompt: self.assembler.assemble(question),
            options: self.options.clone(),
        };

        let backend = Arc::clone(&self.backend);
        let backend_cancel = Arc::clone(cancel);
        let completion =
            catch_unwind(AssertUnwindSafe(move || backend.generate(request, backend_cancel)));

        if cancel.load(Ordering::SeqCst) {
            return RawOutcome::Cancelled;
        }

        match completion {
            Ok(Ok(text)) => {
                let reply = text.trim().to_string();
                if reply.is_empty() {
                    return RawOutcome::Failed(GenerationError::EmptyCompletion);
                }

                let unknown_answer = reply.contains(UNKNOWN_ANSWER_MARKER);
                if unknown_answer {
                    debug!(turn_id, "backend disclaimed knowledge");
                }

                RawOutcome::Completed {
                    reply,
                    unknown_answer,
                }
            }
            Ok(Err(message)) => RawOutcome::Failed(GenerationError::Backend { message }),
            Err(_) => RawOutcome::Failed(GenerationError::BackendPanic),
        }
    }
}

/// Classified backend result before any transcript mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RawOutcome {
    Completed { reply: String, unknown_answer: bool },
    Cancelled,
    Failed(GenerationError),
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    use generation_backend::{
        BackendProfile, CancelSignal, GenerationBackend, GenerationOptions, GenerationRequest,
    };

    use super::{is_degenerate, ConversationController, RawOutcome};
    use crate::error::GenerationError;
    use crate::prompt::PromptAssembler;

    struct PanickingBackend;

    impl GenerationBackend for PanickingBackend {
        fn profile(&self) -> BackendProfile {
            BackendProfile {
                backend_id: "panicking".to_string(),
                model_id: "panicking".to_string(),
            }
        }

        fn generate(&self, _req: GenerationRequest, _cancel: CancelSignal) -> Result<String, String> {
            panic!("backend blew up");
        }
    }

    struct StaticBackend(&'static str);

    impl GenerationBackend for StaticBackend {
        fn profile(&self) -> BackendProfile {
            BackendProfile {
                backend_id: "static".to_string(),
                model_id: "static".to_string(),
            }
        }

        fn generate(&self, _req: GenerationRequest, _cancel: CancelSignal) -> Result<String, String> {
            Ok(self.0.to_string())
        }
    }

    fn controller(backend: Arc<dyn GenerationBackend>) -> ConversationController {
        ConversationController::new(backend, PromptAssembler::new(), GenerationOptions::default())
    }

    #[test]
    fn degenerate_detection_uses_trimmed_char_count() {
        assert!(is_degenerate(""));
        assert!(is_degenerate("x"));
        assert!(is_degenerate("  x  "));
        assert!(!is_degenerate("Hi"));
    }

    #[test]
    fn completion_is_trimmed_and_unknown_marker_flagged() {
        let controller = controller(Arc::new(StaticBackend("  I do not know.  ")));
        let cancel: CancelSignal = Arc::new(AtomicBool::new(false));

        let outcome = controller.generate(1, "Who?", &cancel);
        assert_eq!(
            outcome,
            RawOutcome::Completed {
                reply: "I do not know.".to_string(),
                unknown_answer: true,
            }
        );
    }

    #[test]
    fn whitespace_only_completion_is_an_empty_completion_failure() {
        let controller = controller(Arc::new(StaticBackend("   \n  ")));
        let cancel: CancelSignal = Arc::new(AtomicBool::new(false));

        let outcome = controller.generate(1, "Anything?", &cancel);
        assert_eq!(
            outcome,
            RawOutcome::Failed(GenerationError::EmptyCompletion)
        );
    }

    #[test]
    fn backend_panic_is_contained() {
        let controller = controller(Arc::new(PanickingBackend));
        let cancel: CancelSignal = Arc::new(AtomicBool::new(false));

        let outcome = controller.generate(1, "Boom?", &cancel);
        assert_eq!(outcome, RawOutcome::Failed(GenerationError::BackendPanic));
    }

    #[test]
    fn cancel_wins_over_whatever_the_backend_returned() {
        let controller = controller(Arc::new(StaticBackend("late but complete")));
        let cancel: CancelSignal = Arc::new(AtomicBool::new(true));

        let outcome = controller.generate(1, "Slow?", &cancel);
        assert_eq!(outcome, RawOutcome::Cancelled);
    }
}
