//! Display transcript and carried history for a chat session

use newsdesk_core::{ConversationHistory, TurnProcessor};

/// One exchange as shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub prompt: String,
    pub response: String,
}

/// Feeds user messages to a [`TurnProcessor`] and keeps the transcript and
/// the history for the next turn
pub struct TurnAccumulator<P> {
    processor: P,
    transcript: Vec<TranscriptEntry>,
    history: ConversationHistory,
}

impl<P: TurnProcessor> TurnAccumulator<P> {
    pub fn new(processor: P) -> Self {
        Self {
            processor,
            transcript: Vec::new(),
            history: ConversationHistory::new(),
        }
    }

    pub fn processor(&self) -> &P {
        &self.processor
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// Run one turn for `message`.
    ///
    /// Returns the transcript, the history and the cleared input. A blank
    /// message changes nothing and never reaches the processor.
    pub async fn respond(
        &mut self,
        message: &str,
    ) -> (&[TranscriptEntry], &ConversationHistory, String) {
        if message.trim().is_empty() {
            return (&self.transcript, &self.history, String::new());
        }

        let outcome = self.processor.process_turn(message, &self.history).await;

        self.transcript.push(TranscriptEntry {
            prompt: message.to_string(),
            response: outcome.response,
        });
        self.history = outcome.history;

        (&self.transcript, &self.history, String::new())
    }

    /// Forget the transcript and start a new conversation
    pub fn clear(&mut self) {
        self.transcript.clear();
        self.history = ConversationHistory::new();
    }
}
