//! Conversation history with a sliding-window cap.

use crate::config::DEFAULT_HISTORY_LIMIT;
use crate::prompts::ChatMessage;

/// Past user/assistant turns, oldest first.
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    messages: Vec<ChatMessage>,
    limit: usize,
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl ConversationHistory {
    /// The limit is rounded down to whole exchanges, at least one.
    pub fn new(limit: usize) -> Self {
        Self {
            messages: Vec::new(),
            limit: (limit & !1).max(2),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Append one completed exchange, then drop the oldest messages past the limit.
    pub fn record_exchange(&mut self, query: impl Into<String>, reply: impl Into<String>) {
        self.messages.push(ChatMessage::user(query));
        self.messages.push(ChatMessage::assistant(reply));

        if self.messages.len() > self.limit {
            let excess = self.messages.len() - self.limit;
            self.messages.drain(..excess);
        }
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompts::Role;

    #[test]
    fn records_user_then_assistant() {
        let mut history = ConversationHistory::default();
        history.record_exchange("question", "answer");

        assert_eq!(
            history.messages(),
            &[ChatMessage::user("question"), ChatMessage::assistant("answer")]
        );
    }

    #[test]
    fn length_is_min_of_two_n_and_limit() {
        let mut history = ConversationHistory::default();

        for n in 1..=12 {
            history.record_exchange(format!("q{}", n), format!("a{}", n));

            assert_eq!(history.len(), (2 * n).min(10));
            assert_eq!(history.len() % 2, 0);
            let last = history.messages().last().unwrap();
            assert_eq!(last.role, Role::Assistant);
            assert_eq!(last.content, format!("a{}", n));
        }
    }

    #[test]
    fn six_exchanges_keep_last_five() {
        let mut history = ConversationHistory::default();
        for n in 1..=6 {
            history.record_exchange(format!("q{}", n), format!("a{}", n));
        }

        assert_eq!(history.len(), 10);
        assert_eq!(history.messages()[0], ChatMessage::user("q2"));
        assert_eq!(history.messages()[9], ChatMessage::assistant("a6"));
    }

    #[test]
    fn clear_empties_history() {
        let mut history = ConversationHistory::new(4);
        history.record_exchange("q", "a");
        history.clear();

        assert!(history.is_empty());
        assert_eq!(history.limit(), 4);
    }

    #[test]
    fn zero_limit_keeps_one_exchange() {
        let mut history = ConversationHistory::new(0);
        history.record_exchange("q1", "a1");
        history.record_exchange("q2", "a2");

        assert_eq!(history.limit(), 2);
        assert_eq!(
            history.messages(),
            &[ChatMessage::user("q2"), ChatMessage::assistant("a2")]
        );
    }

    #[test]
    fn odd_limit_never_splits_an_exchange() {
        let mut history = ConversationHistory::new(9);
        assert_eq!(history.limit(), 8);

        for n in 1..=5 {
            history.record_exchange(format!("q{}", n), format!("a{}", n));
            assert_eq!(history.len() % 2, 0);
            assert_eq!(history.messages()[0].role, Role::User);
        }

        assert_eq!(history.len(), 8);
        assert_eq!(history.messages()[0], ChatMessage::user("q2"));
    }

    #[test]
    fn huge_limit_does_not_preallocate() {
        let mut history = ConversationHistory::new(usize::MAX);
        history.record_exchange("q", "a");
        assert_eq!(history.len(), 2);
    }
}
