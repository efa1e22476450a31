//! Sliding context window over a conversation.
//!
//! The window is a read-time projection: the full history stays on disk and
//! only the most recent turns are sent to the model.

use proglot_core::Turn;

/// Turns of history sent with each request unless configured otherwise.
pub const DEFAULT_WINDOW_SIZE: usize = 20;

/// The bounded suffix of a transcript submitted as context.
#[derive(Debug, Clone, Copy)]
pub struct ContextWindow<'a> {
    turns: &'a [Turn],
    omitted: usize,
}

impl<'a> ContextWindow<'a> {
    /// Keep the last `max_turns` turns in their original order.
    /// `max_turns == 0` yields an empty window.
    pub fn build(transcript: &'a [Turn], max_turns: usize) -> Self {
        let start = transcript.len().saturating_sub(max_turns);
        Self {
            turns: &transcript[start..],
            omitted: start,
        }
    }

    pub fn turns(&self) -> &'a [Turn] {
        self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// How many older turns were left out of the window.
    pub fn omitted(&self) -> usize {
        self.omitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcript(n: usize) -> Vec<Turn> {
        (0..n)
            .map(|i| {
                if i % 2 == 0 {
                    Turn::user(format!("u{i}"))
                } else {
                    Turn::assistant(format!("a{i}"))
                }
            })
            .collect()
    }

    #[test]
    fn length_is_min_of_history_and_bound_and_window_is_a_suffix() {
        for len in 0..30 {
            let turns = transcript(len);
            for n in 0..35 {
                let window = ContextWindow::build(&turns, n);
                assert_eq!(window.len(), len.min(n), "len={len} n={n}");
                assert_eq!(window.turns(), &turns[len - window.len()..]);
                assert_eq!(window.omitted() + window.len(), len);
            }
        }
    }

    #[test]
    fn short_history_is_returned_unchanged() {
        let turns = transcript(5);
        let window = ContextWindow::build(&turns, DEFAULT_WINDOW_SIZE);
        assert_eq!(window.turns(), turns.as_slice());
        assert_eq!(window.omitted(), 0);
    }

    #[test]
    fn zero_bound_gives_empty_window() {
        let turns = transcript(7);
        let window = ContextWindow::build(&turns, 0);
        assert!(window.is_empty());
        assert_eq!(window.omitted(), 7);
    }

    #[test]
    fn keeps_most_recent_turns_in_order() {
        let turns = transcript(25);
        let window = ContextWindow::build(&turns, 20);
        let texts: Vec<_> = window.turns().iter().map(|t| t.text()).collect();
        assert_eq!(texts.first(), Some(&"a5"));
        assert_eq!(texts.last(), Some(&"u24"));
        assert_eq!(turns.len(), 25);
    }
}
