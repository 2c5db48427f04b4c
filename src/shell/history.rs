//! Session history of successful generations.

use crate::completion::Mode;

/// One successful generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub mode: Mode,
    pub text: String,
}

/// Append-only, insertion-ordered record of the session's generations.
/// Lives only as long as the process.
#[derive(Debug, Default)]
pub struct HistoryLog {
    entries: Vec<HistoryEntry>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, mode: Mode, text: impl Into<String>) {
        self.entries.push(HistoryEntry {
            mode,
            text: text.into(),
        });
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render every entry as `"<Mode> <index>: <text>"`, 1-indexed.
    pub fn lines(&self) -> Vec<String> {
        self.entries()
            .iter()
            .enumerate()
            .map(|(i, entry)| format!("{} {}: {}", entry.mode.label(), i + 1, entry.text))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_are_one_indexed_in_insertion_order() {
        let mut history = HistoryLog::new();
        history.push(Mode::Song, "Raindrops falling...");
        history.push(Mode::Poem, "The sea is wide");
        history.push(Mode::Song, "Chorus again");

        assert_eq!(
            history.lines(),
            vec![
                "Song 1: Raindrops falling...".to_string(),
                "Poem 2: The sea is wide".to_string(),
                "Song 3: Chorus again".to_string(),
            ]
        );
        assert_eq!(history.len(), 3);
        assert_eq!(history.entries()[1].mode, Mode::Poem);
    }

    #[test]
    fn test_empty_history() {
        let history = HistoryLog::new();
        assert!(history.is_empty());
        assert!(history.lines().is_empty());
    }
}
