use shared::{Role, Turn};

/// Turns of one conversation, oldest first. Only grows or gets cleared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    turns: Vec<Turn>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// The newest `max` turns, trimmed so the window opens on a user turn.
    pub fn window(&self, max: Option<usize>) -> &[Turn] {
        let start = max
            .map(|max| self.turns.len().saturating_sub(max))
            .unwrap_or(0);

        let mut window = &self.turns[start..];
        while let Some((first, rest)) = window.split_first() {
            if first.role() == Role::User {
                break;
            }
            window = rest;
        }
        window
    }
}
