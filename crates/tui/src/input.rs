//! Single-line text editing for the search bar and batch prompt.

const MAX_INPUT_LEN: usize = 64;

/// Editable line with a character-based cursor.
#[derive(Debug, Clone, Default)]
pub struct TextInput {
    value: String,
    cursor: usize,
}

impl TextInput {
    pub fn with_value(value: &str) -> Self {
        let value: String = value.chars().take(MAX_INPUT_LEN).collect();
        let cursor = value.chars().count();
        Self { value, cursor }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let len = self.len() as isize;
        let next = (self.cursor as isize + delta).clamp(0, len);
        self.cursor = next as usize;
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.len();
    }

    pub fn insert(&mut self, ch: char) {
        if self.len() >= MAX_INPUT_LEN || ch.is_control() {
            return;
        }
        let at = self.byte_index(self.cursor);
        self.value.insert(at, ch);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let at = self.byte_index(self.cursor);
        self.value.remove(at);
    }

    pub fn delete(&mut self) {
        if self.cursor < self.len() {
            let at = self.byte_index(self.cursor);
            self.value.remove(at);
        }
    }

    fn len(&self) -> usize {
        self.value.chars().count()
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.value
            .char_indices()
            .nth(char_index)
            .map(|(idx, _)| idx)
            .unwrap_or(self.value.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edits_multibyte_text() {
        let mut input = TextInput::with_value("Malm");
        input.insert('ö');
        assert_eq!(input.value(), "Malmö");
        input.move_home();
        input.delete();
        input.insert('m');
        assert_eq!(input.value(), "malmö");
        input.move_end();
        input.backspace();
        assert_eq!(input.value(), "malm");
        assert_eq!(input.cursor(), 4);
    }

    #[test]
    fn cursor_stays_in_bounds() {
        let mut input = TextInput::with_value("ab");
        input.move_cursor(-10);
        assert_eq!(input.cursor(), 0);
        input.backspace();
        assert_eq!(input.value(), "ab");
        input.move_cursor(10);
        assert_eq!(input.cursor(), 2);
        input.delete();
        assert_eq!(input.value(), "ab");
    }

    #[test]
    fn length_is_capped() {
        let mut input = TextInput::with_value(&"x".repeat(100));
        assert_eq!(input.value().len(), MAX_INPUT_LEN);
        input.insert('y');
        assert!(!input.value().contains('y'));
        input.clear();
        assert_eq!(input.value(), "");
    }
}
