/// The commit panel's message editor. The cursor is a char index.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommitDraft {
    pub message: String,
    pub cursor: usize,
    pub scroll_y: u16,
    pub amend: bool,
}

impl CommitDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_blank(&self) -> bool {
        self.message.trim().is_empty()
    }

    /// Replaces the message and parks the cursor at its end.
    pub fn set_message(&mut self, message: &str) {
        self.message = message.to_string();
        self.cursor = self.message.chars().count();
        self.scroll_y = 0;
    }

    pub fn clear(&mut self) {
        self.message.clear();
        self.cursor = 0;
        self.scroll_y = 0;
        self.amend = false;
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        let len = self.message.chars().count();
        if self.cursor < len {
            self.cursor += 1;
        }
    }

    pub fn move_up(&mut self) {
        let (line, col) = cursor_line_col(&self.message, self.cursor);
        if line == 0 {
            self.cursor = 0;
            return;
        }
        let col = col.min(line_length(&self.message, line - 1));
        self.cursor = cursor_to_index_in_line(&self.message, line - 1, col);
    }

    pub fn move_down(&mut self) {
        let (line, col) = cursor_line_col(&self.message, self.cursor);
        if line + 1 >= line_count(&self.message) {
            self.cursor = self.message.chars().count();
            return;
        }
        let col = col.min(line_length(&self.message, line + 1));
        self.cursor = cursor_to_index_in_line(&self.message, line + 1, col);
    }

    pub fn move_home(&mut self) {
        let (line, _) = cursor_line_col(&self.message, self.cursor);
        self.cursor = cursor_to_index_in_line(&self.message, line, 0);
    }

    pub fn move_end(&mut self) {
        let (line, _) = cursor_line_col(&self.message, self.cursor);
        let line_len = line_length(&self.message, line);
        self.cursor = cursor_to_index_in_line(&self.message, line, line_len);
    }

    pub fn insert_char(&mut self, ch: char) {
        let byte = char_to_byte_index(&self.message, self.cursor);
        self.message.insert(byte, ch);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let b0 = char_to_byte_index(&self.message, self.cursor - 1);
        let b1 = char_to_byte_index(&self.message, self.cursor);
        if b0 < b1 {
            self.message.replace_range(b0..b1, "");
            self.cursor -= 1;
        }
    }

    pub fn delete(&mut self) {
        let len = self.message.chars().count();
        if self.cursor >= len {
            return;
        }
        let b0 = char_to_byte_index(&self.message, self.cursor);
        let b1 = char_to_byte_index(&self.message, self.cursor + 1);
        if b0 < b1 {
            self.message.replace_range(b0..b1, "");
        }
    }

    pub fn cursor_line_col(&self) -> (usize, usize) {
        cursor_line_col(&self.message, self.cursor)
    }

    pub fn ensure_cursor_visible(&mut self, view_height: usize) {
        if view_height == 0 {
            return;
        }
        let (line, _) = self.cursor_line_col();
        let top = self.scroll_y as usize;
        if line < top {
            self.scroll_y = line as u16;
        } else if line >= top + view_height {
            self.scroll_y = (line + 1 - view_height) as u16;
        }
    }
}

fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

fn cursor_line_col(s: &str, cursor: usize) -> (usize, usize) {
    let mut line = 0usize;
    let mut col = 0usize;
    for ch in s.chars().take(cursor) {
        if ch == '\n' {
            line += 1;
            col = 0;
        } else {
            col += 1;
        }
    }
    (line, col)
}

/// Like `str::lines` but counts a trailing newline as opening an empty line.
fn line_count(s: &str) -> usize {
    s.split('\n').count()
}

fn line_length(s: &str, line_index: usize) -> usize {
    s.split('\n')
        .nth(line_index)
        .map(|l| l.chars().count())
        .unwrap_or(0)
}

fn cursor_to_index_in_line(s: &str, target_line: usize, target_col: usize) -> usize {
    let mut idx = 0usize;
    let mut line = 0usize;
    let mut col = 0usize;

    for ch in s.chars() {
        if line == target_line && col == target_col {
            break;
        }
        if ch == '\n' {
            if line == target_line {
                break;
            }
            line += 1;
            col = 0;
            idx += 1;
            continue;
        }
        if line == target_line {
            col += 1;
        }
        idx += 1;
    }

    idx
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(text: &str) -> CommitDraft {
        let mut d = CommitDraft::new();
        text.chars().for_each(|c| d.insert_char(c));
        d
    }

    #[test]
    fn editing_handles_multibyte_text() {
        let mut d = typed("héllo");
        d.move_left();
        d.backspace();
        assert_eq!(d.message, "hélo");
        d.move_home();
        d.delete();
        assert_eq!(d.message, "élo");
        assert_eq!(d.cursor, 0);
    }

    #[test]
    fn vertical_moves_keep_column() {
        let mut d = typed("first line\n\nthird");
        assert_eq!(d.cursor_line_col(), (2, 5));
        d.move_up();
        assert_eq!(d.cursor_line_col(), (1, 0));
        d.move_up();
        assert_eq!(d.cursor_line_col(), (0, 0));
        d.move_end();
        assert_eq!(d.cursor_line_col(), (0, 10));
        d.move_down();
        d.move_down();
        assert_eq!(d.cursor_line_col(), (2, 0));
    }

    #[test]
    fn newline_at_end_opens_a_line() {
        let mut d = typed("subject\n");
        assert_eq!(d.cursor_line_col(), (1, 0));
        d.move_up();
        d.move_down();
        assert_eq!(d.cursor_line_col(), (1, 0));
    }

    #[test]
    fn scroll_follows_cursor() {
        let mut d = typed("1\n2\n3\n4\n5");
        d.ensure_cursor_visible(2);
        assert_eq!(d.scroll_y, 3);
        d.set_message("x");
        assert_eq!(d.scroll_y, 0);
        assert_eq!(d.cursor, 1);
    }
}
