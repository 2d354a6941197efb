use std::fmt;

pub const INDENT_UNIT: &str = "    ";

const BLOCK_OPENER: char = ':';
const COMMENT_MARKER: char = '#';

/// Lines of a Python script with the indentation already applied.
///
/// Appending a line whose code ends with `:` opens a block; blocks are closed
/// explicitly by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptLines {
    lines: Vec<String>,
    indent_level: usize,
}

impl ScriptLines {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn indent_level(&self) -> usize {
        self.indent_level
    }

    pub fn append(&mut self, line: impl AsRef<str>) {
        let line = line.as_ref().trim_end();
        let indented = indent(line, self.indent_level);
        self.lines.push(indented);

        if code_part(line).trim_end().ends_with(BLOCK_OPENER) {
            self.indent_level += 1;
        }
    }

    /// Appends another buffer's lines at the current indent. Its own block
    /// structure is already baked into its lines.
    pub fn extend(&mut self, other: ScriptLines) {
        debug_assert_eq!(other.indent_level, 0, "extending with an unclosed block");
        for line in other.lines {
            let indented = indent(&line, self.indent_level);
            self.lines.push(indented);
        }
    }

    pub fn insert_at(&mut self, index: usize, line: &str, level: usize) {
        self.lines.insert(index, indent(line.trim_end(), level));
    }

    pub fn dedent(&mut self) {
        assert!(
            self.indent_level > 0,
            "unbalanced block close: indent level would go negative"
        );
        self.indent_level -= 1;
    }

    pub fn close_block(&mut self) {
        self.dedent();
        self.append("");
    }

    pub fn close_function(&mut self) {
        self.close_block();
        self.append("");
    }

    /// True when at least one line is neither blank nor a comment.
    pub fn has_statements(&self) -> bool {
        self.lines.iter().any(|line| {
            let trimmed = line.trim_start();
            !trimmed.is_empty() && !trimmed.starts_with(COMMENT_MARKER)
        })
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl fmt::Display for ScriptLines {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lines.join("\n"))
    }
}

/// The line up to its trailing comment. A `#` inside a string literal does not
/// start a comment.
fn code_part(line: &str) -> &str {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (idx, c) in line.char_indices() {
        match quote {
            Some(_) if escaped => escaped = false,
            Some(_) if c == '\\' => escaped = true,
            Some(open) if c == open => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == COMMENT_MARKER => return &line[..idx],
            None => {}
        }
    }
    line
}

fn indent(line: &str, level: usize) -> String {
    if line.is_empty() {
        return String::new();
    }
    let mut out = INDENT_UNIT.repeat(level);
    out.push_str(line);
    out
}
