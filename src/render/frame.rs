//! One flattened render of the whole component tree.

/// The lines of a single full-tree render, top to bottom.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Frame {
    lines: Vec<String>,
}

impl Frame {
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

impl From<Vec<String>> for Frame {
    fn from(lines: Vec<String>) -> Self {
        Self::new(lines)
    }
}

impl From<Vec<&str>> for Frame {
    fn from(lines: Vec<&str>) -> Self {
        Self::new(lines.into_iter().map(str::to_string).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::Frame;

    #[test]
    fn lines_round_trip_byte_exact() {
        let input = vec![
            String::new(),
            " padded ".to_string(),
            "\u{1b}[31mred\u{1b}[0m".to_string(),
            "unicode: π你好".to_string(),
        ];
        let frame = Frame::from(input.clone());
        assert_eq!(frame.len(), 4);
        assert_eq!(frame.into_lines(), input);
    }
}
