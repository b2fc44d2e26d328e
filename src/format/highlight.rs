//! Syntax highlighting for fenced code blocks.

use once_cell::sync::Lazy;
use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::as_24_bit_terminal_escaped;

use crate::core::text::ansi::SGR_RESET;

const THEME_NAME: &str = "base16-ocean.dark";

static SYNTAX_SET: Lazy<SyntaxSet> = Lazy::new(SyntaxSet::load_defaults_newlines);
static THEME_SET: Lazy<ThemeSet> = Lazy::new(ThemeSet::load_defaults);

fn theme() -> Option<&'static Theme> {
    THEME_SET.themes.get(THEME_NAME)
}

fn syntax_for(lang: &str) -> Option<&'static SyntaxReference> {
    let lang = lang.trim();
    if lang.is_empty() {
        return None;
    }
    SYNTAX_SET
        .find_syntax_by_token(lang)
        .or_else(|| SYNTAX_SET.find_syntax_by_extension(lang))
}

/// Highlight `code` as `lang`, one output line per source line.
///
/// Every highlighted line ends with an SGR reset. Unknown or missing languages, and any
/// highlighter failure, yield the source lines untouched.
pub fn highlight_code(code: &str, lang: Option<&str>) -> Vec<String> {
    let plain = || code.split('\n').map(str::to_string).collect::<Vec<_>>();

    let (Some(syntax), Some(theme)) = (lang.and_then(syntax_for), theme()) else {
        return plain();
    };

    let mut highlighter = HighlightLines::new(syntax, theme);
    let mut lines = Vec::new();
    for line in code.split('\n') {
        let with_newline = format!("{line}\n");
        let ranges = match highlighter.highlight_line(&with_newline, &SYNTAX_SET) {
            Ok(ranges) => ranges,
            Err(error) => {
                tracing::debug!(%error, "code highlighting failed, using plain text");
                return plain();
            }
        };
        let mut escaped = as_24_bit_terminal_escaped(&ranges, false);
        while escaped.ends_with('\n') {
            escaped.pop();
        }
        escaped.push_str(SGR_RESET);
        lines.push(escaped);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::highlight_code;
    use crate::core::text::ansi::strip_ansi;

    #[test]
    fn unknown_language_falls_back_to_plain_lines() {
        assert_eq!(
            highlight_code("a\nb", Some("no-such-language")),
            vec!["a".to_string(), "b".to_string()]
        );
        assert_eq!(highlight_code("x", None), vec!["x".to_string()]);
    }

    #[test]
    fn known_language_is_colored_without_changing_text() {
        let lines = highlight_code("fn main() {}\nlet x = 1;", Some("rust"));
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\x1b[38;2;"));
        assert!(lines[0].ends_with("\x1b[0m"));
        assert_eq!(strip_ansi(&lines[0]), "fn main() {}");
        assert_eq!(strip_ansi(&lines[1]), "let x = 1;");
    }
}
