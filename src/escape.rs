use std::fmt::{self, Write};
use unicode_general_category::{get_general_category, GeneralCategory};

/// Displays a lexeme as a double-quoted literal with control characters
/// escaped, for traces and token dumps.
pub fn inspect(s: &str) -> LexemeInspector<'_> {
    LexemeInspector(s)
}

pub struct LexemeInspector<'a>(&'a str);

impl<'a> fmt::Display for LexemeInspector<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("\"")?;
        for ch in self.0.chars() {
            let esc = match ch {
                '\n' => Some("\\n"),
                '\r' => Some("\\r"),
                '\t' => Some("\\t"),
                '\x0C' => Some("\\f"),
                '\x08' => Some("\\b"),
                '"' => Some("\\\""),
                '\\' => Some("\\\\"),
                _ => None,
            };
            if let Some(esc) = esc {
                f.write_str(esc)?;
            } else if is_printable(ch) {
                f.write_char(ch)?;
            } else if (ch as u32) < 0x10000 {
                write!(f, "\\u{:04X}", ch as u32)?;
            } else {
                write!(f, "\\u{{{:X}}}", ch as u32)?;
            }
        }
        f.write_str("\"")
    }
}

fn is_printable(ch: char) -> bool {
    !matches!(
        get_general_category(ch),
        GeneralCategory::LineSeparator
            | GeneralCategory::ParagraphSeparator
            | GeneralCategory::Control
            | GeneralCategory::Surrogate
            | GeneralCategory::Unassigned
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inspect() {
        let testcases: Vec<(&str, &str)> = vec![
            ("", "\"\""),
            ("Total", "\"Total\""),
            ("いろは", "\"いろは\""),
            ("\"abc\\n\"", "\"\\\"abc\\\\n\\\"\""),
            ("\x00\x07\x08\t\n\x0B\x0C\r\x1B", "\"\\u0000\\u0007\\b\\t\\n\\u000B\\f\\r\\u001B\""),
            ("-- :=~@{}[]()", "\"-- :=~@{}[]()\""),
            ("\x7F\u{2028}", "\"\\u007F\\u2028\""),
            ("\u{FFFD}\u{FFFF}", "\"\u{FFFD}\\uFFFF\""),
            ("\u{10000}\u{E0001}", "\"\u{10000}\u{E0001}\""),
            ("\u{10FFFF}", "\"\\u{10FFFF}\""),
        ];
        for (input, expected) in &testcases {
            let result = inspect(input).to_string();
            assert_eq!(&*result, *expected);
        }
    }
}
