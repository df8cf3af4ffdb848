//! Character cursor and token stream.
//!
//! The scanner reads decoded characters from [`Utf8Decoder`], tracks
//! line/column positions, skips blanks and comments, and hands the token
//! start over to the automaton in [`crate::lexing`]. Tokens are kept in an
//! arena so that peeked tokens are never scanned twice.

use std::collections::HashMap;
use std::path::Path;

use tracing::trace;

use crate::buffer::Buffer;
use crate::escape::inspect;
use crate::lexing::KEYWORDS;
use crate::parser_diagnostics::FatalError;
use crate::token::{Token, TokenKind};
use crate::utf8::Utf8Decoder;

/// Index of a token in the scanner's arena. Id 0 is the empty token the
/// parser starts from.
pub type TokenId = usize;

/// How comments are closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentEnd {
    LineBreak,
    Marker([char; 2]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommentRule {
    pub open: [char; 2],
    pub close: CommentEnd,
    /// Whether an inner opening marker raises the nesting level.
    pub nested: bool,
}

impl CommentRule {
    /// `-- ...` up to the end of the line.
    pub const ADA: CommentRule = CommentRule {
        open: ['-', '-'],
        close: CommentEnd::LineBreak,
        nested: false,
    };
}

impl Default for CommentRule {
    fn default() -> Self {
        CommentRule::ADA
    }
}

/// A restorable snapshot of the character cursor.
#[derive(Debug, Clone)]
pub(crate) struct Mark {
    input_pos: usize,
    ch: Option<char>,
    pos: usize,
    char_pos: usize,
    chars_read: usize,
    line: u32,
    col: u32,
    text_len: usize,
}

#[derive(Debug)]
pub struct Scanner {
    input: Utf8Decoder,
    pub(crate) keywords: &'static HashMap<&'static str, TokenKind>,
    comment: CommentRule,
    /// Current character; `None` at end of input.
    pub(crate) ch: Option<char>,
    /// Byte offset of `ch`.
    pub(crate) pos: usize,
    /// Character offset of `ch`.
    pub(crate) char_pos: usize,
    chars_read: usize,
    pub(crate) line: u32,
    pub(crate) col: u32,
    /// Text of the token being scanned.
    pub(crate) text: String,
    tokens: Vec<Token>,
    committed: TokenId,
    peeked: TokenId,
    /// Byte offset of an opener whose comment ran into EOF. Later openers
    /// of a non-nesting rule cannot be closed either.
    unclosed_comment_from: Option<usize>,
}

impl Scanner {
    pub fn new(buffer: Buffer) -> Result<Self, FatalError> {
        let mut scanner = Scanner {
            input: Utf8Decoder::new(buffer)?,
            keywords: &KEYWORDS,
            comment: CommentRule::default(),
            ch: None,
            pos: 0,
            char_pos: 0,
            chars_read: 0,
            line: 1,
            col: 0,
            text: String::new(),
            tokens: vec![Token::default()],
            committed: 0,
            peeked: 0,
            unclosed_comment_from: None,
        };
        scanner.next_ch()?;
        Ok(scanner)
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, FatalError> {
        Self::new(Buffer::open(path)?)
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self, FatalError> {
        Self::new(Buffer::from_bytes(bytes))
    }

    pub fn with_comment_rule(mut self, rule: CommentRule) -> Self {
        self.comment = rule;
        self
    }

    /// Consumes the next token, reusing it if it was already peeked.
    ///
    /// Also moves the peek cursor to the new commit point.
    pub fn scan(&mut self) -> Result<&Token, FatalError> {
        let id = self.scan_id()?;
        Ok(&self.tokens[id])
    }

    /// Returns the token after the peek cursor and advances the cursor.
    pub fn peek(&mut self) -> Result<&Token, FatalError> {
        let id = self.peek_id()?;
        Ok(&self.tokens[id])
    }

    pub fn reset_peek(&mut self) {
        self.peeked = self.committed;
    }

    pub fn token(&self, id: TokenId) -> &Token {
        &self.tokens[id]
    }

    pub(crate) fn scan_id(&mut self) -> Result<TokenId, FatalError> {
        self.committed = self.materialize(self.committed + 1)?;
        self.peeked = self.committed;
        Ok(self.committed)
    }

    pub(crate) fn peek_id(&mut self) -> Result<TokenId, FatalError> {
        loop {
            self.peeked = self.materialize(self.peeked + 1)?;
            if self.tokens[self.peeked].kind.is_real() {
                return Ok(self.peeked);
            }
        }
    }

    fn materialize(&mut self, id: TokenId) -> Result<TokenId, FatalError> {
        while self.tokens.len() <= id {
            let token = self.next_token()?;
            trace!(
                kind = ?token.kind,
                lexeme = %inspect(&token.text),
                line = token.line,
                col = token.col,
                "scanned"
            );
            self.tokens.push(token);
        }
        Ok(id)
    }

    pub(crate) fn next_ch(&mut self) -> Result<(), FatalError> {
        self.pos = self.input.pos();
        let mut ch = self.input.read()?;
        self.char_pos = self.chars_read;
        if ch.is_some() {
            self.chars_read += 1;
        }
        self.col += 1;
        if ch == Some('\r') && self.input.peek_byte()? != Some(b'\n') {
            ch = Some('\n');
        }
        if ch == Some('\n') {
            self.line += 1;
            self.col = 0;
        }
        self.ch = ch;
        Ok(())
    }

    /// Appends the current character to the token text and moves on.
    pub(crate) fn add_ch(&mut self) -> Result<(), FatalError> {
        if let Some(ch) = self.ch {
            self.text.push(ch);
        }
        self.next_ch()
    }

    pub(crate) fn mark(&self) -> Mark {
        Mark {
            input_pos: self.input.pos(),
            ch: self.ch,
            pos: self.pos,
            char_pos: self.char_pos,
            chars_read: self.chars_read,
            line: self.line,
            col: self.col,
            text_len: self.text.len(),
        }
    }

    pub(crate) fn reset_to(&mut self, mark: &Mark) -> Result<(), FatalError> {
        if self.input.pos() != mark.input_pos {
            self.input.set_pos(mark.input_pos)?;
        }
        self.ch = mark.ch;
        self.pos = mark.pos;
        self.char_pos = mark.char_pos;
        self.chars_read = mark.chars_read;
        self.line = mark.line;
        self.col = mark.col;
        self.text.truncate(mark.text_len);
        Ok(())
    }

    /// Skips whitespace and comments before a token.
    pub(crate) fn skip_blanks(&mut self) -> Result<(), FatalError> {
        loop {
            while matches!(self.ch, Some(' ' | '\r' | '\n')) {
                self.next_ch()?;
            }
            if self.ch == Some(self.comment.open[0]) && self.skip_comment()? {
                continue;
            }
            return Ok(());
        }
    }

    /// Skips one comment starting at the current character.
    ///
    /// Returns `false` with the cursor unchanged if there is no comment
    /// here, or if the input ends before the comment is closed.
    fn skip_comment(&mut self) -> Result<bool, FatalError> {
        let rule = self.comment;
        if !rule.nested && matches!(self.unclosed_comment_from, Some(from) if self.pos >= from) {
            return Ok(false);
        }
        let start = self.mark();
        self.next_ch()?;
        if self.ch != Some(rule.open[1]) {
            self.reset_to(&start)?;
            return Ok(false);
        }
        self.next_ch()?;
        let mut level = 1;
        loop {
            let ch = match self.ch {
                Some(ch) => ch,
                None => {
                    self.reset_to(&start)?;
                    self.unclosed_comment_from = Some(self.pos);
                    return Ok(false);
                }
            };
            let closes = match rule.close {
                CommentEnd::LineBreak => ch == '\n',
                CommentEnd::Marker([c0, c1]) => ch == c0 && self.input.peek()? == Some(c1),
            };
            if closes {
                if let CommentEnd::Marker(_) = rule.close {
                    self.next_ch()?;
                }
                self.next_ch()?;
                level -= 1;
                if level == 0 {
                    return Ok(true);
                }
            } else if rule.nested && ch == rule.open[0] && self.input.peek()? == Some(rule.open[1])
            {
                self.next_ch()?;
                self.next_ch()?;
                level += 1;
            } else {
                self.next_ch()?;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn scan_all(scanner: &mut Scanner) -> Vec<Token> {
        let mut tokens = vec![];
        loop {
            let token = scanner.scan().unwrap().clone();
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return tokens;
            }
        }
    }

    fn kinds(source: &str) -> Vec<TokenKind> {
        let mut scanner = Scanner::from_bytes(source).unwrap();
        scan_all(&mut scanner).iter().map(|t| t.kind).collect()
    }

    fn positions(source: &[u8]) -> Vec<(String, u32, u32)> {
        let mut scanner = Scanner::from_bytes(source).unwrap();
        scan_all(&mut scanner)
            .into_iter()
            .map(|t| (t.text, t.line, t.col))
            .collect()
    }

    #[test]
    fn test_line_breaks() {
        assert_eq!(
            positions(b"a\r\nb\rc\nd"),
            vec![
                ("a".to_owned(), 1, 1),
                ("b".to_owned(), 2, 1),
                ("c".to_owned(), 3, 1),
                ("d".to_owned(), 4, 1),
                ("".to_owned(), 4, 2),
            ]
        );
    }

    #[test]
    fn test_columns_count_characters() {
        let mut scanner = Scanner::from_bytes("s := \"ä\"; t").unwrap();
        let tokens = scan_all(&mut scanner);
        let t = &tokens[4];
        assert_eq!(t.text, "t");
        assert_eq!((t.col, t.char_offset, t.byte_offset), (11, 10, 11));
    }

    #[test]
    fn test_byte_order_mark() {
        let mut scanner = Scanner::from_bytes(&b"\xEF\xBB\xBFx"[..]).unwrap();
        let t = scanner.scan().unwrap();
        assert_eq!(t.kind, TokenKind::Ident);
        assert_eq!((t.byte_offset, t.char_offset, t.line, t.col), (3, 0, 1, 1));
        assert!(matches!(
            Scanner::from_bytes(&b"\xEF\xBBx"[..]),
            Err(FatalError::IllegalByteOrderMark)
        ));
    }

    #[test]
    fn test_comments() {
        assert_eq!(
            kinds("a -- b c\n-- d\r\ne - f"),
            vec![
                TokenKind::Ident,
                TokenKind::Ident,
                TokenKind::Minus,
                TokenKind::Ident,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_unclosed_comment_is_lexed() {
        // No line break before EOF: the dashes come back as tokens.
        assert_eq!(
            kinds("x -- y"),
            vec![
                TokenKind::Ident,
                TokenKind::Minus,
                TokenKind::Minus,
                TokenKind::Ident,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_long_unclosed_comment_line() {
        let source = format!("x : Integer;\n{}", "-".repeat(20_000));
        let mut scanner = Scanner::from_bytes(source).unwrap();
        let tokens = scan_all(&mut scanner);
        assert_eq!(scanner.unclosed_comment_from, Some(13));
        assert_eq!(tokens.len(), 4 + 20_000 + 1);
        assert!(tokens[4..20_004].iter().all(|t| t.kind == TokenKind::Minus));
        assert_eq!(tokens[20_003].col, 20_000);
        assert_eq!(tokens[20_004].kind, TokenKind::Eof);
    }

    #[test]
    fn test_nested_comment_rule() {
        let rule = CommentRule {
            open: ['(', '*'],
            close: CommentEnd::Marker(['*', ')']),
            nested: true,
        };
        let mut scanner = Scanner::from_bytes("a (* b (* c *) d *) e")
            .unwrap()
            .with_comment_rule(rule);
        let texts = scan_all(&mut scanner)
            .into_iter()
            .map(|t| t.text)
            .collect::<Vec<_>>();
        assert_eq!(texts, vec!["a", "e", ""]);

        let mut scanner = Scanner::from_bytes("a (* b (* c *) d")
            .unwrap()
            .with_comment_rule(rule);
        let kinds = scan_all(&mut scanner)
            .into_iter()
            .map(|t| t.kind)
            .collect::<Vec<_>>();
        assert_eq!(kinds[..3], [TokenKind::Ident, TokenKind::LPar, TokenKind::Mult]);

        // A later nested comment can still close after an outer one did not.
        let mut scanner = Scanner::from_bytes("a (* b (* c *) d")
            .unwrap()
            .with_comment_rule(rule);
        let texts = scan_all(&mut scanner)
            .into_iter()
            .map(|t| t.text)
            .collect::<Vec<_>>();
        assert_eq!(texts, vec!["a", "(", "*", "b", "d", ""]);
    }

    #[test]
    fn test_peek_and_reset() {
        let mut scanner = Scanner::from_bytes("a b c").unwrap();
        assert_eq!(scanner.peek().unwrap().text, "a");
        assert_eq!(scanner.peek().unwrap().text, "b");
        scanner.reset_peek();
        assert_eq!(scanner.peek().unwrap().text, "a");
        assert_eq!(scanner.scan().unwrap().text, "a");
        // scan moved the peek cursor along
        assert_eq!(scanner.peek().unwrap().text, "b");
        assert_eq!(scanner.peek().unwrap().text, "c");
        assert_eq!(scanner.scan().unwrap().text, "b");
        assert_eq!(scanner.scan().unwrap().text, "c");
        assert_eq!(scanner.scan().unwrap().kind, TokenKind::Eof);
        assert_eq!(scanner.scan().unwrap().kind, TokenKind::Eof);
    }

    #[test]
    fn test_peeked_tokens_are_reused() {
        let mut scanner = Scanner::from_bytes("a b").unwrap();
        scanner.peek().unwrap();
        scanner.peek().unwrap();
        let materialized = scanner.tokens.len();
        scanner.scan().unwrap();
        scanner.scan().unwrap();
        assert_eq!(scanner.tokens.len(), materialized);
    }

    #[test]
    fn test_dummy_token() {
        let scanner = Scanner::from_bytes("").unwrap();
        assert_eq!(scanner.token(0), &Token::default());
    }

    fn source_strategy() -> impl Strategy<Value = String> {
        proptest::collection::vec(
            proptest::sample::select(vec![
                "x",
                "Total_2",
                "begin",
                "42",
                "0x1F",
                "4.5e3",
                "'a'",
                "\"s\\n\"",
                "\"open",
                ":=",
                ":",
                "--c\n",
                "-",
                "@",
                "\t",
                " ",
                "\n",
                "\r\n",
                "\r",
                "é",
            ]),
            0..40,
        )
        .prop_map(|parts| parts.concat())
    }

    proptest! {
        #[test]
        fn peek_is_transparent(
            source in source_strategy(),
            peeks in proptest::collection::vec(0usize..4, 0..40),
        ) {
            let mut plain = Scanner::from_bytes(source.as_str()).unwrap();
            let expected = scan_all(&mut plain);

            let mut peeking = Scanner::from_bytes(source.as_str()).unwrap();
            let mut actual = vec![];
            let mut peeks = peeks.into_iter();
            loop {
                for _ in 0..peeks.next().unwrap_or(0) {
                    peeking.peek().unwrap();
                }
                peeking.reset_peek();
                let token = peeking.scan().unwrap().clone();
                let done = token.kind == TokenKind::Eof;
                actual.push(token);
                if done {
                    break;
                }
            }
            prop_assert_eq!(actual, expected);
        }

        #[test]
        fn positions_match_locator(source in source_strategy()) {
            let locator = crate::pos::SourceLocator::new(source.as_bytes());
            let mut scanner = Scanner::from_bytes(source.as_str()).unwrap();
            for token in scan_all(&mut scanner) {
                let pos = locator.position(source.as_bytes(), token.byte_offset);
                prop_assert_eq!((token.line, token.col), (pos.line, pos.col));
                prop_assert_eq!(
                    source[..token.byte_offset].chars().count(),
                    token.char_offset
                );
            }
        }
    }
}
