use crate::parser_diagnostics::FatalError;
use crate::scanner::{Mark, Scanner};
use crate::token::{Token, TokenKind};
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Reserved words, looked up after an identifier has been recognized.
/// Matching is case-sensitive.
pub(crate) static KEYWORDS: Lazy<HashMap<&'static str, TokenKind>> = Lazy::new(|| {
    vec![
        ("subtype", TokenKind::Subtype),
        ("record", TokenKind::Record),
        ("range", TokenKind::Range),
        ("is", TokenKind::Is),
        ("loop", TokenKind::Loop),
        ("while", TokenKind::While),
        ("for", TokenKind::For),
        ("begin", TokenKind::Begin),
        ("end", TokenKind::End),
        ("procedure", TokenKind::Procedure),
        ("function", TokenKind::Function),
        ("package", TokenKind::Package),
        ("use", TokenKind::Use),
        ("with", TokenKind::With),
        ("of", TokenKind::Of),
        ("array", TokenKind::Array),
        ("Integer", TokenKind::Integer),
        ("String", TokenKind::String),
        ("Boolean", TokenKind::Boolean),
        ("float", TokenKind::Float),
        ("null", TokenKind::Null),
        ("Character", TokenKind::Character),
        ("and", TokenKind::And),
        ("not", TokenKind::Not),
        ("true", TokenKind::True),
        ("false", TokenKind::False),
    ]
    .into_iter()
    .collect::<HashMap<_, _>>()
});

/// States of the token automaton.
///
/// Each state knows which characters it can consume and whether the text
/// read so far is a complete token. Scanning is maximal munch: the
/// automaton runs until no transition applies, then falls back to the
/// last accepting state it passed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum State {
    Ident,
    /// `0`
    Zero,
    /// `017`
    Octal,
    /// `089`: only valid if it turns into a float
    OctalOverflow,
    /// `0x`
    HexPrefix,
    /// `0x1F`
    Hex,
    /// `42`
    Decimal,
    /// `42L`
    LongSuffix,
    /// `4.`, `4.2`, `.5`
    Fraction,
    /// `4.2e`
    ExponentMark,
    /// `4.2e-`
    ExponentSign,
    /// `4.2e-3`
    Exponent,
    /// `4.2f`
    FloatSuffix,
    /// `.`
    Dot,
    /// `:`
    Colon,
    /// `'`
    CharOpen,
    /// `'a`, `'\n`
    CharBody,
    /// `'\`
    CharEscape,
    /// `'\1`, `'\12`: more octal digits may follow
    CharOctal { remaining: u8 },
    /// `'\u`, `'\uu0`
    CharUnicode { digits: u8 },
    /// `'a'`
    CharClose,
    /// `"abc`
    StringBody,
    /// `"abc\`
    StringEscape,
    /// `"\u12`
    StringUnicode { digits: u8 },
    /// `"abc"`
    StringClose,
    /// A token that is complete as soon as it starts.
    Punct(TokenKind),
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || ch == '$'
}

fn is_ident_continue(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '$'
}

fn is_octal_digit(ch: char) -> bool {
    matches!(ch, '0'..='7')
}

fn is_line_break(ch: char) -> bool {
    ch == '\n' || ch == '\r'
}

impl State {
    pub(crate) fn start(ch: char) -> Option<State> {
        let state = match ch {
            _ if is_ident_start(ch) => State::Ident,
            '0' => State::Zero,
            '1'..='9' => State::Decimal,
            '.' => State::Dot,
            ':' => State::Colon,
            '\'' => State::CharOpen,
            '"' => State::StringBody,
            ';' => State::Punct(TokenKind::Semicolon),
            ',' => State::Punct(TokenKind::Comma),
            '@' => State::Punct(TokenKind::SelfRef),
            '{' => State::Punct(TokenKind::LBrace),
            '[' => State::Punct(TokenKind::LBrack),
            '(' => State::Punct(TokenKind::LPar),
            '*' => State::Punct(TokenKind::Mult),
            '-' => State::Punct(TokenKind::Minus),
            '+' => State::Punct(TokenKind::Plus),
            '}' => State::Punct(TokenKind::RBrace),
            ']' => State::Punct(TokenKind::RBrack),
            ')' => State::Punct(TokenKind::RPar),
            '~' => State::Punct(TokenKind::Tilde),
            _ => return None,
        };
        Some(state)
    }

    /// The kind of token recognized if scanning stopped here.
    pub(crate) fn accepts(self) -> Option<TokenKind> {
        use State::*;
        match self {
            Ident => Some(TokenKind::Ident),
            Zero | Octal | Hex | Decimal | LongSuffix => Some(TokenKind::IntLit),
            Fraction | Exponent | FloatSuffix => Some(TokenKind::FloatLit),
            Dot => Some(TokenKind::Dot),
            Colon => Some(TokenKind::Colon),
            CharClose => Some(TokenKind::CharLit),
            StringClose => Some(TokenKind::StringLit),
            Punct(kind) => Some(kind),
            OctalOverflow | HexPrefix | ExponentMark | ExponentSign | CharOpen | CharBody
            | CharEscape | CharOctal { .. } | CharUnicode { .. } | StringBody | StringEscape
            | StringUnicode { .. } => None,
        }
    }

    pub(crate) fn next(self, ch: char) -> Option<State> {
        use State::*;
        let state = match (self, ch) {
            (Ident, _) if is_ident_continue(ch) => Ident,

            (Zero | Octal, _) if is_octal_digit(ch) => Octal,
            (Zero | Octal | OctalOverflow, '0'..='9') => OctalOverflow,
            (Zero, 'x' | 'X') => HexPrefix,
            (HexPrefix | Hex, _) if ch.is_ascii_hexdigit() => Hex,
            (Decimal, '0'..='9') => Decimal,
            (Zero | Octal | Decimal | Hex, 'l' | 'L') => LongSuffix,
            (Zero | Octal | OctalOverflow | Decimal, '.') => Fraction,
            (Zero | Octal | OctalOverflow | Decimal | Fraction, 'e' | 'E') => ExponentMark,
            (Zero | Octal | OctalOverflow | Decimal | Fraction | Exponent, 'd' | 'D' | 'f' | 'F') => {
                FloatSuffix
            }
            (Dot | Fraction, '0'..='9') => Fraction,
            (ExponentMark, '+' | '-') => ExponentSign,
            (ExponentMark | ExponentSign | Exponent, '0'..='9') => Exponent,

            (Colon, '=') => Punct(TokenKind::Assign),

            (CharOpen, '\\') => CharEscape,
            (CharOpen, _) if ch != '\'' && !is_line_break(ch) => CharBody,
            (CharEscape, '"' | '\'' | '\\' | 'b' | 'f' | 'n' | 'r' | 't') => CharBody,
            (CharEscape, '0'..='3') => CharOctal { remaining: 2 },
            (CharEscape, '4'..='7') => CharOctal { remaining: 1 },
            (CharOctal { remaining }, _) if remaining > 0 && is_octal_digit(ch) => CharOctal {
                remaining: remaining - 1,
            },
            (CharEscape, 'u') => CharUnicode { digits: 0 },
            (CharUnicode { digits: 0 }, 'u') => CharUnicode { digits: 0 },
            (CharUnicode { digits: 3 }, _) if ch.is_ascii_hexdigit() => CharBody,
            (CharUnicode { digits }, _) if ch.is_ascii_hexdigit() => CharUnicode {
                digits: digits + 1,
            },
            (CharBody | CharOctal { .. }, '\'') => CharClose,

            (StringBody, '"') => StringClose,
            (StringBody, '\\') => StringEscape,
            (StringBody, _) if !is_line_break(ch) => StringBody,
            (StringEscape, 'u') => StringUnicode { digits: 0 },
            (StringEscape, _) if !is_line_break(ch) => StringBody,
            (StringUnicode { digits: 0 }, 'u') => StringUnicode { digits: 0 },
            (StringUnicode { digits: 3 }, _) if ch.is_ascii_hexdigit() => StringBody,
            (StringUnicode { digits }, _) if ch.is_ascii_hexdigit() => StringUnicode {
                digits: digits + 1,
            },
            // An incomplete `\u` escape is read as plain string text.
            (StringUnicode { .. }, _) => return StringBody.next(ch),

            _ => return None,
        };
        Some(state)
    }
}

impl Scanner {
    /// Scans one token starting at the current character.
    pub(crate) fn next_token(&mut self) -> Result<Token, FatalError> {
        self.skip_blanks()?;
        self.text.clear();
        let byte_offset = self.pos;
        let char_offset = self.char_pos;
        let line = self.line;
        let col = self.col;

        let kind = match self.ch {
            None => TokenKind::Eof,
            Some(ch) => match State::start(ch) {
                None => {
                    self.add_ch()?;
                    TokenKind::NoSym
                }
                Some(state) => {
                    self.add_ch()?;
                    self.run(state)?
                }
            },
        };
        let kind = match kind {
            TokenKind::Ident => self
                .keywords
                .get(self.text.as_str())
                .copied()
                .unwrap_or(TokenKind::Ident),
            kind => kind,
        };
        Ok(Token {
            kind,
            text: self.text.clone(),
            byte_offset,
            char_offset,
            line,
            col,
        })
    }

    /// Runs the automaton from `state` and returns the longest match.
    ///
    /// Without any accepting state along the way, everything consumed
    /// becomes a single `NoSym` token.
    fn run(&mut self, mut state: State) -> Result<TokenKind, FatalError> {
        let mut recognized: Option<(TokenKind, Mark)> = None;
        loop {
            if let Some(kind) = state.accepts() {
                recognized = Some((kind, self.mark()));
            }
            match self.ch.and_then(|ch| state.next(ch)) {
                Some(next) => {
                    state = next;
                    self.add_ch()?;
                }
                None => break,
            }
        }
        match recognized {
            Some((kind, mark)) => {
                self.reset_to(&mark)?;
                Ok(kind)
            }
            None => Ok(TokenKind::NoSym),
        }
    }
}
