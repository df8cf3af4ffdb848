use crate::pos::Position;
use serde::Serialize;

/// Highest kind id that the parser treats as a real token.
///
/// Kinds above this id are reserved for pragma-like tokens, which the parser
/// skips without counting them toward the error distance.
pub const MAX_T: u8 = TokenKind::NoSym as u8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    /// The exact lexeme.
    pub text: String,
    pub byte_offset: usize,
    pub char_offset: usize,
    /// 1-based.
    pub line: u32,
    /// 1-based, counted in characters.
    pub col: u32,
}

impl Token {
    pub fn position(&self) -> Position {
        Position {
            line: self.line,
            col: self.col,
        }
    }
}

impl Default for Token {
    /// The synthetic empty token the parser starts from.
    fn default() -> Self {
        Token {
            kind: TokenKind::Eof,
            text: String::new(),
            byte_offset: 0,
            char_offset: 0,
            line: 0,
            col: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[repr(u8)]
pub enum TokenKind {
    Eof,
    /// `Total`, `Text_IO`, `$tmp`
    Ident,
    /// `42`, `017`, `0x2A`, `7L`
    IntLit,
    /// `4.2`, `.5`, `42e3`, `1.5E-2`, `3f`
    FloatLit,
    /// `'a'`, `'\n'`, `'\101'`, `'A'`
    CharLit,
    /// `"text"`
    StringLit,
    /// `subtype`
    Subtype,
    /// `record`
    Record,
    /// `range`
    Range,
    /// `is`
    Is,
    /// `loop`
    Loop,
    /// `while`
    While,
    /// `for`
    For,
    /// `begin`
    Begin,
    /// `end`
    End,
    /// `procedure`
    Procedure,
    /// `function`
    Function,
    /// `package`
    Package,
    /// `use`
    Use,
    /// `with`
    With,
    /// `of`
    Of,
    /// `array`
    Array,
    /// `Integer`
    Integer,
    /// `String`
    String,
    /// `Boolean`
    Boolean,
    /// `float`
    Float,
    /// `null`
    Null,
    /// `Character`
    Character,
    /// `:`
    Colon,
    /// `;`
    Semicolon,
    /// `,`
    Comma,
    /// `.`
    Dot,
    /// `@`, the target of the enclosing assignment
    SelfRef,
    /// `{`
    LBrace,
    /// `[`
    LBrack,
    /// `(`
    LPar,
    /// `*`
    Mult,
    /// `and`
    And,
    /// `not`
    Not,
    /// `-`
    Minus,
    /// `+`
    Plus,
    /// `}`
    RBrace,
    /// `]`
    RBrack,
    /// `)`
    RPar,
    /// `~`
    Tilde,
    /// `:=`
    Assign,
    /// `true`
    True,
    /// `false`
    False,
    /// Input that matches no token: a stray character or an unterminated
    /// literal.
    NoSym,
}

impl TokenKind {
    /// Number of kinds, i.e. the width of a row in the set table.
    pub const COUNT: usize = TokenKind::NoSym as usize + 1;

    pub const fn index(self) -> usize {
        self as usize
    }

    /// Name used in "... expected" messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::Eof => "EOF",
            Self::Ident => "ident",
            Self::IntLit => "intLit",
            Self::FloatLit => "floatLit",
            Self::CharLit => "charLit",
            Self::StringLit => "stringLit",
            Self::Subtype => "subtype",
            Self::Record => "record",
            Self::Range => "range",
            Self::Is => "is",
            Self::Loop => "loop",
            Self::While => "while",
            Self::For => "for",
            Self::Begin => "begin",
            Self::End => "end",
            Self::Procedure => "procedure",
            Self::Function => "function",
            Self::Package => "package",
            Self::Use => "use",
            Self::With => "with",
            Self::Of => "of",
            Self::Array => "array",
            Self::Integer => "Integer",
            Self::String => "String",
            Self::Boolean => "Boolean",
            Self::Float => "float",
            Self::Null => "null",
            Self::Character => "Character",
            Self::Colon => "\":\"",
            Self::Semicolon => "\";\"",
            Self::Comma => "\",\"",
            Self::Dot => "\".\"",
            Self::SelfRef => "\"@\"",
            Self::LBrace => "\"{\"",
            Self::LBrack => "\"[\"",
            Self::LPar => "\"(\"",
            Self::Mult => "\"*\"",
            Self::And => "and",
            Self::Not => "not",
            Self::Minus => "\"-\"",
            Self::Plus => "\"+\"",
            Self::RBrace => "\"}\"",
            Self::RBrack => "\"]\"",
            Self::RPar => "\")\"",
            Self::Tilde => "\"~\"",
            Self::Assign => "\":=\"",
            Self::True => "true",
            Self::False => "false",
            Self::NoSym => "???",
        }
    }

    pub fn is_literal(self) -> bool {
        matches!(
            self,
            Self::Ident | Self::IntLit | Self::FloatLit | Self::CharLit | Self::StringLit
        )
    }

    pub fn is_keyword(self) -> bool {
        (Self::Subtype..=Self::Character).contains(&self)
    }

    pub fn is_punctuation(self) -> bool {
        (Self::Colon..=Self::False).contains(&self)
    }

    /// Whether the parser consumes this kind (as opposed to skipping it).
    pub fn is_real(self) -> bool {
        self as u8 <= MAX_T
    }
}
