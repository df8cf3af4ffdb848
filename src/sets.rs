//! First/follow sets for the grammar in `parsing`.
//!
//! The table is computed by hand from the grammar and laid out as a matrix:
//! `SETS[set][kind]`. Row 0 is always `{EOF}` so that every recovery loop
//! stops at end of input.

use crate::token::TokenKind;

/// A set of token kinds, one bit per kind.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenSet(u64);

impl TokenSet {
    pub const fn new() -> Self {
        TokenSet(0)
    }

    #[must_use]
    pub const fn with(self, kind: TokenKind) -> Self {
        TokenSet(self.0 | (1u64 << kind.index()))
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        TokenSet(self.0 | other.0)
    }

    pub const fn contains(&self, kind: TokenKind) -> bool {
        self.0 & (1u64 << kind.index()) != 0
    }

    pub const fn is_superset(&self, other: &Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn iter(self) -> impl Iterator<Item = TokenKind> {
        ALL_KINDS.iter().copied().filter(move |&kind| self.contains(kind))
    }
}

impl Default for TokenSet {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

const ALL_KINDS: [TokenKind; TokenKind::COUNT] = {
    use TokenKind as K;
    [
        K::Eof,
        K::Ident,
        K::IntLit,
        K::FloatLit,
        K::CharLit,
        K::StringLit,
        K::Subtype,
        K::Record,
        K::Range,
        K::Is,
        K::Loop,
        K::While,
        K::For,
        K::Begin,
        K::End,
        K::Procedure,
        K::Function,
        K::Package,
        K::Use,
        K::With,
        K::Of,
        K::Array,
        K::Integer,
        K::String,
        K::Boolean,
        K::Float,
        K::Null,
        K::Character,
        K::Colon,
        K::Semicolon,
        K::Comma,
        K::Dot,
        K::SelfRef,
        K::LBrace,
        K::LBrack,
        K::LPar,
        K::Mult,
        K::And,
        K::Not,
        K::Minus,
        K::Plus,
        K::RBrace,
        K::RBrack,
        K::RPar,
        K::Tilde,
        K::Assign,
        K::True,
        K::False,
        K::NoSym,
    ]
};

/// Row ids into [`SETS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SetId {
    /// `{EOF}`: the universal recovery sentinel, also the follow of the
    /// top-level item list.
    Eof,
    /// First of `Expr`.
    ExprStart,
    /// First of a non-empty `Item`.
    ItemStart,
    /// Where an item list resumes after a missing `;`.
    ItemSync,
    /// Follow of an item list closed by `end`.
    BlockFollow,
    /// Follow of a unit's declarative part.
    DeclPartFollow,
    /// Resume point after a missing `is` in a unit header.
    DeclSync,
    /// Resume point after a missing `:` in a declaration.
    TypeStart,
    /// First of a parameter declaration.
    ParamStart,
    /// Follow of a parenthesized list.
    CloseParen,
    /// Follow of an aggregate's element list.
    CloseBrace,
    /// First of `AddOp`.
    AddOp,
}

const EOF: TokenSet = TokenSet::new().with(TokenKind::Eof);

const EXPR_START: TokenSet = TokenSet::new()
    .with(TokenKind::Ident)
    .with(TokenKind::SelfRef)
    .with(TokenKind::IntLit)
    .with(TokenKind::FloatLit)
    .with(TokenKind::CharLit)
    .with(TokenKind::StringLit)
    .with(TokenKind::True)
    .with(TokenKind::False)
    .with(TokenKind::Null)
    .with(TokenKind::LPar)
    .with(TokenKind::LBrace)
    .with(TokenKind::Not)
    .with(TokenKind::Plus)
    .with(TokenKind::Minus);

const STMT_START: TokenSet = EXPR_START.with(TokenKind::While).with(TokenKind::For);

const ITEM_START: TokenSet = STMT_START
    .with(TokenKind::Subtype)
    .with(TokenKind::Procedure)
    .with(TokenKind::Function)
    .with(TokenKind::Package)
    .with(TokenKind::With)
    .with(TokenKind::Use);

// Items may be empty, so a bare `;` is also a fine place to resume.
const ITEM_SYNC: TokenSet = ITEM_START.with(TokenKind::Semicolon);

const BLOCK_FOLLOW: TokenSet = TokenSet::new().with(TokenKind::End);

const DECL_PART_FOLLOW: TokenSet = BLOCK_FOLLOW.with(TokenKind::Begin);

const DECL_SYNC: TokenSet = ITEM_SYNC.union(DECL_PART_FOLLOW).union(EOF);

const TYPE_START: TokenSet = TokenSet::new()
    .with(TokenKind::Integer)
    .with(TokenKind::String)
    .with(TokenKind::Boolean)
    .with(TokenKind::Float)
    .with(TokenKind::Character)
    .with(TokenKind::Ident)
    .with(TokenKind::Array)
    .with(TokenKind::Record)
    .union(EOF);

const PARAM_START: TokenSet = TokenSet::new().with(TokenKind::Ident);

const CLOSE_PAREN: TokenSet = TokenSet::new().with(TokenKind::RPar);

const CLOSE_BRACE: TokenSet = TokenSet::new().with(TokenKind::RBrace);

const ADD_OP: TokenSet = TokenSet::new()
    .with(TokenKind::Plus)
    .with(TokenKind::Minus)
    .with(TokenKind::Tilde);

/// Indexed by [`SetId`].
pub(crate) static SETS: [TokenSet; 12] = [
    EOF,
    EXPR_START,
    ITEM_START,
    ITEM_SYNC,
    BLOCK_FOLLOW,
    DECL_PART_FOLLOW,
    DECL_SYNC,
    TYPE_START,
    PARAM_START,
    CLOSE_PAREN,
    CLOSE_BRACE,
    ADD_OP,
];

impl SetId {
    pub(crate) fn set(self) -> &'static TokenSet {
        &SETS[self as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_row_zero_is_eof() {
        assert_eq!(SETS[0].iter().collect::<Vec<_>>(), vec![TokenKind::Eof]);
        assert_eq!(SetId::Eof.set(), &SETS[0]);
    }

    #[test]
    fn test_rows_line_up_with_ids() {
        assert_eq!(SetId::AddOp as usize, SETS.len() - 1);
        assert_eq!(SetId::TypeStart.set(), &TYPE_START);
        assert_eq!(SetId::CloseBrace.set(), &CLOSE_BRACE);
    }

    #[test]
    fn test_all_kinds_in_order() {
        for (i, kind) in ALL_KINDS.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }

    #[test]
    fn test_weak_expect_sets_stop_at_eof() {
        for id in [SetId::DeclSync, SetId::TypeStart] {
            assert!(id.set().contains(TokenKind::Eof), "{:?}", id);
        }
    }

    #[test]
    fn test_item_sets_nest() {
        assert!(STMT_START.is_superset(SetId::ExprStart.set()));
        assert!(SetId::ItemStart.set().is_superset(&STMT_START));
        assert!(SetId::ItemSync.set().is_superset(SetId::ItemStart.set()));
        // An empty item at end of input must not look like a resume point.
        assert!(!SetId::ItemSync.set().contains(TokenKind::Eof));
        assert!(!SetId::ItemStart.set().contains(TokenKind::Begin));
    }
}
