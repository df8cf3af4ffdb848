use tracing::{debug, trace};

use crate::escape::inspect;
use crate::parser_diagnostics::{ErrorSink, FatalError, SyntaxError};
use crate::scanner::{Scanner, TokenId};
use crate::sets::SetId;
use crate::token::{Token, TokenKind};

/// Default number of tokens that must be consumed after an error before
/// the next one is reported.
pub const MIN_ERR_DIST: u32 = 2;

/// Grow the stack when less than this is left.
const RED_ZONE: usize = 100 * 1024;

/// Size of each new stack segment.
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Runs `f` on a grown stack if the current one is nearly exhausted.
///
/// Recursive rules go through this so that deeply nested input is parsed
/// instead of overflowing.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

#[inline]
#[cfg(target_arch = "wasm32")]
pub(crate) fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}

/// Recursive-descent parser over a [`Scanner`].
///
/// The grammar rules live in [`crate::parsing`]; this module holds the
/// cursor and the recovery primitives they are written with.
#[derive(Debug)]
pub struct Parser {
    pub(crate) scanner: Scanner,
    pub(crate) errors: ErrorSink,
    /// Last consumed token.
    pub(crate) t: TokenId,
    /// Lookahead token.
    pub(crate) la: TokenId,
    err_dist: u32,
    min_err_dist: u32,
}

impl Parser {
    pub fn new(scanner: Scanner, errors: ErrorSink) -> Self {
        Parser {
            scanner,
            errors,
            t: 0,
            la: 0,
            err_dist: MIN_ERR_DIST,
            min_err_dist: MIN_ERR_DIST,
        }
    }

    pub fn with_min_error_distance(mut self, distance: u32) -> Self {
        self.min_err_dist = distance;
        self.err_dist = distance;
        self
    }

    /// Parses the whole input.
    ///
    /// Syntax errors are recorded in the error sink; only I/O and buffer
    /// failures are returned.
    pub fn parse(&mut self) -> Result<(), FatalError> {
        self.la = 0;
        self.get()?;
        self.ada()?;
        self.expect(TokenKind::Eof)
    }

    pub fn errors(&self) -> &ErrorSink {
        &self.errors
    }

    pub fn into_errors(self) -> ErrorSink {
        self.errors
    }

    pub(crate) fn la(&self) -> &Token {
        self.scanner.token(self.la)
    }

    pub(crate) fn la_kind(&self) -> TokenKind {
        self.la().kind
    }

    pub(crate) fn t(&self) -> &Token {
        self.scanner.token(self.t)
    }

    /// Advances to the next real token.
    pub(crate) fn get(&mut self) -> Result<(), FatalError> {
        loop {
            self.t = self.la;
            self.la = self.scanner.scan_id()?;
            if self.la_kind().is_real() {
                self.err_dist += 1;
                return Ok(());
            }
        }
    }

    pub(crate) fn expect(&mut self, kind: TokenKind) -> Result<(), FatalError> {
        if self.la_kind() == kind {
            self.get()
        } else {
            self.syn_err(SyntaxError::Expected(kind));
            Ok(())
        }
    }

    /// Like [`Parser::expect`], but on a mismatch skips ahead to a token
    /// in `follow`.
    pub(crate) fn expect_weak(&mut self, kind: TokenKind, follow: SetId) -> Result<(), FatalError> {
        debug_assert!(follow.set().is_superset(SetId::Eof.set()));
        if self.la_kind() == kind {
            self.get()
        } else {
            self.syn_err(SyntaxError::Expected(kind));
            while !self.start_of(follow) {
                self.get()?;
            }
            Ok(())
        }
    }

    /// Handles a list separator.
    ///
    /// Returns `true` when the list continues: either `kind` was present,
    /// or it was missing and the parser resynchronized on `sync`. Returns
    /// `false` when the lookahead ends the list.
    pub(crate) fn weak_separator(
        &mut self,
        kind: TokenKind,
        sync: SetId,
        repeat_follow: SetId,
    ) -> Result<bool, FatalError> {
        if self.la_kind() == kind {
            self.get()?;
            return Ok(true);
        }
        if self.start_of(repeat_follow) {
            return Ok(false);
        }
        self.syn_err(SyntaxError::Expected(kind));
        while !(self.start_of(sync) || self.start_of(repeat_follow) || self.start_of(SetId::Eof)) {
            self.get()?;
        }
        Ok(self.start_of(sync))
    }

    pub(crate) fn start_of(&self, set: SetId) -> bool {
        set.set().contains(self.la_kind())
    }

    /// Looks `n` tokens past the lookahead without consuming anything.
    pub(crate) fn peek(&mut self, n: usize) -> Result<TokenKind, FatalError> {
        self.scanner.reset_peek();
        let mut kind = self.la_kind();
        for _ in 0..n {
            kind = self.scanner.peek()?.kind;
        }
        Ok(kind)
    }

    /// Reports a syntax error at the lookahead, unless it is too close to
    /// the previous one.
    pub(crate) fn syn_err(&mut self, error: SyntaxError) {
        let position = self.la().position();
        if self.err_dist >= self.min_err_dist {
            debug!(code = error.code(), line = position.line, col = position.col, %error, "syntax error");
            self.errors.syn_err(position, error);
        } else {
            debug!(code = error.code(), line = position.line, col = position.col, %error, "suppressed syntax error");
        }
        self.err_dist = 0;
    }

    /// Reports a semantic error at the last consumed token.
    pub(crate) fn sem_err(&mut self, message: impl Into<String>) {
        let position = self.t().position();
        let message = message.into();
        if self.err_dist >= self.min_err_dist {
            debug!(line = position.line, col = position.col, %message, "semantic error");
            self.errors.sem_err(position, message);
        } else {
            debug!(line = position.line, col = position.col, %message, "suppressed semantic error");
        }
        self.err_dist = 0;
    }

    pub(crate) fn warning(&mut self, message: impl Into<String>) {
        let position = self.t().position();
        self.errors.warning(position, message);
    }

    /// Emits the left-to-right trace of what a rule recognized.
    pub(crate) fn trace_rule(&self, rule: &'static str, lexeme: &str) {
        trace!(rule, lexeme = %inspect(lexeme), "recognized");
    }
}
