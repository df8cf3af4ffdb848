//! Grammar rules, one method per nonterminal.
//!
//! ```text
//! Ada         = Items<EOF> EOF .
//! Items<F>    = Item { WEAK ";" Item } .
//! Item        = [ Context | Unit | Subtype | Declaration | Statement ] .
//! Context     = ( "with" | "use" ) Name .
//! Unit        = ( "procedure" | "function" | "package" ) ident [ Params ]
//!               WEAK "is" Items<begin|end> [ "begin" Items<end> ] "end" [ ident ] .
//! Params      = "(" Declaration { WEAK ";" Declaration } ")" .
//! Subtype     = "subtype" ident "is" TypeMark .
//! Declaration = ident { "," ident } WEAK ":" TypeMark [ ":=" Expr ] .
//! TypeMark    = "Integer" | "String" | "Boolean" | "float" | "Character" | ident
//!             | "array" "[" Expr "]" "of" TypeMark
//!             | "record" Items<end> "end" "record" .
//! Statement   = "while" Expr "loop" Items<end> "end" "loop"
//!             | "for" ident "of" Expr "loop" Items<end> "end" "loop"
//!             | Expr [ ":=" Expr ] .
//! Expr        = SimpleExpr { "and" SimpleExpr } .
//! SimpleExpr  = [ "+" | "-" ] Term { AddOp Term } .
//! AddOp       = "+" | "-" | "~" .
//! Term        = Factor { "*" Factor } .
//! Factor      = "not" Factor | Primary .
//! Primary     = intLit | floatLit | charLit | stringLit | "true" | "false" | "null"
//!             | Name | "(" Expr ")" | "{" [ Expr { WEAK "," Expr } ] "}" .
//! Name        = ( ident | "@" ) { "." ident | "(" Expr { WEAK "," Expr } ")" | "[" Expr "]" } .
//! ```
//!
//! `Item` picks `Declaration` over `Statement` when the identifier is
//! followed by `:` or `,`.

use crate::buffer::Buffer;
use crate::parser::{ensure_sufficient_stack, Parser};
use crate::parser_diagnostics::{ErrorSink, FatalError, Production, SyntaxError};
use crate::scanner::Scanner;
use crate::sets::SetId;
use crate::token::TokenKind;

/// Parses a whole source and returns the diagnostics it produced.
pub fn parse(buffer: Buffer, errors: ErrorSink) -> Result<ErrorSink, FatalError> {
    let mut parser = Parser::new(Scanner::new(buffer)?, errors);
    parser.parse()?;
    Ok(parser.into_errors())
}

/// Whether an expression can stand on the left of `:=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExprShape {
    Name,
    Other,
}

impl Parser {
    pub(crate) fn ada(&mut self) -> Result<(), FatalError> {
        self.items(SetId::Eof)
    }

    fn items(&mut self, follow: SetId) -> Result<(), FatalError> {
        self.item()?;
        while self.weak_separator(TokenKind::Semicolon, SetId::ItemSync, follow)? {
            self.item()?;
        }
        Ok(())
    }

    fn item(&mut self) -> Result<(), FatalError> {
        ensure_sufficient_stack(|| -> Result<(), FatalError> {
            if !self.start_of(SetId::ItemStart) {
                // empty item
                return Ok(());
            }
            match self.la_kind() {
                TokenKind::With | TokenKind::Use => self.context(),
                TokenKind::Procedure | TokenKind::Function | TokenKind::Package => self.unit(),
                TokenKind::Subtype => self.subtype_decl(),
                _ => {
                    if self.is_declaration()? {
                        self.declaration()
                    } else {
                        self.statement()
                    }
                }
            }
        })
    }

    fn is_declaration(&mut self) -> Result<bool, FatalError> {
        Ok(self.la_kind() == TokenKind::Ident
            && matches!(self.peek(1)?, TokenKind::Colon | TokenKind::Comma))
    }

    fn recognized(&self, rule: &'static str) {
        self.trace_rule(rule, &self.t().text);
    }

    fn context(&mut self) -> Result<(), FatalError> {
        self.get()?;
        self.recognized("context");
        self.name()?;
        Ok(())
    }

    fn unit(&mut self) -> Result<(), FatalError> {
        self.get()?;
        self.recognized("unit");
        let name = match self.la_kind() {
            TokenKind::Ident => Some(self.la().text.clone()),
            _ => None,
        };
        self.expect(TokenKind::Ident)?;
        if self.la_kind() == TokenKind::LPar {
            self.parameters()?;
        }
        self.expect_weak(TokenKind::Is, SetId::DeclSync)?;
        self.items(SetId::DeclPartFollow)?;
        if self.la_kind() == TokenKind::Begin {
            self.get()?;
            self.items(SetId::BlockFollow)?;
        }
        self.expect(TokenKind::End)?;
        if self.la_kind() == TokenKind::Ident {
            self.get()?;
            self.recognized("end label");
            if let Some(name) = name {
                let label = &self.t().text;
                if *label != name {
                    let message = format!(
                        "end label \"{}\" does not match unit \"{}\"",
                        label, name
                    );
                    self.warning(message);
                }
            }
        }
        Ok(())
    }

    fn parameters(&mut self) -> Result<(), FatalError> {
        self.expect(TokenKind::LPar)?;
        self.declaration()?;
        while self.weak_separator(TokenKind::Semicolon, SetId::ParamStart, SetId::CloseParen)? {
            self.declaration()?;
        }
        self.expect(TokenKind::RPar)
    }

    fn subtype_decl(&mut self) -> Result<(), FatalError> {
        self.expect(TokenKind::Subtype)?;
        self.expect(TokenKind::Ident)?;
        self.recognized("subtype");
        self.expect(TokenKind::Is)?;
        self.type_mark()
    }

    fn declaration(&mut self) -> Result<(), FatalError> {
        self.expect(TokenKind::Ident)?;
        self.recognized("ident");
        while self.la_kind() == TokenKind::Comma {
            self.get()?;
            self.expect(TokenKind::Ident)?;
            self.recognized("ident");
        }
        self.expect_weak(TokenKind::Colon, SetId::TypeStart)?;
        self.type_mark()?;
        if self.la_kind() == TokenKind::Assign {
            self.get()?;
            self.expr()?;
        }
        Ok(())
    }

    fn type_mark(&mut self) -> Result<(), FatalError> {
        ensure_sufficient_stack(|| -> Result<(), FatalError> {
            match self.la_kind() {
                TokenKind::Integer
                | TokenKind::String
                | TokenKind::Boolean
                | TokenKind::Float
                | TokenKind::Character
                | TokenKind::Ident => {
                    self.get()?;
                    self.recognized("type");
                }
                TokenKind::Array => {
                    self.get()?;
                    self.recognized("type");
                    self.expect(TokenKind::LBrack)?;
                    self.expr()?;
                    self.expect(TokenKind::RBrack)?;
                    self.expect(TokenKind::Of)?;
                    self.type_mark()?;
                }
                TokenKind::Record => {
                    self.get()?;
                    self.recognized("type");
                    self.items(SetId::BlockFollow)?;
                    self.expect(TokenKind::End)?;
                    self.expect(TokenKind::Record)?;
                }
                _ => self.syn_err(SyntaxError::Invalid(Production::TypeMark)),
            }
            Ok(())
        })
    }

    fn statement(&mut self) -> Result<(), FatalError> {
        match self.la_kind() {
            TokenKind::While => {
                self.get()?;
                self.recognized("while");
                self.expr()?;
                self.loop_body()
            }
            TokenKind::For => {
                self.get()?;
                self.expect(TokenKind::Ident)?;
                self.recognized("for");
                self.expect(TokenKind::Of)?;
                self.expr()?;
                self.loop_body()
            }
            _ => {
                let target = self.expr()?;
                if self.la_kind() == TokenKind::Assign {
                    if target != ExprShape::Name {
                        self.sem_err("invalid assignment target");
                    }
                    self.get()?;
                    self.recognized("assign");
                    self.expr()?;
                }
                Ok(())
            }
        }
    }

    fn loop_body(&mut self) -> Result<(), FatalError> {
        self.expect(TokenKind::Loop)?;
        self.items(SetId::BlockFollow)?;
        self.expect(TokenKind::End)?;
        self.expect(TokenKind::Loop)
    }

    fn expr(&mut self) -> Result<ExprShape, FatalError> {
        ensure_sufficient_stack(|| -> Result<ExprShape, FatalError> {
            let mut shape = self.simple_expr()?;
            while self.la_kind() == TokenKind::And {
                self.get()?;
                self.simple_expr()?;
                shape = ExprShape::Other;
            }
            Ok(shape)
        })
    }

    fn simple_expr(&mut self) -> Result<ExprShape, FatalError> {
        let mut signed = false;
        if matches!(self.la_kind(), TokenKind::Plus | TokenKind::Minus) {
            self.get()?;
            signed = true;
        }
        let mut shape = self.term()?;
        while self.start_of(SetId::AddOp) {
            self.add_op()?;
            self.term()?;
            shape = ExprShape::Other;
        }
        Ok(if signed { ExprShape::Other } else { shape })
    }

    fn add_op(&mut self) -> Result<(), FatalError> {
        match self.la_kind() {
            TokenKind::Plus | TokenKind::Minus | TokenKind::Tilde => {
                self.get()?;
                self.recognized("operator");
            }
            _ => self.syn_err(SyntaxError::Invalid(Production::AddOp)),
        }
        Ok(())
    }

    fn term(&mut self) -> Result<ExprShape, FatalError> {
        let mut shape = self.factor()?;
        while self.la_kind() == TokenKind::Mult {
            self.get()?;
            self.factor()?;
            shape = ExprShape::Other;
        }
        Ok(shape)
    }

    fn factor(&mut self) -> Result<ExprShape, FatalError> {
        ensure_sufficient_stack(|| -> Result<ExprShape, FatalError> {
            if self.la_kind() == TokenKind::Not {
                self.get()?;
                self.factor()?;
                Ok(ExprShape::Other)
            } else {
                self.primary()
            }
        })
    }

    fn primary(&mut self) -> Result<ExprShape, FatalError> {
        match self.la_kind() {
            TokenKind::IntLit
            | TokenKind::FloatLit
            | TokenKind::CharLit
            | TokenKind::StringLit
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Null => {
                self.get()?;
                self.recognized("literal");
            }
            TokenKind::Ident | TokenKind::SelfRef => return self.name(),
            TokenKind::LPar => {
                self.get()?;
                self.expr()?;
                self.expect(TokenKind::RPar)?;
            }
            TokenKind::LBrace => {
                self.get()?;
                if self.start_of(SetId::ExprStart) {
                    self.expr()?;
                    while self.weak_separator(TokenKind::Comma, SetId::ExprStart, SetId::CloseBrace)? {
                        self.expr()?;
                    }
                }
                self.expect(TokenKind::RBrace)?;
            }
            _ => self.syn_err(SyntaxError::Invalid(Production::Primary)),
        }
        Ok(ExprShape::Other)
    }

    fn name(&mut self) -> Result<ExprShape, FatalError> {
        match self.la_kind() {
            TokenKind::Ident | TokenKind::SelfRef => {
                self.get()?;
                self.recognized("name");
            }
            _ => self.syn_err(SyntaxError::Invalid(Production::Name)),
        }
        loop {
            match self.la_kind() {
                TokenKind::Dot => {
                    self.get()?;
                    self.expect(TokenKind::Ident)?;
                    self.recognized("selector");
                }
                TokenKind::LPar => {
                    self.get()?;
                    self.expr()?;
                    while self.weak_separator(TokenKind::Comma, SetId::ExprStart, SetId::CloseParen)? {
                        self.expr()?;
                    }
                    self.expect(TokenKind::RPar)?;
                }
                TokenKind::LBrack => {
                    self.get()?;
                    self.expr()?;
                    self.expect(TokenKind::RBrack)?;
                }
                _ => break,
            }
        }
        Ok(ExprShape::Name)
    }
}
