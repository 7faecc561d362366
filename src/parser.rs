//! Reduces a flat [`Token`] stream into a [`DefinitionList`] AST.
//!
//! ```text
//! grammar       ::= rule_list
//! rule_list     ::= ε | rule_list rule
//! rule          ::= LHS IS_DEFINED_AS kind rhs_list
//!                 | LHS IS_DEFINED_AS ONE_OF_KIND one_of_list
//! kind          ::= ε | TOKEN_KIND | REGEXP_KIND
//! rhs_list      ::= rhs_line | rhs_list rhs_line
//! rhs_line      ::= alt_list EOL | REGEXP
//! one_of_list   ::= LITERAL | one_of_list LITERAL
//! alt_list      ::= alt | alt_list OR alt
//! alt           ::= ε | term_list
//! term_list     ::= term | term_list term
//! term          ::= LPAREN alt_list RPAREN
//!                 | SYMBOL_NAME
//!                 | QUOTED_LITERAL
//!                 | term (STAR | PLUS | QUESTION)
//! ```
//!
//! `rhs_line`'s second alternative is written `REGEXP EOL` in `spec.md`, but
//! the lexer's `(regexp)` body mode never emits an `EOL` (§4.B) — each
//! `REGEXP` token already demarcates one line. The parser follows the
//! lexer here: a bare `REGEXP` token ends a line on its own, consuming a
//! trailing `EOL` only if one happens to be present.
use std::rc::Rc;

use crate::ast::{Definition, DefinitionKind, DefinitionList, Quantifier, Symbol, Term};
use crate::diagnostics::Diagnostic;
use crate::source_map::SourceRange;
use crate::token::{Token, TokenKind};

/// Parses `tokens` into a [`DefinitionList`].
///
/// On a syntax error, returns a single [`Diagnostic`] sited at the offending
/// token, with notes listing the token kinds that would have been accepted;
/// no partial AST is produced.
pub fn parse(tokens: &[Token]) -> Result<DefinitionList, Diagnostic> {
    log::debug!("parsing {} tokens", tokens.len());
    let mut parser = Parser { tokens, pos: 0 };
    match parser.parse_grammar() {
        Ok(defs) => {
            log::debug!("parsed {} rules", defs.len());
            Ok(defs)
        }
        Err(err) => {
            log::warn!("{}", err.message);
            Err(err)
        }
    }
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> Parser<'t> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    fn bump(&mut self) -> &'t Token {
        let t = &self.tokens[self.pos];
        self.pos += 1;
        t
    }

    fn error_range(&self) -> SourceRange {
        match self.peek() {
            Some(t) => t.range.clone(),
            None => self
                .tokens
                .last()
                .map(|t| t.range.clone())
                .unwrap_or_else(SourceRange::none),
        }
    }

    fn syntax_error(&self, expected: &[&str]) -> Diagnostic {
        let found = match self.peek() {
            Some(t) => format!("{}", t.kind),
            None => "end of input".to_string(),
        };
        let message = format!(
            "unexpected {}; expected one of: {}",
            found,
            expected.join(", ")
        );
        Diagnostic::new(message, self.error_range())
    }

    fn expect(&mut self, kind: TokenKind, expected_desc: &[&str]) -> Result<&'t Token, Diagnostic> {
        if self.peek_kind() == Some(kind) {
            Ok(self.bump())
        } else {
            Err(self.syntax_error(expected_desc))
        }
    }

    fn parse_grammar(&mut self) -> Result<DefinitionList, Diagnostic> {
        let mut defs = Vec::new();
        while self.peek().is_some() {
            defs.push(self.parse_rule()?);
        }
        Ok(defs)
    }

    fn parse_rule(&mut self) -> Result<Definition, Diagnostic> {
        let lhs_tok = self.expect(TokenKind::Lhs, &["LHS"])?;
        let lhs = Symbol::new(lhs_tok.lexeme.clone(), lhs_tok.range.clone());
        let start = lhs_tok.range.clone();
        self.expect(TokenKind::IsDefinedAs, &["::="])?;
        match self.peek_kind() {
            Some(TokenKind::OneOfKind) => {
                self.bump();
                let alternatives = self.parse_one_of_list()?;
                let end = alternatives
                    .last()
                    .and_then(|a| a.last())
                    .map(Term::range)
                    .unwrap_or_else(|| start.clone());
                Ok(Definition {
                    kind: DefinitionKind::OneOf,
                    lhs,
                    alternatives,
                    range: start.extend(&end),
                })
            }
            Some(TokenKind::TokenKind) => {
                self.bump();
                let alternatives = self.parse_rhs_list()?;
                Ok(self.finish_definition(DefinitionKind::Token, lhs, alternatives, start))
            }
            Some(TokenKind::RegexpKind) => {
                self.bump();
                let alternatives = self.parse_rhs_list()?;
                Ok(self.finish_definition(DefinitionKind::Regexp, lhs, alternatives, start))
            }
            _ => {
                let alternatives = self.parse_rhs_list()?;
                Ok(self.finish_definition(DefinitionKind::Plain, lhs, alternatives, start))
            }
        }
    }

    fn finish_definition(
        &self,
        kind: DefinitionKind,
        lhs: Symbol,
        alternatives: crate::ast::AlternativeList,
        start: SourceRange,
    ) -> Definition {
        let end = alternatives
            .last()
            .map(|a| {
                a.last()
                    .map(Term::range)
                    .unwrap_or_else(|| start.clone())
            })
            .unwrap_or_else(|| start.clone());
        Definition {
            kind,
            lhs,
            alternatives,
            range: start.extend(&end),
        }
    }

    fn parse_one_of_list(&mut self) -> Result<crate::ast::AlternativeList, Diagnostic> {
        let mut alts = Vec::new();
        loop {
            match self.peek_kind() {
                Some(TokenKind::Literal) => {
                    let tok = self.bump();
                    alts.push(vec![Term::Literal(tok.lexeme.clone(), tok.range.clone())]);
                }
                _ => break,
            }
        }
        if alts.is_empty() {
            return Err(self.syntax_error(&["LITERAL"]));
        }
        Ok(alts)
    }

    fn parse_rhs_list(&mut self) -> Result<crate::ast::AlternativeList, Diagnostic> {
        let mut alts = Vec::new();
        loop {
            match self.peek_kind() {
                Some(TokenKind::Lhs) | None => break,
                Some(TokenKind::Regexp) => {
                    let tok = self.bump();
                    alts.push(vec![Term::Regexp(tok.lexeme.clone(), tok.range.clone())]);
                    if self.peek_kind() == Some(TokenKind::Eol) {
                        self.bump();
                    }
                }
                _ => {
                    alts.push(self.parse_rhs_line()?);
                    self.expect(TokenKind::Eol, &["end of line"])?;
                }
            }
        }
        if alts.is_empty() {
            return Err(self.syntax_error(&["a rule body"]));
        }
        Ok(alts)
    }

    /// Parses one `alt_list EOL`-shaped line, collapsing it to the single
    /// alternative the line contributes to the rule (§4.C).
    fn parse_rhs_line(&mut self) -> Result<crate::ast::Alternative, Diagnostic> {
        let mut alt_list = vec![self.parse_alt()?];
        while self.peek_kind() == Some(TokenKind::Or) {
            self.bump();
            alt_list.push(self.parse_alt()?);
        }
        if alt_list.len() == 1 {
            Ok(alt_list.into_iter().next().unwrap())
        } else {
            Ok(vec![Term::Group(alt_list)])
        }
    }

    fn parse_alt(&mut self) -> Result<crate::ast::Alternative, Diagnostic> {
        let mut terms = Vec::new();
        while matches!(
            self.peek_kind(),
            Some(TokenKind::LParen) | Some(TokenKind::SymbolName) | Some(TokenKind::QuotedLiteral)
        ) {
            terms.push(self.parse_term()?);
        }
        Ok(terms)
    }

    fn parse_term(&mut self) -> Result<Term, Diagnostic> {
        let mut term = match self.peek_kind() {
            Some(TokenKind::LParen) => {
                self.bump();
                let mut alt_list = vec![self.parse_alt()?];
                while self.peek_kind() == Some(TokenKind::Or) {
                    self.bump();
                    alt_list.push(self.parse_alt()?);
                }
                self.expect(TokenKind::RParen, &[")"])?;
                Term::Group(alt_list)
            }
            Some(TokenKind::SymbolName) => {
                let tok = self.bump();
                Term::Sym(Symbol::new(tok.lexeme.clone(), tok.range.clone()))
            }
            Some(TokenKind::QuotedLiteral) => {
                let tok = self.bump();
                Term::Literal(unquote(&tok.lexeme), tok.range.clone())
            }
            _ => {
                return Err(self.syntax_error(&["(", "SYMBOL_NAME", "QUOTED_LITERAL"]));
            }
        };
        loop {
            let (quantifier, range) = match self.peek_kind() {
                Some(TokenKind::Star) => (Quantifier::Star, self.bump().range.clone()),
                Some(TokenKind::Plus) => (Quantifier::Plus, self.bump().range.clone()),
                Some(TokenKind::Question) => (Quantifier::Question, self.bump().range.clone()),
                _ => break,
            };
            let full_range = term.range().extend(&range);
            term = Term::Quantified(Box::new(term), quantifier, full_range);
        }
        Ok(term)
    }
}

/// Strips the outer quotes from a `QUOTED_LITERAL` lexeme and removes every
/// backslash (no other escapes are interpreted) — §4.C.
fn unquote(lexeme: &str) -> Rc<str> {
    let inner = lexeme
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .unwrap_or(lexeme);
    Rc::from(inner.replace('\\', "").as_str())
}
