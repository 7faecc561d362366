//! Context-sensitive tokenizer: translates one grammar source fragment into
//! a flat token stream. The lexer is stateful with two nested loops — an
//! outer loop recognizing rule headers (`SYMBOL_NAME "::=" annotation?`) and
//! an inner loop whose recognizer depends on the header's annotation
//! (`plain`/`token`, `(one of)`, `(regexp)`).
//!
//! The lexer never fails: characters it cannot classify in the current mode
//! become [`TokenKind::IllegalCharacter`] tokens and scanning continues.
use std::rc::Rc;

use crate::source_map::{SourceFile, SourceRange};
use crate::token::{Token, TokenKind};

/// Which inner recognizer a rule body is lexed with, selected by the header
/// annotation (or its absence, for `plain`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyMode {
    Plain,
    Token,
    OneOf,
    Regexp,
}

/// Tokenizes `file`'s text into a flat [`Token`] stream.
///
/// This is a free function rather than a method because a [`Lexer`] does not
/// outlive a single invocation; there is no reusable state to hold onto
/// between fragments.
pub fn tokenize(file: &SourceFile) -> Vec<Token> {
    log::debug!("tokenizing `{}` ({} bytes)", file.url(), file.len());
    let mut lexer = Lexer {
        file: file.clone(),
        text: Rc::from(file.text()),
        pos: 0,
        tokens: Vec::new(),
    };
    lexer.run();
    let illegal = lexer
        .tokens
        .iter()
        .filter(|t| t.kind == TokenKind::IllegalCharacter)
        .count();
    if illegal > 0 {
        log::warn!(
            "`{}`: {} illegal character(s) encountered while lexing",
            file.url(),
            illegal
        );
    }
    log::debug!("`{}`: {} tokens produced", file.url(), lexer.tokens.len());
    lexer.tokens
}

struct Lexer {
    file: SourceFile,
    text: Rc<str>,
    pos: usize,
    tokens: Vec<Token>,
}

fn is_symbol_start(c: char) -> bool {
    c.is_ascii_alphabetic()
}

fn is_symbol_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn is_horizontal_ws(c: char) -> bool {
    c == ' ' || c == '\t' || c == '\r'
}

impl Lexer {
    fn rest(&self) -> &str {
        &self.text[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn at_eof(&self) -> bool {
        self.pos >= self.text.len()
    }

    fn at_column_one(&self) -> bool {
        self.pos == 0 || self.text.as_bytes()[self.pos - 1] == b'\n'
    }

    fn range(&self, start: usize) -> SourceRange {
        SourceRange::new(self.file.clone(), start, self.pos)
    }

    fn skip_horizontal_ws(&mut self) {
        while let Some(c) = self.peek() {
            if is_horizontal_ws(c) {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
    }

    fn scan_symbol_name(&mut self) -> Option<(usize, usize)> {
        let start = self.pos;
        let mut chars = self.rest().chars();
        let first = chars.next()?;
        if !is_symbol_start(first) {
            return None;
        }
        let mut end = start + first.len_utf8();
        for c in chars {
            if is_symbol_continue(c) {
                end += c.len_utf8();
            } else {
                break;
            }
        }
        Some((start, end))
    }

    /// Looks ahead, without consuming input, for a top-level rule header
    /// (`SYMBOL_NAME` then, modulo horizontal whitespace, `::=`) starting at
    /// the current position. Only meaningful at column 1.
    fn looking_at_header(&self) -> bool {
        let saved = self.pos;
        let mut probe = Lexer {
            file: self.file.clone(),
            text: self.text.clone(),
            pos: saved,
            tokens: Vec::new(),
        };
        let Some((_, end)) = probe.scan_symbol_name() else {
            return false;
        };
        probe.pos = end;
        probe.skip_horizontal_ws();
        probe.rest().starts_with("::=")
    }

    fn run(&mut self) {
        loop {
            self.skip_blank_lines();
            if self.at_eof() {
                break;
            }
            match self.lex_header() {
                Some(BodyMode::Plain) | Some(BodyMode::Token) => self.lex_plain_or_token_body(),
                Some(BodyMode::OneOf) => self.lex_one_of_body(),
                Some(BodyMode::Regexp) => self.lex_regexp_body(),
                None => {}
            }
        }
    }

    /// Skips any run of blank lines (horizontal whitespace and newlines)
    /// between rules.
    fn skip_blank_lines(&mut self) {
        loop {
            let save = self.pos;
            self.skip_horizontal_ws();
            match self.peek() {
                Some('\n') => {
                    self.pos += 1;
                }
                _ => {
                    self.pos = save;
                    break;
                }
            }
        }
        self.skip_horizontal_ws();
    }

    /// Lexes one rule header. Returns the body mode to lex next, or `None`
    /// if the header was too malformed to determine one (the parser will
    /// surface a syntax error from the resulting token stream).
    fn lex_header(&mut self) -> Option<BodyMode> {
        let Some((start, end)) = self.scan_symbol_name() else {
            // Not even a symbol name: drain the rest of the line as illegal
            // characters, one token per character, then bail to the outer
            // loop.
            self.drain_illegal_until_newline();
            self.consume_newline_if_present();
            return None;
        };
        self.pos = end;
        self.tokens.push(Token::new(
            TokenKind::Lhs,
            &self.text[start..end],
            self.range(start),
        ));
        self.skip_horizontal_ws();
        if self.rest().starts_with("::=") {
            let tok_start = self.pos;
            self.pos += 3;
            self.tokens.push(Token::new(
                TokenKind::IsDefinedAs,
                "::=",
                self.range(tok_start),
            ));
        } else {
            self.drain_illegal_until_newline();
            self.consume_newline_if_present();
            return None;
        }
        self.skip_horizontal_ws();
        let mode = if self.rest().starts_with("(one of)") {
            self.emit_annotation("(one of)", TokenKind::OneOfKind);
            BodyMode::OneOf
        } else if self.rest().starts_with("(token)") {
            self.emit_annotation("(token)", TokenKind::TokenKind);
            BodyMode::Token
        } else if self.rest().starts_with("(regexp)") {
            self.emit_annotation("(regexp)", TokenKind::RegexpKind);
            BodyMode::Regexp
        } else {
            BodyMode::Plain
        };
        self.drain_illegal_until_newline();
        self.consume_newline_if_present();
        Some(mode)
    }

    fn emit_annotation(&mut self, literal: &'static str, kind: TokenKind) {
        let start = self.pos;
        self.pos += literal.len();
        self.tokens.push(Token::new(kind, literal, self.range(start)));
        self.skip_horizontal_ws();
    }

    /// Anything left on the header line that is not whitespace becomes one
    /// [`TokenKind::IllegalCharacter`] token per character.
    fn drain_illegal_until_newline(&mut self) {
        loop {
            self.skip_horizontal_ws();
            match self.peek() {
                None | Some('\n') => break,
                Some(c) => {
                    let start = self.pos;
                    self.pos += c.len_utf8();
                    log::trace!("illegal character `{}` in rule header", c);
                    self.tokens.push(Token::new(
                        TokenKind::IllegalCharacter,
                        &self.text[start..self.pos],
                        self.range(start),
                    ));
                }
            }
        }
    }

    fn consume_newline_if_present(&mut self) {
        if self.peek() == Some('\n') {
            self.pos += 1;
        }
    }

    /// `plain`/`token` mode: terms on each line, an `EOL` token per line.
    fn lex_plain_or_token_body(&mut self) {
        loop {
            if self.at_column_one() && (self.at_eof() || self.looking_at_header()) {
                break;
            }
            let line_start_save = self.pos;
            self.skip_horizontal_ws();
            if matches!(self.peek(), None | Some('\n')) {
                // Blank line: body ends here, left for skip_blank_lines.
                self.pos = line_start_save;
                break;
            }
            loop {
                self.skip_horizontal_ws();
                match self.peek() {
                    None | Some('\n') => break,
                    Some('\'') => self.lex_quoted_literal(),
                    Some(c) if is_symbol_start(c) => self.lex_symbol_name_term(),
                    Some('*') => self.emit_single(TokenKind::Star),
                    Some('+') => self.emit_single(TokenKind::Plus),
                    Some('|') => self.emit_single(TokenKind::Or),
                    Some('(') => self.emit_single(TokenKind::LParen),
                    Some(')') => self.emit_single(TokenKind::RParen),
                    Some('?') => self.emit_single(TokenKind::Question),
                    Some(c) => {
                        let start = self.pos;
                        self.pos += c.len_utf8();
                        self.tokens.push(Token::new(
                            TokenKind::IllegalCharacter,
                            &self.text[start..self.pos],
                            self.range(start),
                        ));
                    }
                }
            }
            let eol_start = self.pos;
            if self.peek() == Some('\n') {
                self.pos += 1;
                self.tokens
                    .push(Token::new(TokenKind::Eol, "\n", self.range(eol_start)));
            } else {
                // End of input with no trailing newline: synthesize an EOL
                // so the parser's `rhs_line ::= alt_list EOL` can still
                // reduce the final line.
                self.tokens
                    .push(Token::new(TokenKind::Eol, "", self.range(eol_start)));
                break;
            }
        }
    }

    fn emit_single(&mut self, kind: TokenKind) {
        let start = self.pos;
        let c = self.peek().expect("caller checked peek()");
        self.pos += c.len_utf8();
        self.tokens
            .push(Token::new(kind, &self.text[start..self.pos], self.range(start)));
    }

    fn lex_symbol_name_term(&mut self) {
        let (start, end) = self.scan_symbol_name().expect("caller checked is_symbol_start");
        self.pos = end;
        self.tokens.push(Token::new(
            TokenKind::SymbolName,
            &self.text[start..end],
            self.range(start),
        ));
    }

    /// A single-quoted literal supporting `\\`-escapes inside. The token's
    /// lexeme is the raw text including the surrounding quotes; unescaping
    /// happens in the parser (§4.C).
    fn lex_quoted_literal(&mut self) {
        let start = self.pos;
        self.pos += 1; // opening quote
        loop {
            match self.peek() {
                None => break,
                Some('\\') => {
                    self.pos += 1;
                    if let Some(c) = self.peek() {
                        self.pos += c.len_utf8();
                    }
                }
                Some('\'') => {
                    self.pos += 1;
                    break;
                }
                Some(c) => self.pos += c.len_utf8(),
            }
        }
        self.tokens.push(Token::new(
            TokenKind::QuotedLiteral,
            &self.text[start..self.pos],
            self.range(start),
        ));
    }

    /// `(one of)` mode: whitespace-separated literal runs, continuing
    /// across lines until a blank line or the next rule header.
    fn lex_one_of_body(&mut self) {
        loop {
            if self.at_column_one() && (self.at_eof() || self.looking_at_header()) {
                break;
            }
            let line_start_save = self.pos;
            self.skip_horizontal_ws();
            if matches!(self.peek(), None | Some('\n')) {
                self.pos = line_start_save;
                break;
            }
            loop {
                self.skip_horizontal_ws();
                match self.peek() {
                    None | Some('\n') => break,
                    Some(_) => {
                        let start = self.pos;
                        while let Some(c) = self.peek() {
                            if c.is_whitespace() {
                                break;
                            }
                            self.pos += c.len_utf8();
                        }
                        self.tokens.push(Token::new(
                            TokenKind::Literal,
                            &self.text[start..self.pos],
                            self.range(start),
                        ));
                    }
                }
            }
            if self.peek() == Some('\n') {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    /// `(regexp)` mode: the trimmed remainder of each line is one `REGEXP`
    /// token; no `EOL` is emitted.
    fn lex_regexp_body(&mut self) {
        loop {
            if self.at_column_one() && (self.at_eof() || self.looking_at_header()) {
                break;
            }
            let line_start = self.pos;
            let newline_offset = self.rest().find('\n');
            let line_end = match newline_offset {
                Some(off) => line_start + off,
                None => self.text.len(),
            };
            let line = &self.text[line_start..line_end];
            let trimmed_leading = line.len() - line.trim_start().len();
            let trimmed = line.trim();
            if trimmed.is_empty() {
                // Blank line: body ends here.
                break;
            }
            let content_start = line_start + trimmed_leading;
            let content_end = content_start + trimmed.len();
            self.tokens.push(Token::new(
                TokenKind::Regexp,
                trimmed,
                SourceRange::new(self.file.clone(), content_start, content_end),
            ));
            match newline_offset {
                Some(off) => self.pos = line_start + off + 1,
                None => {
                    self.pos = self.text.len();
                    break;
                }
            }
        }
    }
}
