//! The grammar model: an indexed, validated view over a parsed
//! [`DefinitionList`] (§4.D). Construction accumulates every validation
//! error into an [`ErrorLog`] and only fails once, at the end, with the
//! full set.
use std::rc::Rc;

use ahash::{AHashMap, AHashSet};

use crate::ast::{AlternativeList, Definition, DefinitionKind, DefinitionList, Symbol, Term};
use crate::config::Config;
use crate::diagnostics::{Diagnostic, ErrorLog};
use crate::source_map::SourceRange;

/// Errors constructing a [`Grammar`] from an AST.
#[derive(Debug, thiserror::Error)]
pub enum GrammarError {
    /// The grammar failed one or more validation passes.
    #[error("grammar is invalid:\n{0}")]
    Invalid(ErrorLog),
}

/// A validated grammar: its definitions, an index from left-hand side name
/// to the (first) definition with that name, and the start symbol.
#[derive(Debug, Clone)]
pub struct Grammar {
    definitions: DefinitionList,
    definitions_by_lhs: AHashMap<Rc<str>, usize>,
    start: Symbol,
}

impl Grammar {
    /// Builds and validates a grammar from a parsed AST and a start symbol.
    ///
    /// Runs, in order: (1) index by LHS, recording a duplicate-definition
    /// error for repeats (the first occurrence stays authoritative); (2)
    /// look up the start symbol, aborting early if it is undefined since
    /// later passes need it; (3) check every `Sym` reference is defined,
    /// and that references to `Regexp`-kind symbols only occur inside
    /// `Token`-kind rules; (4) check every definition is reachable from
    /// `start`; (5) check the `Token`/`OneOf` subgraph is acyclic. All
    /// errors from passes that do run are accumulated and returned together.
    pub fn new(ast: DefinitionList, start: Symbol) -> Result<Grammar, GrammarError> {
        log::debug!("validating {} definitions, start = `{}`", ast.len(), start.name);
        let mut log = ErrorLog::new();

        log::trace!("pass: index by lhs");
        let definitions_by_lhs = index_by_lhs(&ast, &mut log);
        log::trace!("pass finished: index by lhs ({} diagnostics so far)", log.len());

        for def in &ast {
            if def.alternatives.is_empty() {
                log::warn!("`{}` is defined with zero alternatives", def.lhs.name);
            }
        }

        log::trace!("pass: start symbol lookup");
        if !definitions_by_lhs.contains_key(&start.name) {
            log.push(Diagnostic::new(
                format!("start symbol `{}` is not defined", start.name),
                start.range.clone(),
            ));
            log::warn!("start symbol `{}` is not defined; aborting early", start.name);
            return Err(GrammarError::Invalid(log));
        }
        log::trace!("pass finished: start symbol lookup");

        log::trace!("pass: all symbols defined");
        check_all_symbols_defined(&ast, &definitions_by_lhs, &mut log);
        log::trace!("pass finished: all symbols defined ({} diagnostics so far)", log.len());

        log::trace!("pass: all symbols reachable");
        check_all_symbols_reachable(&ast, &definitions_by_lhs, &start, &mut log);
        log::trace!("pass finished: all symbols reachable ({} diagnostics so far)", log.len());

        log::trace!("pass: no recursive tokens");
        check_no_recursive_tokens(&ast, &definitions_by_lhs, &mut log);
        log::trace!("pass finished: no recursive tokens ({} diagnostics so far)", log.len());

        if !log.is_empty() {
            log::debug!("grammar invalid: {} diagnostics", log.len());
            return Err(GrammarError::Invalid(log));
        }

        log::debug!(
            "grammar validated: {} definitions, start = `{}`",
            ast.len(),
            start.name
        );
        Ok(Grammar {
            definitions: ast,
            definitions_by_lhs,
            start,
        })
    }

    /// Builds a grammar the way a pipeline driven by a [`Config`] does:
    /// `start` is the configured `start_symbol`, and the error set is
    /// capped at `config.max_errors` (in report order) if one is set.
    pub fn from_config(ast: DefinitionList, config: &Config) -> Result<Grammar, GrammarError> {
        let start = Symbol::new(config.start_symbol.clone(), SourceRange::none());
        match Grammar::new(ast, start) {
            Ok(grammar) => Ok(grammar),
            Err(GrammarError::Invalid(mut log)) => {
                if let Some(max) = config.max_errors {
                    log.truncate_sorted(max);
                }
                Err(GrammarError::Invalid(log))
            }
        }
    }

    pub fn start(&self) -> &Symbol {
        &self.start
    }

    pub fn definitions(&self) -> &[Definition] {
        &self.definitions
    }

    /// The (first, authoritative) definition for `name`, if any is defined.
    pub fn definition(&self, name: &str) -> Option<&Definition> {
        self.definitions_by_lhs
            .get(name)
            .map(|&i| &self.definitions[i])
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.definitions_by_lhs.contains_key(name)
    }

    /// The lhs symbols retained as BNF nonterminals: those defined with
    /// kind [`DefinitionKind::Plain`]. Everything else is either folded
    /// into a terminal or expanded into the scanner description (§4.E/F).
    pub fn nonterminals(&self) -> AHashSet<Rc<str>> {
        self.definitions_by_lhs
            .keys()
            .filter(|name| self.definition(name).unwrap().kind == DefinitionKind::Plain)
            .cloned()
            .collect()
    }

    /// Every distinct literal string appearing anywhere in any rule.
    pub fn literals(&self) -> AHashSet<Rc<str>> {
        let mut out = AHashSet::default();
        for def in &self.definitions {
            collect_literals(&def.alternatives, &mut out);
        }
        out
    }

    /// Named regular expressions, one per `Token`/`OneOf`/`Regexp`
    /// definition, equivalent to that definition's internal structure
    /// (§4.F). Delegates to [`crate::scanner`], which also uses this to
    /// build the full scanner description.
    pub fn regexps(&self) -> AHashMap<Rc<str>, String> {
        crate::scanner::compute_named_regexps(self)
    }
}

fn index_by_lhs(ast: &DefinitionList, log: &mut ErrorLog) -> AHashMap<Rc<str>, usize> {
    let mut by_lhs: AHashMap<Rc<str>, usize> = AHashMap::default();
    for (i, def) in ast.iter().enumerate() {
        if let Some(&first) = by_lhs.get(&def.lhs.name) {
            log.push(
                Diagnostic::new(
                    format!("duplicate definition of `{}`", def.lhs.name),
                    def.lhs.range.clone(),
                )
                .with_note("first defined here", ast[first].lhs.range.clone()),
            );
        } else {
            by_lhs.insert(def.lhs.name.clone(), i);
        }
    }
    by_lhs
}

fn walk_symbols<'a>(alts: &'a AlternativeList, visit: &mut impl FnMut(&'a Symbol)) {
    for alt in alts {
        for term in alt {
            walk_term_symbols(term, visit);
        }
    }
}

fn walk_term_symbols<'a>(term: &'a Term, visit: &mut impl FnMut(&'a Symbol)) {
    match term {
        Term::Sym(s) => visit(s),
        Term::Group(alts) => walk_symbols(alts, visit),
        Term::Quantified(inner, _, _) => walk_term_symbols(inner, visit),
        Term::Literal(_, _) | Term::Regexp(_, _) => {}
    }
}

fn collect_literals(alts: &AlternativeList, out: &mut AHashSet<Rc<str>>) {
    for alt in alts {
        for term in alt {
            collect_term_literals(term, out);
        }
    }
}

fn collect_term_literals(term: &Term, out: &mut AHashSet<Rc<str>>) {
    match term {
        Term::Literal(text, _) => {
            out.insert(text.clone());
        }
        Term::Group(alts) => collect_literals(alts, out),
        Term::Quantified(inner, _, _) => collect_term_literals(inner, out),
        Term::Sym(_) | Term::Regexp(_, _) => {}
    }
}

fn check_all_symbols_defined(
    ast: &DefinitionList,
    by_lhs: &AHashMap<Rc<str>, usize>,
    log: &mut ErrorLog,
) {
    for def in ast {
        walk_symbols(&def.alternatives, &mut |sym| match by_lhs.get(&sym.name) {
            None => {
                log.push(Diagnostic::new(
                    format!("undefined symbol `{}`", sym.name),
                    sym.range.clone(),
                ));
            }
            Some(&target_idx) => {
                let target = &ast[target_idx];
                if target.kind == DefinitionKind::Regexp && def.kind != DefinitionKind::Token {
                    log.push(
                        Diagnostic::new(
                            format!(
                                "`{}` is a (regexp) rule and can only be referenced from a \
                                 (token) rule",
                                sym.name
                            ),
                            sym.range.clone(),
                        )
                        .with_note("defined as (regexp) here", target.lhs.range.clone()),
                    );
                }
                if target.kind == DefinitionKind::Plain
                    && matches!(def.kind, DefinitionKind::Token | DefinitionKind::OneOf)
                {
                    log.push(
                        Diagnostic::new(
                            format!(
                                "`{}` is a plain rule and cannot be referenced from a \
                                 (token)/(one of) rule, which may only reference terminals, \
                                 (one of) rules, (token) rules or (regexp) rules",
                                sym.name
                            ),
                            sym.range.clone(),
                        )
                        .with_note("defined here", target.lhs.range.clone()),
                    );
                }
            }
        });
    }
}

fn check_all_symbols_reachable(
    ast: &DefinitionList,
    by_lhs: &AHashMap<Rc<str>, usize>,
    start: &Symbol,
    log: &mut ErrorLog,
) {
    let mut visited: AHashSet<Rc<str>> = AHashSet::default();
    let mut stack = vec![start.name.clone()];
    while let Some(name) = stack.pop() {
        if !visited.insert(name.clone()) {
            continue;
        }
        let Some(&idx) = by_lhs.get(&name) else {
            continue;
        };
        walk_symbols(&ast[idx].alternatives, &mut |sym| {
            if !visited.contains(&sym.name) {
                stack.push(sym.name.clone());
            }
        });
    }
    let mut authoritative_indices: Vec<usize> = by_lhs.values().copied().collect();
    authoritative_indices.sort_unstable();
    for idx in authoritative_indices {
        let def = &ast[idx];
        if !visited.contains(&def.lhs.name) {
            log.push(Diagnostic::new(
                format!("`{}` is not reachable from the start symbol", def.lhs.name),
                def.lhs.range.clone(),
            ));
        }
    }
}

/// Three-color DFS over the `Token`/`OneOf` subgraph (§4.D pass 5). An edge
/// `A -> B` exists whenever `B` is a defined `Token`-kind symbol referenced
/// in `A`'s RHS.
fn check_no_recursive_tokens(
    ast: &DefinitionList,
    by_lhs: &AHashMap<Rc<str>, usize>,
    log: &mut ErrorLog,
) {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Color {
        White,
        Gray,
        Black,
    }
    let mut color: AHashMap<Rc<str>, Color> = AHashMap::default();
    let candidate_nodes: Vec<usize> = ast
        .iter()
        .enumerate()
        .filter(|(_, d)| matches!(d.kind, DefinitionKind::Token | DefinitionKind::OneOf))
        .map(|(i, _)| i)
        .collect();
    for &idx in &candidate_nodes {
        color
            .entry(ast[idx].lhs.name.clone())
            .or_insert(Color::White);
    }

    fn visit(
        idx: usize,
        ast: &DefinitionList,
        by_lhs: &AHashMap<Rc<str>, usize>,
        color: &mut AHashMap<Rc<str>, Color>,
        log: &mut ErrorLog,
    ) {
        color.insert(ast[idx].lhs.name.clone(), Color::Gray);
        let mut edges: Vec<(Symbol, usize)> = Vec::new();
        walk_symbols(&ast[idx].alternatives, &mut |sym| {
            if let Some(&target_idx) = by_lhs.get(&sym.name) {
                if ast[target_idx].kind == DefinitionKind::Token {
                    edges.push((sym.clone(), target_idx));
                }
            }
        });
        for (sym, target_idx) in edges {
            let target_name = ast[target_idx].lhs.name.clone();
            match color.get(&target_name).copied().unwrap_or(Color::Black) {
                Color::Gray => {
                    log.push(
                        Diagnostic::new(
                            format!(
                                "(token) rule `{}` is part of a cycle (via `{}`)",
                                ast[idx].lhs.name, sym.name
                            ),
                            sym.range.clone(),
                        )
                        .with_note(
                            format!("`{}` is defined here", target_name),
                            ast[target_idx].lhs.range.clone(),
                        ),
                    );
                }
                Color::White => visit(target_idx, ast, by_lhs, color, log),
                Color::Black => {}
            }
        }
        color.insert(ast[idx].lhs.name.clone(), Color::Black);
    }

    for &idx in &candidate_nodes {
        if color[&ast[idx].lhs.name] == Color::White {
            visit(idx, ast, by_lhs, &mut color, log);
        }
    }
}
