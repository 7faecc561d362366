//! EBNF→BNF lowering (§4.E): folds every compound term into a freshly named
//! BNF symbol, memoized per structurally distinct sub-expression, and drives
//! an abstract [`Builder`] so the BNF sink is pluggable.
use std::rc::Rc;

use ahash::{AHashMap, AHashSet};

use crate::ast::{Alternative, Definition, DefinitionKind, EbnfNode, Quantifier, Symbol, Term};
use crate::grammar::Grammar;
use crate::source_map::SourceRange;

/// Provenance recorded for a generated symbol or rule: the source fragment's
/// range and its textual dump (bare names stay bare; compound fragments are
/// wrapped in back-ticks, via [`EbnfNode::bnf_symbol_name`]).
#[derive(Debug, Clone)]
pub struct Provenance {
    pub range: SourceRange,
    pub display_name: String,
}

impl Provenance {
    pub fn of(node: &impl EbnfNode) -> Self {
        Provenance {
            range: node.node_range(),
            display_name: node.bnf_symbol_name(),
        }
    }
}

/// The lowering's output sink. A builder never needs to understand EBNF; it
/// only assembles terminals, nonterminals and productions as told.
pub trait Builder {
    type Symbol: Clone;

    fn make_terminal(&mut self, source: Provenance) -> Self::Symbol;
    fn make_nonterminal(&mut self, source: Provenance) -> Self::Symbol;
    fn set_start_symbol(&mut self, symbol: Self::Symbol);
    fn add_rule(&mut self, lhs: Self::Symbol, rhs: Vec<Self::Symbol>, source: Provenance);
}

/// Runs the lowering over a validated `grammar`, driving `builder`.
///
/// Only `Plain`-kind definitions become BNF nonterminals with emitted rules;
/// `Token`, `OneOf` and `Regexp` definitions are folded into single terminal
/// symbols whose internal structure is exposed by [`crate::scanner`] instead.
pub fn lower<B: Builder>(grammar: &Grammar, builder: &mut B) {
    let mut ctx = Lowering {
        builder,
        memo: AHashMap::default(),
        nonterminals: grammar.nonterminals(),
    };
    let mut emitted = 0usize;
    for def in grammar.definitions() {
        if def.kind == DefinitionKind::Plain {
            ctx.lower_definition(def);
            emitted += 1;
        }
    }
    let start_symbol = ctx.lower_term(&Term::Sym(grammar.start().clone()));
    ctx.builder.set_start_symbol(start_symbol);
    log::debug!(
        "lowering complete: {} plain definitions, {} distinct sub-expressions memoized",
        emitted,
        ctx.memo.len()
    );
}

struct Lowering<'g, B: Builder> {
    builder: &'g mut B,
    memo: AHashMap<Term, B::Symbol>,
    nonterminals: AHashSet<Rc<str>>,
}

impl<B: Builder> Lowering<'_, B> {
    fn lower_definition(&mut self, def: &Definition) {
        let lhs_symbol = self.lower_term(&Term::Sym(def.lhs.clone()));
        for alt in &def.alternatives {
            let rhs = self.lower_alternative(alt);
            self.builder
                .add_rule(lhs_symbol.clone(), rhs, Provenance::of(alt));
        }
    }

    fn lower_alternative(&mut self, alt: &Alternative) -> Vec<B::Symbol> {
        alt.iter().map(|term| self.lower_term(term)).collect()
    }

    fn lower_term(&mut self, term: &Term) -> B::Symbol {
        if let Some(existing) = self.memo.get(term) {
            log::trace!("lowering memo hit for `{}`", term.bnf_symbol_name());
            return existing.clone();
        }
        match term {
            Term::Sym(s) => self.lower_sym(s, term),
            Term::Literal(_, _) | Term::Regexp(_, _) => {
                let symbol = self.builder.make_terminal(Provenance::of(term));
                self.memo.insert(term.clone(), symbol.clone());
                symbol
            }
            Term::Group(alts) => {
                let symbol = self.builder.make_nonterminal(Provenance::of(term));
                self.memo.insert(term.clone(), symbol.clone());
                for alt in alts {
                    let rhs = self.lower_alternative(alt);
                    self.builder
                        .add_rule(symbol.clone(), rhs, Provenance::of(alt));
                }
                symbol
            }
            Term::Quantified(inner, q, _) => {
                let symbol = self.builder.make_nonterminal(Provenance::of(term));
                self.memo.insert(term.clone(), symbol.clone());
                self.lower_quantified(&symbol, inner, *q, term);
                symbol
            }
        }
    }

    fn lower_sym(&mut self, s: &Symbol, key: &Term) -> B::Symbol {
        let symbol = if self.nonterminals.contains(&s.name) {
            self.builder.make_nonterminal(Provenance::of(s))
        } else {
            self.builder.make_terminal(Provenance::of(s))
        };
        self.memo.insert(key.clone(), symbol.clone());
        symbol
    }

    /// `q ∈ {*, ?}`: `L → ε`. `q ∈ {+, ?}`: `L → lower(t)`. `q ∈ {*, +}`:
    /// `L → L lower(t)` (left-recursive expansion; the target engine is
    /// assumed to handle left recursion natively).
    fn lower_quantified(&mut self, symbol: &B::Symbol, inner: &Term, q: Quantifier, whole: &Term) {
        let prov = || Provenance::of(whole);
        match q {
            Quantifier::Star => {
                self.builder.add_rule(symbol.clone(), vec![], prov());
                let inner_symbol = self.lower_term(inner);
                self.builder.add_rule(
                    symbol.clone(),
                    vec![symbol.clone(), inner_symbol],
                    prov(),
                );
            }
            Quantifier::Plus => {
                let inner_symbol = self.lower_term(inner);
                self.builder
                    .add_rule(symbol.clone(), vec![inner_symbol.clone()], prov());
                self.builder.add_rule(
                    symbol.clone(),
                    vec![symbol.clone(), inner_symbol],
                    prov(),
                );
            }
            Quantifier::Question => {
                self.builder.add_rule(symbol.clone(), vec![], prov());
                let inner_symbol = self.lower_term(inner);
                self.builder
                    .add_rule(symbol.clone(), vec![inner_symbol], prov());
            }
        }
    }
}

/// A minimal in-memory [`Builder`] that records every symbol and rule,
/// recoverable afterwards by index. Useful as the default sink when no
/// downstream parser-engine binding is wired in, and as a test double.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BnfSymbol(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Terminal,
    Nonterminal,
}

/// A symbol's recorded metadata. `display_name` is interned: large grammars
/// generate many symbols whose dumps repeat (e.g. several `Quantified`
/// expansions over the same inner term in different contexts), so the
/// builder keeps one copy of each distinct string.
#[derive(Debug, Clone)]
pub struct SymbolInfo {
    pub kind: SymbolKind,
    display_name: string_interner::DefaultSymbol,
    pub range: SourceRange,
}

#[derive(Debug, Clone)]
pub struct BnfRule {
    pub lhs: BnfSymbol,
    pub rhs: Vec<BnfSymbol>,
    pub range: SourceRange,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryBuilder {
    symbols: Vec<SymbolInfo>,
    rules: Vec<BnfRule>,
    start: Option<BnfSymbol>,
    names: string_interner::DefaultStringInterner,
}

impl MemoryBuilder {
    pub fn new() -> Self {
        MemoryBuilder::default()
    }

    pub fn symbol_info(&self, symbol: BnfSymbol) -> &SymbolInfo {
        &self.symbols[symbol.0]
    }

    pub fn display_name(&self, symbol: BnfSymbol) -> &str {
        self.names
            .resolve(self.symbols[symbol.0].display_name)
            .expect("every recorded display name was interned by this builder")
    }

    pub fn rules(&self) -> &[BnfRule] {
        &self.rules
    }

    pub fn start(&self) -> BnfSymbol {
        self.start.expect("set_start_symbol was never called")
    }

    fn push_symbol(&mut self, kind: SymbolKind, source: Provenance) -> BnfSymbol {
        let id = BnfSymbol(self.symbols.len());
        let display_name = self.names.get_or_intern(source.display_name);
        self.symbols.push(SymbolInfo {
            kind,
            display_name,
            range: source.range,
        });
        id
    }
}

impl Builder for MemoryBuilder {
    type Symbol = BnfSymbol;

    fn make_terminal(&mut self, source: Provenance) -> BnfSymbol {
        self.push_symbol(SymbolKind::Terminal, source)
    }

    fn make_nonterminal(&mut self, source: Provenance) -> BnfSymbol {
        self.push_symbol(SymbolKind::Nonterminal, source)
    }

    fn set_start_symbol(&mut self, symbol: BnfSymbol) {
        self.start = Some(symbol);
    }

    fn add_rule(&mut self, lhs: BnfSymbol, rhs: Vec<BnfSymbol>, source: Provenance) {
        self.rules.push(BnfRule {
            lhs,
            rhs,
            range: source.range,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Symbol as AstSymbol;
    use crate::lexer::tokenize;
    use crate::parser::parse;
    use crate::source_map::SourceFile;

    fn lower_source(src: &str) -> MemoryBuilder {
        let f = SourceFile::new("mem://t", src, 1);
        let toks = tokenize(&f);
        let ast = parse(&toks).expect("test input should parse");
        let grammar =
            Grammar::new(ast, AstSymbol::new("start", SourceRange::none())).expect("valid grammar");
        let mut builder = MemoryBuilder::new();
        lower(&grammar, &mut builder);
        builder
    }

    #[test]
    fn single_literal_rule() {
        let b = lower_source("start ::=\n  'a'\n");
        assert_eq!(b.rules().len(), 1);
        assert_eq!(b.rules()[0].rhs.len(), 1);
    }

    #[test]
    fn star_quantifier_yields_three_rules() {
        let b = lower_source("start ::=\n  'a'*\n");
        assert_eq!(b.rules().len(), 3);
        assert!(b.rules().iter().any(|r| r.rhs.is_empty()));
        assert!(b
            .rules()
            .iter()
            .any(|r| r.rhs.first() == Some(&r.lhs) && r.rhs.len() == 2));
    }

    #[test]
    fn plus_quantifier_yields_three_rules_no_epsilon() {
        let b = lower_source("start ::=\n  'a'+\n");
        assert_eq!(b.rules().len(), 3);
        assert!(!b.rules().iter().any(|r| r.rhs.is_empty()));
    }

    #[test]
    fn question_quantifier_yields_three_rules_no_recursion() {
        let b = lower_source("start ::=\n  'a'?\n");
        assert_eq!(b.rules().len(), 3);
        assert!(b.rules().iter().any(|r| r.rhs.is_empty()));
        assert!(!b.rules().iter().any(|r| r.rhs.first() == Some(&r.lhs)));
    }

    #[test]
    fn star_then_group_yields_five_rules() {
        let b = lower_source("start ::=\n  'b'* ('c' | 'd')\n");
        assert_eq!(b.rules().len(), 5);
        let top = b
            .rules()
            .iter()
            .find(|r| r.lhs == b.start())
            .expect("a rule for start");
        assert_eq!(top.rhs.len(), 2);
    }

    #[test]
    fn identical_literals_memoize_to_one_symbol() {
        let b = lower_source("start ::=\n  'x' 'x'\n");
        let top = b.rules().iter().find(|r| r.lhs == b.start()).unwrap();
        assert_eq!(top.rhs.len(), 2);
        assert_eq!(top.rhs[0], top.rhs[1]);
    }

    #[test]
    fn token_and_one_of_symbols_are_terminals_not_nonterminals() {
        let src = "start ::=\n  a\na ::= (token)\n  'x' b\nb ::= (one of)\n  y z\n";
        let b = lower_source(src);
        let a_rule = b.rules().iter().find(|r| r.lhs == b.start()).unwrap();
        assert_eq!(a_rule.rhs.len(), 1);
        let a_symbol = a_rule.rhs[0];
        assert_eq!(b.symbol_info(a_symbol).kind, SymbolKind::Terminal);
    }
}
