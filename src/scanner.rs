//! Scanner description (§4.F): the literal set and named regular
//! expressions an external lexer needs, derived straight from the
//! validated grammar without running the lowering.
use std::rc::Rc;

use ahash::{AHashMap, AHashSet};

use crate::ast::{DefinitionKind, Quantifier, Term};
use crate::config::Config;
use crate::grammar::Grammar;

fn is_scanned_kind(kind: DefinitionKind) -> bool {
    matches!(
        kind,
        DefinitionKind::Token | DefinitionKind::OneOf | DefinitionKind::Regexp
    )
}

/// Escapes regex metacharacters in a literal so it can be embedded verbatim
/// in a generated pattern.
fn quote_regex_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(
            c,
            '\\' | '.' | '^' | '$' | '|' | '?' | '*' | '+' | '(' | ')' | '[' | ']' | '{' | '}'
        ) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn join_alternation(parts: &[String]) -> String {
    if parts.len() == 1 {
        parts[0].clone()
    } else {
        format!("(?:{})", parts.join("|"))
    }
}

/// Computes, for every `Token`/`OneOf`/`Regexp` definition, the equivalent
/// ICU-compatible regular expression pattern, memoized by lhs name so a
/// symbol referenced from several `Token` bodies is only expanded once.
///
/// Assumes `grammar` is valid: in particular, that the `Token`/`OneOf`
/// subgraph is acyclic (§4.D pass 5), which is what makes the recursive
/// expansion below terminate.
pub fn compute_named_regexps(grammar: &Grammar) -> AHashMap<Rc<str>, String> {
    let mut cache = AHashMap::default();
    for def in grammar.definitions() {
        if is_scanned_kind(def.kind) && !cache.contains_key(&def.lhs.name) {
            let pattern = regex_for_symbol(grammar, &def.lhs.name, &mut cache);
            log::trace!("scanner pattern for `{}`: {}", def.lhs.name, pattern);
        }
    }
    cache
}

fn regex_for_symbol(grammar: &Grammar, name: &Rc<str>, cache: &mut AHashMap<Rc<str>, String>) -> String {
    if let Some(pattern) = cache.get(name.as_ref()) {
        return pattern.clone();
    }
    let def = grammar
        .definition(name)
        .expect("scanner description requires a validated grammar");
    let pattern = match def.kind {
        DefinitionKind::Regexp => {
            let parts: Vec<String> = def
                .alternatives
                .iter()
                .map(|alt| match alt.as_slice() {
                    [Term::Regexp(p, _)] => p.to_string(),
                    _ => String::new(),
                })
                .collect();
            join_alternation(&parts)
        }
        DefinitionKind::OneOf => {
            let parts: Vec<String> = def
                .alternatives
                .iter()
                .filter_map(|alt| match alt.as_slice() {
                    [Term::Literal(text, _)] => Some(quote_regex_literal(text)),
                    _ => None,
                })
                .collect();
            format!("(?:{})", parts.join("|"))
        }
        DefinitionKind::Token => {
            let alt_patterns: Vec<String> = def
                .alternatives
                .iter()
                .map(|alt| {
                    alt.iter()
                        .map(|t| encode_term(t, grammar, cache))
                        .collect::<String>()
                })
                .collect();
            join_alternation(&alt_patterns)
        }
        DefinitionKind::Plain => unreachable!("plain definitions never reach the scanner"),
    };
    cache.insert(name.clone(), pattern.clone());
    pattern
}

/// Encodes one term inside a `Token` body. References to other
/// token/one-of/regexp symbols are expanded inline; a quantifier applies
/// outside the expanded pattern.
fn encode_term(term: &Term, grammar: &Grammar, cache: &mut AHashMap<Rc<str>, String>) -> String {
    match term {
        Term::Literal(text, _) => quote_regex_literal(text),
        Term::Regexp(pattern, _) => pattern.to_string(),
        Term::Sym(s) => regex_for_symbol(grammar, &s.name, cache),
        Term::Group(alts) => {
            let parts: Vec<String> = alts
                .iter()
                .map(|alt| {
                    alt.iter()
                        .map(|t| encode_term(t, grammar, cache))
                        .collect::<String>()
                })
                .collect();
            join_alternation(&parts)
        }
        Term::Quantified(inner, q, _) => {
            let inner_pattern = encode_term(inner, grammar, cache);
            let suffix = match q {
                Quantifier::Star => "*",
                Quantifier::Plus => "+",
                Quantifier::Question => "?",
            };
            format!("(?:{}){}", inner_pattern, suffix)
        }
    }
}

/// The literal set, named patterns (in grammar definition order) and
/// unrecognized-character terminal that together let a host lexer scan
/// tokens for this grammar.
#[derive(Debug, Clone)]
pub struct ScannerDescription {
    pub literals: AHashSet<Rc<str>>,
    pub patterns: Vec<(Rc<str>, String)>,
    pub unrecognized_terminal: Rc<str>,
}

impl ScannerDescription {
    pub fn from_grammar(grammar: &Grammar, unrecognized_terminal_name: impl Into<Rc<str>>) -> Self {
        let named = compute_named_regexps(grammar);
        let mut patterns = Vec::with_capacity(named.len());
        for def in grammar.definitions() {
            if is_scanned_kind(def.kind) {
                if let Some(pattern) = named.get(&def.lhs.name) {
                    patterns.push((def.lhs.name.clone(), pattern.clone()));
                }
            }
        }
        ScannerDescription {
            literals: grammar.literals(),
            patterns,
            unrecognized_terminal: unrecognized_terminal_name.into(),
        }
    }

    /// Builds a scanner description the way a pipeline driven by a [`Config`]
    /// does: the unrecognized-character terminal's name comes from
    /// `config.unrecognized_terminal_name` rather than an ad hoc string.
    pub fn from_config(grammar: &Grammar, config: &Config) -> Self {
        ScannerDescription::from_grammar(grammar, config.unrecognized_terminal_name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Symbol;
    use crate::grammar::Grammar;
    use crate::lexer::tokenize;
    use crate::parser::parse;
    use crate::source_map::{SourceFile, SourceRange};

    fn grammar_of(src: &str) -> Grammar {
        let f = SourceFile::new("mem://t", src, 1);
        let toks = tokenize(&f);
        let ast = parse(&toks).unwrap();
        Grammar::new(ast, Symbol::new("start", SourceRange::none())).unwrap()
    }

    #[test]
    fn one_of_pattern_is_quoted_alternation() {
        let g = grammar_of("start ::=\n  b\nb ::= (one of)\n  0 1 _\n");
        let named = g.regexps();
        assert_eq!(named.get("b").unwrap(), "(?:0|1|_)");
    }

    #[test]
    fn regexp_pattern_passes_through_verbatim() {
        let g = grammar_of("start ::=\n  r\nr ::= (regexp)\n  [0-9]+\n");
        let named = g.regexps();
        assert_eq!(named.get("r").unwrap(), "[0-9]+");
    }

    #[test]
    fn token_inlines_referenced_one_of() {
        let g = grammar_of("start ::=\n  a\na ::= (token)\n  'x' b\nb ::= (one of)\n  y z\n");
        let named = g.regexps();
        assert_eq!(named.get("a").unwrap(), "x(?:y|z)");
    }

    #[test]
    fn scanner_description_collects_literals_and_patterns() {
        let g = grammar_of("start ::=\n  a\na ::= (token)\n  'x' b\nb ::= (one of)\n  y z\n");
        let scanner = ScannerDescription::from_grammar(&g, "UNRECOGNIZED");
        assert!(scanner.literals.contains("x"));
        assert_eq!(scanner.patterns.len(), 2);
        assert_eq!(scanner.unrecognized_terminal.as_ref(), "UNRECOGNIZED");
    }

    #[test]
    fn quantified_term_inside_token_wraps_pattern() {
        let g = grammar_of("start ::=\n  a\na ::= (token)\n  'x'*\n");
        let named = g.regexps();
        assert_eq!(named.get("a").unwrap(), "(?:x)*");
    }

    #[test]
    fn from_config_uses_the_configured_unrecognized_terminal_name() {
        let g = grammar_of("start ::=\n  'a'\n");
        let config = crate::config::Config {
            unrecognized_terminal_name: "BAD".to_string(),
            ..crate::config::Config::default()
        };
        let scanner = ScannerDescription::from_config(&g, &config);
        assert_eq!(scanner.unrecognized_terminal.as_ref(), "BAD");
    }
}
