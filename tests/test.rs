//! End-to-end tests driving the full tokenize -> parse -> validate -> lower
//! pipeline against whole grammar sources, as opposed to the per-module unit
//! tests that exercise each stage in isolation.
use ebnf2bnf::{
    config::Config,
    grammar::{Grammar, GrammarError},
    lexer, lowering,
    lowering::MemoryBuilder,
    parser,
    scanner::ScannerDescription,
    source_map::SourceFile,
};

fn grammar_of(src: &str) -> Result<Grammar, GrammarError> {
    let file = SourceFile::new("mem://test.ebnf", src, 1);
    let tokens = lexer::tokenize(&file);
    let ast = parser::parse(&tokens).expect("source must be syntactically valid");
    Grammar::from_config(ast, &Config::default())
}

fn lower_of(src: &str) -> MemoryBuilder {
    let grammar = grammar_of(src).expect("grammar must validate");
    let mut builder = MemoryBuilder::new();
    lowering::lower(&grammar, &mut builder);
    builder
}

#[test]
fn minimal_grammar_lowers_to_a_single_rule() {
    let builder = lower_of("start ::=\n  'a'\n");
    assert_eq!(builder.rules().len(), 1);
    let rule = &builder.rules()[0];
    assert_eq!(rule.lhs, builder.start());
    assert_eq!(rule.rhs.len(), 1);
}

#[test]
fn star_quantifier_expands_to_epsilon_and_self_recursive_rule() {
    let builder = lower_of("start ::=\n  'a'*\n");
    // start -> Q, Q -> epsilon, Q -> Q 'a'
    assert_eq!(builder.rules().len(), 3);
    let epsilon_rules = builder.rules().iter().filter(|r| r.rhs.is_empty()).count();
    assert_eq!(epsilon_rules, 1);
    let self_recursive = builder
        .rules()
        .iter()
        .filter(|r| r.rhs.first() == Some(&r.lhs))
        .count();
    assert_eq!(self_recursive, 1);
}

#[test]
fn plus_quantifier_expands_without_epsilon() {
    let builder = lower_of("start ::=\n  'a'+\n");
    assert_eq!(builder.rules().len(), 3);
    assert!(builder.rules().iter().all(|r| !r.rhs.is_empty()));
}

#[test]
fn question_quantifier_expands_without_recursion() {
    let builder = lower_of("start ::=\n  'a'?\n");
    assert_eq!(builder.rules().len(), 3);
    assert!(builder
        .rules()
        .iter()
        .all(|r| r.rhs.first() != Some(&r.lhs)));
}

#[test]
fn star_followed_by_group_produces_five_rules() {
    let builder = lower_of("start ::=\n  'b'* ('c' | 'd')\n");
    assert_eq!(builder.rules().len(), 5);
    let top = builder
        .rules()
        .iter()
        .find(|r| r.lhs == builder.start())
        .expect("a rule for the start symbol");
    assert_eq!(top.rhs.len(), 2);
}

#[test]
fn identical_sub_expressions_share_one_generated_symbol() {
    let builder = lower_of("start ::=\n  'x'*\n  'x'*\n");
    let stars: std::collections::HashSet<_> = builder
        .rules()
        .iter()
        .filter(|r| r.rhs.first() == Some(&r.lhs))
        .map(|r| r.lhs)
        .collect();
    assert_eq!(stars.len(), 1, "both 'x'* sub-expressions must lower to one symbol");
}

#[test]
fn token_rule_inlines_referenced_one_of_rule_into_one_pattern() {
    let grammar = grammar_of("a ::= (token)\n  'x' b\nb ::= (one of)\n  y z\n")
        .expect("grammar must validate");
    let scanner = ScannerDescription::from_config(&grammar, &Config::default());
    let pattern = scanner
        .patterns
        .iter()
        .find(|(name, _)| &**name == "a")
        .map(|(_, pattern)| pattern.clone())
        .expect("a named pattern for rule `a`");
    assert_eq!(pattern, "x(?:y|z)");
}

#[test]
fn scanner_description_carries_an_unrecognized_terminal() {
    let grammar = grammar_of("start ::= (token)\n  'a'\n").expect("grammar must validate");
    let config = Config {
        unrecognized_terminal_name: "BAD_CHAR".to_string(),
        ..Config::default()
    };
    let scanner = ScannerDescription::from_config(&grammar, &config);
    assert_eq!(&*scanner.unrecognized_terminal, "BAD_CHAR");
}

#[test]
fn duplicate_left_hand_side_is_rejected() {
    let err = grammar_of("start ::=\n  'a'\nstart ::= (token)\n  'b'\n").unwrap_err();
    let GrammarError::Invalid(log) = err;
    assert!(log.iter().any(|d| d.message.contains("duplicate")));
}

#[test]
fn undefined_symbol_is_rejected() {
    let err = grammar_of("start ::=\n  missing\n").unwrap_err();
    let GrammarError::Invalid(log) = err;
    assert!(log.iter().any(|d| d.message.contains("undefined symbol")));
}

#[test]
fn unreachable_rule_is_rejected() {
    let err = grammar_of("start ::=\n  'a'\nunused ::=\n  'b'\n").unwrap_err();
    let GrammarError::Invalid(log) = err;
    assert!(log.iter().any(|d| d.message.contains("not reachable")));
}

#[test]
fn recursive_token_rule_is_rejected() {
    let err = grammar_of(
        "start ::=\n  'a' tok_a\ntok_a ::= (token)\n  tok_b\ntok_b ::= (token)\n  tok_a\n",
    )
    .unwrap_err();
    let GrammarError::Invalid(log) = err;
    assert!(log.iter().any(|d| d.message.contains("cycle")));
}

#[test]
fn regexp_symbol_used_outside_a_token_rule_is_rejected() {
    let err = grammar_of("start ::=\n  digits\ndigits ::= (regexp)\n[0-9]+\n").unwrap_err();
    let GrammarError::Invalid(log) = err;
    assert!(log
        .iter()
        .any(|d| d.message.contains("can only be referenced from a (token) rule")));
}

#[test]
fn plain_symbol_used_inside_a_token_rule_is_rejected() {
    let err = grammar_of("start ::=\n  a\na ::= (token)\n  plain\nplain ::=\n  'x'\n").unwrap_err();
    let GrammarError::Invalid(log) = err;
    assert!(log
        .iter()
        .any(|d| d.message.contains("cannot be referenced from a (token)/(one of) rule")));
}

#[test]
fn missing_start_symbol_reports_a_single_error() {
    let err = grammar_of("greeting ::=\n  'hi'\n").unwrap_err();
    let GrammarError::Invalid(log) = err;
    assert_eq!(log.len(), 1);
}

#[test]
fn max_errors_caps_the_reported_diagnostics() {
    let file = SourceFile::new(
        "mem://test.ebnf",
        "start ::=\n  'a'\nunused_one ::=\n  'b'\nunused_two ::=\n  'c'\n",
        1,
    );
    let tokens = lexer::tokenize(&file);
    let ast = parser::parse(&tokens).expect("syntactically valid");
    let config = Config {
        max_errors: Some(1),
        ..Config::default()
    };
    let err = Grammar::from_config(ast, &config).unwrap_err();
    let GrammarError::Invalid(log) = err;
    assert_eq!(log.len(), 1);
}
