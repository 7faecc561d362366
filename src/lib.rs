/*!
# ebnf2bnf

This crate translates an annotated EBNF grammar dialect into a validated
grammar model and an equivalent BNF grammar suitable for a general parser
engine (e.g. an Earley recognizer). It is a pipeline of independently
usable stages:

- [`source_map`]: tracks source text and maps byte offsets to line/column.
- [`lexer`]: turns a [`source_map::SourceFile`] into a token stream, switching
  lexing mode per rule-kind annotation.
- [`ast`]: the syntax tree the parser produces ([`ast::Definition`],
  [`ast::Term`], [`ast::Symbol`]).
- [`parser`]: a recursive-descent parser from tokens to an [`ast::DefinitionList`].
- [`grammar`]: validates a parsed grammar ([`grammar::Grammar`]) against its
  start symbol, undefined/unreachable symbols and recursive token rules.
- [`lowering`]: rewrites a validated [`grammar::Grammar`] into BNF rules via a
  pluggable [`lowering::Builder`], with full provenance back to the source.
- [`scanner`]: synthesizes a scanner description (literal set plus named
  regular expressions) for a grammar's token-kind rules.
- [`diagnostics`]: structured, source-ordered error reporting shared by every
  stage above.
- [`config`]: the small set of knobs ([`config::Config`]) that shape a run.

# Example

```rust
use ebnf2bnf::{config::Config, grammar::Grammar, lexer, lowering, parser, source_map::SourceFile};

let file = SourceFile::new("mem://example.ebnf", "start ::=\n  'a' 'b'*\n", 1);
let tokens = lexer::tokenize(&file);
let ast = parser::parse(&tokens).expect("syntax error");
let config = Config::default();
let grammar = Grammar::from_config(ast, &config).expect("invalid grammar");

let mut builder = lowering::MemoryBuilder::new();
lowering::lower(&grammar, &mut builder);
assert!(!builder.rules().is_empty());
```

# Grammar dialect

A grammar is a sequence of rule definitions. A definition's header,
`lhs ::=` plus an optional rule-kind annotation, occupies its own line;
the body starts on the line(s) after it, each body line contributing one
alternative. Alternatives are `|`-separated sequences of terms; a term is
a single-quoted literal, a reference to another rule, a parenthesized
group, or any of those followed by a postfix quantifier (`*`, `+`, `?`).

```ebnf
start ::=
  'a' 'b'*
start ::=
  ('a' | 'b')+ 'c'?
```

A rule's header may carry one annotation that switches how its body is
lexed and what it may be referenced from:

- `(token)`: the body is lexed as literal/regexp fragments rather than full
  EBNF syntax; a `(token)` rule may reference other `(token)`, `(one of)` and
  `(regexp)` rules, but not plain nonterminals.
- `(one of)`: the body is one bare literal per line; an `(one of)` rule is
  itself usable as a terminal set, and is subject to the same restriction.
- `(regexp)`: the body is one or more regular expression patterns, one per
  line; a `(regexp)` rule may only be referenced from a `(token)` rule.

A rule with none of these annotations is a plain nonterminal, parsed with
the full grammar above and lowered into BNF.

# Validation

[`grammar::Grammar::new`] (or [`grammar::Grammar::from_config`], which also
applies [`config::Config::max_errors`]) runs five passes and accumulates every
finding into one [`diagnostics::ErrorLog`] rather than stopping at the first
problem, except that a missing start symbol aborts immediately since every
later pass depends on it: duplicate left-hand sides, start symbol lookup,
every referenced symbol is defined (`(regexp)` symbols are only referenced
from `(token)` rules, and plain nonterminals are never referenced from
`(token)`/`(one of)` rules), every defined symbol is reachable from the
start symbol, and no `(token)`/`(one of)` rule participates in a reference
cycle through another token-kind rule.

# Lowering and the scanner description

[`lowering::lower`] walks a validated grammar's plain rules and emits BNF
rules through a [`lowering::Builder`], memoizing by structural (range-blind)
term equality so that two syntactically identical sub-expressions lower to
exactly one shared symbol. [`lowering::MemoryBuilder`] is a concrete,
in-memory `Builder` suitable for inspection and tests; a host engine
implements its own `Builder` to feed BNF rules directly into its own symbol
table. [`scanner::ScannerDescription::from_config`] (or
[`scanner::ScannerDescription::from_grammar`], for an explicit terminal name)
separately compiles a grammar's `(token)`/`(one of)`/`(regexp)` rules into a
literal set and named regular expressions for a scanner to consume; it does
not participate in the BNF lowering.
*/
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]

pub mod ast;
pub mod config;
pub mod diagnostics;
pub mod grammar;
pub mod lexer;
pub mod lowering;
pub mod parser;
pub mod scanner;
pub mod source_map;
pub mod token;

pub use ast::{Definition, DefinitionKind, DefinitionList, Symbol, Term};
pub use config::Config;
pub use diagnostics::{Diagnostic, ErrorLog};
pub use grammar::{Grammar, GrammarError};
pub use lowering::{lower, Builder, MemoryBuilder, Provenance};
pub use scanner::ScannerDescription;
pub use source_map::SourceFile;
pub use token::Token;
