use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ebnf2bnf::{config::Config, grammar::Grammar, lexer, lowering, parser, source_map::SourceFile};

const DEEPLY_NESTED: &str = r#"
start ::=
  alpha beta gamma delta
alpha ::= (token)
  ('x' | 'y')* 'i'
beta ::= (token)
  ('x' | 'y')+ 'j'
gamma ::= (token)
  ('x' | 'y')? 'k'
delta ::= (token)
  (('x' | 'y')* ('z' | 'w')+)? 'l'
"#;

fn build_grammar(src: &str) -> Grammar {
    let file = SourceFile::new("mem://bench.ebnf", src, 1);
    let tokens = lexer::tokenize(&file);
    let ast = parser::parse(&tokens).expect("benchmark source is syntactically valid");
    Grammar::from_config(ast, &Config::default()).expect("benchmark source validates")
}

fn bench_lowering(c: &mut Criterion) {
    let grammar = build_grammar(DEEPLY_NESTED);
    c.bench_function("lower deeply nested quantifiers", |b| {
        b.iter(|| {
            let mut builder = lowering::MemoryBuilder::new();
            lowering::lower(black_box(&grammar), &mut builder);
            black_box(builder.rules().len())
        })
    });
}

criterion_group!(benches, bench_lowering);
criterion_main!(benches);
