//! Lexer throughput benchmark.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use viperc_lex::Lexer;
use viperc_sem::TypeRegistry;
use viperc_util::Diagnostics;

const SNIPPET: &str = r#"
struct Point { i32 x; i32 y; };
let i32 manhattan(Point* p) = return p.x + p.y;
let i32 main() = {
    let i32 total = 0;
    let i32 i = 0;
    while (i < 100) {
        total += i * 2 - 1;
        i += 1;
    };
    return total;
};
"#;

fn bench_lexer(c: &mut Criterion) {
    let source = SNIPPET.repeat(64);
    let types = TypeRegistry::new();

    c.bench_function("lex_64_functions", |b| {
        b.iter(|| {
            let mut diag = Diagnostics::new();
            let tokens = Lexer::new(black_box(&source), &types, &mut diag).lex();
            black_box(tokens.len())
        })
    });
}

criterion_group!(benches, bench_lexer);
criterion_main!(benches);
