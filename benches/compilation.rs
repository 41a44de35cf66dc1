use criterion::{criterion_group, criterion_main, Criterion};

const SOURCE: &str = r#"
type Point struct {x, y I64}

fn puts(s [I8])

pub fn main() I32 {
    var p Point
    p.x = 3
    p.y = 4

    var total, i I64
    for i = 0; i < 100; i++ {
        total += i * i
    }

    if total > 0 && p.x < p.y {
        puts("ok")
    }
    return 0
}
"#;

fn lex_benchmark(c: &mut Criterion) {
    c.bench_function("lex", |b| {
        b.iter(|| lode::lexer::lex(SOURCE).expect("lex should succeed"))
    });
}

fn parse_benchmark(c: &mut Criterion) {
    c.bench_function("parse", |b| {
        b.iter(|| lode::parser::parse(SOURCE).expect("parse should succeed"))
    });
}

fn compile_benchmark(c: &mut Criterion) {
    c.bench_function("compile", |b| {
        b.iter(|| lode::compile(SOURCE).expect("compile should succeed"))
    });
}

criterion_group!(benches, lex_benchmark, parse_benchmark, compile_benchmark);
criterion_main!(benches);
