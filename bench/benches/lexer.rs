use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use std::hint::black_box;
use yttria::{lexer, token::TokenKind};

static SNIPPET: &str = r#"
# arithmetic over every literal base
main {
    render "The output is " + (101 & 99);
    render 0b1010 + 0o17 * 0xFF >>> 2;
    defer render 'done\n';
    unsafe { render -(3.25 / 1.5) == 2; }
    return 0;
}
"#;

fn scan_count(input: &str) {
    let scanned = lexer::scan("bench.yt", input);
    let digits = scanned
        .tokens
        .iter()
        .filter(|token| token.kind == TokenKind::Digit)
        .count();
    black_box((digits, scanned.errors.len()));
}

fn criterion_benchmark(c: &mut Criterion) {
    let input = SNIPPET.repeat(512);
    let mut group = c.benchmark_group("lexer");
    group.throughput(Throughput::Bytes(input.len() as u64));
    group.bench_function("scan", |b| b.iter(|| scan_count(black_box(&input))));
    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
