//! Benchmarks for the word-graph pipeline.
//!
//! Measures tokenization, graph construction in both pairing modes, and
//! reachability extraction over a synthetic customer-support corpus.

use std::time::Duration;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use voxmap_analytics::{build_graph, extract_reachable, tokenize, PairingMode};

const VOCABULARY: &[&str] = &[
    "pedido", "entrega", "atraso", "reembolso", "boleto", "fatura", "cartão", "crédito",
    "produto", "defeito", "troca", "devolução", "frete", "endereço", "rastreio", "prazo",
    "cancelamento", "assinatura", "desconto", "cupom", "pagamento", "estorno", "suporte",
    "atendente", "protocolo", "reclamação", "garantia", "loja", "aplicativo", "senha",
];

/// Generate a realistic support message (~25 words) for `index`.
fn generate_message(index: usize) -> String {
    let mut words = Vec::with_capacity(25);
    for i in 0..12 {
        let w = VOCABULARY[(index * 7 + i * 13) % VOCABULARY.len()];
        words.push(w);
        if i % 3 == 0 {
            words.push("não");
        }
        if i % 4 == 0 {
            words.push("para");
        }
    }
    format!("Olá, {} número {}.", words.join(" "), index)
}

fn bench_tokenize(c: &mut Criterion) {
    let messages: Vec<String> = (0..1000).map(generate_message).collect();

    let mut group = c.benchmark_group("tokenize");
    group.measurement_time(Duration::from_secs(5));

    group.bench_function("single_message", |b| {
        let mut idx = 0usize;
        b.iter(|| {
            let tokens = tokenize(&messages[idx % messages.len()]);
            idx += 1;
            tokens
        });
    });

    group.finish();
}

fn bench_build_graph(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_graph");
    group.measurement_time(Duration::from_secs(5));

    for &size in &[100usize, 1000] {
        let sequences: Vec<Vec<String>> =
            (0..size).map(|i| tokenize(&generate_message(i))).collect();

        group.bench_with_input(BenchmarkId::new("window_2", size), &sequences, |b, seqs| {
            b.iter(|| build_graph(seqs, PairingMode::SlidingWindow(2), 1));
        });
        group.bench_with_input(BenchmarkId::new("window_5", size), &sequences, |b, seqs| {
            b.iter(|| build_graph(seqs, PairingMode::SlidingWindow(5), 1));
        });
        group.bench_with_input(BenchmarkId::new("full_message", size), &sequences, |b, seqs| {
            b.iter(|| build_graph(seqs, PairingMode::FullMessage, 1));
        });
    }

    group.finish();
}

fn bench_reachability(c: &mut Criterion) {
    let sequences: Vec<Vec<String>> = (0..1000).map(|i| tokenize(&generate_message(i))).collect();
    let graph = build_graph(&sequences, PairingMode::SlidingWindow(2), 2);

    let mut group = c.benchmark_group("reachability");
    for depth in [1usize, 2, 4] {
        group.bench_with_input(BenchmarkId::new("pedido", depth), &depth, |b, &d| {
            b.iter(|| extract_reachable(&graph, "pedido", d));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_tokenize, bench_build_graph, bench_reachability);
criterion_main!(benches);
