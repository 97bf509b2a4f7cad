// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use understory_looper::{
    Context, Flow, Handler, HandlerId, LooperConfig, LooperId, Message, PlainLooper, Registry,
    kind,
};

#[derive(Default)]
struct Sink {
    seen: u64,
}

impl Handler for Sink {
    fn message_received(&mut self, message: &Message, _cx: &mut Context<'_>) -> Flow {
        self.seen = self.seen.wrapping_add(u64::from(message.what));
        Flow::Handled
    }
}

struct Pass;

impl Handler for Pass {
    fn message_received(&mut self, _message: &Message, _cx: &mut Context<'_>) -> Flow {
        Flow::Forward
    }
}

fn setup(capacity: usize) -> (Registry, LooperId, HandlerId) {
    let mut reg = Registry::new();
    let looper = reg.insert_looper(LooperConfig::default().with_capacity(capacity), PlainLooper);
    let sink = reg.insert(Sink::default());
    reg.add_handler(looper, sink);
    (reg, looper, sink)
}

fn sample_message() -> Message {
    let mut m = Message::new(kind::MOUSE_MOVED);
    m.add_int("keys", 0);
    m.add_int("xpos", 120);
    m.add_int("ypos", 80);
    m
}

fn bench_post_and_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("post_and_drain");
    for &n in &[64usize, 1024] {
        group.throughput(Throughput::Elements(n as u64));
        let template = sample_message();

        group.bench_function(format!("post_message_n{}", n), |b| {
            b.iter_batched(
                || setup(n),
                |(mut reg, looper, sink)| {
                    for _ in 0..n {
                        let _ = reg.post_message(looper, &template, Some(sink));
                    }
                    black_box(reg.queue(looper).map(|q| q.len()));
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function(format!("post_dispatch_n{}", n), |b| {
            b.iter_batched(
                || setup(n),
                |(mut reg, looper, sink)| {
                    for _ in 0..n {
                        let _ = reg.post_message(looper, &template, Some(sink));
                    }
                    while reg.dispatch_next(looper) {}
                    black_box(reg.get::<Sink>(sink).map(|s| s.seen));
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_chain_walk(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_walk");
    for &depth in &[1usize, 8, 64] {
        let (mut reg, looper, sink) = setup(1);
        // Build pass -> pass -> ... -> sink.
        let mut head = sink;
        for _ in 0..depth {
            let pass = reg.insert(Pass);
            reg.set_next(pass, Some(head));
            head = pass;
        }
        reg.add_handler(looper, head);
        let message = Message::with_handler(kind::USER, head);
        group.throughput(Throughput::Elements(depth as u64));

        group.bench_function(format!("dispatch_message_depth{}", depth), |b| {
            b.iter(|| black_box(reg.dispatch_message(looper, black_box(&message))))
        });
    }
    group.finish();
}

fn bench_message_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("message_lookup");
    for &fields in &[4usize, 32] {
        let mut m = Message::new(kind::USER);
        for i in 0..fields {
            m.add_int(&format!("field{}", i), i as i32);
        }
        let last = format!("field{}", fields - 1);
        group.bench_function(format!("find_int_last_of{}", fields), |b| {
            b.iter(|| black_box(m.find_int(black_box(&last))))
        });
        group.bench_function(format!("clone_of{}", fields), |b| {
            b.iter(|| black_box(m.clone()))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_post_and_drain,
    bench_chain_walk,
    bench_message_lookup
);
criterion_main!(benches);
