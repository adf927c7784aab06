use async_trait::async_trait;
use chatgpt_source_core::{DeliveryError, Event};
use chatgpt_source_server::server::{bridge::Bridge, pool::DeliveryPool, sink::EventSink};
use core::hint::black_box;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use futures::stream::{FuturesUnordered, StreamExt};
use std::{sync::Arc, time::Instant};
use tokio::runtime::Builder;

/// Accepts every event without doing any I/O.
struct DiscardSink;

#[async_trait]
impl EventSink for DiscardSink {
    async fn deliver(&self, event: &Event) -> Result<(), DeliveryError> {
        black_box(event);
        Ok(())
    }
}

#[derive(Clone, Copy, Debug)]
struct BridgeBenchParams {
    capacity: usize,
    consumers: usize,
    producers: usize,
}

fn bridge_bench(c: &mut Criterion) {
    let capacity_cases = [1, 16, 128];
    let consumer_cases = [1, 4];
    let producer_cases = [1, 8, 64];

    // Generate cartesian product of all param combinations
    let mut cases = Vec::new();
    for &capacity in &capacity_cases {
        for &consumers in &consumer_cases {
            for &producers in &producer_cases {
                cases.push(BridgeBenchParams {
                    capacity,
                    consumers,
                    producers,
                });
            }
        }
    }
    let rt = Builder::new_multi_thread().enable_all().build().unwrap();

    for params in cases {
        let mut group = c.benchmark_group("bridge/enqueue_and_wait");
        group.throughput(Throughput::Elements(params.producers as u64));

        group.bench_function(
            format!(
                "cap/{}/consumers/{}/producers/{}",
                params.capacity, params.consumers, params.producers,
            ),
            |b| {
                b.to_async(&rt).iter_custom(|iters| async move {
                    let (bridge, queue) = Bridge::new(params.capacity, None);
                    let pool = DeliveryPool::spawn(queue, Arc::new(DiscardSink), params.consumers);

                    let start = Instant::now();
                    for _ in 0..iters {
                        run_round(&bridge, params.producers).await;
                    }
                    let elapsed = start.elapsed();

                    pool.shutdown().await;
                    elapsed
                });
            },
        );

        group.finish();
    }
}

/// Runs `producers` concurrent round trips through the bridge.
async fn run_round(bridge: &Bridge, producers: usize) {
    let mut tasks = FuturesUnordered::new();

    for n in 0..producers {
        let bridge = bridge.clone();
        tasks.push(tokio::spawn(async move {
            let event = Event::with_content("bench", "bench", n.to_string());
            bridge.enqueue_and_wait(event).await
        }));
    }

    while let Some(res) = tasks.next().await {
        res.unwrap().unwrap();
    }
}

criterion_group!(bridge_benches, bridge_bench);
criterion_main!(bridge_benches);
