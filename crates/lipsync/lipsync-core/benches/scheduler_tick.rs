use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lipsync_core::{
    BlinkConfig, BlinkController, Clock, Component, ComponentSink, Compositor, Scheduler,
    VisemeEvent,
};

struct BenchClock(AtomicI64);

impl Clock for BenchClock {
    fn sample_rate(&self) -> f64 {
        48_000.0
    }
    fn now_samples(&self) -> i64 {
        self.0.load(Ordering::Relaxed)
    }
}

fn utterance(channels: usize, events: usize) -> Vec<VisemeEvent> {
    (0..events)
        .map(|i| {
            let start = i as i64 * 3_200;
            VisemeEvent::new(i % channels, start, start + 4_800, 0.9)
        })
        .collect()
}

fn bench_scheduler_tick(c: &mut Criterion) {
    c.bench_function("scheduler_tick_52ch", |b| {
        let clock = Arc::new(BenchClock(AtomicI64::new(0)));
        let sched = Scheduler::new(clock.clone(), vec![0.0f32; 52]);
        let batch = utterance(52, 600);
        b.iter(|| {
            sched.enqueue(&batch);
            let mut now = 0i64;
            while !sched.is_idle() {
                now += 800; // one 60 Hz frame at 48 kHz
                clock.0.store(now, Ordering::Relaxed);
                sched.tick();
            }
            clock.0.store(0, Ordering::Relaxed);
            black_box(sched.pending_len());
        });
    });
}

fn bench_frame(c: &mut Criterion) {
    c.bench_function("frame_compose_52ch", |b| {
        let shared = Compositor::new(vec![0.0f32; 52]).into_shared();
        let clock = Arc::new(BenchClock(AtomicI64::new(0)));
        let sched = Scheduler::new(
            clock.clone(),
            ComponentSink::new(shared.clone(), Component::Viseme),
        );
        let mut blink_sink = ComponentSink::new(shared.clone(), Component::Blink);
        let mut blink =
            BlinkController::with_seed(&BlinkConfig::default(), Some(0), Some(1), 0.0, 7);
        sched.enqueue(&utterance(52, 10_000));
        let mut now = 0.0f64;
        b.iter(|| {
            now += 1.0 / 60.0;
            clock.0.fetch_add(800, Ordering::Relaxed);
            sched.tick();
            blink.tick(1.0 / 60.0, now, &mut blink_sink);
            shared.lock().unwrap().apply();
        });
    });
}

criterion_group!(benches, bench_scheduler_tick, bench_frame);
criterion_main!(benches);
