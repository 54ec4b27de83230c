use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use magnet_core::Controller;
use magnet_core::mocks::ScriptedTransport;
use magnet_core::reply;
use magnet_traits::clock::test_clock::TestClock;

const REPLIES: &[&str] = &[
    "12:00:00 OUTPUT: 0.4521 AMPS OUTPUT: 0.250 VOLTS",
    "12:00:00 MID SETTING:  0.5000 TESLA",
    "12:00:00 CURRENT DIRECTION: +",
    "12:00:00 HEATER STATUS: SWITCHED OFF AT 0.5000 TESLA",
    "12:00:00 RAMP STATUS: RAMPING FROM 0.2000 TO 0.5000 TESLA",
    "?? 12;00;00 OUTPUT; 0.4521 AMPS OUTPUT; 0.250 VOLTS",
];

pub fn bench_parsers(c: &mut Criterion) {
    let mut g = c.benchmark_group("reply_parse");
    // BENCH_SAMPLE_SIZE=10 cargo bench -p magnet_core --bench reply_parse
    if let Ok(ss) = std::env::var("BENCH_SAMPLE_SIZE")
        && let Ok(n) = ss.parse::<usize>()
    {
        g.sample_size(n.max(10));
    }
    g.bench_function("output", |b| {
        b.iter(|| reply::parse_output(black_box(REPLIES[0])))
    });
    g.bench_function("ramp_status", |b| {
        b.iter(|| reply::parse_ramp_status(black_box(REPLIES[4])))
    });
    g.bench_function("any_shape", |b| {
        b.iter(|| {
            for raw in REPLIES {
                black_box(reply::parse_any(black_box(raw)));
            }
        })
    });
    g.finish();
}

pub fn bench_controller_poll(c: &mut Criterion) {
    c.bench_function("refresh_all_scripted", |b| {
        b.iter_batched(
            || {
                Controller::builder()
                    .with_transport(ScriptedTransport::holding_at(0.5))
                    .with_clock(TestClock::new())
                    .build_unprimed()
                    .expect("controller build")
            },
            |mut ctl| {
                ctl.refresh_all().expect("refresh");
                black_box(ctl.snapshot())
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_parsers, bench_controller_poll);
criterion_main!(benches);
