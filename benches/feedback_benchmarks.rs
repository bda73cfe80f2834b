use criterion::{Criterion, criterion_group, criterion_main};
use jsinspect::ic::{FeedbackSlot, FeedbackSlotKind, LayoutId, LayoutTable, Shape};
use jsinspect::{ElementKind, EngineConfig, Session};
use std::hint::black_box;

// cargo bench --profile dev

// Initialize logger for benchmark so `RUST_LOG` is honored.
#[ctor::ctor]
fn __init_bench_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default()).try_init();
}

const KINDS: [ElementKind; 6] = [
    ElementKind::PackedSmi,
    ElementKind::HoleySmi,
    ElementKind::PackedDouble,
    ElementKind::HoleyDouble,
    ElementKind::PackedGeneric,
    ElementKind::HoleyGeneric,
];

fn benchmark_feedback_transitions(c: &mut Criterion) {
    // A store site that keeps seeing the same array shape
    c.bench_function("feedback_monomorphic_hit", |b| {
        b.iter(|| {
            let mut slot = FeedbackSlot::new(FeedbackSlotKind::StoreKeyedSloppy);
            for _ in 0..64 {
                slot.record(black_box(Shape::array(ElementKind::PackedSmi)), 4);
            }
            black_box(slot.state().descriptor())
        })
    });

    // Walks every kind up the lattice: each store replaces the recorded shape
    c.bench_function("feedback_generalization_chain", |b| {
        b.iter(|| {
            let mut slot = FeedbackSlot::new(FeedbackSlotKind::StoreKeyedStrict);
            for kind in KINDS {
                slot.record(black_box(Shape::array(kind)), 4);
            }
            black_box(slot.state().descriptor())
        })
    });

    // Distinct object layouts push the site to megamorphic
    c.bench_function("feedback_megamorphic_escalation", |b| {
        let mut layouts = LayoutTable::new();
        let shapes: Vec<Shape> = ["a", "b", "c", "d", "e", "f"]
            .iter()
            .map(|name| Shape {
                kind: ElementKind::PackedSmi,
                layout: layouts.add_property(LayoutId::EMPTY_OBJECT, name),
            })
            .collect();
        b.iter(|| {
            let mut slot = FeedbackSlot::new(FeedbackSlotKind::LoadKeyed);
            for shape in &shapes {
                slot.record(black_box(*shape), 4);
            }
            black_box(slot.state().descriptor())
        })
    });
}

fn benchmark_keyed_store_script(c: &mut Criterion) {
    // End to end: parse, run and collect feedback for a store loop
    c.bench_function("keyed_store_loop", |b| {
        b.iter(|| {
            let mut session = Session::with_config(EngineConfig::default().with_natives_syntax(true));
            let script = r#"
                function fill(a, v) { for (let i = 0; i < a.length; i++) { a[i] = v; } }
                let a = [1, 2, 3, 4, 5, 6, 7, 8];
                for (let n = 0; n < 16; n++) { fill(a, n); }
                fill(a, 0.5);
            "#;
            let _ = black_box(session.run_script(script, "bench.js"));
            black_box(session.feedback("fill"))
        })
    });
}

criterion_group!(benches, benchmark_feedback_transitions, benchmark_keyed_store_script);
criterion_main!(benches);
