//! Benchmarks for the inference and regularization passes.

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};

use htn_refine::infer::infer_preconditions;
use htn_refine::model::{Domain, Literal, Method, PlanStep, PredicateDef, Sorts, Task, TypedVar};
use htn_refine::regularize::two_regularize;

const DEPTH: usize = 40;
const PREDICATES: usize = 8;

/// A layered hierarchy: every layer has two chain methods, one of which
/// recurses into the layer below, plus a self-recursive layer at the bottom.
fn generated_domain() -> Domain {
    let mut sorts = Sorts::new();
    sorts.insert("obj".into(), (0..4).map(|i| format!("o{i}")).collect());
    let x = || vec![TypedVar::new("?x", "obj")];

    let mut domain = Domain {
        sorts,
        ..Default::default()
    };
    for k in 0..PREDICATES {
        let pred = format!("p{k}");
        domain.predicates.push(PredicateDef::new(&pred, &["obj"]));
        domain.primitive_tasks.push(
            Task::new(format!("produce{k}"), x()).with_effect(Literal::new(&pred, true, &["?x"])),
        );
        domain.primitive_tasks.push(
            Task::new(format!("consume{k}"), x())
                .with_precondition(Literal::new(&pred, true, &["?x"]))
                .with_effect(Literal::new(&pred, false, &["?x"])),
        );
    }

    domain.abstract_tasks.push(Task::new("__top", vec![]));
    domain.methods.push(
        Method::new("m_top", "__top", &[])
            .with_var("?o", "obj")
            .with_step(PlanStep::new("s0", "L0", &["?o"])),
    );
    for layer in 0..=DEPTH {
        let task = format!("L{layer}");
        domain.abstract_tasks.push(Task::new(&task, x()));
        let below = if layer == DEPTH { task.clone() } else { format!("L{}", layer + 1) };
        let k = layer % PREDICATES;
        domain.methods.push(
            Method::new(format!("m_deep{layer}"), &task, &["?v"])
                .with_var("?v", "obj")
                .with_var("?w", "obj")
                .with_step(PlanStep::new("s0", format!("produce{k}"), &["?v"]))
                .with_step(PlanStep::new("s1", &below, &["?w"]))
                .with_step(PlanStep::new("s2", format!("consume{k}"), &["?v"]))
                .with_step(PlanStep::new("s3", format!("consume{}", (k + 1) % PREDICATES), &["?w"]))
                .totally_ordered(),
        );
        domain.methods.push(
            Method::new(format!("m_flat{layer}"), &task, &["?v"])
                .with_var("?v", "obj")
                .with_step(PlanStep::new("s0", format!("consume{k}"), &["?v"])),
        );
    }
    domain
}

fn bench_inference(c: &mut Criterion) {
    let domain = generated_domain();
    c.bench_function("infer_preconditions_layered", |bench| {
        bench.iter_batched(
            || domain.clone(),
            |mut d| black_box(infer_preconditions(&mut d, "__top").unwrap()),
            BatchSize::SmallInput,
        )
    });
}

fn bench_regularize(c: &mut Criterion) {
    let domain = generated_domain();
    c.bench_function("two_regularize_layered", |bench| {
        bench.iter_batched(
            || domain.clone(),
            |mut d| black_box(two_regularize(&mut d)),
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_inference, bench_regularize);
criterion_main!(benches);
