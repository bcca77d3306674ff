//! Precondition inference.
//!
//! For every predicate, first with positive then with negative polarity, a
//! [`Sweep`](analysis::Sweep) computes which argument patterns each method
//! needs to hold and which it may establish itself. Patterns needed but not
//! established become preconditions of a synthetic primitive step, built in a
//! shadow copy of the model that replaces the domain's methods and primitive
//! tasks only once every sweep succeeded.

pub mod analysis;
pub mod inject;
pub mod signature;
pub mod stats;

use crate::error::{InferError, InferResult};
use crate::model::Domain;

use analysis::{AnalysisContext, Sweep};
use inject::{Injector, Shadow};
use stats::InferenceStatistics;

/// Default entry point of the reachability walk.
pub const DEFAULT_TOP_TASK: &str = "__top";

/// Infer and inject method preconditions into `domain`.
///
/// On error the domain is left exactly as it was.
pub fn infer_preconditions(domain: &mut Domain, top_task: &str) -> InferResult<InferenceStatistics> {
    let Shadow {
        methods,
        primitive_tasks,
        statistics,
    } = build_shadow(domain, top_task)?;

    domain.methods = methods;
    domain.primitive_tasks = primitive_tasks;

    tracing::info!(
        predicates = domain.predicates.len(),
        inferences = statistics.total_inferences(),
        redundant = statistics.total_redundant(),
        methods = statistics.inference_methods(),
        "precondition inference complete"
    );
    Ok(statistics)
}

fn build_shadow(domain: &Domain, top_task: &str) -> InferResult<Shadow> {
    let ctx = AnalysisContext::build(domain);
    if ctx.index().task(top_task).is_err() {
        return Err(InferError::UnknownTopTask {
            task: top_task.to_string(),
        });
    }

    let mut injector = Injector::new(ctx.index());
    for positive in [true, false] {
        for predicate in &domain.predicates {
            let outcome = Sweep::new(&ctx, &predicate.name, positive).run(top_task)?;
            for inference in outcome.methods() {
                injector.inject(inference, &predicate.name, positive)?;
            }
        }
    }
    Ok(injector.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Literal, Method, PlanStep, PredicateDef, Sorts, Task, TypedVar};

    fn domain() -> Domain {
        let mut sorts = Sorts::new();
        sorts.insert("obj".into(), ["o1"].iter().map(|s| s.to_string()).collect());
        let x = || vec![TypedVar::new("?x", "obj")];
        Domain {
            sorts,
            predicates: vec![PredicateDef::new("p", &["obj"])],
            primitive_tasks: vec![
                Task::new("noop", x()),
                Task::new("need", x()).with_precondition(Literal::new("p", false, &["?x"])),
            ],
            abstract_tasks: vec![Task::new("__top", vec![])],
            methods: vec![
                Method::new("m_top", "__top", &[])
                    .with_var("?o", "obj")
                    .with_step(PlanStep::new("s0", "noop", &["?o"]))
                    .with_step(PlanStep::new("s1", "need", &["?o"]))
                    .totally_ordered(),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn negative_requirement_is_injected() {
        let mut d = domain();
        let stats = infer_preconditions(&mut d, DEFAULT_TOP_TASK).unwrap();
        assert_eq!(stats.total_inferences(), 1);
        assert_eq!(stats.total_methods, 1);
        assert_eq!(stats.total_tasks, 3);

        let m = &d.methods[0];
        assert_eq!(m.subtasks.len(), 3);
        let task = d.task("__method_precondition_inference_m_top").unwrap();
        assert_eq!(task.preconditions, vec![Literal::new("p", false, &["?o"])]);
        assert!(d.check_method(m).is_ok());
    }

    #[test]
    fn missing_top_task_leaves_domain_untouched() {
        let mut d = domain();
        let before = d.clone();
        let err = infer_preconditions(&mut d, "nope").unwrap_err();
        assert!(matches!(err, InferError::UnknownTopTask { .. }));
        assert_eq!(d, before);
    }

    #[test]
    fn missing_top_task_is_reported_without_predicates() {
        let mut d = domain();
        d.predicates.clear();
        assert!(infer_preconditions(&mut d, "nope").is_err());
    }

    #[test]
    fn second_run_reuses_the_precondition_step() {
        let mut d = domain();
        infer_preconditions(&mut d, DEFAULT_TOP_TASK).unwrap();
        let once = d.clone();
        let stats = infer_preconditions(&mut d, DEFAULT_TOP_TASK).unwrap();
        assert_eq!(stats.total_inferences(), 0);
        assert_eq!(d, once);
    }
}
