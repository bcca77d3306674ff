//! Two-regularization: methods with a totally ordered chain of more than two
//! subtasks are rewritten into a cascade of binary methods.
//!
//! A chain `[s0, s1, …, sn]` becomes a head `[s0, t]` where `t` is a step of
//! a fresh abstract task, plus a method decomposing that task into
//! `[s1, …, sn]`, which is split again until at most two steps remain.
//! Methods whose subtasks do not form a single chain are left untouched.

use std::collections::{BTreeSet, HashSet};

use crate::model::{Domain, Literal, Method, PlanStep, Task, TypedVar};

/// Name prefix of synthetic tail tasks.
pub const TASK_PREFIX: &str = "_two_reg_task";
/// Name prefix of synthetic tail methods.
pub const METHOD_PREFIX: &str = "_two_reg_method";

/// Counts of one regularization run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegularizeReport {
    /// Original methods that were split.
    pub rewritten_methods: usize,
    pub synthetic_tasks: usize,
    pub synthetic_methods: usize,
}

/// Rewrite every totally ordered method of `domain` with more than two
/// subtasks. Synthetic tasks are appended to the abstract tasks; split
/// methods are replaced in place by their head followed by the tail methods.
pub fn two_regularize(domain: &mut Domain) -> RegularizeReport {
    let mut report = RegularizeReport::default();
    let mut taken: HashSet<String> = domain
        .primitive_tasks
        .iter()
        .chain(&domain.abstract_tasks)
        .map(|t| t.name.clone())
        .collect();

    let old = std::mem::take(&mut domain.methods);
    for method in old {
        if method.subtasks.len() <= 2 {
            domain.methods.push(method);
            continue;
        }
        let Some(chain) = linearize(&method) else {
            tracing::debug!(method = %method.name, "ordering is not a chain, left as is");
            domain.methods.push(method);
            continue;
        };

        report.rewritten_methods += 1;
        let mut current = chain;
        while current.subtasks.len() > 2 {
            let Split { head, tail, task } = split(current, &taken);
            debug_check(&head, &tail, &task);
            tracing::debug!(method = %head.name, task = %task.name, tail = %tail.name, "split method");

            taken.insert(task.name.clone());
            domain.abstract_tasks.push(task);
            domain.methods.push(head);
            report.synthetic_tasks += 1;
            report.synthetic_methods += 1;
            current = tail;
        }
        domain.methods.push(current);
    }

    tracing::info!(
        rewritten = report.rewritten_methods,
        tasks = report.synthetic_tasks,
        methods = report.synthetic_methods,
        "two-regularization complete"
    );
    report
}

/// The method with its steps sorted along the ordering and the ordering
/// reduced to the chain edges, or `None` if the steps are not totally ordered.
fn linearize(method: &Method) -> Option<Method> {
    let rank = |step: &PlanStep| {
        method
            .subtasks
            .iter()
            .filter(|other| method.is_smaller(&other.id, &step.id))
            .count()
    };
    let mut chain = method.clone();
    chain.subtasks.sort_by_cached_key(rank);
    let ordering: Vec<(String, String)> = chain
        .subtasks
        .windows(2)
        .map_while(|w| {
            method
                .is_smaller(&w[0].id, &w[1].id)
                .then(|| (w[0].id.clone(), w[1].id.clone()))
        })
        .collect();
    if ordering.len() + 1 != chain.subtasks.len() {
        return None;
    }
    chain.ordering = ordering;
    Some(chain)
}

struct Split {
    head: Method,
    tail: Method,
    task: Task,
}

/// Counter and suffix for the synthetic names derived from `method`.
///
/// A method that is itself a tail `_two_reg_method<K>__<suffix>` continues at
/// `K + 1` with the same suffix, so names do not grow with every split.
fn name_seed(method: &str) -> (usize, &str) {
    method
        .strip_prefix(METHOD_PREFIX)
        .and_then(|rest| rest.split_once("__"))
        .and_then(|(count, suffix)| Some((count.parse::<usize>().ok()? + 1, suffix)))
        .unwrap_or((0, method))
}

fn split(method: Method, taken: &HashSet<String>) -> Split {
    let (mut count, suffix) = name_seed(&method.name);
    while taken.contains(&format!("{TASK_PREFIX}{count}__{suffix}")) {
        count += 1;
    }
    let task_name = format!("{TASK_PREFIX}{count}__{suffix}");
    let tail_name = format!("{METHOD_PREFIX}{count}__{suffix}");

    let first = &method.subtasks[0];
    let first_args: BTreeSet<&str> = first.args.iter().map(String::as_str).collect();
    let tail_args: BTreeSet<&str> = method.subtasks[1..]
        .iter()
        .flat_map(|s| s.args.iter().map(String::as_str))
        .collect();
    let exposed: BTreeSet<&str> = method.task_args.iter().map(String::as_str).collect();

    let mut head_vars: Vec<TypedVar> = Vec::new();
    let mut tail_vars: Vec<TypedVar> = Vec::new();
    let mut tail_params: Vec<TypedVar> = Vec::new();
    for var in &method.vars {
        let name = var.name.as_str();
        if tail_args.contains(name) {
            tail_vars.push(var.clone());
        }
        if exposed.contains(name) || first_args.contains(name) {
            if tail_args.contains(name) {
                tail_params.push(var.clone());
            }
            head_vars.push(var.clone());
        }
    }

    let mut head_constraints: Vec<Literal> = Vec::new();
    let mut tail_constraints: Vec<Literal> = Vec::new();
    for constraint in &method.constraints {
        let in_head = constraint.arguments.iter().any(|a| first_args.contains(a.as_str()));
        let only_tail = constraint.arguments.iter().all(|a| tail_args.contains(a.as_str()));
        if !in_head && only_tail {
            tail_constraints.push(constraint.clone());
            continue;
        }
        // Evaluated at the head: tail variables it mentions become tail
        // parameters, anything else must be declared in the head.
        for var in &method.vars {
            if !constraint.arguments.contains(&var.name) {
                continue;
            }
            if tail_args.contains(var.name.as_str()) && !tail_params.contains(var) {
                tail_params.push(var.clone());
            }
            if !head_vars.contains(var) {
                head_vars.push(var.clone());
            }
        }
        head_constraints.push(constraint.clone());
    }

    let mut task = Task::new(task_name, tail_params);
    task.artificial = true;
    let param_names: Vec<&str> = task.params.iter().map(|p| p.name.as_str()).collect();

    let tail_step = PlanStep::new(method.subtasks[1].id.clone(), task.name.clone(), &param_names);
    let head = Method {
        name: method.name.clone(),
        task: method.task.clone(),
        task_args: method.task_args.clone(),
        vars: head_vars,
        ordering: vec![(first.id.clone(), tail_step.id.clone())],
        subtasks: vec![first.clone(), tail_step],
        constraints: head_constraints,
    };

    let mut tail = Method::new(tail_name, task.name.clone(), &param_names);
    tail.vars = tail_vars;
    tail.subtasks = method.subtasks[1..].to_vec();
    tail.ordering = method.ordering[1..].to_vec();
    tail.constraints = tail_constraints;

    Split { head, tail, task }
}

/// Consistency of a fresh split; checked in debug builds only.
fn debug_check(head: &Method, tail: &Method, task: &Task) {
    if cfg!(debug_assertions) {
        let checked = task
            .check_integrity()
            .and_then(|()| head.check_integrity())
            .and_then(|()| tail.check_integrity());
        debug_assert!(checked.is_ok(), "two-regularization produced {checked:?}");
        debug_assert_eq!(head.subtasks[1].args.len(), task.params.len());
        debug_assert_eq!(tail.task_args.len(), task.params.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_method(name: &str, len: usize) -> Method {
        let mut m = Method::new(name, "T", &["?t"]).with_var("?t", "obj");
        for i in 0..len {
            let var = format!("?v{i}");
            m = m
                .with_var(&var, "obj")
                .with_step(PlanStep::new(format!("s{i}"), format!("a{i}"), &[var.as_str(), "?t"]));
        }
        m.totally_ordered()
    }

    fn domain(methods: Vec<Method>) -> Domain {
        let params = || vec![TypedVar::new("?x", "obj"), TypedVar::new("?y", "obj")];
        Domain {
            primitive_tasks: (0..6).map(|i| Task::new(format!("a{i}"), params())).collect(),
            abstract_tasks: vec![Task::new("T", vec![TypedVar::new("?t", "obj")])],
            methods,
            ..Default::default()
        }
    }

    /// Primitive steps reached from `method` by following synthetic tasks.
    fn flatten(domain: &Domain, method: &Method) -> Vec<PlanStep> {
        let mut out = Vec::new();
        for step in &method.subtasks {
            if step.task.starts_with(TASK_PREFIX) {
                let tail = domain.methods.iter().find(|m| m.task == step.task).unwrap();
                out.extend(flatten(domain, tail));
            } else {
                out.push(step.clone());
            }
        }
        out
    }

    #[test]
    fn two_steps_stay_unmodified() {
        let mut d = domain(vec![chain_method("m", 2)]);
        let before = d.clone();
        let report = two_regularize(&mut d);
        assert_eq!(report, RegularizeReport::default());
        assert_eq!(d, before);
    }

    #[test]
    fn three_steps_split_into_head_and_tail() {
        let mut d = domain(vec![chain_method("m", 3)]);
        two_regularize(&mut d);

        assert_eq!(d.methods.len(), 2);
        let head = &d.methods[0];
        assert_eq!(head.name, "m");
        assert_eq!(head.subtasks.len(), 2);
        assert_eq!(head.subtasks[0].task, "a0");
        assert_eq!(head.subtasks[1].task, "_two_reg_task0__m");
        assert_eq!(head.subtasks[1].id, "s1");
        assert_eq!(head.ordering, vec![("s0".to_string(), "s1".to_string())]);

        let tail = &d.methods[1];
        assert_eq!(tail.name, "_two_reg_method0__m");
        assert_eq!(tail.task, "_two_reg_task0__m");
        let tasks: Vec<&str> = tail.subtasks.iter().map(|s| s.task.as_str()).collect();
        assert_eq!(tasks, vec!["a1", "a2"]);
        assert_eq!(tail.ordering, vec![("s1".to_string(), "s2".to_string())]);

        let synthetic = d.abstract_tasks.last().unwrap();
        assert!(synthetic.artificial);
        // ?t is exposed and used in the tail.
        assert_eq!(synthetic.params, vec![TypedVar::new("?t", "obj")]);
        assert_eq!(synthetic.original_param_count, 1);
        for m in &d.methods {
            assert!(d.check_method(m).is_ok(), "{}", m.name);
        }
    }

    #[test]
    fn long_chain_reproduces_original_steps() {
        let original = chain_method("m", 5);
        let mut d = domain(vec![original.clone()]);
        let report = two_regularize(&mut d);

        assert_eq!(report.rewritten_methods, 1);
        assert_eq!(report.synthetic_tasks, 3);
        assert_eq!(d.methods.len(), 4);
        assert!(d.methods.iter().all(|m| m.subtasks.len() <= 2));
        assert_eq!(flatten(&d, &d.methods[0]), original.subtasks);
        for m in &d.methods {
            assert!(d.check_method(m).is_ok(), "{}", m.name);
        }
    }

    #[test]
    fn names_do_not_grow_with_depth() {
        let mut d = domain(vec![chain_method("m", 4)]);
        two_regularize(&mut d);
        let names: Vec<&str> = d.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["m", "_two_reg_method0__m", "_two_reg_method1__m"]);
        let tasks: Vec<&str> = d.abstract_tasks[1..].iter().map(|t| t.name.as_str()).collect();
        assert_eq!(tasks, vec!["_two_reg_task0__m", "_two_reg_task1__m"]);
    }

    #[test]
    fn taken_task_names_are_skipped() {
        let mut d = domain(vec![chain_method("m", 3)]);
        d.abstract_tasks.push(Task::new("_two_reg_task0__m", vec![]));
        two_regularize(&mut d);
        assert_eq!(d.methods[1].name, "_two_reg_method1__m");
        assert_eq!(d.abstract_tasks.last().unwrap().name, "_two_reg_task1__m");
    }

    #[test]
    fn name_seed_continues_counter() {
        assert_eq!(name_seed("_two_reg_method4__deliver"), (5, "deliver"));
        assert_eq!(name_seed("deliver"), (0, "deliver"));
        assert_eq!(name_seed("_two_reg_method__odd"), (0, "_two_reg_method__odd"));
    }

    #[test]
    fn steps_listed_out_of_order_are_sorted_first() {
        let ordered = chain_method("m", 3);
        let mut shuffled = ordered.clone();
        shuffled.subtasks.reverse();
        let mut d = domain(vec![shuffled]);
        two_regularize(&mut d);
        assert_eq!(d.methods.len(), 2);
        assert_eq!(flatten(&d, &d.methods[0]), ordered.subtasks);
    }

    #[test]
    fn branching_order_is_left_alone() {
        let diamond = Method::new("m", "T", &[])
            .with_step(PlanStep::new("s0", "a0", &[]))
            .with_step(PlanStep::new("s1", "a1", &[]))
            .with_step(PlanStep::new("s2", "a2", &[]))
            .with_order("s0", "s1")
            .with_order("s0", "s2");
        let unordered = Method::new("u", "T", &[])
            .with_step(PlanStep::new("s0", "a0", &[]))
            .with_step(PlanStep::new("s1", "a1", &[]))
            .with_step(PlanStep::new("s2", "a2", &[]));
        let mut d = domain(vec![diamond, unordered]);
        let before = d.clone();
        let report = two_regularize(&mut d);
        assert_eq!(report.rewritten_methods, 0);
        assert_eq!(d, before);
    }

    #[test]
    fn constraints_follow_their_variables() {
        let m = Method::new("m", "T", &["?a"])
            .with_var("?a", "obj")
            .with_var("?b", "obj")
            .with_var("?c", "obj")
            .with_step(PlanStep::new("s0", "a0", &["?a", "?a"]))
            .with_step(PlanStep::new("s1", "a1", &["?b", "?b"]))
            .with_step(PlanStep::new("s2", "a2", &["?c", "?c"]))
            .with_constraint(Literal::new("same", true, &["?a", "?b"]))
            .with_constraint(Literal::new("blue", true, &["?c"]))
            .totally_ordered();
        let mut d = domain(vec![m]);
        two_regularize(&mut d);

        let task = d.abstract_tasks.last().unwrap();
        assert_eq!(task.params, vec![TypedVar::new("?b", "obj")]);

        let head = &d.methods[0];
        assert_eq!(head.constraints, vec![Literal::new("same", true, &["?a", "?b"])]);
        assert!(head.var("?b").is_some());
        assert!(head.var("?c").is_none());
        assert_eq!(head.subtasks[1].args, vec!["?b"]);

        let tail = &d.methods[1];
        assert_eq!(tail.task_args, vec!["?b"]);
        assert_eq!(tail.constraints, vec![Literal::new("blue", true, &["?c"])]);
        assert!(tail.var("?a").is_none());
        for m in &d.methods {
            assert!(d.check_method(m).is_ok(), "{}", m.name);
        }
    }

    #[test]
    fn second_run_changes_nothing() {
        let mut d = domain(vec![chain_method("m", 5)]);
        two_regularize(&mut d);
        let once = d.clone();
        assert_eq!(two_regularize(&mut d).rewritten_methods, 0);
        assert_eq!(d, once);
    }
}
