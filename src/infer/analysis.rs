//! Non-emptiness and add-reachability of predicate patterns.
//!
//! One [`Sweep`] handles one (predicate, polarity) pair. It walks the task
//! hierarchy depth-first from the top task, visiting every task once, and
//! computes per task:
//!
//! - `non_empty`: patterns required by every method of the task,
//! - `add_non_empty`: patterns every method is guaranteed to make true,
//! - `add_reachable`: patterns some method may newly make true.
//!
//! This is a single memoized pass, not a fixpoint iteration. Loop tasks are
//! seeded with nothing guaranteed and everything reachable before their
//! methods are processed, which keeps the walk finite on recursive domains.

use std::collections::HashMap;

use crate::error::{InferError, InferResult, ModelResult};
use crate::index::DomainIndex;
use crate::loops::{DecompositionGraph, LoopSet};
use crate::model::{Domain, Literal, Method, Task};

use super::signature::{LocalPolicy, Signature, SignatureSet};

/// Lookup tables and loop tasks shared by all sweeps of one run.
#[derive(Debug)]
pub struct AnalysisContext<'d> {
    index: DomainIndex<'d>,
    loops: LoopSet,
}

impl<'d> AnalysisContext<'d> {
    pub fn build(domain: &'d Domain) -> Self {
        let index = DomainIndex::build(domain);
        let loops = DecompositionGraph::build(&index).loops();
        tracing::debug!(
            methods = domain.methods.len(),
            loops = loops.len(),
            "analysis context ready"
        );
        Self { index, loops }
    }

    pub fn index(&self) -> &DomainIndex<'d> {
        &self.index
    }

    pub fn loops(&self) -> &LoopSet {
        &self.loops
    }
}

/// Working state of one task during a sweep.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskRecord {
    pub initialized: bool,
    pub finished: bool,
    pub non_empty: SignatureSet,
    pub add_non_empty: SignatureSet,
    pub add_reachable: SignatureSet,
}

/// Analysis result for one method, in the method's own naming.
#[derive(Debug, Clone)]
pub struct MethodInference<'d> {
    pub method: &'d Method,
    /// Patterns some subtask requires, local variables kept bare.
    pub local_non_empty: SignatureSet,
    /// Patterns some subtask may newly establish.
    pub add_reachable: SignatureSet,
    /// `local_non_empty` minus whatever `add_reachable` already covers.
    pub inferred: SignatureSet,
}

/// One (predicate, polarity) pass over the hierarchy.
#[derive(Debug)]
pub struct Sweep<'c, 'd> {
    ctx: &'c AnalysisContext<'d>,
    predicate: &'c str,
    positive: bool,
    records: HashMap<&'d str, TaskRecord>,
    methods: Vec<MethodInference<'d>>,
}

impl<'c, 'd> Sweep<'c, 'd> {
    /// Fresh working state with every primitive task seeded from its own
    /// preconditions and effects.
    pub fn new(ctx: &'c AnalysisContext<'d>, predicate: &'c str, positive: bool) -> Self {
        let mut records = HashMap::new();
        for task in &ctx.index.domain().primitive_tasks {
            let matching = |literals: &[Literal]| -> SignatureSet {
                literals
                    .iter()
                    .filter(|l| l.matches(predicate, positive))
                    .map(|l| Signature::from_names(l.arguments.as_slice()))
                    .collect()
            };
            let prec = matching(&task.preconditions);
            let eff = matching(&task.effects);

            let mut add_reachable = eff.clone();
            add_reachable.subtract(&prec);
            // Holding and staying true counts as established.
            let mut add_non_empty = eff;
            add_non_empty.union(&prec);

            records.insert(
                task.name.as_str(),
                TaskRecord {
                    initialized: true,
                    finished: true,
                    non_empty: prec,
                    add_non_empty,
                    add_reachable,
                },
            );
        }
        Self {
            ctx,
            predicate,
            positive,
            records,
            methods: Vec::new(),
        }
    }

    /// Walk the hierarchy below `top`.
    pub fn run(mut self, top: &str) -> InferResult<SweepOutcome<'d>> {
        let task = self
            .ctx
            .index
            .task(top)
            .map_err(|_| InferError::UnknownTopTask {
                task: top.to_string(),
            })?;
        self.visit(&task.name)?;
        Ok(SweepOutcome {
            records: self.records,
            methods: self.methods,
        })
    }

    fn visit(&mut self, name: &'d str) -> ModelResult<()> {
        let ctx = self.ctx;
        let record = self.records.entry(name).or_default();
        if record.finished {
            return Ok(());
        }
        record.finished = true;

        if ctx.loops.contains(name) {
            record.initialized = true;
            record.non_empty = SignatureSet::empty();
            record.add_non_empty = SignatureSet::empty();
            record.add_reachable = SignatureSet::Unconstrained;
        }

        let task = ctx.index.task(name)?;
        for &method in ctx.index.methods_of(name) {
            self.visit_method(task, method)?;
        }
        Ok(())
    }

    fn visit_method(&mut self, task: &'d Task, method: &'d Method) -> ModelResult<()> {
        let ctx = self.ctx;
        let index = &ctx.index;

        let mut non_empty = SignatureSet::empty();
        let mut local_non_empty = SignatureSet::empty();
        let mut add_non_empty = SignatureSet::empty();
        for step in &method.subtasks {
            self.visit(&step.task)?;
            let sub = self.record(&step.task);
            non_empty.union(&sub.non_empty.rename_down(index, method, step, LocalPolicy::Drop)?);
            local_non_empty.union(&sub.non_empty.rename_down(index, method, step, LocalPolicy::Keep)?);
            add_non_empty.union(&sub.add_non_empty.rename_down(index, method, step, LocalPolicy::Drop)?);
        }
        let task_non_empty = non_empty.rename_up(index, task, method)?;
        let task_add_non_empty = add_non_empty.rename_up(index, task, method)?;

        // A pattern is not newly reachable through a step if an earlier step
        // already guarantees it.
        let mut add_reachable = SignatureSet::empty();
        for step in &method.subtasks {
            let mut reach = self.record(&step.task).add_reachable.rename_down(
                index,
                method,
                step,
                LocalPolicy::Qualify,
            )?;
            for earlier in &method.subtasks {
                if method.is_smaller(&earlier.id, &step.id) {
                    let guaranteed = self.record(&earlier.task).add_non_empty.rename_down(
                        index,
                        method,
                        earlier,
                        LocalPolicy::Qualify,
                    )?;
                    reach.subtract(&guaranteed);
                }
            }
            add_reachable.union(&reach);
        }
        let task_add_reachable = add_reachable.rename_up(index, task, method)?;

        let record = self.records.entry(task.name.as_str()).or_default();
        if record.initialized {
            record.non_empty.intersect(&task_non_empty);
            record.add_non_empty.intersect(&task_add_non_empty);
        } else {
            record.initialized = true;
            record.non_empty = task_non_empty;
            record.add_non_empty = task_add_non_empty;
        }
        record.add_reachable.union(&task_add_reachable);

        let inferred = local_non_empty.constrain(&add_reachable, index, method)?;
        if !local_non_empty.is_empty() || !add_reachable.is_empty() {
            tracing::debug!(
                predicate = self.predicate,
                positive = self.positive,
                method = %method.name,
                non_empty = ?local_non_empty.len(),
                add_reachable = ?add_reachable.len(),
                inferred = ?inferred.len(),
                "method analysed"
            );
        }
        self.methods.push(MethodInference {
            method,
            local_non_empty,
            add_reachable,
            inferred,
        });
        Ok(())
    }

    fn record(&self, task: &str) -> &TaskRecord {
        // visit() inserts an entry before any step's record is read.
        static NOTHING: TaskRecord = TaskRecord {
            initialized: false,
            finished: false,
            non_empty: SignatureSet::Enumerated(Vec::new()),
            add_non_empty: SignatureSet::Enumerated(Vec::new()),
            add_reachable: SignatureSet::Enumerated(Vec::new()),
        };
        self.records.get(task).unwrap_or(&NOTHING)
    }
}

/// What one sweep produced.
#[derive(Debug)]
pub struct SweepOutcome<'d> {
    records: HashMap<&'d str, TaskRecord>,
    methods: Vec<MethodInference<'d>>,
}

impl<'d> SweepOutcome<'d> {
    /// Final working state of `task`, if the walk reached it.
    pub fn record(&self, task: &str) -> Option<&TaskRecord> {
        self.records.get(task)
    }

    /// Analysed methods in visiting (post-)order.
    pub fn methods(&self) -> &[MethodInference<'d>] {
        &self.methods
    }

    pub fn method(&self, name: &str) -> Option<&MethodInference<'d>> {
        self.methods.iter().find(|m| m.method.name == name)
    }
}
