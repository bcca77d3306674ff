//! Turning inferred signatures into preconditions of synthetic primitive steps.
//!
//! Every method that receives at least one accepted literal gets one extra
//! primitive step ordered before all of its original steps. The step's task
//! collects the literals of every sweep; its parameters are the method
//! variables those literals mention, in first-use order.

use std::collections::HashMap;

use crate::error::{InferError, InferResult};
use crate::index::DomainIndex;
use crate::model::{Literal, Method, PlanStep, Task, TypedVar};

use super::analysis::MethodInference;
use super::signature::{Arg, Signature};
use super::stats::InferenceStatistics;

/// Any step whose task starts with this prefix is a precondition step.
pub const PRECONDITION_TASK_PREFIX: &str = "__method_precondition_";
/// Name prefix of the precondition tasks created by this pass.
pub const INFERENCE_TASK_PREFIX: &str = "__method_precondition_inference_";
/// Id prefix of the precondition steps created by this pass.
pub const INFERENCE_STEP_PREFIX: &str = "mprec_inference_";

/// Where a method's precondition step lives in the shadow model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PreconditionSlot {
    method: usize,
    step: usize,
    task: usize,
}

/// Accumulates accepted literals into a shadow copy of the methods and
/// primitive tasks. Nothing here touches the indexed domain.
#[derive(Debug)]
pub struct Injector<'c, 'd> {
    index: &'c DomainIndex<'d>,
    methods: Vec<Method>,
    primitive_tasks: Vec<Task>,
    slots: HashMap<String, PreconditionSlot>,
    statistics: InferenceStatistics,
}

/// The finished shadow model plus what it took to build it.
#[derive(Debug, Clone)]
pub struct Shadow {
    pub methods: Vec<Method>,
    pub primitive_tasks: Vec<Task>,
    pub statistics: InferenceStatistics,
}

impl<'c, 'd> Injector<'c, 'd> {
    pub fn new(index: &'c DomainIndex<'d>) -> Self {
        let domain = index.domain();
        Self {
            index,
            methods: domain.methods.clone(),
            primitive_tasks: domain.primitive_tasks.clone(),
            slots: HashMap::new(),
            statistics: InferenceStatistics::new(domain.methods.len(), domain.task_count()),
        }
    }

    /// Offer every inferred signature of one method as a precondition.
    pub fn inject(
        &mut self,
        inference: &MethodInference<'d>,
        predicate: &str,
        positive: bool,
    ) -> InferResult<()> {
        let method = inference.method;
        for sig in inference.inferred.iter() {
            let literal = to_literal(method, predicate, positive, sig)?;
            let redundant = self.is_redundant(method, &literal)?;
            tracing::debug!(
                method = %method.name,
                literal = %literal,
                redundant,
                "inferred precondition"
            );
            if redundant {
                self.statistics.record_redundant(&method.name);
                continue;
            }
            self.statistics.record_accepted(&method.name);

            let slot = self.slot(method)?;
            self.extend(slot, method, literal)?;
        }
        Ok(())
    }

    /// A literal is redundant when every possibly-first step's task already
    /// lists it verbatim, or when this run already injected it.
    fn is_redundant(&self, method: &Method, literal: &Literal) -> InferResult<bool> {
        for task in self.index.preceding_tasks(&method.name) {
            if !self.index.task(task)?.preconditions.contains(literal) {
                return Ok(self
                    .slots
                    .get(&method.name)
                    .is_some_and(|slot| self.primitive_tasks[slot.task].preconditions.contains(literal)));
            }
        }
        Ok(true)
    }

    /// The method's precondition step, created on first use.
    fn slot(&mut self, method: &Method) -> InferResult<PreconditionSlot> {
        if let Some(slot) = self.slots.get(&method.name) {
            return Ok(*slot);
        }
        let position = self.index.method_position(&method.name)?;
        let slot = match self.existing_slot(position) {
            Some(slot) => slot,
            None => self.create_slot(position),
        };
        self.slots.insert(method.name.clone(), slot);
        Ok(slot)
    }

    fn existing_slot(&self, position: usize) -> Option<PreconditionSlot> {
        let shadow = &self.methods[position];
        let step = shadow
            .subtasks
            .iter()
            .position(|s| s.task.starts_with(PRECONDITION_TASK_PREFIX))?;
        let task = self
            .primitive_tasks
            .iter()
            .position(|t| t.name == shadow.subtasks[step].task)?;
        Some(PreconditionSlot {
            method: position,
            step,
            task,
        })
    }

    fn create_slot(&mut self, position: usize) -> PreconditionSlot {
        let shadow = &mut self.methods[position];
        let step = PlanStep::new(
            format!("{INFERENCE_STEP_PREFIX}{}", shadow.name),
            format!("{INFERENCE_TASK_PREFIX}{}", shadow.name),
            &[],
        );
        for original in &shadow.subtasks {
            shadow.ordering.push((step.id.clone(), original.id.clone()));
        }

        let mut task = Task::new(step.task.clone(), Vec::new());
        task.artificial = true;
        tracing::debug!(method = %shadow.name, task = %task.name, "precondition step created");

        shadow.subtasks.push(step);
        self.primitive_tasks.push(task);
        PreconditionSlot {
            method: position,
            step: shadow.subtasks.len() - 1,
            task: self.primitive_tasks.len() - 1,
        }
    }

    fn extend(&mut self, slot: PreconditionSlot, method: &Method, literal: Literal) -> InferResult<()> {
        let task = &mut self.primitive_tasks[slot.task];
        let step = &mut self.methods[slot.method].subtasks[slot.step];
        for arg in &literal.arguments {
            if task.has_param(arg) {
                continue;
            }
            task.params.push(TypedVar::new(arg.as_str(), self.index.sort_of(&method.name, arg)?));
            step.args.push(arg.clone());
        }
        task.preconditions.push(literal);
        Ok(())
    }

    pub fn statistics(&self) -> &InferenceStatistics {
        &self.statistics
    }

    pub fn finish(self) -> Shadow {
        Shadow {
            methods: self.methods,
            primitive_tasks: self.primitive_tasks,
            statistics: self.statistics,
        }
    }
}

fn to_literal(method: &Method, predicate: &str, positive: bool, sig: &Signature) -> InferResult<Literal> {
    let mut arguments = Vec::with_capacity(sig.len());
    for arg in sig.args() {
        match arg {
            Arg::Named(name) => arguments.push(name.clone()),
            Arg::Local { .. } => {
                return Err(InferError::OpaqueArgument {
                    method: method.name.clone(),
                    predicate: predicate.to_string(),
                    argument: arg.to_string(),
                });
            }
        }
    }
    Ok(Literal {
        predicate: predicate.to_string(),
        positive,
        arguments,
    })
}
