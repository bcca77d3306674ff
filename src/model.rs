//! HTN domain model: sorts, predicates, tasks, methods and literals.
//!
//! The model is produced by an external loader and consumed by a downstream
//! compiler. Both passes in this crate borrow or mutate a [`Domain`]; none of
//! them validate it beyond the integrity checks exposed here.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Sort name → set of constant instances.
pub type Sorts = BTreeMap<String, BTreeSet<String>>;

/// A predicate name together with its argument sorts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredicateDef {
    pub name: String,
    pub arg_sorts: Vec<String>,
}

impl PredicateDef {
    pub fn new(name: impl Into<String>, arg_sorts: &[&str]) -> Self {
        Self {
            name: name.into(),
            arg_sorts: arg_sorts.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn arity(&self) -> usize {
        self.arg_sorts.len()
    }
}

/// A single (possibly negated) fact over named arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Literal {
    pub predicate: String,
    pub positive: bool,
    pub arguments: Vec<String>,
}

impl Literal {
    pub fn new(predicate: impl Into<String>, positive: bool, arguments: &[&str]) -> Self {
        Self {
            predicate: predicate.into(),
            positive,
            arguments: arguments.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Whether this literal talks about `predicate` with the given polarity.
    pub fn matches(&self, predicate: &str, positive: bool) -> bool {
        self.positive == positive && self.predicate == predicate
    }
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.positive { '+' } else { '-' };
        write!(f, "{sign}{}({})", self.predicate, self.arguments.join(", "))
    }
}

/// A variable or parameter together with its sort.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypedVar {
    pub name: String,
    pub sort: String,
}

impl TypedVar {
    pub fn new(name: impl Into<String>, sort: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sort: sort.into(),
        }
    }
}

/// A primitive or abstract task.
///
/// Abstract tasks carry no preconditions or effects; whether a task is
/// primitive is decided by which list of the [`Domain`] it lives in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub name: String,
    /// Ordered parameters. The order is fixed for the task's lifetime.
    pub params: Vec<TypedVar>,
    #[serde(default)]
    pub preconditions: Vec<Literal>,
    #[serde(default)]
    pub effects: Vec<Literal>,
    /// Set on tasks synthesized by one of the passes.
    #[serde(default)]
    pub artificial: bool,
    /// Number of leading parameters that existed before any pass extended the task.
    #[serde(default)]
    pub original_param_count: usize,
}

impl Task {
    pub fn new(name: impl Into<String>, params: Vec<TypedVar>) -> Self {
        let original_param_count = params.len();
        Self {
            name: name.into(),
            params,
            preconditions: Vec::new(),
            effects: Vec::new(),
            artificial: false,
            original_param_count,
        }
    }

    pub fn with_precondition(mut self, literal: Literal) -> Self {
        self.preconditions.push(literal);
        self
    }

    pub fn with_effect(mut self, literal: Literal) -> Self {
        self.effects.push(literal);
        self
    }

    /// Position of parameter `name`, if declared.
    pub fn param_position(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p.name == name)
    }

    pub fn has_param(&self, name: &str) -> bool {
        self.param_position(name).is_some()
    }

    /// Check parameter uniqueness and that every literal only uses parameters.
    pub fn check_integrity(&self) -> ModelResult<()> {
        let mut seen = HashSet::new();
        for param in &self.params {
            if !seen.insert(param.name.as_str()) {
                return Err(self.violation(format!("duplicate parameter {}", param.name)));
            }
        }
        if self.original_param_count > self.params.len() {
            return Err(self.violation(format!(
                "{} original parameters but only {} declared",
                self.original_param_count,
                self.params.len()
            )));
        }
        for literal in self.preconditions.iter().chain(&self.effects) {
            if let Some(arg) = literal.arguments.iter().find(|a| !seen.contains(a.as_str())) {
                return Err(self.violation(format!("literal {literal} uses undeclared {arg}")));
            }
        }
        Ok(())
    }

    fn violation(&self, message: String) -> ModelError {
        ModelError::Integrity {
            entity: self.name.clone(),
            message,
        }
    }
}

/// One subtask occurrence inside a method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    /// Unique within the owning method.
    pub id: String,
    pub task: String,
    /// Method variables, positional with respect to the task's parameters.
    pub args: Vec<String>,
}

impl PlanStep {
    pub fn new(id: impl Into<String>, task: impl Into<String>, args: &[&str]) -> Self {
        Self {
            id: id.into(),
            task: task.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

/// A decomposition rule for an abstract task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Method {
    pub name: String,
    /// The decomposed task.
    pub task: String,
    /// Method variables bound, by position, to the decomposed task's parameters.
    pub task_args: Vec<String>,
    pub vars: Vec<TypedVar>,
    pub subtasks: Vec<PlanStep>,
    /// Pairs `(before, after)` of plan-step ids. Must form a DAG.
    #[serde(default)]
    pub ordering: Vec<(String, String)>,
    /// Extra literal constraints over method variables.
    #[serde(default)]
    pub constraints: Vec<Literal>,
}

impl Method {
    pub fn new(name: impl Into<String>, task: impl Into<String>, task_args: &[&str]) -> Self {
        Self {
            name: name.into(),
            task: task.into(),
            task_args: task_args.iter().map(|a| a.to_string()).collect(),
            vars: Vec::new(),
            subtasks: Vec::new(),
            ordering: Vec::new(),
            constraints: Vec::new(),
        }
    }

    pub fn with_var(mut self, name: &str, sort: &str) -> Self {
        self.vars.push(TypedVar::new(name, sort));
        self
    }

    pub fn with_step(mut self, step: PlanStep) -> Self {
        self.subtasks.push(step);
        self
    }

    pub fn with_order(mut self, before: &str, after: &str) -> Self {
        self.ordering.push((before.to_string(), after.to_string()));
        self
    }

    pub fn with_constraint(mut self, literal: Literal) -> Self {
        self.constraints.push(literal);
        self
    }

    /// Orders the current subtasks as one chain, in list order.
    pub fn totally_ordered(mut self) -> Self {
        self.ordering = self
            .subtasks
            .windows(2)
            .map(|w| (w[0].id.clone(), w[1].id.clone()))
            .collect();
        self
    }

    pub fn var(&self, name: &str) -> Option<&TypedVar> {
        self.vars.iter().find(|v| v.name == name)
    }

    /// Whether step `a` is ordered strictly before step `b` (transitively).
    pub fn is_smaller(&self, a: &str, b: &str) -> bool {
        if a == b {
            return false;
        }
        let mut seen: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::from([a]);
        while let Some(current) = queue.pop_front() {
            for (before, after) in &self.ordering {
                if before != current || !seen.insert(after.as_str()) {
                    continue;
                }
                if after == b {
                    return true;
                }
                queue.push_back(after.as_str());
            }
        }
        false
    }

    /// Steps not ordered after any other step: the ones that may execute first.
    pub fn minimal_steps(&self) -> impl Iterator<Item = &PlanStep> {
        self.subtasks.iter().filter(|step| {
            !self
                .subtasks
                .iter()
                .any(|other| self.is_smaller(&other.id, &step.id))
        })
    }

    /// Check step-id uniqueness, ordering references and variable declarations.
    pub fn check_integrity(&self) -> ModelResult<()> {
        let mut declared = HashSet::new();
        for var in &self.vars {
            if !declared.insert(var.name.as_str()) {
                return Err(self.violation(format!("duplicate variable {}", var.name)));
            }
        }
        let mut ids = HashSet::new();
        for step in &self.subtasks {
            if !ids.insert(step.id.as_str()) {
                return Err(self.violation(format!("duplicate plan step id {}", step.id)));
            }
        }
        for (before, after) in &self.ordering {
            if !ids.contains(before.as_str()) || !ids.contains(after.as_str()) {
                return Err(self.violation(format!("ordering {before} < {after} uses unknown ids")));
            }
        }
        let used = self
            .task_args
            .iter()
            .chain(self.subtasks.iter().flat_map(|s| &s.args))
            .chain(self.constraints.iter().flat_map(|l| &l.arguments));
        for name in used {
            if !declared.contains(name.as_str()) {
                return Err(self.violation(format!("variable {name} is not declared")));
            }
        }
        Ok(())
    }

    fn violation(&self, message: String) -> ModelError {
        ModelError::Integrity {
            entity: self.name.clone(),
            message,
        }
    }
}

/// A complete planning domain as handed over by the loader.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    #[serde(default)]
    pub sorts: Sorts,
    #[serde(default)]
    pub predicates: Vec<PredicateDef>,
    #[serde(default)]
    pub primitive_tasks: Vec<Task>,
    #[serde(default)]
    pub abstract_tasks: Vec<Task>,
    #[serde(default)]
    pub methods: Vec<Method>,
}

impl Domain {
    /// Look up a task by name, primitive tasks first.
    pub fn task(&self, name: &str) -> Option<&Task> {
        self.primitive_tasks
            .iter()
            .chain(&self.abstract_tasks)
            .find(|t| t.name == name)
    }

    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Instances of `sort`.
    pub fn instances(&self, sort: &str) -> ModelResult<&BTreeSet<String>> {
        self.sorts.get(sort).ok_or_else(|| ModelError::UnknownSort {
            sort: sort.to_string(),
        })
    }

    pub fn task_count(&self) -> usize {
        self.primitive_tasks.len() + self.abstract_tasks.len()
    }

    /// Check a method against the tasks it references: the decomposed task's
    /// binding and every plan step must match the callee's parameter count.
    pub fn check_method(&self, method: &Method) -> ModelResult<()> {
        method.check_integrity()?;
        let decomposed = self.task(&method.task).ok_or_else(|| ModelError::UnknownTask {
            task: method.task.clone(),
        })?;
        if decomposed.params.len() != method.task_args.len() {
            return Err(ModelError::Integrity {
                entity: method.name.clone(),
                message: format!(
                    "binds {} arguments to {} with {} parameters",
                    method.task_args.len(),
                    decomposed.name,
                    decomposed.params.len()
                ),
            });
        }
        for step in &method.subtasks {
            let task = self.task(&step.task).ok_or_else(|| ModelError::UnknownTask {
                task: step.task.clone(),
            })?;
            if task.params.len() != step.args.len() {
                return Err(ModelError::ArityMismatch {
                    method: method.name.clone(),
                    step: step.id.clone(),
                    expected: task.params.len(),
                    actual: step.args.len(),
                });
            }
        }
        Ok(())
    }
}
