//! Per-run lookup tables over a [`Domain`].
//!
//! Built once per inference run: parameter positions of tasks, variable
//! positions and task bindings of methods, methods grouped by the task they
//! decompose, and the tasks of each method's minimal (possibly first) steps.

use std::collections::{BTreeSet, HashMap};

use crate::error::{ModelError, ModelResult};
use crate::model::{Domain, Method, Task};

/// How a method variable relates to the decomposed task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// Bound to the decomposed task's parameter at this position.
    Exposed(usize),
    /// Private to the method.
    Local,
}

/// Lookup tables borrowed from one domain.
#[derive(Debug)]
pub struct DomainIndex<'d> {
    domain: &'d Domain,
    tasks: HashMap<&'d str, &'d Task>,
    task_params: HashMap<&'d str, HashMap<&'d str, usize>>,
    method_positions: HashMap<&'d str, usize>,
    method_vars: HashMap<&'d str, HashMap<&'d str, usize>>,
    method_bindings: HashMap<&'d str, HashMap<&'d str, Binding>>,
    task_methods: HashMap<&'d str, Vec<&'d Method>>,
    preceding_tasks: HashMap<&'d str, BTreeSet<&'d str>>,
}

impl<'d> DomainIndex<'d> {
    pub fn build(domain: &'d Domain) -> Self {
        let mut tasks = HashMap::new();
        let mut task_params = HashMap::new();
        for task in domain.primitive_tasks.iter().chain(&domain.abstract_tasks) {
            tasks.entry(task.name.as_str()).or_insert(task);
            let positions: HashMap<&str, usize> = task
                .params
                .iter()
                .enumerate()
                .map(|(i, p)| (p.name.as_str(), i))
                .collect();
            task_params.entry(task.name.as_str()).or_insert(positions);
        }

        let mut method_positions = HashMap::new();
        let mut method_vars = HashMap::new();
        let mut method_bindings = HashMap::new();
        let mut task_methods: HashMap<&str, Vec<&Method>> = HashMap::new();
        let mut preceding_tasks = HashMap::new();
        for (position, method) in domain.methods.iter().enumerate() {
            let name = method.name.as_str();
            method_positions.insert(name, position);
            task_methods.entry(method.task.as_str()).or_default().push(method);

            let mut vars = HashMap::new();
            let mut bindings = HashMap::new();
            for (i, var) in method.vars.iter().enumerate() {
                vars.insert(var.name.as_str(), i);
                bindings.insert(var.name.as_str(), Binding::Local);
            }
            // A variable bound twice keeps its last position.
            for (i, arg) in method.task_args.iter().enumerate() {
                bindings.insert(arg.as_str(), Binding::Exposed(i));
            }
            method_vars.insert(name, vars);
            method_bindings.insert(name, bindings);

            let first: BTreeSet<&str> = method.minimal_steps().map(|s| s.task.as_str()).collect();
            preceding_tasks.insert(name, first);
        }

        Self {
            domain,
            tasks,
            task_params,
            method_positions,
            method_vars,
            method_bindings,
            task_methods,
            preceding_tasks,
        }
    }

    pub fn domain(&self) -> &'d Domain {
        self.domain
    }

    pub fn task(&self, name: &str) -> ModelResult<&'d Task> {
        self.tasks
            .get(name)
            .copied()
            .ok_or_else(|| ModelError::UnknownTask {
                task: name.to_string(),
            })
    }

    /// Zero-based position of `param` among `task`'s parameters.
    pub fn param_position(&self, task: &str, param: &str) -> ModelResult<usize> {
        self.task_params
            .get(task)
            .ok_or_else(|| ModelError::UnknownTask {
                task: task.to_string(),
            })?
            .get(param)
            .copied()
            .ok_or_else(|| ModelError::UnknownParameter {
                task: task.to_string(),
                param: param.to_string(),
            })
    }

    /// Position of `method` in the domain's method list.
    pub fn method_position(&self, method: &str) -> ModelResult<usize> {
        self.method_positions
            .get(method)
            .copied()
            .ok_or_else(|| ModelError::UnknownMethod {
                method: method.to_string(),
            })
    }

    pub fn method(&self, name: &str) -> ModelResult<&'d Method> {
        Ok(&self.domain.methods[self.method_position(name)?])
    }

    /// Position of `var` in `method`'s variable list.
    pub fn var_position(&self, method: &str, var: &str) -> ModelResult<usize> {
        self.method_vars
            .get(method)
            .ok_or_else(|| ModelError::UnknownMethod {
                method: method.to_string(),
            })?
            .get(var)
            .copied()
            .ok_or_else(|| ModelError::UnknownVariable {
                method: method.to_string(),
                var: var.to_string(),
            })
    }

    /// Sort of `var` as declared by `method`.
    pub fn sort_of(&self, method: &str, var: &str) -> ModelResult<&'d str> {
        let position = self.var_position(method, var)?;
        Ok(self.method(method)?.vars[position].sort.as_str())
    }

    /// Whether `var` is exposed to the decomposed task, and where.
    pub fn binding(&self, method: &str, var: &str) -> ModelResult<Binding> {
        self.method_bindings
            .get(method)
            .ok_or_else(|| ModelError::UnknownMethod {
                method: method.to_string(),
            })?
            .get(var)
            .copied()
            .ok_or_else(|| ModelError::UnknownVariable {
                method: method.to_string(),
                var: var.to_string(),
            })
    }

    /// Methods decomposing `task`, in declaration order.
    pub fn methods_of(&self, task: &str) -> &[&'d Method] {
        self.task_methods.get(task).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Task names of the steps of `method` that no other step must precede.
    pub fn preceding_tasks(&self, method: &str) -> impl Iterator<Item = &'d str> + '_ {
        self.preceding_tasks
            .get(method)
            .into_iter()
            .flat_map(|tasks| tasks.iter().copied())
    }
}
