//! Signature sets: which argument patterns of one predicate a task or method
//! guarantees or may establish.
//!
//! A [`Signature`] is an argument tuple expressed in the parameter names of
//! one entity. A [`SignatureSet`] is either an enumerated set of signatures or
//! [`SignatureSet::Unconstrained`], meaning "any pattern at all". Renaming
//! moves a set between the scope of a subtask, the enclosing method and the
//! task that method decomposes.

use std::collections::BTreeSet;

use crate::error::{ModelError, ModelResult};
use crate::index::{Binding, DomainIndex};
use crate::model::{Method, PlanStep, Task};

/// Prefix of the textual form of a method-local placeholder.
pub const LOCAL_PREFIX: &str = "__LOCAL__";
/// Separates the owning method from the variable in a placeholder.
pub const LOCAL_DELIMITER: &str = "__LOCALEND";

/// One argument of a signature.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Arg {
    /// A name in the scope of the entity owning the signature.
    Named(String),
    /// A private variable of `method`. Opaque outside of it: two placeholders
    /// from different methods never compare equal.
    Local { method: String, var: String },
}

impl Arg {
    pub fn named(name: impl Into<String>) -> Self {
        Arg::Named(name.into())
    }

    pub fn local(method: impl Into<String>, var: impl Into<String>) -> Self {
        Arg::Local {
            method: method.into(),
            var: var.into(),
        }
    }

    /// The variable behind the argument, whichever scope it belongs to.
    pub fn var(&self) -> &str {
        match self {
            Arg::Named(name) => name,
            Arg::Local { var, .. } => var,
        }
    }
}

impl std::fmt::Display for Arg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Arg::Named(name) => f.write_str(name),
            Arg::Local { method, var } => write!(f, "{LOCAL_PREFIX}{method}{LOCAL_DELIMITER}{var}"),
        }
    }
}

/// An ordered argument tuple of one predicate.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Signature(pub Vec<Arg>);

impl Signature {
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        Signature(names.iter().map(|n| Arg::named(n.as_ref())).collect())
    }

    pub fn args(&self) -> &[Arg] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// A zero-length tuple: trivially true for any instantiation.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("(")?;
        for (i, arg) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{arg}")?;
        }
        f.write_str(")")
    }
}

/// What happens to method-private variables when renaming into a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalPolicy {
    /// Drop every signature mentioning a private variable.
    Drop,
    /// Replace the variable by a placeholder tagged with the owning method.
    Qualify,
    /// Keep the bare variable name; only meaningful inside the method.
    Keep,
}

/// A set of signatures, or the absorbing "anything" value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureSet {
    Unconstrained,
    Enumerated(Vec<Signature>),
}

impl Default for SignatureSet {
    fn default() -> Self {
        SignatureSet::Enumerated(Vec::new())
    }
}

impl FromIterator<Signature> for SignatureSet {
    fn from_iter<I: IntoIterator<Item = Signature>>(iter: I) -> Self {
        let mut set = SignatureSet::Enumerated(iter.into_iter().collect());
        set.simplify();
        set
    }
}

impl SignatureSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Normalize to sorted, duplicate-free form.
    pub fn simplify(&mut self) {
        if let SignatureSet::Enumerated(sigs) = self {
            sigs.sort();
            sigs.dedup();
        }
    }

    pub fn is_unconstrained(&self) -> bool {
        matches!(self, SignatureSet::Unconstrained)
    }

    /// True only for an enumerated set without members.
    pub fn is_empty(&self) -> bool {
        matches!(self, SignatureSet::Enumerated(sigs) if sigs.is_empty())
    }

    /// Number of enumerated members; `None` when unconstrained.
    pub fn len(&self) -> Option<usize> {
        match self {
            SignatureSet::Unconstrained => None,
            SignatureSet::Enumerated(sigs) => Some(sigs.len()),
        }
    }

    /// Enumerated members. Yields nothing for [`SignatureSet::Unconstrained`].
    pub fn iter(&self) -> std::slice::Iter<'_, Signature> {
        match self {
            SignatureSet::Unconstrained => Default::default(),
            SignatureSet::Enumerated(sigs) => sigs.iter(),
        }
    }

    pub fn contains(&self, sig: &Signature) -> bool {
        match self {
            SignatureSet::Unconstrained => true,
            SignatureSet::Enumerated(sigs) => sigs.contains(sig),
        }
    }

    /// Whether the set holds the zero-length, always-true tuple.
    pub fn contains_trivial(&self) -> bool {
        self.iter().any(Signature::is_empty)
    }

    /// `self ∪ other`; unconstrained absorbs.
    pub fn union(&mut self, other: &SignatureSet) {
        match other {
            SignatureSet::Unconstrained => *self = SignatureSet::Unconstrained,
            SignatureSet::Enumerated(more) => {
                if let SignatureSet::Enumerated(sigs) = self {
                    sigs.extend(more.iter().cloned());
                    self.simplify();
                }
            }
        }
    }

    /// `self ∩ other`. The analysis only ever intersects enumerated sets;
    /// unconstrained acts as the identity should it show up.
    pub fn intersect(&mut self, other: &SignatureSet) {
        let SignatureSet::Enumerated(keep) = other else {
            return;
        };
        match self {
            SignatureSet::Unconstrained => *self = other.clone(),
            SignatureSet::Enumerated(sigs) => sigs.retain(|sig| keep.contains(sig)),
        }
    }

    /// `self − other`. An unconstrained set cannot be enumerated and stays as is.
    pub fn subtract(&mut self, other: &SignatureSet) {
        let SignatureSet::Enumerated(sigs) = self else {
            return;
        };
        match other {
            SignatureSet::Unconstrained => sigs.clear(),
            SignatureSet::Enumerated(remove) => sigs.retain(|sig| !remove.contains(sig)),
        }
    }

    /// Rename from `step`'s task parameters into `method`'s variables.
    ///
    /// Placeholders pass through untouched. Exposed variables take their name
    /// from the method's task binding; private ones follow `policy`.
    pub fn rename_down(
        &self,
        index: &DomainIndex<'_>,
        method: &Method,
        step: &PlanStep,
        policy: LocalPolicy,
    ) -> ModelResult<SignatureSet> {
        let SignatureSet::Enumerated(sigs) = self else {
            return Ok(SignatureSet::Unconstrained);
        };

        let mut renamed = Vec::with_capacity(sigs.len());
        'sigs: for sig in sigs {
            let mut args = Vec::with_capacity(sig.len());
            for arg in sig.args() {
                let Arg::Named(param) = arg else {
                    args.push(arg.clone());
                    continue;
                };
                let position = index.param_position(&step.task, param)?;
                let actual = step.args.get(position).ok_or_else(|| ModelError::ArityMismatch {
                    method: method.name.clone(),
                    step: step.id.clone(),
                    expected: position + 1,
                    actual: step.args.len(),
                })?;
                match index.binding(&method.name, actual)? {
                    Binding::Exposed(i) => args.push(Arg::named(&method.task_args[i])),
                    Binding::Local => match policy {
                        LocalPolicy::Drop => continue 'sigs,
                        LocalPolicy::Qualify => args.push(Arg::local(&method.name, actual)),
                        LocalPolicy::Keep => args.push(Arg::named(actual)),
                    },
                }
            }
            renamed.push(Signature(args));
        }
        Ok(renamed.into_iter().collect())
    }

    /// Rename from `method`'s variables into the parameters of `task`, the
    /// task it decomposes. Placeholders stay opaque above the method.
    pub fn rename_up(
        &self,
        index: &DomainIndex<'_>,
        task: &Task,
        method: &Method,
    ) -> ModelResult<SignatureSet> {
        let SignatureSet::Enumerated(sigs) = self else {
            return Ok(SignatureSet::Unconstrained);
        };

        let mut renamed = Vec::with_capacity(sigs.len());
        for sig in sigs {
            let mut args = Vec::with_capacity(sig.len());
            for arg in sig.args() {
                let Arg::Named(var) = arg else {
                    args.push(arg.clone());
                    continue;
                };
                let Binding::Exposed(i) = index.binding(&method.name, var)? else {
                    return Err(ModelError::UnboundVariable {
                        method: method.name.clone(),
                        var: var.clone(),
                    });
                };
                let param = task.params.get(i).ok_or_else(|| ModelError::Integrity {
                    entity: method.name.clone(),
                    message: format!("binds position {i} of {} which has no such parameter", task.name),
                })?;
                args.push(Arg::named(&param.name));
            }
            renamed.push(Signature(args));
        }
        Ok(renamed.into_iter().collect())
    }

    /// Candidates of `self` not already covered by `reachable`.
    ///
    /// Both sets are in `method`'s naming. A candidate is covered when some
    /// reachable signature is sort-compatible with it at every position, that
    /// is, the instance sets of the two variables overlap everywhere. An
    /// unconstrained or trivially true `reachable` covers everything.
    pub fn constrain(
        &self,
        reachable: &SignatureSet,
        index: &DomainIndex<'_>,
        method: &Method,
    ) -> ModelResult<SignatureSet> {
        if reachable.is_unconstrained() || reachable.contains_trivial() {
            return Ok(SignatureSet::empty());
        }
        let SignatureSet::Enumerated(candidates) = self else {
            return Ok(SignatureSet::Unconstrained);
        };

        let mut kept = Vec::new();
        for candidate in candidates {
            let mut covered = false;
            for other in reachable.iter() {
                if sort_compatible(candidate, other, index, method)? {
                    covered = true;
                    break;
                }
            }
            if !covered {
                kept.push(candidate.clone());
            }
        }
        Ok(kept.into_iter().collect())
    }
}

fn sort_compatible(
    a: &Signature,
    b: &Signature,
    index: &DomainIndex<'_>,
    method: &Method,
) -> ModelResult<bool> {
    for (x, y) in a.args().iter().zip(b.args()) {
        let xs = instances_of(x, index, method)?;
        let ys = instances_of(y, index, method)?;
        if xs.is_disjoint(ys) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Instances an argument may take; placeholders are looked up in their own method.
fn instances_of<'d>(
    arg: &Arg,
    index: &DomainIndex<'d>,
    method: &Method,
) -> ModelResult<&'d BTreeSet<String>> {
    let sort = match arg {
        Arg::Named(var) => index.sort_of(&method.name, var)?,
        Arg::Local { method: owner, var } => index.sort_of(owner, var)?,
    };
    index.domain().instances(sort)
}
