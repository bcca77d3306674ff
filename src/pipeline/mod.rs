//! Runs the configured passes over a domain, in order.
//!
//! Inference always runs before regularization, so injected precondition
//! steps are split like any other step of a chain.

use crate::config::RefineConfig;
use crate::error::RefineResult;
use crate::infer::infer_preconditions;
use crate::infer::stats::InferenceStatistics;
use crate::model::Domain;
use crate::regularize::{RegularizeReport, two_regularize};

/// Built-in passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    /// Infer and inject method preconditions.
    InferPreconditions,
    /// Split long chains into binary methods.
    TwoRegularize,
}

impl Pass {
    /// Passes enabled by `config`, in execution order.
    pub fn selected(config: &RefineConfig) -> Vec<Pass> {
        let mut passes = Vec::new();
        if config.infer_preconditions {
            passes.push(Pass::InferPreconditions);
        }
        if config.two_regularize {
            passes.push(Pass::TwoRegularize);
        }
        passes
    }
}

/// What the passes of one run reported.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefineReport {
    /// Present when inference ran and statistics were requested.
    pub statistics: Option<InferenceStatistics>,
    pub regularization: Option<RegularizeReport>,
}

/// Run the passes selected by `config`.
///
/// Stops at the first failing pass; passes already applied stay applied.
pub fn run(domain: &mut Domain, config: &RefineConfig) -> RefineResult<RefineReport> {
    run_passes(domain, config, &Pass::selected(config))
}

/// Run exactly `passes`, in the given order.
pub fn run_passes(domain: &mut Domain, config: &RefineConfig, passes: &[Pass]) -> RefineResult<RefineReport> {
    let mut report = RefineReport::default();
    for pass in passes {
        tracing::debug!(?pass, "running pass");
        match pass {
            Pass::InferPreconditions => {
                let statistics = infer_preconditions(domain, &config.top_task)?;
                if config.report_statistics {
                    report.statistics = Some(statistics);
                }
            }
            Pass::TwoRegularize => {
                report.regularization = Some(two_regularize(domain));
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_selects_inference_only() {
        assert_eq!(Pass::selected(&RefineConfig::default()), vec![Pass::InferPreconditions]);
        let both = RefineConfig {
            two_regularize: true,
            ..Default::default()
        };
        assert_eq!(
            Pass::selected(&both),
            vec![Pass::InferPreconditions, Pass::TwoRegularize]
        );
    }

    #[test]
    fn statistics_can_be_suppressed() {
        let mut domain = Domain {
            abstract_tasks: vec![crate::model::Task::new("__top", vec![])],
            ..Default::default()
        };
        let quiet = RefineConfig {
            report_statistics: false,
            ..Default::default()
        };
        let report = run(&mut domain, &quiet).unwrap();
        assert!(report.statistics.is_none());
        assert!(report.regularization.is_none());

        let report = run(&mut domain, &RefineConfig::default()).unwrap();
        assert_eq!(report.statistics.unwrap().total_tasks, 1);
    }

    #[test]
    fn missing_top_task_is_reported() {
        let mut domain = Domain::default();
        assert!(run(&mut domain, &RefineConfig::default()).is_err());
        let regularize_only = RefineConfig {
            infer_preconditions: false,
            two_regularize: true,
            ..Default::default()
        };
        let report = run(&mut domain, &regularize_only).unwrap();
        assert_eq!(report.regularization, Some(RegularizeReport::default()));
    }
}
