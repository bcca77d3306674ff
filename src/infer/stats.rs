//! Inference statistics and the one-line diagnostic summary.

use std::collections::BTreeMap;

/// Accepted and redundant inferences of one method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MethodTally {
    pub accepted: usize,
    pub redundant: usize,
}

/// Totals over one inference run.
///
/// `Display` renders the summary line: redundancy ratio, inferences per
/// method, inference-method fraction per method, the same two per task and
/// per (method + task), then the raw inference count, raw inference-method
/// count, method count and task count. Ratios are printed with six
/// significant digits, and a zero denominator prints as `0`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InferenceStatistics {
    /// Only methods that saw at least one candidate appear here.
    pub per_method: BTreeMap<String, MethodTally>,
    pub total_methods: usize,
    pub total_tasks: usize,
}

impl InferenceStatistics {
    pub fn new(total_methods: usize, total_tasks: usize) -> Self {
        Self {
            per_method: BTreeMap::new(),
            total_methods,
            total_tasks,
        }
    }

    pub fn record_accepted(&mut self, method: &str) {
        self.tally(method).accepted += 1;
    }

    pub fn record_redundant(&mut self, method: &str) {
        self.tally(method).redundant += 1;
    }

    fn tally(&mut self, method: &str) -> &mut MethodTally {
        self.per_method.entry(method.to_string()).or_default()
    }

    pub fn total_inferences(&self) -> usize {
        self.per_method.values().map(|t| t.accepted).sum()
    }

    pub fn total_redundant(&self) -> usize {
        self.per_method.values().map(|t| t.redundant).sum()
    }

    /// Methods that received at least one accepted inference.
    pub fn inference_methods(&self) -> usize {
        self.per_method.values().filter(|t| t.accepted != 0).count()
    }

    pub fn redundancy_ratio(&self) -> f64 {
        let redundant = self.total_redundant();
        ratio(redundant, redundant + self.total_inferences())
    }

    /// The seven ratios of the summary line, in order.
    pub fn ratios(&self) -> [f64; 7] {
        let inferences = self.total_inferences();
        let methods = self.inference_methods();
        let both = self.total_methods + self.total_tasks;
        [
            self.redundancy_ratio(),
            ratio(inferences, self.total_methods),
            ratio(methods, self.total_methods),
            ratio(inferences, self.total_tasks),
            ratio(methods, self.total_tasks),
            ratio(inferences, both),
            ratio(methods, both),
        ]
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

const SIGNIFICANT_DIGITS: usize = 6;

/// `x` the way C's `%g` prints it: six significant digits, trailing zeros
/// dropped, scientific notation outside `1e-4 ..= 1e6`.
fn significant(x: f64) -> String {
    if x == 0.0 {
        return "0".to_string();
    }
    // The exponent after rounding decides between the two notations.
    let sci = format!("{:.*e}", SIGNIFICANT_DIGITS - 1, x);
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    if exponent < -4 || exponent >= SIGNIFICANT_DIGITS as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", trim_zeros(mantissa), exponent.abs())
    } else {
        let decimals = (SIGNIFICANT_DIGITS as i32 - 1 - exponent) as usize;
        trim_zeros(&format!("{x:.decimals$}")).to_string()
    }
}

fn trim_zeros(number: &str) -> &str {
    if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.')
    } else {
        number
    }
}

impl std::fmt::Display for InferenceStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for r in self.ratios() {
            write!(f, "{} ", significant(r))?;
        }
        write!(
            f,
            "{} {} {} {}",
            self.total_inferences(),
            self.inference_methods(),
            self.total_methods,
            self.total_tasks
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_run_prints_zeros() {
        let stats = InferenceStatistics::new(0, 0);
        assert_eq!(stats.to_string(), "0 0 0 0 0 0 0 0 0 0 0");
    }

    #[test]
    fn totals_and_ratios() {
        let mut stats = InferenceStatistics::new(4, 6);
        stats.record_accepted("m1");
        stats.record_accepted("m1");
        stats.record_redundant("m1");
        stats.record_redundant("m2");

        assert_eq!(stats.total_inferences(), 2);
        assert_eq!(stats.total_redundant(), 2);
        assert_eq!(stats.inference_methods(), 1);
        assert_eq!(stats.redundancy_ratio(), 0.5);

        let r = stats.ratios();
        assert_eq!(r[1], 0.5); // 2 inferences / 4 methods
        assert_eq!(r[2], 0.25);
        assert_eq!(r[5], 0.2); // 2 / 10
        assert_eq!(stats.to_string(), "0.5 0.5 0.25 0.333333 0.166667 0.2 0.1 2 1 4 6");
    }

    #[test]
    fn ratios_use_six_significant_digits() {
        assert_eq!(significant(0.0), "0");
        assert_eq!(significant(1.0), "1");
        assert_eq!(significant(2.0 / 3.0), "0.666667");
        assert_eq!(significant(12.5), "12.5");
        assert_eq!(significant(0.0001), "0.0001");
        assert_eq!(significant(1.0 / 30000.0), "3.33333e-05");
        assert_eq!(significant(1234567.0), "1.23457e+06");
        assert_eq!(significant(999999.7), "1e+06");
    }

    #[test]
    fn zero_tasks_do_not_produce_non_finite_values() {
        let mut stats = InferenceStatistics::new(2, 0);
        stats.record_accepted("m");
        assert!(stats.ratios().iter().all(|r| r.is_finite()));
        assert_eq!(stats.ratios()[3], 0.0);
    }
}
