//! Test evaluation engine
//!
//! Turns one audit command's output plus a [`TestSpec`] into a [`Verdict`].
//! Evaluation is pure: no I/O and no shared state, so identical inputs
//! always produce identical verdicts.
//!
//! Parsing problems (no `permissions=` token, no number after a flag, no
//! element list) produce `WARN`. A `FAIL` always means the output confirmed
//! a wrong setting.

use crate::definition::{BinOp, CompareOp, TestItem, TestSpec};
use kubecis_core::{Error, Result, Status, Verdict};
use regex::Regex;

pub const NO_OUTPUT_REASON: &str =
    "No output from audit command, the recommendation might be manual";

const NO_CONDITIONS_REASON: &str = "No valid test conditions";
const DEFAULT_PERMISSIONS: &str = "600";

/// Evaluate output against a test specification, downgrading internal
/// failures to an `ERROR` verdict
pub fn evaluate(output: &str, spec: &TestSpec) -> Verdict {
    try_evaluate(output, spec)
        .unwrap_or_else(|e| Verdict::error(format!("Exception during evaluation: {}", e)))
}

/// Evaluate output against a test specification
pub fn try_evaluate(output: &str, spec: &TestSpec) -> Result<Verdict> {
    if output.trim().is_empty() {
        return Ok(Verdict::warn(NO_OUTPUT_REASON));
    }

    let verdicts = spec
        .test_items
        .iter()
        .map(|item| evaluate_item(output, item))
        .collect::<Result<Vec<_>>>()?;

    Ok(combine(&spec.bin_op, &verdicts))
}

fn evaluate_item(output: &str, item: &TestItem) -> Result<Verdict> {
    let targets = item.match_targets();
    let shown = format_targets(&targets);

    if let Some(should_exist) = item.set {
        let found = contains_any(output, &targets);
        return Ok(match (should_exist, found) {
            (true, true) => Verdict::pass(format!("{} present as expected", shown)),
            (true, false) => Verdict::fail(format!("{} missing", shown)),
            (false, true) => Verdict::fail(format!("{} should not be set", shown)),
            (false, false) => Verdict::pass(format!("{} correctly unset", shown)),
        });
    }

    let compare = item.compare.as_ref();
    let Some(op) = compare.and_then(|c| c.operator()) else {
        return Ok(if contains_any(output, &targets) {
            Verdict::pass(format!("Found {}", shown))
        } else {
            Verdict::fail(format!("Did not find {}", shown))
        });
    };
    let expected = compare.and_then(|c| c.value.as_deref());

    match op {
        CompareOp::Bitmask => Ok(bitmask(output, expected)),
        CompareOp::Eq => Ok(containment(output, &targets, expected, |matched| {
            if matched {
                Verdict::pass(format!("{} == {}", shown, display_value(expected)))
            } else {
                Verdict::fail(format!("{} != {}", shown, display_value(expected)))
            }
        })),
        CompareOp::Has => Ok(containment(output, &targets, expected, |matched| {
            if matched {
                Verdict::pass(format!("{} contains {}", shown, display_value(expected)))
            } else {
                Verdict::fail(format!(
                    "{} does not contain {}",
                    shown,
                    display_value(expected)
                ))
            }
        })),
        CompareOp::NotHave => {
            let present = expected.map(|v| output.contains(v)).unwrap_or(false);
            Ok(if present {
                Verdict::fail(format!(
                    "{} should not contain {}",
                    shown,
                    display_value(expected)
                ))
            } else {
                Verdict::pass(format!(
                    "{} does not contain {}",
                    shown,
                    display_value(expected)
                ))
            })
        }
        CompareOp::Gte => gte(output, &targets, &shown, expected),
        CompareOp::ValidElements => valid_elements(output, &targets, expected),
        CompareOp::Unknown(name) => Ok(Verdict::warn(format!("Unknown compare op {}", name))),
    }
}

/// Fold item verdicts with the test combinator; `WARN` items never decide
fn combine(bin_op: &BinOp, verdicts: &[Verdict]) -> Verdict {
    let reasons = verdicts
        .iter()
        .map(|v| v.reason.as_str())
        .collect::<Vec<_>>()
        .join("; ");

    let decisive: Vec<Status> = verdicts
        .iter()
        .map(|v| v.status)
        .filter(|s| *s != Status::Warn)
        .collect();

    if decisive.is_empty() {
        if reasons.is_empty() {
            return Verdict::warn(NO_CONDITIONS_REASON);
        }
        return Verdict::warn(reasons);
    }

    let status = match bin_op {
        BinOp::And if decisive.iter().all(Status::is_pass) => Status::Pass,
        BinOp::And => Status::Fail,
        BinOp::Or if decisive.iter().any(Status::is_pass) => Status::Pass,
        BinOp::Or => Status::Fail,
        BinOp::Other(_) => Status::Warn,
    };
    Verdict::new(status, reasons)
}

fn contains_any(output: &str, targets: &[&str]) -> bool {
    targets.iter().any(|t| output.contains(t))
}

/// `eq`/`has`: a target and the expected value both appear in the output
fn containment(
    output: &str,
    targets: &[&str],
    expected: Option<&str>,
    verdict: impl FnOnce(bool) -> Verdict,
) -> Verdict {
    let value_present = expected.map(|v| output.contains(v)).unwrap_or(true);
    verdict(value_present && contains_any(output, targets))
}

fn bitmask(output: &str, expected: Option<&str>) -> Verdict {
    let expected = expected
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(DEFAULT_PERMISSIONS);

    let Some(expected_perm) = parse_octal(expected) else {
        return Verdict::warn("Could not parse permissions");
    };

    let actual_perm = output
        .split_whitespace()
        .filter_map(|token| token.strip_prefix("permissions="))
        .find_map(parse_octal);

    match actual_perm {
        Some(actual) if actual <= expected_perm => Verdict::pass(format!(
            "Permissions {:#o} <= {:#o}",
            actual, expected_perm
        )),
        Some(actual) => Verdict::fail(format!(
            "Permissions {:#o} > expected {:#o}",
            actual, expected_perm
        )),
        None => Verdict::warn("Could not parse permissions"),
    }
}

fn parse_octal(value: &str) -> Option<u32> {
    let value = value.trim();
    let digits = value
        .strip_prefix("0o")
        .or_else(|| value.strip_prefix("0O"))
        .unwrap_or(value);
    u32::from_str_radix(digits, 8).ok()
}

fn gte(output: &str, targets: &[&str], shown: &str, expected: Option<&str>) -> Result<Verdict> {
    let mut actual = None;
    for target in targets {
        let pattern = target_pattern(target, r"[= ]([0-9]+)")?;
        if let Some(caps) = pattern.captures(output) {
            actual = caps.get(1).and_then(|m| m.as_str().parse::<i128>().ok());
            break;
        }
    }

    let Some(expected_num) = expected.and_then(|v| v.trim().parse::<i128>().ok()) else {
        return Ok(Verdict::warn(format!(
            "Invalid expected numeric value {}",
            display_value(expected)
        )));
    };

    Ok(match actual {
        None => Verdict::warn("Could not parse numeric value for comparison"),
        Some(actual) if actual >= expected_num => Verdict::pass(format!(
            "{} >= {} (actual {})",
            shown, expected_num, actual
        )),
        Some(actual) => Verdict::fail(format!(
            "{} < {} (actual {})",
            shown, expected_num, actual
        )),
    })
}

fn valid_elements(output: &str, targets: &[&str], expected: Option<&str>) -> Result<Verdict> {
    let allowed: Vec<&str> = split_elements(expected.unwrap_or_default());

    let mut found: Vec<&str> = Vec::new();
    for target in targets {
        let pattern = target_pattern(target, r"=([A-Za-z0-9_@.\-+,]+)")?;
        if let Some(list) = pattern.captures(output).and_then(|caps| caps.get(1)) {
            for element in split_elements(list.as_str()) {
                if !found.contains(&element) {
                    found.push(element);
                }
            }
        }
    }

    if found.is_empty() {
        return Ok(Verdict::warn("Could not parse values for valid_elements"));
    }

    let disallowed: Vec<&str> = found
        .into_iter()
        .filter(|element| !allowed.contains(element))
        .collect();

    Ok(if disallowed.is_empty() {
        Verdict::pass("All configured values are in the allowed list")
    } else {
        Verdict::fail(format!("Found disallowed values: {}", disallowed.join(", ")))
    })
}

fn split_elements(list: &str) -> Vec<&str> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

fn target_pattern(target: &str, suffix: &str) -> Result<Regex> {
    Regex::new(&format!("{}{}", regex::escape(target), suffix)).map_err(|e| {
        Error::InvalidPattern {
            target: target.to_string(),
            message: e.to_string(),
        }
    })
}

/// Render targets as a bracketed, quoted list: `['--flag', 'ENV']`
fn format_targets(targets: &[&str]) -> String {
    let quoted: Vec<String> = targets.iter().map(|t| format!("'{}'", t)).collect();
    format!("[{}]", quoted.join(", "))
}

fn display_value(value: Option<&str>) -> &str {
    value.unwrap_or("(none)")
}
