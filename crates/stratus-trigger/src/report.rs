//! Parsing of the provider's execution report line.

use crate::result::ExecutionResult;

/// Fill provider-side timings from an execution log tail.
///
/// The log ends with a line of the form
/// `REPORT RequestId: ...\tDuration: 12.34 ms\tBilled Duration: 13 ms\t...`.
/// Fields that are absent or malformed are skipped. Returns whether a report
/// line was found.
pub fn parse_report(log: &str, result: &mut ExecutionResult) -> bool {
  let Some(line) = log.lines().rev().find(|line| line.starts_with("REPORT")) else {
    return false;
  };

  for field in line.split('\t') {
    let Some((key, value)) = field.split_once(':') else {
      continue;
    };
    let key = key.trim();
    let value = value.trim();

    match key {
      "Duration" => {
        if let Some(us) = millis_to_us(value) {
          result.provider_times.execution_us = Some(us);
        }
      }
      "Billed Duration" => {
        if let Some(us) = millis_to_us(value) {
          result
            .provider_times
            .extra
            .insert("billed_us".to_string(), us);
        }
      }
      "Init Duration" => {
        if let Some(us) = millis_to_us(value) {
          result.provider_times.initialization_us = Some(us);
          result.times.initialization_us = us;
        }
      }
      "Max Memory Used" => {
        if let Some(mb) = number(value, "MB") {
          result.stats.memory_used_mb = Some(mb);
        }
      }
      _ => {}
    }
  }

  true
}

fn number(value: &str, unit: &str) -> Option<f64> {
  value.strip_suffix(unit)?.trim().parse().ok()
}

fn millis_to_us(value: &str) -> Option<i64> {
  number(value, "ms").map(|ms| (ms * 1000.0).round() as i64)
}
