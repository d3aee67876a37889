//! Per-unit results for fan-out operations
//!
//! Generate runs one container per library, tag-and-release handles one
//! library per PR block, and automation triggers one build per repository.
//! Each of those produces an [`Outcomes`] list so callers can inspect exactly
//! which units succeeded instead of parsing a combined error string.

use crate::core::error::{LibrarianError, LibrarianResult, PartialFailure};

/// The result of one independent unit of work
#[derive(Debug)]
pub struct UnitOutcome<T> {
  /// Library ID or repository name
  pub unit: String,
  pub result: LibrarianResult<T>,
}

impl<T> UnitOutcome<T> {
  pub fn new(unit: impl Into<String>, result: LibrarianResult<T>) -> Self {
    Self {
      unit: unit.into(),
      result,
    }
  }

  pub fn is_ok(&self) -> bool {
    self.result.is_ok()
  }
}

/// Ordered list of unit outcomes for one operation
#[derive(Debug)]
pub struct Outcomes<T> {
  operation: String,
  units: Vec<UnitOutcome<T>>,
}

impl<T> Outcomes<T> {
  pub fn new(operation: impl Into<String>) -> Self {
    Self {
      operation: operation.into(),
      units: Vec::new(),
    }
  }

  pub fn push(&mut self, unit: impl Into<String>, result: LibrarianResult<T>) {
    self.units.push(UnitOutcome::new(unit, result));
  }

  pub fn len(&self) -> usize {
    self.units.len()
  }

  pub fn is_empty(&self) -> bool {
    self.units.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &UnitOutcome<T>> {
    self.units.iter()
  }

  pub fn has_failures(&self) -> bool {
    self.units.iter().any(|u| u.result.is_err())
  }

  /// True when at least one unit ran and none succeeded
  pub fn all_failed(&self) -> bool {
    !self.units.is_empty() && self.units.iter().all(|u| u.result.is_err())
  }

  /// Look up a unit by name
  pub fn get(&self, unit: &str) -> Option<&UnitOutcome<T>> {
    self.units.iter().find(|u| u.unit == unit)
  }

  /// Separate successful values from failures. The error, when present, is a
  /// [`PartialFailure`] holding every failure in unit order.
  pub fn split(self) -> (Vec<(String, T)>, Option<LibrarianError>) {
    let attempted = self.units.len();
    let mut successes = Vec::new();
    let mut failures = Vec::new();
    for unit in self.units {
      match unit.result {
        Ok(value) => successes.push((unit.unit, value)),
        Err(err) => failures.push((unit.unit, err)),
      }
    }

    let error = (!failures.is_empty()).then(|| {
      LibrarianError::PartialFailure(PartialFailure {
        operation: self.operation,
        attempted,
        failures,
      })
    });
    (successes, error)
  }

  /// Collapse into a single result: `Ok` with successful values when nothing
  /// failed, otherwise the [`PartialFailure`].
  pub fn into_result(self) -> LibrarianResult<Vec<(String, T)>> {
    match self.split() {
      (successes, None) => Ok(successes),
      (_, Some(err)) => Err(err),
    }
  }
}

impl<T> IntoIterator for Outcomes<T> {
  type Item = UnitOutcome<T>;
  type IntoIter = std::vec::IntoIter<UnitOutcome<T>>;

  fn into_iter(self) -> Self::IntoIter {
    self.units.into_iter()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_into_result_keeps_failure_order() {
    let mut outcomes: Outcomes<u32> = Outcomes::new("generate");
    outcomes.push("a", Ok(1));
    outcomes.push("b", Err(LibrarianError::message("b failed")));
    outcomes.push("c", Err(LibrarianError::message("c failed")));

    assert!(outcomes.has_failures());
    assert!(!outcomes.all_failed());
    assert_eq!(outcomes.len(), 3);

    match outcomes.into_result() {
      Err(LibrarianError::PartialFailure(p)) => {
        assert_eq!(p.attempted, 3);
        assert_eq!(p.failed_units(), vec!["b", "c"]);
      }
      other => panic!("expected partial failure, got {:?}", other),
    }
  }

  #[test]
  fn test_empty_outcomes_are_not_all_failed() {
    let outcomes: Outcomes<()> = Outcomes::new("automation");
    assert!(!outcomes.all_failed());
    assert!(outcomes.into_result().unwrap().is_empty());
  }
}
