// src/core/joining.rs

use crate::core::value::Extras;
use std::fmt;

/// Joins the converted parameter strings of one switch into a single string.
pub trait Flattener: fmt::Debug + Send + Sync {
    fn flatten(&self, values: &[String], parameter: &str, extras: &Extras) -> String;
}

/// The default flattener: joins with `parameter` as the delimiter.
///
/// Known limitation: flattening followed by splitting on the same delimiter
/// only round-trips when no element itself contains the delimiter.
#[derive(Debug, Clone, Copy, Default)]
pub struct JoiningFlattener;

impl Flattener for JoiningFlattener {
    fn flatten(&self, values: &[String], parameter: &str, _extras: &Extras) -> String {
        values.join(parameter)
    }
}

/// Joins a switch name with its flattened parameter string.
pub trait Aggregator: fmt::Debug + Send + Sync {
    fn aggregate(&self, name: &str, value: &str, parameter: &str, extras: &Extras) -> String;
}

/// The default aggregator: joins the non-empty members of `{name, value}`
/// with `parameter` as the symbol between them. A bare command yields just
/// its name; a valueless switch never gets a dangling separator.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymbolAggregator;

impl Aggregator for SymbolAggregator {
    fn aggregate(&self, name: &str, value: &str, parameter: &str, _extras: &Extras) -> String {
        [name, value]
            .iter()
            .filter(|element| !element.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(parameter)
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::panic)]
mod tests {
    use super::*;

    fn to_values(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn test_flatten_joins_on_delimiter() {
        let extras = Extras::new();
        let flattened = JoiningFlattener.flatten(&to_values(&["a", "b", "c"]), ", ", &extras);
        assert_eq!(flattened, "a, b, c");
    }

    #[test]
    fn test_flatten_split_round_trip_without_delimiter_in_elements() {
        let extras = Extras::new();
        let values = to_values(&["a.jar", "b.jar"]);
        let flattened = JoiningFlattener.flatten(&values, ":", &extras);
        let split: Vec<String> = flattened.split(':').map(str::to_string).collect();
        assert_eq!(split, values);
    }

    #[test]
    fn test_flatten_split_round_trip_breaks_when_element_contains_delimiter() {
        // Documented limitation, not a bug: an element containing the
        // delimiter cannot be recovered by splitting.
        let extras = Extras::new();
        let values = to_values(&["a:b", "c"]);
        let flattened = JoiningFlattener.flatten(&values, ":", &extras);
        let split: Vec<String> = flattened.split(':').map(str::to_string).collect();
        assert_ne!(split, values);
    }

    #[test]
    fn test_aggregate_joins_name_and_value() {
        let extras = Extras::new();
        assert_eq!(SymbolAggregator.aggregate("-m", "\"x y\"", " ", &extras), "-m \"x y\"");
        assert_eq!(SymbolAggregator.aggregate("-D", "key=value", "", &extras), "-Dkey=value");
    }

    #[test]
    fn test_aggregate_drops_empty_value() {
        let extras = Extras::new();
        assert_eq!(SymbolAggregator.aggregate("commit", "", " ", &extras), "commit");
    }

    #[test]
    fn test_aggregate_drops_empty_name() {
        let extras = Extras::new();
        assert_eq!(SymbolAggregator.aggregate("", "mainClass", " ", &extras), "mainClass");
    }
}
