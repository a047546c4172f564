//! Slot specifications and their expansion into concrete indices.

use regex::Regex;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::OnceLock;

use crate::requirement::parse_numeric;

fn range_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+)\s*-\s*(\d+)$").expect("slot range regex must compile"))
}

/// Where an item entry goes: an index, a `"0-8,12"` style string, or a list of either.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotSpec {
    Index(i64),
    Text(String),
    List(Vec<SlotSpec>),
}

impl SlotSpec {
    /// Read a slot spec from decoded configuration. Other JSON types yield `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
                .map(SlotSpec::Index),
            Value::String(s) => Some(SlotSpec::Text(s.clone())),
            Value::Array(items) => Some(SlotSpec::List(
                items.iter().filter_map(SlotSpec::from_value).collect(),
            )),
            _ => None,
        }
    }

    /// Expand into ascending, deduplicated indices in `0..size`.
    ///
    /// Ranges may be descending (`"8-2"`). Tokens that are not numbers or
    /// fall outside the menu are dropped silently.
    pub fn expand(&self, size: usize) -> Vec<usize> {
        let mut out = BTreeSet::new();
        self.collect_into(size, &mut out);
        out.into_iter().collect()
    }

    fn collect_into(&self, size: usize, out: &mut BTreeSet<usize>) {
        let mut add = |n: i64| {
            if n >= 0 && (n as u64) < size as u64 {
                out.insert(n as usize);
            }
        };
        match self {
            SlotSpec::Index(n) => add(*n),
            SlotSpec::Text(text) => {
                for part in text.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                    if let Some(caps) = range_pattern().captures(part) {
                        let bound = |i: usize| {
                            caps.get(i)
                                .and_then(|m| m.as_str().parse::<i64>().ok())
                        };
                        if let (Some(a), Some(b)) = (bound(1), bound(2)) {
                            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
                            // Clip before iterating so "0-99999999" stays cheap.
                            let hi = hi.min(size as i64);
                            for n in lo..=hi {
                                add(n);
                            }
                        }
                    } else if let Some(n) = parse_numeric(part) {
                        add(n.trunc() as i64);
                    }
                }
            }
            SlotSpec::List(items) => {
                for item in items {
                    item.collect_into(size, out);
                }
            }
        }
    }

    /// True when the spec names at least one slot inside `size`.
    pub fn is_usable(&self, size: usize) -> bool {
        !self.expand(size).is_empty()
    }
}

impl From<usize> for SlotSpec {
    fn from(n: usize) -> Self {
        SlotSpec::Index(n as i64)
    }
}

impl From<&str> for SlotSpec {
    fn from(s: &str) -> Self {
        SlotSpec::Text(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expands_ranges_lists_and_indices() {
        let spec = SlotSpec::from("0-2, 5,7-6");
        assert_eq!(spec.expand(9), vec![0, 1, 2, 5, 6, 7]);
        let nested = SlotSpec::from_value(&json!([1, "3-4", [8, "8"]])).unwrap();
        assert_eq!(nested.expand(9), vec![1, 3, 4, 8]);
    }

    #[test]
    fn drops_out_of_range_and_garbage() {
        let spec = SlotSpec::from("-1, 3, 9, abc, 4-12");
        assert_eq!(spec.expand(9), vec![3, 4, 5, 6, 7, 8]);
        assert!(SlotSpec::Index(54).expand(54).is_empty());
        assert!(!SlotSpec::from("x").is_usable(9));
    }

    #[test]
    fn huge_range_is_clipped() {
        let spec = SlotSpec::from("0-4000000000");
        assert_eq!(spec.expand(18).len(), 18);
    }

    #[test]
    fn every_expanded_slot_is_in_bounds() {
        let specs = ["0-100", "53,54,55", "10-0", "7", " , ,", "2 - 5"];
        for size in [9usize, 27, 54] {
            for s in specs {
                for slot in SlotSpec::from(s).expand(size) {
                    assert!(slot < size, "{} escaped {} for {}", slot, size, s);
                }
            }
        }
    }

    #[test]
    fn non_slot_values_are_rejected() {
        assert!(SlotSpec::from_value(&json!({"a": 1})).is_none());
        assert!(SlotSpec::from_value(&json!(true)).is_none());
    }
}
