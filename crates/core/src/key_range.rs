//! Key ranges for index scans and range dependencies.

use core::cmp::Ordering;
use core::ops::Bound;

/// A key range over an ordered key space.
#[derive(Clone, Debug, PartialEq)]
pub enum KeyRange<K> {
    /// All keys
    All,
    /// A single key (equality)
    Only(K),
    /// Keys >= lower bound
    LowerBound { value: K, exclusive: bool },
    /// Keys <= upper bound
    UpperBound { value: K, exclusive: bool },
    /// Keys between lower and upper bounds
    Bound {
        lower: K,
        upper: K,
        lower_exclusive: bool,
        upper_exclusive: bool,
    },
}

impl<K: Clone + Ord> KeyRange<K> {
    /// Creates a range for all keys.
    pub fn all() -> Self {
        KeyRange::All
    }

    /// Creates a range for a single key.
    pub fn only(key: K) -> Self {
        KeyRange::Only(key)
    }

    /// Creates a range with a lower bound.
    pub fn lower_bound(value: K, exclusive: bool) -> Self {
        KeyRange::LowerBound { value, exclusive }
    }

    /// Creates a range with an upper bound.
    pub fn upper_bound(value: K, exclusive: bool) -> Self {
        KeyRange::UpperBound { value, exclusive }
    }

    /// Creates a range with both bounds.
    pub fn bound(lower: K, upper: K, lower_exclusive: bool, upper_exclusive: bool) -> Self {
        KeyRange::Bound {
            lower,
            upper,
            lower_exclusive,
            upper_exclusive,
        }
    }

    /// Returns true if this range represents all values (unbounded).
    pub fn is_all(&self) -> bool {
        matches!(self, KeyRange::All)
    }

    /// Returns true if no key can satisfy this range.
    pub fn is_empty(&self) -> bool {
        match self {
            KeyRange::Bound {
                lower,
                upper,
                lower_exclusive,
                upper_exclusive,
            } => match lower.cmp(upper) {
                Ordering::Greater => true,
                Ordering::Equal => *lower_exclusive || *upper_exclusive,
                Ordering::Less => false,
            },
            _ => false,
        }
    }

    /// Checks if a key is within this range.
    pub fn contains(&self, key: &K) -> bool {
        match self {
            KeyRange::All => true,
            KeyRange::Only(k) => key.cmp(k) == Ordering::Equal,
            KeyRange::LowerBound { value, exclusive } => {
                if *exclusive {
                    key > value
                } else {
                    key >= value
                }
            }
            KeyRange::UpperBound { value, exclusive } => {
                if *exclusive {
                    key < value
                } else {
                    key <= value
                }
            }
            KeyRange::Bound {
                lower,
                upper,
                lower_exclusive,
                upper_exclusive,
            } => {
                let lower_ok = if *lower_exclusive {
                    key > lower
                } else {
                    key >= lower
                };
                let upper_ok = if *upper_exclusive {
                    key < upper
                } else {
                    key <= upper
                };
                lower_ok && upper_ok
            }
        }
    }

    /// Returns the range as a pair of `core::ops::Bound`s, suitable for
    /// `BTreeMap::range`. Callers must check `is_empty` first.
    pub fn as_bounds(&self) -> (Bound<&K>, Bound<&K>) {
        fn edge<K>(value: &K, exclusive: bool) -> Bound<&K> {
            if exclusive {
                Bound::Excluded(value)
            } else {
                Bound::Included(value)
            }
        }

        match self {
            KeyRange::All => (Bound::Unbounded, Bound::Unbounded),
            KeyRange::Only(k) => (Bound::Included(k), Bound::Included(k)),
            KeyRange::LowerBound { value, exclusive } => (edge(value, *exclusive), Bound::Unbounded),
            KeyRange::UpperBound { value, exclusive } => (Bound::Unbounded, edge(value, *exclusive)),
            KeyRange::Bound {
                lower,
                upper,
                lower_exclusive,
                upper_exclusive,
            } => (edge(lower, *lower_exclusive), edge(upper, *upper_exclusive)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;

    #[test]
    fn test_key_range_all() {
        let range: KeyRange<i64> = KeyRange::all();
        assert!(range.is_all());
        assert!(range.contains(&0));
        assert!(range.contains(&i64::MAX));
    }

    #[test]
    fn test_key_range_only() {
        let range = KeyRange::only(5);
        assert!(range.contains(&5));
        assert!(!range.contains(&4));
    }

    #[test]
    fn test_key_range_lower_bound() {
        let inclusive = KeyRange::lower_bound(5, false);
        assert!(inclusive.contains(&5));
        assert!(inclusive.contains(&6));
        assert!(!inclusive.contains(&4));

        let exclusive = KeyRange::lower_bound(5, true);
        assert!(!exclusive.contains(&5));
        assert!(exclusive.contains(&6));
    }

    #[test]
    fn test_key_range_upper_bound() {
        let inclusive = KeyRange::upper_bound(5, false);
        assert!(inclusive.contains(&5));
        assert!(!inclusive.contains(&6));

        let exclusive = KeyRange::upper_bound(5, true);
        assert!(!exclusive.contains(&5));
        assert!(exclusive.contains(&4));
    }

    #[test]
    fn test_key_range_bound() {
        let range = KeyRange::bound(1, 10, false, true);
        assert!(range.contains(&1));
        assert!(range.contains(&9));
        assert!(!range.contains(&10));
        assert!(!range.contains(&0));
    }

    #[test]
    fn test_key_range_contains_string() {
        let range = KeyRange::bound(Value::from("level_A/"), Value::from("level_B/"), false, true);
        assert!(range.contains(&Value::from("level_A/x")));
        assert!(!range.contains(&Value::from("level_B/")));
    }

    #[test]
    fn test_key_range_only_numeric_key() {
        let range = KeyRange::only(Value::Float64(1.0));
        assert!(range.contains(&Value::Int64(1)));
        assert!(!range.contains(&Value::Int64(2)));
        assert!(KeyRange::bound(Value::Int64(3), Value::Float64(3.0), false, true).is_empty());
        assert!(!KeyRange::bound(Value::Int64(3), Value::Float64(3.0), false, false).is_empty());
    }

    #[test]
    fn test_key_range_is_empty() {
        assert!(KeyRange::bound(5, 1, false, false).is_empty());
        assert!(KeyRange::bound(5, 5, true, false).is_empty());
        assert!(!KeyRange::bound(5, 5, false, false).is_empty());
        assert!(!KeyRange::<i64>::all().is_empty());
    }

    #[test]
    fn test_key_range_as_bounds() {
        let range = KeyRange::bound(1, 10, true, false);
        assert_eq!(range.as_bounds(), (Bound::Excluded(&1), Bound::Included(&10)));
        let all: KeyRange<i64> = KeyRange::all();
        assert_eq!(all.as_bounds(), (Bound::Unbounded, Bound::Unbounded));
    }
}
