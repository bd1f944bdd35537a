use std::fmt::{Display, Formatter, Result as FmtResult};

use itertools::Itertools;

use crate::misc::char_support;


/// An inclusive range `a..=b` of code points or token types.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Interval {
    /// First element.
    pub a: i32,
    /// Last element, inclusive.
    pub b: i32,
}

impl Interval {
    /// Create the interval `a..=b`.
    pub fn new(a: i32, b: i32) -> Self {
        Self { a, b }
    }

    /// Number of elements in the interval.
    pub fn len(&self) -> usize {
        if self.b < self.a {
            0
        } else {
            (self.b as i64 - self.a as i64 + 1) as usize
        }
    }

    /// Whether the interval contains nothing.
    pub fn is_empty(&self) -> bool {
        self.b < self.a
    }
}

/// A set of integers stored as sorted, disjoint and non-adjacent intervals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct IntervalSet {
    intervals: Vec<Interval>,
}

impl IntervalSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the set `a..=b`.
    pub fn of(a: i32, b: i32) -> Self {
        let mut set = Self::new();
        set.add_range(a, b);
        set
    }

    /// Add a single element.
    pub fn add(&mut self, value: i32) {
        self.add_range(value, value);
    }

    /// Add all elements of `a..=b`. Empty ranges are ignored.
    pub fn add_range(&mut self, a: i32, b: i32) {
        if b < a {
            return;
        }

        let mut new = Interval::new(a, b);
        let mut merged = Vec::with_capacity(self.intervals.len() + 1);
        let mut inserted = false;

        for &iv in &self.intervals {
            if (iv.b as i64) + 1 < new.a as i64 {
                merged.push(iv);
            } else if (new.b as i64) + 1 < iv.a as i64 {
                if !inserted {
                    merged.push(new);
                    inserted = true;
                }
                merged.push(iv);
            } else {
                new = Interval::new(new.a.min(iv.a), new.b.max(iv.b));
            }
        }

        if !inserted {
            merged.push(new);
        }

        self.intervals = merged;
    }

    /// Add every element of `other`.
    pub fn add_set(&mut self, other: &IntervalSet) {
        for iv in &other.intervals {
            self.add_range(iv.a, iv.b);
        }
    }

    /// Whether `value` is in the set.
    pub fn contains(&self, value: i32) -> bool {
        self.intervals
            .binary_search_by(|iv| {
                if iv.b < value {
                    std::cmp::Ordering::Less
                } else if iv.a > value {
                    std::cmp::Ordering::Greater
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok()
    }

    /// Whether any element of `a..=b` is in the set.
    pub fn intersects_range(&self, a: i32, b: i32) -> bool {
        if b < a {
            return false;
        }

        self.intervals.iter().any(|iv| iv.a <= b && a <= iv.b)
    }

    /// Whether the set has no elements.
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Number of elements in the set.
    pub fn len(&self) -> usize {
        self.intervals.iter().map(Interval::len).sum()
    }

    /// The intervals of the set in ascending order.
    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    /// Everything in `vocabulary` that is not in this set.
    pub fn complement(&self, vocabulary: &IntervalSet) -> IntervalSet {
        let mut result = IntervalSet::new();

        for voc in &vocabulary.intervals {
            let mut start = voc.a as i64;

            for iv in &self.intervals {
                if (iv.b as i64) < start || iv.a > voc.b {
                    continue;
                }

                if (iv.a as i64) > start {
                    result.add_range(start as i32, iv.a - 1);
                }

                start = iv.b as i64 + 1;
            }

            if start <= voc.b as i64 {
                result.add_range(start as i32, voc.b);
            }
        }

        result
    }
}

impl IntervalSet {
    /// Render the set with every interval shown as escaped grammar char literals,
    /// e.g. `'a'..'f', 'é'`.
    pub fn to_escaped_string(&self) -> String {
        self.intervals
            .iter()
            .map(|iv| char_support::range_escaped_string(iv.a, iv.b))
            .join(", ")
    }
}

impl Display for IntervalSet {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        if self.intervals.len() > 1 {
            write!(f, "{{")?;
        }

        let parts = self.intervals.iter().map(|iv| {
            if iv.a == iv.b {
                format!("{}", iv.a)
            } else {
                format!("{}..{}", iv.a, iv.b)
            }
        });
        write!(f, "{}", parts.format(", "))?;

        if self.intervals.len() > 1 {
            write!(f, "}}")?;
        }

        Ok(())
    }
}
