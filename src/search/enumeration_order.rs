//! Traversal orders over an ordered candidate list.
//!
//! Each order is a pure `index -> next index` step function, so iteration is a
//! small state machine over a borrowed slice and never reorders the slice.
//! Every order yields each index in `0..len` exactly once.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EnumerationOrder {
    /// 0, 1, 2, ...
    #[default]
    Default,
    /// Even indices, then odd indices.
    Skip,
    /// Odd indices, then even indices.
    SkipOffset,
}

impl EnumerationOrder {
    pub fn first_index(self, len: usize) -> Option<usize> {
        match (self, len) {
            (_, 0) => None,
            (EnumerationOrder::SkipOffset, n) if n > 1 => Some(1),
            _ => Some(0),
        }
    }

    pub fn next_index(self, current: usize, len: usize) -> Option<usize> {
        match self {
            EnumerationOrder::Default => Some(current + 1).filter(|&i| i < len),
            EnumerationOrder::Skip => Self::alternating_next(current, len, 0),
            EnumerationOrder::SkipOffset => Self::alternating_next(current, len, 1),
        }
    }

    /// Step through the run of `start_parity` indices, then the other run.
    fn alternating_next(current: usize, len: usize, start_parity: usize) -> Option<usize> {
        let stepped = current + 2;
        if stepped < len {
            return Some(stepped);
        }
        let second_run_start = 1 - start_parity;
        if current % 2 == start_parity && second_run_start < len {
            Some(second_run_start)
        } else {
            None
        }
    }

    pub fn indices(self, len: usize) -> OrderedIndices {
        OrderedIndices {
            order: self,
            len,
            next: self.first_index(len),
        }
    }

    pub fn enumerate<T>(self, items: &[T]) -> OrderedIter<'_, T> {
        OrderedIter {
            items,
            indices: self.indices(items.len()),
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            EnumerationOrder::Default => "Default",
            EnumerationOrder::Skip => "Skip",
            EnumerationOrder::SkipOffset => "SkipOffset",
        }
    }
}

impl fmt::Display for EnumerationOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EnumerationOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(EnumerationOrder::Default),
            "skip" => Ok(EnumerationOrder::Skip),
            "skipoffset" | "skip_offset" => Ok(EnumerationOrder::SkipOffset),
            _ => Err(format!("unknown enumeration order '{s}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrderedIndices {
    order: EnumerationOrder,
    len: usize,
    next: Option<usize>,
}

impl Iterator for OrderedIndices {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let current = self.next?;
        self.next = self.order.next_index(current, self.len);
        Some(current)
    }
}

#[derive(Debug, Clone)]
pub struct OrderedIter<'a, T> {
    items: &'a [T],
    indices: OrderedIndices,
}

impl<'a, T> Iterator for OrderedIter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        self.indices.next().map(|i| &self.items[i])
    }
}
