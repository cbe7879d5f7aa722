use serde::{Deserialize, Serialize};
use std::fmt;

/// Job progress as a percentage that never moves backwards
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Progress(u8);

impl Progress {
    pub const MAX: u8 = 100;

    /// Creates a progress value, clamped to 100
    pub fn new(value: u8) -> Self {
        Self(value.min(Self::MAX))
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    /// Moves progress forward to `to`
    ///
    /// Lower values are ignored. Returns true if the value changed.
    pub fn advance(&mut self, to: u8) -> bool {
        let to = to.min(Self::MAX);
        if to > self.0 {
            self.0 = to;
            true
        } else {
            false
        }
    }

    /// Linear position of step `index` out of `total` inside `[from, to]`
    ///
    /// Used to spread per-item work across a progress band. `index` is
    /// 1-based; a zero `total` yields `to`.
    pub fn interpolate(from: u8, to: u8, index: usize, total: usize) -> u8 {
        if total == 0 || to <= from {
            return to.min(Self::MAX);
        }
        let span = (to - from) as usize;
        let step = span * index.min(total) / total;
        (from as usize + step).min(Self::MAX as usize) as u8
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}
