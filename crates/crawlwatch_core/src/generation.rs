use std::fmt;

/// Ownership token for one live connection instance or one armed poll.
///
/// Every callback carries the token it was issued with; a callback whose token
/// no longer matches its owner is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(u64);

impl Generation {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// Issues strictly increasing generations. Never reuses a value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GenerationCounter {
    last: u64,
}

impl GenerationCounter {
    pub fn issue(&mut self) -> Generation {
        self.last += 1;
        Generation(self.last)
    }
}
