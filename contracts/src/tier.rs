use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Shape a check contract template is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tier {
    pub max_inputs: usize,
    pub max_outputs: usize,
}

impl Tier {
    pub const fn new(max_inputs: usize, max_outputs: usize) -> Self {
        Self { max_inputs, max_outputs }
    }

    pub fn covers(&self, inputs: usize, outputs: usize) -> bool {
        inputs <= self.max_inputs && outputs <= self.max_outputs
    }

    fn capacity(&self) -> usize {
        self.max_inputs * self.max_outputs
    }
}

impl Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.max_inputs, self.max_outputs)
    }
}

/// Every shape the check contracts are compiled for.
pub const TIERS: [Tier; 5] = [Tier::new(2, 5), Tier::new(4, 8), Tier::new(8, 12), Tier::new(20, 5), Tier::new(3, 100)];

/// Largest number of token inputs any tier accepts.
pub const MAX_TOKEN_INPUTS: usize = 20;

/// Returns the smallest tier covering `inputs` token inputs and `outputs`
/// token outputs, or `None` when no tier does.
pub fn select_tier(inputs: usize, outputs: usize) -> Option<Tier> {
    TIERS.iter().filter(|tier| tier.covers(inputs, outputs)).min_by_key(|tier| tier.capacity()).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_tier() {
        struct Test {
            inputs: usize,
            outputs: usize,
            expected: Option<Tier>,
        }

        let tests = vec![
            Test { inputs: 1, outputs: 1, expected: Some(Tier::new(2, 5)) },
            Test { inputs: 2, outputs: 3, expected: Some(Tier::new(2, 5)) },
            Test { inputs: 3, outputs: 6, expected: Some(Tier::new(4, 8)) },
            Test { inputs: 5, outputs: 3, expected: Some(Tier::new(8, 12)) },
            Test { inputs: 9, outputs: 1, expected: Some(Tier::new(20, 5)) },
            Test { inputs: 20, outputs: 0, expected: Some(Tier::new(20, 5)) },
            Test { inputs: 3, outputs: 50, expected: Some(Tier::new(3, 100)) },
            Test { inputs: 4, outputs: 13, expected: None },
            Test { inputs: 25, outputs: 1, expected: None },
        ];

        for test in tests {
            assert_eq!(select_tier(test.inputs, test.outputs), test.expected, "({}, {})", test.inputs, test.outputs);
        }
        assert_eq!(TIERS.iter().map(|t| t.max_inputs).max(), Some(MAX_TOKEN_INPUTS));
    }
}
