//! Small fixture models used by tests, benchmarks and the fixture binary.

pub mod discounted_cycle;
pub mod slippery_corridor;
pub mod terminal_reward;
pub mod tiger;

use std::fmt;
use std::str::FromStr;

use horizon_kernel::error::KernelError;
use horizon_kernel::pomdp::TabularPomdp;

/// Fixture models addressable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum World {
    TerminalReward,
    DiscountedCycle,
    SlipperyCorridor,
    Tiger,
}

impl World {
    pub const ALL: [Self; 4] = [
        Self::TerminalReward,
        Self::DiscountedCycle,
        Self::SlipperyCorridor,
        Self::Tiger,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TerminalReward => "terminal_reward",
            Self::DiscountedCycle => "discounted_cycle",
            Self::SlipperyCorridor => "slippery_corridor",
            Self::Tiger => "tiger",
        }
    }

    /// Build the model.
    ///
    /// # Errors
    ///
    /// Propagated from the model builder.
    pub fn model(self) -> Result<TabularPomdp, KernelError> {
        match self {
            Self::TerminalReward => terminal_reward::model(),
            Self::DiscountedCycle => discounted_cycle::model(),
            Self::SlipperyCorridor => slippery_corridor::model(),
            Self::Tiger => tiger::model(),
        }
    }
}

impl fmt::Display for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for World {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|w| w.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}
