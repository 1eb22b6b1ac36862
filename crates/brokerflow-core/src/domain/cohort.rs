use std::fmt::{Display, Formatter};

use serde::Serialize;

/// One of the two broker groups flow is split into.
///
/// `Whale` is the institutional cohort named by [`crate::FlowConfig`]; every
/// other broker code falls into `Retail`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Cohort {
    Whale,
    Retail,
}

impl Cohort {
    pub const ALL: [Self; 2] = [Self::Whale, Self::Retail];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Whale => "whale",
            Self::Retail => "retail",
        }
    }
}

impl Display for Cohort {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value tracked once per cohort.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CohortPair<T> {
    pub whale: T,
    pub retail: T,
}

impl<T> CohortPair<T> {
    pub fn new(whale: T, retail: T) -> Self {
        Self { whale, retail }
    }

    pub fn get(&self, cohort: Cohort) -> &T {
        match cohort {
            Cohort::Whale => &self.whale,
            Cohort::Retail => &self.retail,
        }
    }

    pub fn get_mut(&mut self, cohort: Cohort) -> &mut T {
        match cohort {
            Cohort::Whale => &mut self.whale,
            Cohort::Retail => &mut self.retail,
        }
    }

    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> CohortPair<U> {
        CohortPair {
            whale: f(&self.whale),
            retail: f(&self.retail),
        }
    }
}
