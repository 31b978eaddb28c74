//! Source fragments
//!
//! What one compilation receives: code to add, each piece tagged with the
//! subtree it came from, and the subtrees whose earlier code is retired.

use delta_diff::SubtreeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Code belonging to one subtree (or to nobody, for runner generated code)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentUnit {
    pub owner: Option<SubtreeId>,
    pub code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFragment {
    /// Compiled in order
    pub units: Vec<FragmentUnit>,
    /// Subtrees whose statements and functions are deactivated first
    pub retired: Vec<SubtreeId>,
}

impl SourceFragment {
    /// Fragment made of unowned code
    #[must_use]
    pub fn from_code(code: impl Into<String>) -> Self {
        Self {
            units: vec![FragmentUnit {
                owner: None,
                code: code.into(),
            }],
            retired: Vec::new(),
        }
    }

    pub fn push(&mut self, owner: Option<SubtreeId>, code: impl Into<String>) {
        self.units.push(FragmentUnit {
            owner,
            code: code.into(),
        });
    }

    pub fn retire(&mut self, subtree: SubtreeId) {
        if !self.retired.contains(&subtree) {
            self.retired.push(subtree);
        }
    }

    /// Nothing to compile and nothing to retire
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.retired.is_empty() && self.units.iter().all(|unit| unit.code.trim().is_empty())
    }
}

impl fmt::Display for SourceFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for unit in &self.units {
            writeln!(f, "{}", unit.code)?;
        }
        Ok(())
    }
}
