use crate::error::TypeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A permission namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Properties,
    Methods,
    Actions,
    Tools,
    Resources,
    Prompts,
}

/// Which rule shape a category uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleShape {
    /// `patterns` / `operations` / `excluded_patterns`.
    PatternOperation,
    /// `allowed` / `denied`.
    AllowDeny,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Properties,
        Category::Methods,
        Category::Actions,
        Category::Tools,
        Category::Resources,
        Category::Prompts,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Properties => "properties",
            Category::Methods => "methods",
            Category::Actions => "actions",
            Category::Tools => "tools",
            Category::Resources => "resources",
            Category::Prompts => "prompts",
        }
    }

    pub fn shape(&self) -> RuleShape {
        match self {
            Category::Properties | Category::Resources => RuleShape::PatternOperation,
            Category::Methods | Category::Actions | Category::Tools | Category::Prompts => {
                RuleShape::AllowDeny
            }
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| TypeError::UnknownCategory(s.to_string()))
    }
}
