//! Branch selection policies for nodes with more than one child.
//!
//! Exports keep every edited or regenerated attempt as a sibling branch.
//! The walker asks a [`BranchPolicy`] which sibling continues the
//! canonical path; the rest are discarded.

use chrono::{DateTime, Utc};

use crate::error::ConfigError;

/// One sibling subtree offered to a branch policy.
#[derive(Debug, Clone)]
pub struct BranchCandidate<'a> {
    /// Id of the child node heading this subtree.
    pub node_id: &'a str,
    /// Position in the parent's declared child order.
    pub position: usize,
    /// Latest message timestamp anywhere in the subtree.
    pub latest: Option<DateTime<Utc>>,
    /// Number of nodes on the longest path down from the child (inclusive).
    pub height: usize,
}

/// Picks the sibling that continues the canonical path.
pub trait BranchPolicy: Send + Sync {
    fn name(&self) -> &str;

    /// Return an index into `candidates` (never empty).
    fn select(&self, candidates: &[BranchCandidate<'_>]) -> usize;
}

/// How [`LatestBranchPolicy`] resolves equal latest timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TieBreak {
    /// Earliest declared child wins.
    #[default]
    FirstDeclared,
    /// Latest declared child wins.
    LastDeclared,
    /// Tallest subtree wins, then earliest declared.
    Deepest,
}

impl std::str::FromStr for TieBreak {
    type Err = ConfigError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first" => Ok(Self::FirstDeclared),
            "last" => Ok(Self::LastDeclared),
            "deepest" => Ok(Self::Deepest),
            _ => Err(ConfigError::UnknownPolicy {
                kind: "tie-break",
                name: s.to_string(),
            }),
        }
    }
}

/// Follow the subtree holding the most recent message.
///
/// Subtrees with no timestamps at all rank below any timestamped subtree.
#[derive(Debug, Clone, Copy, Default)]
pub struct LatestBranchPolicy {
    pub tie_break: TieBreak,
}

impl LatestBranchPolicy {
    pub fn new(tie_break: TieBreak) -> Self {
        Self { tie_break }
    }
}

impl BranchPolicy for LatestBranchPolicy {
    fn name(&self) -> &str {
        "latest"
    }

    fn select(&self, candidates: &[BranchCandidate<'_>]) -> usize {
        let Some(latest) = candidates.iter().map(|c| c.latest).max() else {
            return 0;
        };
        let tied = candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| c.latest == latest);

        match self.tie_break {
            TieBreak::FirstDeclared => tied.map(|(i, _)| i).next().unwrap_or(0),
            TieBreak::LastDeclared => tied.map(|(i, _)| i).last().unwrap_or(0),
            TieBreak::Deepest => tied
                .fold(None::<(usize, usize)>, |best, (i, c)| match best {
                    Some((_, h)) if h >= c.height => best,
                    _ => Some((i, c.height)),
                })
                .map(|(i, _)| i)
                .unwrap_or(0),
        }
    }
}

/// Always follow the last declared child, ignoring timestamps.
#[derive(Debug, Clone, Copy, Default)]
pub struct LastChildPolicy;

impl BranchPolicy for LastChildPolicy {
    fn name(&self) -> &str {
        "last-child"
    }

    fn select(&self, candidates: &[BranchCandidate<'_>]) -> usize {
        candidates.len().saturating_sub(1)
    }
}

/// Resolve a branch policy by its configured name.
pub fn policy_from_name(
    name: &str,
    tie_break: TieBreak,
) -> Result<Box<dyn BranchPolicy>, ConfigError> {
    match name {
        "latest" => Ok(Box::new(LatestBranchPolicy::new(tie_break))),
        "last-child" => Ok(Box::new(LastChildPolicy)),
        _ => Err(ConfigError::UnknownPolicy {
            kind: "branch",
            name: name.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn candidate(position: usize, secs: Option<i64>, height: usize) -> BranchCandidate<'static> {
        BranchCandidate {
            node_id: "n",
            position,
            latest: secs.map(|s| Utc.timestamp_opt(s, 0).unwrap()),
            height,
        }
    }

    #[test]
    fn latest_timestamp_wins() {
        let cands = [candidate(0, Some(10), 1), candidate(1, Some(20), 1), candidate(2, Some(5), 9)];
        assert_eq!(LatestBranchPolicy::default().select(&cands), 1);
    }

    #[test]
    fn timestamped_beats_untimestamped() {
        let cands = [candidate(0, None, 5), candidate(1, Some(1), 1)];
        assert_eq!(LatestBranchPolicy::default().select(&cands), 1);
    }

    #[test]
    fn tie_breaks() {
        let cands = [candidate(0, Some(10), 1), candidate(1, Some(10), 3), candidate(2, Some(10), 2)];
        assert_eq!(LatestBranchPolicy::new(TieBreak::FirstDeclared).select(&cands), 0);
        assert_eq!(LatestBranchPolicy::new(TieBreak::LastDeclared).select(&cands), 2);
        assert_eq!(LatestBranchPolicy::new(TieBreak::Deepest).select(&cands), 1);
    }

    #[test]
    fn last_child_ignores_time() {
        let cands = [candidate(0, Some(99), 1), candidate(1, Some(1), 1)];
        assert_eq!(LastChildPolicy.select(&cands), 1);
    }

    #[test]
    fn resolves_names() {
        assert_eq!(policy_from_name("latest", TieBreak::default()).unwrap().name(), "latest");
        assert_eq!(
            policy_from_name("last-child", TieBreak::default()).unwrap().name(),
            "last-child"
        );
        assert!(matches!(
            policy_from_name("random", TieBreak::default()),
            Err(ConfigError::UnknownPolicy { kind: "branch", .. })
        ));
        assert!("sideways".parse::<TieBreak>().is_err());
        assert_eq!("deepest".parse::<TieBreak>().unwrap(), TieBreak::Deepest);
    }
}
