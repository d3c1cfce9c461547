use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// A CVS dotted revision number, e.g. `1.2.3.4`.
///
/// Always even length (CVS never emits an odd-length revision) once it has
/// passed through [`Revision::parse`], which also collapses magic branch
/// numbers (`a.b.0.n` -> `a.b.n`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Revision(pub Vec<u32>);

impl Revision {
    /// Parses a dotted revision string such as `"1.2.3.4"`.
    pub fn parse(s: &str) -> Option<Self> {
        let parts: Option<Vec<u32>> = s.split('.').map(|p| p.parse().ok()).collect();
        parts.map(Revision)
    }

    /// Collapses a magic branch number (`a.b.0.n`, even length > 3, with a
    /// zero in the penultimate position) to its normalized odd form
    /// (`a.b.n`). Revisions that aren't magic branch numbers pass through
    /// unchanged.
    pub fn collapse_magic_branch(&self) -> Revision {
        let n = self.0.len();
        if n > 3 && n % 2 == 0 && self.0[n - 2] == 0 {
            let mut collapsed = self.0[..n - 2].to_vec();
            collapsed.push(self.0[n - 1]);
            Revision(collapsed)
        } else {
            self.clone()
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `revision[:-1]`: the branch this revision lives on (as a prefix key).
    pub fn branch_prefix(&self) -> Revision {
        Revision(self.0[..self.0.len() - 1].to_vec())
    }

    /// `revision[:-2]`: the revision this one's branch sprouted from.
    pub fn branch_root(&self) -> Revision {
        let n = self.0.len();
        Revision(self.0[..n.saturating_sub(2)].to_vec())
    }

    /// True if `self` is a normal (non-vendor) branch number: even length
    /// >= 2 with a zero penultimate component.
    pub fn is_normal_branch_number(&self) -> bool {
        self.0.len() >= 2 && self.0[self.0.len() - 2] == 0 && self.0[self.0.len() - 1] % 2 == 0
    }

    pub fn is_vendor_branch_marker(&self) -> bool {
        self.0 == [1, 1, 1]
    }
}

impl Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(u32::to_string).collect();
        write!(f, "{}", parts.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dotted_revision() {
        assert_eq!(Revision::parse("1.2.3.4").unwrap().0, vec![1, 2, 3, 4]);
    }

    #[test]
    fn rejects_non_numeric() {
        assert!(Revision::parse("1.x.3").is_none());
    }

    #[test]
    fn collapses_magic_branch_number() {
        let rev = Revision(vec![1, 1, 0, 2]);
        assert_eq!(rev.collapse_magic_branch().0, vec![1, 1, 2]);
    }

    #[test]
    fn leaves_non_magic_unchanged() {
        let rev = Revision(vec![1, 2, 3, 4]);
        assert_eq!(rev.collapse_magic_branch().0, vec![1, 2, 3, 4]);
    }

    #[test]
    fn branch_prefix_and_root() {
        let rev = Revision(vec![1, 2, 3, 4]);
        assert_eq!(rev.branch_prefix().0, vec![1, 2, 3]);
        assert_eq!(rev.branch_root().0, vec![1, 2]);
    }

    #[test]
    fn display_formats_dotted() {
        assert_eq!(Revision(vec![1, 2, 3, 4]).to_string(), "1.2.3.4");
    }
}
