//! SnapshotId - totally ordered snapshot identity.
//!
//! A PURE TYPE with no behavior beyond construction, access, and
//! directory-name (de)serialization. Modeled on the `CommitId` newtype:
//! explicit constructor only, no `Default`, ordering derived directly
//! from the underlying fields rather than from any string form.

use std::fmt;

/// Identifies a snapshot by the Raft log position it was taken at.
///
/// Ordered by `(index, term, processed_position)`, left to right. A
/// strictly greater `index` always outranks any `term`/`processed_position`
/// difference; ties on `index` fall through to `term`, then to
/// `processed_position`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SnapshotId {
    index: u64,
    term: u64,
    processed_position: u64,
}

impl SnapshotId {
    /// Construct a `SnapshotId` from its three ordering components.
    ///
    /// This is the only way to build one; there is no `Default`, to
    /// prevent an accidental all-zero id from being mistaken for a real
    /// snapshot.
    #[inline]
    pub fn new(index: u64, term: u64, processed_position: u64) -> Self {
        Self {
            index,
            term,
            processed_position,
        }
    }

    /// The Raft log index this snapshot covers up to (inclusive).
    #[inline]
    pub fn index(&self) -> u64 {
        self.index
    }

    /// The Raft term in effect when the snapshot was taken.
    #[inline]
    pub fn term(&self) -> u64 {
        self.term
    }

    /// The exporter/processed position folded into the snapshot.
    #[inline]
    pub fn processed_position(&self) -> u64 {
        self.processed_position
    }

    /// The on-disk directory name for this id: zero-padded decimal
    /// fields so that lexicographic (directory listing) order matches
    /// numeric order.
    pub fn to_dir_name(&self) -> String {
        format!("{:020}-{:020}-{:020}", self.index, self.term, self.processed_position)
    }

    /// Parse a directory name produced by `to_dir_name`. Equivalent to
    /// `parse` - zero-padding does not change what `u64::from_str`
    /// accepts - kept as a separate name so call sites reading directory
    /// listings read naturally.
    pub fn from_dir_name(name: &str) -> Option<Self> {
        name.parse().ok()
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.index, self.term, self.processed_position)
    }
}

impl std::str::FromStr for SnapshotId {
    type Err = ();

    /// Parses either the padded directory-name form or the unpadded
    /// `Display` form - both are `index-term-processed_position` joined
    /// by `-`, and `u64::from_str` accepts leading zeros either way.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('-');
        let index = parts.next().ok_or(())?.parse().map_err(|_| ())?;
        let term = parts.next().ok_or(())?.parse().map_err(|_| ())?;
        let processed_position = parts.next().ok_or(())?.parse().map_err(|_| ())?;
        if parts.next().is_some() {
            return Err(());
        }
        Ok(Self::new(index, term, processed_position))
    }
}
