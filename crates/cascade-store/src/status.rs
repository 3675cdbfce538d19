//! Result types for `status` and `verify`.

use std::path::PathBuf;

use cascade_types::ObjectId;

/// How a spec's generated output compares with its last recorded generation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpecStatus {
    pub spec_path: PathBuf,
    /// Output location used for the comparison, if one could be determined.
    pub output_path: Option<PathBuf>,
    /// Output hash from the latest log entry for this spec.
    pub last_hash: Option<ObjectId>,
    /// Hash of the output file as it is on disk now.
    pub current_hash: Option<ObjectId>,
    pub current_output_exists: bool,
    /// The two hashes differ. A missing side counts as different unless both
    /// are missing.
    pub has_changes: bool,
}

impl SpecStatus {
    /// Never generated.
    pub fn is_untracked(&self) -> bool {
        self.last_hash.is_none()
    }
}

/// A log entry field pointing at an object the store does not hold.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DanglingRef {
    /// Position of the entry in the log.
    pub position: u64,
    pub field: &'static str,
    pub id: ObjectId,
}

/// Outcome of an integrity check over the whole store.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VerifyReport {
    pub entries: usize,
    pub objects: usize,
    pub dangling: Vec<DanglingRef>,
    /// Objects whose bytes no longer hash to their address.
    pub corrupt: Vec<ObjectId>,
}

impl VerifyReport {
    pub fn is_ok(&self) -> bool {
        self.dangling.is_empty() && self.corrupt.is_empty()
    }
}
