//! Upload lifecycle of an image layer.
//!
//! The state is not stored directly; it is derived from the `uploaded` and
//! `checksumed` flags on the image row:
//!
//! | state      | uploaded | checksumed |
//! |------------|----------|------------|
//! | `Created`  | false    | false      |
//! | `Uploaded` | true     | false      |
//! | `Verified` | true     | true       |
//!
//! `checksumed` without `uploaded` has no state and is rejected.

use std::fmt;

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum UploadState {
    Created,
    Uploaded,
    Verified,
}

impl UploadState {
    /// Derive the state from the persisted flags.
    pub fn from_flags(uploaded: bool, checksumed: bool) -> Result<Self, CoreError> {
        match (uploaded, checksumed) {
            (false, false) => Ok(Self::Created),
            (true, false) => Ok(Self::Uploaded),
            (true, true) => Ok(Self::Verified),
            (false, true) => Err(CoreError::Validation(
                "Image cannot be checksumed before it is uploaded".to_string(),
            )),
        }
    }

    /// The `(uploaded, checksumed)` flag pair for this state.
    pub fn flags(self) -> (bool, bool) {
        match self {
            Self::Created => (false, false),
            Self::Uploaded => (true, false),
            Self::Verified => (true, true),
        }
    }

    /// Whether moving from `self` to `next` is a legal lifecycle step.
    ///
    /// Staying in place is always allowed (metadata-only updates); otherwise
    /// only the single forward step is.
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Created, Self::Created)
                | (Self::Created, Self::Uploaded)
                | (Self::Uploaded, Self::Uploaded)
                | (Self::Uploaded, Self::Verified)
                | (Self::Verified, Self::Verified)
        )
    }

    /// Like [`can_transition_to`](Self::can_transition_to) but returns a
    /// validation error describing the rejected step.
    pub fn check_transition(self, next: Self) -> Result<(), CoreError> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(CoreError::Validation(format!(
                "Invalid image state transition: {self} -> {next}"
            )))
        }
    }
}

impl fmt::Display for UploadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Uploaded => "uploaded",
            Self::Verified => "verified",
        };
        f.write_str(name)
    }
}
