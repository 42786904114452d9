use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(v: u64) -> Self {
                Self(v)
            }
        }
    };
}

id_type!(
    /// A state a task can occupy.
    StatusId
);
id_type!(
    /// An actor class that transitions are granted to.
    RoleId
);
id_type!(ProjectId);
id_type!(
    /// The workflow-bearing tracker whose transitions are reconciled.
    TrackerId
);

// ---------------------------------------------------------------------------
// Transition
// ---------------------------------------------------------------------------

/// Permission for `role` to move a task on `tracker` from `from` to `to`.
///
/// Equality, hashing and ordering are field-wise over all four ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Transition {
    pub tracker: TrackerId,
    pub role: RoleId,
    pub from: StatusId,
    pub to: StatusId,
}

impl Transition {
    /// Returns `None` for self-transitions, which are never managed.
    pub fn new(tracker: TrackerId, role: RoleId, from: StatusId, to: StatusId) -> Option<Self> {
        if from == to {
            return None;
        }
        Some(Self {
            tracker,
            role,
            from,
            to,
        })
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tracker {} role {}: {} -> {}",
            self.tracker, self.role, self.from, self.to
        )
    }
}

// ---------------------------------------------------------------------------
// Project / Role
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub identifier: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    /// Built-in roles (anonymous, non-member) never receive transitions.
    #[serde(default)]
    pub builtin: bool,
}

// ---------------------------------------------------------------------------
// WriteOp
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteOp {
    Insert,
    Delete,
}

impl WriteOp {
    pub fn as_str(self) -> &'static str {
        match self {
            WriteOp::Insert => "insert",
            WriteOp::Delete => "delete",
        }
    }
}

impl fmt::Display for WriteOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
