//! Vote state machine shared by the server ledger and the client cache.
//!
//! A voter holds at most one vote per subject. Casting the direction that is
//! already active undoes it, casting the opposite direction flips it, and
//! casting from neutral records it. [`cast`] is the single place that rule
//! lives; the ledger applies the resulting [`LedgerChange`] to its rows while
//! the client only keeps the [`VoteTag`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("vote value must be 1 or -1, got {0}")]
pub struct InvalidVoteValue(pub i32);

/// A requested vote direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn value(self) -> i32 {
        match self {
            Direction::Up => 1,
            Direction::Down => -1,
        }
    }
}

impl From<Direction> for i32 {
    fn from(direction: Direction) -> Self {
        direction.value()
    }
}

impl TryFrom<i32> for Direction {
    type Error = InvalidVoteValue;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Direction::Up),
            -1 => Ok(Direction::Down),
            other => Err(InvalidVoteValue(other)),
        }
    }
}

/// The per-voter, per-subject state: what this voter currently has cast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum VoteTag {
    Down,
    #[default]
    Neutral,
    Up,
}

impl VoteTag {
    pub fn value(self) -> i32 {
        match self {
            VoteTag::Down => -1,
            VoteTag::Neutral => 0,
            VoteTag::Up => 1,
        }
    }

    pub fn direction(self) -> Option<Direction> {
        match self {
            VoteTag::Down => Some(Direction::Down),
            VoteTag::Neutral => None,
            VoteTag::Up => Some(Direction::Up),
        }
    }
}

impl From<Direction> for VoteTag {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Up => VoteTag::Up,
            Direction::Down => VoteTag::Down,
        }
    }
}

impl From<Option<Direction>> for VoteTag {
    fn from(direction: Option<Direction>) -> Self {
        direction.map(VoteTag::from).unwrap_or_default()
    }
}

impl From<VoteTag> for i32 {
    fn from(tag: VoteTag) -> Self {
        tag.value()
    }
}

impl TryFrom<i32> for VoteTag {
    type Error = InvalidVoteValue;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(VoteTag::Neutral),
            other => Direction::try_from(other).map(VoteTag::from),
        }
    }
}

/// What the ledger has to do to its stored row for one cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerChange {
    /// No row existed; store one with this direction.
    Insert(Direction),
    /// The row held this direction and the voter repeated it; delete the row.
    Remove(Direction),
    /// The row held `from`; overwrite it with `to`.
    Flip { from: Direction, to: Direction },
}

/// Outcome of casting one vote from a known starting tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub tag: VoteTag,
    pub delta: i32,
    pub change: LedgerChange,
}

/// Applies one click of `requested` to a voter whose current state is
/// `current`.
pub fn cast(current: VoteTag, requested: Direction) -> Transition {
    match current.direction() {
        None => Transition {
            tag: requested.into(),
            delta: requested.value(),
            change: LedgerChange::Insert(requested),
        },
        Some(existing) if existing == requested => Transition {
            tag: VoteTag::Neutral,
            delta: -existing.value(),
            change: LedgerChange::Remove(existing),
        },
        Some(existing) => Transition {
            tag: requested.into(),
            delta: requested.value() - existing.value(),
            change: LedgerChange::Flip {
                from: existing,
                to: requested,
            },
        },
    }
}
