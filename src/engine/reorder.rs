//! Reordering of named elements in ordered collections.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReorderError {
    #[error("Invalid position {requested}: must be between 0 and {}", len.saturating_sub(1))]
    OutOfRange { requested: i64, len: usize },

    #[error("'{name}' not found")]
    NotFound { name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    pub old_index: usize,
    pub new_index: usize,
    pub len: usize,
}

/// Move the element at `old_index` so it ends up at `new_index`.
///
/// The element is removed first and then inserted into the shortened sequence,
/// so `new_index` addresses the sequence after removal.
pub fn move_item<T>(
    seq: &mut Vec<T>,
    old_index: usize,
    new_index: i64,
) -> Result<MoveOutcome, ReorderError> {
    let len = seq.len();
    let target = checked_index(new_index, len)?;
    if old_index >= len {
        return Err(ReorderError::OutOfRange {
            requested: old_index as i64,
            len,
        });
    }
    let element = seq.remove(old_index);
    seq.insert(target, element);
    Ok(MoveOutcome {
        old_index,
        new_index: target,
        len,
    })
}

/// Move the element whose key equals `name` exactly.
///
/// Fails without touching `seq` when the name is absent or `new_index` is not
/// in `[0, len)`.
pub fn move_named<T, F>(
    seq: &mut Vec<T>,
    name: &str,
    new_index: i64,
    key: F,
) -> Result<MoveOutcome, ReorderError>
where
    F: Fn(&T) -> Option<&str>,
{
    checked_index(new_index, seq.len())?;
    let old_index = seq
        .iter()
        .position(|item| key(item) == Some(name))
        .ok_or_else(|| ReorderError::NotFound {
            name: name.to_string(),
        })?;
    move_item(seq, old_index, new_index)
}

fn checked_index(requested: i64, len: usize) -> Result<usize, ReorderError> {
    usize::try_from(requested)
        .ok()
        .filter(|index| *index < len)
        .ok_or(ReorderError::OutOfRange { requested, len })
}
