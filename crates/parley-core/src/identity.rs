//! Local display name selection.

use crate::{env::Environment, error::SessionError};

/// Guest names are `Guest-<n>` with `n` in `0..GUEST_SUFFIX_RANGE`.
pub const GUEST_SUFFIX_RANGE: u64 = 10_000;

/// Trim a user-chosen display name.
///
/// # Errors
///
/// - [`SessionError::InvalidIdentity`] if nothing is left after trimming
pub fn normalize_identity(name: &str) -> Result<String, SessionError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(SessionError::InvalidIdentity);
    }
    Ok(trimmed.to_owned())
}

/// Generate a guest display name from the environment's RNG.
///
/// Guest names are not checked for collisions with names already in the room.
pub fn guest_identity<E: Environment>(env: &E) -> String {
    format!("Guest-{}", env.random_u64() % GUEST_SUFFIX_RANGE)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn trims_surrounding_whitespace() {
        assert_eq!(normalize_identity("  Alice \n"), Ok("Alice".to_owned()));
    }

    #[test]
    fn keeps_inner_whitespace() {
        assert_eq!(normalize_identity("Mary Ann"), Ok("Mary Ann".to_owned()));
    }

    #[test]
    fn rejects_blank_names() {
        assert_eq!(normalize_identity(""), Err(SessionError::InvalidIdentity));
        assert_eq!(normalize_identity(" \t "), Err(SessionError::InvalidIdentity));
    }
}
