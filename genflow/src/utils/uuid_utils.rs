//! Identifier helpers.

use uuid::Uuid;

/// Length of the short identifiers handed out for generated artifacts.
pub const SHORT_ID_LEN: usize = 8;

/// Generates a new UUID v4.
#[must_use]
pub fn generate_uuid() -> Uuid {
    Uuid::new_v4()
}

/// Returns the first eight hex characters of a fresh UUID v4.
///
/// Used for `animation_id`, `diagram_id` and `roadmap_id`.
#[must_use]
pub fn short_id() -> String {
    let mut id = generate_uuid().simple().to_string();
    id.truncate(SHORT_ID_LEN);
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_id_shape() {
        let id = short_id();
        assert_eq!(id.len(), SHORT_ID_LEN);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_short_ids_differ() {
        assert_ne!(short_id(), short_id());
    }
}
