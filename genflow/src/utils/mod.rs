//! Utility functions for identifiers, timestamps and static patterns.

pub(crate) mod patterns;
pub mod timestamps;
mod uuid_utils;

pub use timestamps::{iso_date, iso_timestamp, now_utc, Timestamp};
pub use uuid_utils::{generate_uuid, short_id, SHORT_ID_LEN};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_uuid_is_valid() {
        let id = generate_uuid();
        assert_eq!(id.get_version_num(), 4);
    }
}
