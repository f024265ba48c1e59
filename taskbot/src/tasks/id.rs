//! Short task identifiers.

use log::debug;
use uuid::Uuid;

/// Number of hex characters kept from a random UUID.
pub const ID_LENGTH: usize = 8;

/// Returns the first [`ID_LENGTH`] hex characters of a fresh v4 UUID.
pub fn random_short_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(ID_LENGTH);
    id
}

/// Draws candidates until one is not taken.
///
/// Truncated UUIDs can collide, so callers pass the set of ids already in use
/// rather than trusting the generator.
pub fn unique_id(is_taken: impl Fn(&str) -> bool, mut candidate: impl FnMut() -> String) -> String {
    loop {
        let id = candidate();
        if !is_taken(&id) {
            return id;
        }
        debug!("Generated task id {} is already taken, retrying", id);
    }
}
