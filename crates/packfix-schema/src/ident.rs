//! Pack and module identifiers.
//!
//! Manifests identify a pack and each of its modules by a UUID written in the
//! canonical hyphenated form (`8-4-4-4-12` hexadecimal groups). Any other
//! spelling (braced, URN, simple) is rejected even though it denotes a valid
//! UUID, because consumers of the pack compare identifiers textually.

/// Group lengths of the canonical hyphenated UUID form.
const GROUPS: [usize; 5] = [8, 4, 4, 4, 12];

/// Returns true if `value` is a UUID in canonical hyphenated textual form.
///
/// Hex digits are accepted in either case.
pub fn is_canonical_uuid(value: &str) -> bool {
    let mut parts = value.split('-');
    for len in GROUPS {
        match parts.next() {
            Some(part) if part.len() == len && part.bytes().all(|b| b.is_ascii_hexdigit()) => {}
            _ => return false,
        }
    }
    parts.next().is_none()
}

/// Two identifiers name the same UUID if they differ only in hex digit case.
pub fn same_uuid(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// Source of freshly generated identifiers used during manifest repair.
pub trait UuidSource {
    fn next_uuid(&mut self) -> String;
}

/// Random (version 4) UUIDs.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomUuids;

impl UuidSource for RandomUuids {
    fn next_uuid(&mut self) -> String {
        uuid::Uuid::new_v4().hyphenated().to_string()
    }
}

/// Replays a fixed list of identifiers, then falls back to random ones.
///
/// Useful wherever repair output must be reproducible.
#[derive(Debug, Default, Clone)]
pub struct FixedUuids {
    queue: std::collections::VecDeque<String>,
}

impl FixedUuids {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            queue: ids.into_iter().map(Into::into).collect(),
        }
    }
}

impl UuidSource for FixedUuids {
    fn next_uuid(&mut self) -> String {
        self.queue
            .pop_front()
            .unwrap_or_else(|| RandomUuids.next_uuid())
    }
}
