//! Host function identifiers
//!
//! Index of a callback in the host registry. Ids are handed out in
//! registration order and never reused.

/// Host function identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostId(pub u32);

impl From<u32> for HostId {
    fn from(v: u32) -> Self {
        HostId(v)
    }
}

impl From<HostId> for u32 {
    fn from(id: HostId) -> Self {
        id.0
    }
}
