//! Newtype identifiers for every entity the core hands back across its API
//! boundary. Keeping these distinct (rather than raw `u64`/`usize`) is what
//! lets the scene graph reject a texture id where a node id was expected at
//! compile time.

use std::fmt;

macro_rules! id_type {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(TextureId);
id_type!(ShaderId);
id_type!(FontId);
id_type!(AnimationId);

/// Monotonically increasing counter used for node ids, texture ids, and
/// other identity-only (non-slotmap) sequences, per spec §3 ("monotonically
/// increasing integer id").
#[derive(Debug, Default)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self { next: 0 }
    }

    pub fn alloc(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocator_is_monotonic() {
        let mut alloc = IdAllocator::new();
        assert_eq!(alloc.alloc(), 0);
        assert_eq!(alloc.alloc(), 1);
        assert_eq!(alloc.alloc(), 2);
    }
}
