//! The small dirty bitset every node carries (spec §4.1).

use bitflags::bitflags;

bitflags! {
    /// Every setter that alters a derived quantity sets one of these bits.
    /// Setting a property equal to its current value is a no-op and leaves
    /// the bitset untouched.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DirtyBits: u16 {
        const LOCAL         = 1 << 0;
        const TRANSFORM     = 1 << 1;
        const WORLD_ALPHA   = 1 << 2;
        const WORLD_COLOR   = 1 << 3;
        const CLIPPING      = 1 << 4;
        const RENDER_BOUNDS = 1 << 5;
        const CHILDREN      = 1 << 6;
        const ZINDEX        = 1 << 7;
        const RTT_UPLOAD    = 1 << 8;
    }
}

impl Default for DirtyBits {
    fn default() -> Self {
        // A freshly created node must compute everything once.
        DirtyBits::all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_node_dirty_bits_cover_everything() {
        let bits = DirtyBits::default();
        assert!(bits.contains(DirtyBits::TRANSFORM));
        assert!(bits.contains(DirtyBits::RENDER_BOUNDS));
    }

    #[test]
    fn bits_combine_and_clear_independently() {
        let mut bits = DirtyBits::empty();
        bits |= DirtyBits::TRANSFORM;
        bits |= DirtyBits::WORLD_ALPHA;
        assert!(bits.contains(DirtyBits::TRANSFORM));
        bits.remove(DirtyBits::TRANSFORM);
        assert!(!bits.contains(DirtyBits::TRANSFORM));
        assert!(bits.contains(DirtyBits::WORLD_ALPHA));
    }
}
