use math::Winding;

/// Windings each flow frame may hold at once: its source, its pass, and one
/// more for the output of a clip in progress
pub const STACK_WINDINGS: usize = 3;

/// Fixed pool of windings owned by one flow frame.
///
/// A slot is taken by the clip that fills it and given back by the clip that
/// consumes it. The whole pool is released when the frame is reused for the
/// next portal, so nothing outlives the path that produced it.
#[derive(Debug, Default)]
pub struct StackWindings {
    windings: [Winding; STACK_WINDINGS],
    used: [bool; STACK_WINDINGS],
}

impl StackWindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Release every slot
    #[inline]
    pub fn reset(&mut self) {
        self.used = [false; STACK_WINDINGS];
    }

    /// Take a free slot, or `None` if all are in use
    pub fn alloc(&mut self) -> Option<usize> {
        let slot = self.used.iter().position(|u| !u)?;
        self.used[slot] = true;
        self.windings[slot].clear();
        Some(slot)
    }

    #[inline]
    pub fn free(&mut self, slot: usize) {
        debug_assert!(self.used[slot], "freeing unused winding slot {slot}");
        self.used[slot] = false;
    }

    #[inline]
    pub fn get(&self, slot: usize) -> &Winding {
        &self.windings[slot]
    }

    #[inline]
    pub fn get_mut(&mut self, slot: usize) -> &mut Winding {
        &mut self.windings[slot]
    }

    /// Read one slot while writing another
    pub fn pair_mut(&mut self, read: usize, write: usize) -> (&Winding, &mut Winding) {
        debug_assert_ne!(read, write);
        if read < write {
            let (lo, hi) = self.windings.split_at_mut(write);
            (&lo[read], &mut hi[0])
        } else {
            let (lo, hi) = self.windings.split_at_mut(read);
            (&hi[0], &mut lo[write])
        }
    }

    #[cfg(test)]
    pub fn in_use(&self) -> usize {
        self.used.iter().filter(|u| **u).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_until_full() {
        let mut pool = StackWindings::new();
        let slots: Vec<_> = (0..STACK_WINDINGS).map(|_| pool.alloc()).collect();
        assert_eq!(slots, vec![Some(0), Some(1), Some(2)]);
        assert_eq!(pool.alloc(), None);
        pool.free(1);
        assert_eq!(pool.alloc(), Some(1));
        pool.reset();
        assert_eq!(pool.in_use(), 0);
    }

    #[test]
    fn pair_mut_either_order() {
        let mut pool = StackWindings::new();
        let a = pool.alloc().unwrap();
        let b = pool.alloc().unwrap();
        {
            let (_, out) = pool.pair_mut(a, b);
            out.origin.x = 2.0;
        }
        let (read, out) = pool.pair_mut(b, a);
        out.origin.x = read.origin.x + 1.0;
        assert_eq!(pool.get(a).origin.x, 3.0);
    }
}
