//! Fixed-capacity store for pending control and information frames, with
//! type+address+N(S) lookup, per spec.md §4.3.
//!
//! The original lays `frames` out as a table of raw pointers into a backing
//! region (spec.md §9 "Queue as pointer table"). We follow the redesign
//! guidance directly: a flat `Vec` of slots, each a tagged union, looked up
//! linearly from a hint index that biases toward FIFO order.

use crate::frame::Address;

bitflags::bitflags! {
    /// Type mask used by [`FrameQueue::next`] to select candidate slots.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SlotKind: u8 {
        const FREE = 0b0001;
        const U = 0b0010;
        const S = 0b0100;
        const I = 0b1000;
    }
}

#[derive(Debug, Clone)]
struct StoredFrame {
    kind: SlotKind,
    address: Address,
    control: u8,
    payload: Vec<u8>,
}

/// One queue slot: either free or holding a stored frame awaiting
/// transmission or retransmission.
#[derive(Debug, Clone)]
enum Slot {
    Free,
    Occupied(StoredFrame),
}

/// An opaque handle to an occupied slot, returned by [`FrameQueue::allocate`]
/// and [`FrameQueue::next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotId(usize);

/// Fixed per-slot bookkeeping overhead (everything but the payload bytes
/// themselves), for capacity-planning estimates such as
/// [`crate::fd::Config::estimated_bytes`].
pub(crate) fn slot_overhead() -> usize {
    std::mem::size_of::<StoredFrame>()
}

/// A fixed-capacity slot store for pending U/S/I frames.
#[derive(Debug)]
pub struct FrameQueue {
    slots: Vec<Slot>,
    mtu: usize,
    lookup_index: usize,
}

impl FrameQueue {
    /// Creates a queue with `capacity` slots, each able to hold a payload of
    /// up to `mtu` bytes.
    pub fn new(capacity: usize, mtu: usize) -> Self {
        FrameQueue {
            slots: (0..capacity).map(|_| Slot::Free).collect(),
            mtu,
            lookup_index: 0,
        }
    }

    pub fn mtu(&self) -> usize {
        self.mtu
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn has_free_slots(&self) -> bool {
        self.slots.iter().any(|s| matches!(s, Slot::Free))
    }

    /// Finds a free slot, copies `data` into it and marks it occupied as
    /// `kind` (exactly one of `U`, `S`, `I`). Fails with `DataTooLarge` if
    /// `data` exceeds the configured MTU, `Failed` if the queue is full.
    pub fn allocate(
        &mut self,
        kind: SlotKind,
        address: Address,
        control: u8,
        data: &[u8],
    ) -> crate::error::Result<SlotId> {
        if data.len() > self.mtu {
            return Err(crate::error::Error::DataTooLarge);
        }
        let idx = self
            .slots
            .iter()
            .position(|s| matches!(s, Slot::Free))
            .ok_or(crate::error::Error::Failed)?;
        self.slots[idx] = Slot::Occupied(StoredFrame {
            kind,
            address,
            control,
            payload: data.to_vec(),
        });
        Ok(SlotId(idx))
    }

    /// Linear scan from `lookup_index` for a slot matching `type_mask`. For
    /// `I`-frame lookups, `ns` additionally filters on the N(S) field of the
    /// stored control byte (bits 1..=3, see `frame::Control::encode`).
    pub fn next(&mut self, type_mask: SlotKind, address: Address, ns: Option<u8>) -> Option<SlotId> {
        let n = self.slots.len();
        if n == 0 {
            return None;
        }
        for step in 0..n {
            let idx = (self.lookup_index + step) % n;
            let matched = match &self.slots[idx] {
                Slot::Free => type_mask.contains(SlotKind::FREE),
                Slot::Occupied(f) => {
                    type_mask.intersects(f.kind)
                        && f.address.matches(address)
                        && match (f.kind, ns) {
                            (SlotKind::I, Some(want_ns)) => (f.control >> 1) & 0x07 == want_ns,
                            _ => true,
                        }
                }
            };
            if matched {
                return Some(SlotId(idx));
            }
        }
        None
    }

    pub fn get(&self, id: SlotId) -> Option<(Address, u8, &[u8])> {
        match &self.slots[id.0] {
            Slot::Occupied(f) => Some((f.address, f.control, &f.payload)),
            Slot::Free => None,
        }
    }

    /// Marks a slot free again and advances the FIFO hint past it.
    pub fn free(&mut self, id: SlotId) {
        self.slots[id.0] = Slot::Free;
        self.lookup_index = (id.0 + 1) % self.slots.len().max(1);
    }

    /// Frees every occupied slot.
    pub fn reset(&mut self) {
        for s in &mut self.slots {
            *s = Slot::Free;
        }
        self.lookup_index = 0;
    }

    /// Frees every slot addressed to `address` (ignoring the C/R bit).
    pub fn reset_for(&mut self, address: Address) {
        for s in &mut self.slots {
            if let Slot::Occupied(f) = s {
                if f.address.matches(address) {
                    *s = Slot::Free;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::new(n, true)
    }

    #[test]
    fn allocate_and_find_free_slot() {
        let mut q = FrameQueue::new(4, 16);
        let id = q.allocate(SlotKind::I, addr(1), 0x02, b"hi").unwrap();
        assert_eq!(q.get(id).unwrap().2, b"hi");
    }

    #[test]
    fn allocate_fails_over_mtu() {
        let mut q = FrameQueue::new(4, 2);
        assert_eq!(
            q.allocate(SlotKind::I, addr(1), 0, b"too long"),
            Err(crate::error::Error::DataTooLarge)
        );
    }

    #[test]
    fn allocate_fails_when_full() {
        let mut q = FrameQueue::new(1, 16);
        q.allocate(SlotKind::U, addr(1), 0, b"a").unwrap();
        assert_eq!(
            q.allocate(SlotKind::U, addr(1), 0, b"b"),
            Err(crate::error::Error::Failed)
        );
    }

    #[test]
    fn next_matches_i_frame_by_address_and_ns() {
        let mut q = FrameQueue::new(4, 16);
        // ns=3 encoded in control bits 1..=3: (3 << 1) = 0x06
        let id = q.allocate(SlotKind::I, addr(1), 0x06, b"p").unwrap();
        let found = q.next(SlotKind::I, addr(1), Some(3));
        assert_eq!(found, Some(id));
        assert_eq!(q.next(SlotKind::I, addr(1), Some(4)), None);
    }

    #[test]
    fn free_makes_slot_reusable() {
        let mut q = FrameQueue::new(1, 16);
        let id = q.allocate(SlotKind::U, addr(1), 0, b"a").unwrap();
        q.free(id);
        assert!(q.has_free_slots());
        assert!(q.allocate(SlotKind::U, addr(1), 0, b"b").is_ok());
    }

    #[test]
    fn reset_for_only_clears_matching_address() {
        let mut q = FrameQueue::new(4, 16);
        q.allocate(SlotKind::I, addr(1), 0, b"a").unwrap();
        q.allocate(SlotKind::I, addr(2), 0, b"b").unwrap();
        q.reset_for(addr(1));
        assert_eq!(q.next(SlotKind::I, addr(1), None), None);
        assert!(q.next(SlotKind::I, addr(2), None).is_some());
    }
}
