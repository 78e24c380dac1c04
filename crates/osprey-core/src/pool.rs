//! Object pool for zero-allocation order storage.
//!
//! An arena of order slots with a LIFO free list: recently released slots
//! are handed out first while still cache-warm. The pool is owned by the
//! matching worker, so no lock is needed; slots are addressed by `u32`
//! handles that stay valid across growth.

use std::mem::MaybeUninit;

use crate::order::Order;

/// Index into the order pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct OrderHandle(pub u32);

impl OrderHandle {
    #[inline(always)]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Growable arena of resting orders.
///
/// Steady-state acquisition pops the free list; on exhaustion the arena
/// doubles, keeping amortized acquisition O(1). Acquisition never fails.
pub struct OrderPool {
    slots: Vec<MaybeUninit<Order>>,
    /// LIFO free list of slot indices.
    free_list: Vec<u32>,
    active: u32,
}

/// Handles are u32 slot indices.
const MAX_CAPACITY: usize = u32::MAX as usize;

impl OrderPool {
    /// Create a pool with `initial` preallocated slots.
    pub fn with_capacity(initial: usize) -> Self {
        let initial = initial.clamp(1, MAX_CAPACITY);

        let mut slots = Vec::with_capacity(initial);
        slots.resize_with(initial, MaybeUninit::uninit);

        // Reverse so the first acquisition takes slot 0.
        let free_list: Vec<u32> = (0..initial as u32).rev().collect();

        Self {
            slots,
            free_list,
            active: 0,
        }
    }

    /// Store an order in a free slot and return its handle.
    #[inline(always)]
    pub fn acquire(&mut self, order: Order) -> OrderHandle {
        let idx = match self.free_list.pop() {
            Some(idx) => idx,
            None => {
                self.grow();
                // grow() always pushes fresh slot indices
                self.free_list.pop().expect("pool growth produced no slots")
            }
        };
        self.slots[idx as usize].write(order);
        self.active += 1;
        OrderHandle(idx)
    }

    /// Return a slot to the free list.
    ///
    /// The handle must have been acquired and not yet released.
    #[inline(always)]
    pub fn release(&mut self, handle: OrderHandle) {
        debug_assert!(handle.index() < self.slots.len(), "invalid handle");
        debug_assert!(self.active > 0, "double release");

        self.free_list.push(handle.0);
        self.active -= 1;
    }

    /// Borrow the order behind a handle.
    #[inline(always)]
    pub fn get(&self, handle: OrderHandle) -> &Order {
        debug_assert!(handle.index() < self.slots.len(), "handle out of bounds");
        // SAFETY: handles are only issued by acquire(), which initializes
        // the slot, and become stale only after release().
        unsafe { self.slots[handle.index()].assume_init_ref() }
    }

    /// Mutably borrow the order behind a handle.
    #[inline(always)]
    pub fn get_mut(&mut self, handle: OrderHandle) -> &mut Order {
        debug_assert!(handle.index() < self.slots.len(), "handle out of bounds");
        // SAFETY: same contract as get().
        unsafe { self.slots[handle.index()].assume_init_mut() }
    }

    /// Number of live orders.
    #[inline(always)]
    pub fn active(&self) -> usize {
        self.active as usize
    }

    /// Total slot count.
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Double the arena.
    #[cold]
    fn grow(&mut self) {
        let old = self.slots.len();
        let new = (old * 2).min(MAX_CAPACITY);
        assert!(new > old, "order pool exhausted at maximum capacity");

        self.slots.resize_with(new, MaybeUninit::uninit);
        // Newest indices first keeps the LIFO discipline.
        self.free_list.extend((old as u32..new as u32).rev());
    }
}
