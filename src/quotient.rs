//! A quotient filter: a compact, open-addressed probabilistic set over pre-hashed fingerprints.
//!
//! A quotient filter is essentially a compact hash table. Each item is represented by a
//! `(q+r)`-bit fingerprint, typically the low bits of some key's hash. The top `q` bits are the
//! fingerprint's quotient and the bottom `r` bits are its remainder. The quotient is the index
//! of the slot where the fingerprint *canonically* belongs. When multiple fingerprints map to
//! the same quotient, they are stored in contiguous slots called a run, and the filter maintains
//! that remainders within a run are sorted in ascending order. All runs within a cluster of
//! adjacent occupied slots are themselves sorted by their canonical slot: if run `r1`'s canonical
//! slot is `i1` and run `r2`'s is `i2` with `i1 < i2`, `r1` occurs to the left of `r2` in the
//! cluster. A run's first fingerprint may not occupy its canonical slot if it has been pushed
//! forward by collisions to its left. These invariants are maintained with three metadata bits
//! per slot: `occupied`, `continuation`, and `shifted`.
//!
//! Hashing is not this type's concern: callers are expected to have already reduced their keys
//! to uniformly distributed `(q+r)`-bit integers before calling [`insert`](QuotientFilter::insert),
//! [`may_contain`](QuotientFilter::may_contain), or [`remove`](QuotientFilter::remove). Bits of
//! the input above position `q+r` are ignored by `insert`/`may_contain`, and rejected outright by
//! `remove` (see its documentation for why).
//!
//! # Examples
//!
//! ```
//! use quotient_filter::quotient::QuotientFilter;
//!
//! let mut filter = QuotientFilter::new(8, 4).unwrap();
//!
//! assert!(!filter.may_contain(0xDEAD));
//! filter.insert(0xDEAD);
//! assert!(filter.may_contain(0xDEAD));
//!
//! filter.clear();
//! assert!(!filter.may_contain(0xDEAD));
//! ```

use crate::error::{QuotientFilterError, Result};
use crate::slot_array::SlotArray;
use log::{debug, trace, warn};
use std::cmp::Ordering;
use std::f64::consts;
use std::fmt;

const SHIFTED_MASK: u64 = 0b001;
const CONTINUATION_MASK: u64 = 0b010;
const OCCUPIED_MASK: u64 = 0b100;
const METADATA_MASK: u64 = 0b111;
const METADATA_BITS: u8 = 3;

/// The maximum remainder width the bit-packed slot array can store a slot for.
///
/// A slot is `remainder_bits + 3` bits wide and the storage layer guarantees a slot spans at
/// most two adjacent 64-bit words, which requires a slot no wider than 64 bits.
const MAX_REMAINDER_BITS: u8 = 61;

#[inline]
fn is_empty(elt: u64) -> bool {
    elt & METADATA_MASK == 0
}

#[inline]
fn is_occupied(elt: u64) -> bool {
    elt & OCCUPIED_MASK != 0
}

#[inline]
fn is_continuation(elt: u64) -> bool {
    elt & CONTINUATION_MASK != 0
}

#[inline]
fn is_shifted(elt: u64) -> bool {
    elt & SHIFTED_MASK != 0
}

#[inline]
fn is_cluster_start(elt: u64) -> bool {
    is_occupied(elt) && !is_continuation(elt) && !is_shifted(elt)
}

#[inline]
fn is_run_start(elt: u64) -> bool {
    !is_continuation(elt) && (is_occupied(elt) || is_shifted(elt))
}

#[inline]
fn remainder_of(elt: u64) -> u64 {
    elt >> METADATA_BITS
}

/// A space-efficient probabilistic data structure to test for membership of pre-hashed
/// fingerprints in a set.
///
/// See the [module-level documentation](self) for the data structure's invariants.
#[derive(Clone)]
pub struct QuotientFilter {
    quotient_bits: u8,
    remainder_bits: u8,
    quotient_mask: u64,
    remainder_mask: u64,
    // Each slot is laid out RR...RRMMM, remainder bits above three metadata bits:
    // bit 0 = occupied, bit 1 = continuation, bit 2 = shifted.
    slots: SlotArray,
    len: usize,
}

impl QuotientFilter {
    #[inline]
    fn get_mask(size: u8) -> u64 {
        (1u64 << size) - 1
    }

    /// Constructs a new, empty `QuotientFilter` with the given number of quotient and remainder
    /// bits. The filter's capacity is `2^quotient_bits` and its false-positive rate is
    /// approximately `2^-remainder_bits` at high load.
    ///
    /// # Errors
    ///
    /// Returns [`QuotientFilterError::InvalidParameters`] if `quotient_bits` is 0,
    /// `remainder_bits` is 0, `quotient_bits + remainder_bits` exceeds 64, or `remainder_bits`
    /// exceeds 61 (so that a slot, which is `remainder_bits + 3` bits wide, never exceeds the
    /// two-word spill the bit-packed slot array supports).
    ///
    /// # Examples
    ///
    /// ```
    /// use quotient_filter::quotient::QuotientFilter;
    ///
    /// let filter = QuotientFilter::new(8, 4).unwrap();
    /// assert_eq!(filter.capacity(), 256);
    /// ```
    pub fn new(quotient_bits: u8, remainder_bits: u8) -> Result<Self> {
        if quotient_bits == 0
            || remainder_bits == 0
            || remainder_bits > MAX_REMAINDER_BITS
            || u16::from(quotient_bits) + u16::from(remainder_bits) > 64
        {
            warn!(
                "rejecting quotient filter with quotient_bits = {}, remainder_bits = {}",
                quotient_bits, remainder_bits
            );
            return Err(QuotientFilterError::InvalidParameters {
                quotient_bits,
                remainder_bits,
            });
        }

        let slot_bits = (remainder_bits + METADATA_BITS) as usize;
        let len = 1usize << quotient_bits;
        let filter = QuotientFilter {
            quotient_bits,
            remainder_bits,
            quotient_mask: Self::get_mask(quotient_bits),
            remainder_mask: Self::get_mask(remainder_bits),
            slots: SlotArray::new(slot_bits, len),
            len: 0,
        };
        debug!(
            "constructed quotient filter: quotient_bits = {}, remainder_bits = {}, \
             capacity = {}, table_size_bytes = {}",
            quotient_bits,
            remainder_bits,
            filter.capacity(),
            Self::table_size_bytes(quotient_bits, remainder_bits)
        );
        Ok(filter)
    }

    /// Constructs a new, empty `QuotientFilter` that can store `capacity` items with an
    /// estimated false positive probability of less than `fpp`. The ideal fullness of a
    /// quotient filter is 75%, so the constructed filter will have a maximum capacity of
    /// `1.33 * capacity`.
    ///
    /// # Errors
    ///
    /// Returns [`QuotientFilterError::InvalidFalsePositiveTarget`] if `capacity` is 0 or `fpp`
    /// is not in the range `(0, 1)`. Propagates [`QuotientFilterError::InvalidParameters`] if
    /// the derived `(quotient_bits, remainder_bits)` pair is out of range.
    ///
    /// # Examples
    ///
    /// ```
    /// use quotient_filter::quotient::QuotientFilter;
    ///
    /// let filter = QuotientFilter::from_fpp(100, 0.05).unwrap();
    /// ```
    pub fn from_fpp(capacity: usize, fpp: f64) -> Result<Self> {
        if capacity == 0 || !(fpp > 0.0 && fpp < 1.0) {
            warn!(
                "rejecting false-positive target: capacity = {}, fpp = {}",
                capacity, fpp
            );
            return Err(QuotientFilterError::InvalidFalsePositiveTarget { capacity, fpp });
        }

        let quotient_bits = (capacity as f64 * 1.33).log2().ceil() as u8;
        let remainder_bits = (1.0 / -2.0 / (1.0 - fpp).ln()).log2().ceil() as u8;
        Self::new(quotient_bits.max(1), remainder_bits.max(1))
    }

    #[inline]
    fn split_fingerprint(&self, hash: u64) -> (usize, u64) {
        (
            ((hash >> self.remainder_bits) & self.quotient_mask) as usize,
            hash & self.remainder_mask,
        )
    }

    #[inline]
    fn increment_index(&self, index: &mut usize) {
        *index = if *index == self.capacity() - 1 {
            0
        } else {
            *index + 1
        };
    }

    #[inline]
    fn decrement_index(&self, index: &mut usize) {
        *index = if *index == 0 {
            self.capacity() - 1
        } else {
            *index - 1
        };
    }

    /// Finds the start of the run belonging to `fq`, given that one exists (i.e. slot `fq`'s
    /// `occupied` bit is set). Returns `(run start index, runs seen so far in the cluster,
    /// occupied slots seen so far in the cluster)`; the latter two are only needed by `remove`'s
    /// bookkeeping as it shifts the cluster left.
    fn find_run_start(&self, mut index: usize) -> (usize, usize, usize) {
        // Walk backward to the start of the cluster.
        let mut occupied_count = 0;
        loop {
            let slot = self.slots.get(index);
            if is_occupied(slot) {
                occupied_count += 1;
            }
            if !is_shifted(slot) {
                break;
            }
            self.decrement_index(&mut index);
        }

        // Walk forward one run per occupied slot until we land on the run for `fq`.
        let mut runs_count = 0;
        let mut total_occupied_count = 0;
        loop {
            let slot = self.slots.get(index);
            if is_occupied(slot) {
                total_occupied_count += 1;
            }
            if !is_continuation(slot) {
                runs_count += 1;
            }
            if occupied_count == runs_count {
                break;
            }
            self.increment_index(&mut index);
        }

        (index, runs_count, total_occupied_count)
    }

    /// Inserts `slot` at `index`, shifting every subsequent occupied slot one place to the
    /// right until an empty slot absorbs the displacement.
    ///
    /// `occupied` never travels with the shift: it belongs to a slot's index, not its content.
    fn insert_and_shift_right(&mut self, mut index: usize, slot: u64) {
        let mut curr = slot;
        loop {
            let mut next = self.slots.get(index);
            let next_was_empty = is_empty(next);

            if is_occupied(next) {
                next &= !OCCUPIED_MASK;
                curr |= OCCUPIED_MASK;
            }

            self.slots.set(index, curr);
            curr = next;
            self.increment_index(&mut index);

            if next_was_empty {
                break;
            }

            curr |= SHIFTED_MASK;
        }
    }

    /// Inserts a fingerprint into the filter. Only the low `quotient_bits + remainder_bits` bits
    /// of `hash` are used; higher bits are ignored.
    ///
    /// Returns `true` if the fingerprint was inserted or was already present, `false` if the
    /// filter is full.
    ///
    /// # Examples
    ///
    /// ```
    /// use quotient_filter::quotient::QuotientFilter;
    ///
    /// let mut filter = QuotientFilter::new(8, 4).unwrap();
    /// assert!(filter.insert(0xDEAD));
    /// ```
    pub fn insert(&mut self, hash: u64) -> bool {
        if self.len == self.capacity() {
            debug!(
                "quotient filter at capacity {} rejected insert",
                self.capacity()
            );
            return false;
        }

        let (quotient, remainder) = self.split_fingerprint(hash);
        let slot = self.slots.get(quotient);

        // Empty canonical slot: the simple case, no shifting required.
        if is_empty(slot) {
            self.slots
                .set(quotient, (remainder << METADATA_BITS) | OCCUPIED_MASK);
            self.len += 1;
            return true;
        }

        if self.may_contain(hash) {
            return true;
        }

        // If the canonical slot isn't occupied yet, this insertion creates its run. Set
        // `occupied` first so `find_run_start` computes the correct insertion point.
        let new_run = if !is_occupied(slot) {
            self.slots.set(quotient, slot | OCCUPIED_MASK);
            true
        } else {
            false
        };

        let (mut index, ..) = self.find_run_start(quotient);
        let run_start = index;
        let mut new_slot = remainder << METADATA_BITS;
        let mut slot = self.slots.get(index);

        if !new_run {
            loop {
                if remainder < remainder_of(slot) {
                    break;
                }
                self.increment_index(&mut index);
                slot = self.slots.get(index);
                if !is_continuation(slot) {
                    break;
                }
            }

            if index == run_start {
                // The new entry becomes the run's head; the old head becomes a continuation.
                let run_start_slot = self.slots.get(run_start) | CONTINUATION_MASK;
                self.slots.set(run_start, run_start_slot);
            } else {
                new_slot |= CONTINUATION_MASK;
            }
        }

        if index != quotient {
            new_slot |= SHIFTED_MASK;
        }

        self.len += 1;
        self.insert_and_shift_right(index, new_slot);
        true
    }

    /// Returns `true` if the fingerprint may be present in the filter, `false` if it is
    /// definitely absent. Only the low `quotient_bits + remainder_bits` bits of `hash` are used.
    ///
    /// # Examples
    ///
    /// ```
    /// use quotient_filter::quotient::QuotientFilter;
    ///
    /// let mut filter = QuotientFilter::new(8, 4).unwrap();
    /// assert!(!filter.may_contain(0xDEAD));
    /// filter.insert(0xDEAD);
    /// assert!(filter.may_contain(0xDEAD));
    /// ```
    pub fn may_contain(&self, hash: u64) -> bool {
        let (quotient, remainder) = self.split_fingerprint(hash);
        let slot = self.slots.get(quotient);

        if !is_occupied(slot) {
            return false;
        }

        let (mut index, ..) = self.find_run_start(quotient);
        let mut slot = self.slots.get(index);
        loop {
            match remainder_of(slot).cmp(&remainder) {
                Ordering::Equal => return true,
                // Runs are sorted, so any later entry in the run is larger still.
                Ordering::Greater => return false,
                Ordering::Less => {
                    self.increment_index(&mut index);
                    slot = self.slots.get(index);
                    if !is_continuation(slot) {
                        return false;
                    }
                }
            }
        }
    }

    /// Removes a fingerprint from the filter.
    ///
    /// This is only safe to call when no two distinct keys ever produced the same `(q+r)`-bit
    /// fingerprint, because the filter cannot distinguish them: removing one would make
    /// [`may_contain`](Self::may_contain) wrongly return `false` for the other, a false
    /// negative. As a guard against the most common way to violate that precondition, `remove`
    /// refuses any `hash` with bits set above position `quotient_bits + remainder_bits` and
    /// returns `false` without modifying the filter. Any other call — including removing a
    /// fingerprint that was never inserted — is idempotent and returns `true`.
    ///
    /// # Examples
    ///
    /// ```
    /// use quotient_filter::quotient::QuotientFilter;
    ///
    /// let mut filter = QuotientFilter::new(8, 4).unwrap();
    /// filter.insert(0xDEAD);
    /// assert!(filter.remove(0xDEAD));
    /// assert!(!filter.may_contain(0xDEAD));
    /// ```
    pub fn remove(&mut self, hash: u64) -> bool {
        let fingerprint_bits = self.quotient_bits + self.remainder_bits;
        if fingerprint_bits < 64 && hash >> fingerprint_bits != 0 {
            return false;
        }

        let (quotient, remainder) = self.split_fingerprint(hash);

        if is_empty(self.slots.get(quotient)) || self.len == 0 {
            return true;
        }

        let (mut index, mut runs_count, mut occupied_count) = self.find_run_start(quotient);
        let mut slot = self.slots.get(index);
        loop {
            match remainder_of(slot).cmp(&remainder) {
                Ordering::Equal => break,
                Ordering::Greater => return true,
                Ordering::Less => {
                    self.increment_index(&mut index);
                    slot = self.slots.get(index);
                    if is_occupied(slot) {
                        occupied_count += 1;
                    }
                    if !is_continuation(slot) {
                        return true;
                    }
                }
            }
        }

        // Found the entry at `index`. Delete it and shift the rest of the cluster left.
        let mut is_run_head = !is_continuation(slot);

        // Keep only the `occupied` bit, if any, since it belongs to the index, not the content.
        slot &= OCCUPIED_MASK;
        self.slots.set(index, 0);

        let mut next_index = index;
        self.increment_index(&mut next_index);
        let mut next_slot = self.slots.get(next_index);

        if is_run_head && index != quotient && !is_continuation(next_slot) {
            // The deleted entry was its run's only member and had been shifted out of its
            // canonical slot. Nothing shifts back into `quotient` to replace it — not even the
            // loop below, which may not run at all if `next_slot` is empty — so clear its
            // `occupied` bit here rather than leaving a run marker with no run behind it.
            let canonical = self.slots.get(quotient) & !OCCUPIED_MASK;
            self.slots.set(quotient, canonical);
        }

        // Continue while the successor is still shifted content belonging to some run; stop at
        // an item already in its canonical slot or at an empty slot.
        while is_continuation(next_slot) || is_shifted(next_slot) {
            self.slots.set(next_index, 0);

            if !is_continuation(next_slot) {
                // The whole run shifts left by one, so we've now seen one more run.
                runs_count += 1;
                if is_run_head {
                    // This run's old head is gone and nothing replaces it at `quotient`;
                    // `quotient` no longer has a run.
                    let canonical = self.slots.get(quotient) & !OCCUPIED_MASK;
                    self.slots.set(quotient, canonical);
                }
            } else if !is_run_head {
                slot |= CONTINUATION_MASK;
            }
            is_run_head = false;

            // If the occupied count hasn't caught up to the run count, the entry sliding into
            // `index` is still shifted; otherwise it has landed on its canonical slot.
            if !is_occupied(slot) || occupied_count != runs_count {
                slot |= SHIFTED_MASK;
            }

            slot |= next_slot & !METADATA_MASK;
            self.slots.set(index, slot);

            if is_occupied(next_slot) {
                occupied_count += 1;
            }

            slot = next_slot & OCCUPIED_MASK;
            index = next_index;
            self.increment_index(&mut next_index);
            next_slot = self.slots.get(next_index);
        }

        self.len -= 1;
        true
    }

    /// Removes every fingerprint from the filter without releasing its allocation.
    ///
    /// # Examples
    ///
    /// ```
    /// use quotient_filter::quotient::QuotientFilter;
    ///
    /// let mut filter = QuotientFilter::new(8, 4).unwrap();
    /// filter.insert(0xDEAD);
    /// filter.clear();
    /// assert!(!filter.may_contain(0xDEAD));
    /// ```
    pub fn clear(&mut self) {
        trace!("clearing quotient filter holding {} entries", self.len);
        self.slots.clear();
        self.len = 0;
    }

    /// Returns an iterator over every fingerprint currently stored, in slot-index (cluster)
    /// order. Each fingerprint is yielded exactly once as `(quotient << remainder_bits) |
    /// remainder`; order is sorted within a run but not across runs.
    ///
    /// # Examples
    ///
    /// ```
    /// use quotient_filter::quotient::QuotientFilter;
    ///
    /// let mut filter = QuotientFilter::new(8, 4).unwrap();
    /// filter.insert(5);
    /// let fingerprints: Vec<u64> = filter.iter().collect();
    /// assert_eq!(fingerprints, vec![5]);
    /// ```
    pub fn iter(&self) -> Iter<'_> {
        Iter::new(self)
    }

    /// Returns the number of fingerprints stored in the filter.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the filter holds no fingerprints.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the filter's capacity, `2^quotient_bits`.
    pub fn capacity(&self) -> usize {
        1 << self.quotient_bits
    }

    /// Returns the number of quotient bits used to index a fingerprint.
    pub fn quotient_bits(&self) -> u8 {
        self.quotient_bits
    }

    /// Returns the number of remainder bits stored per fingerprint.
    pub fn remainder_bits(&self) -> u8 {
        self.remainder_bits
    }

    /// Returns the byte size of the slot array backing a filter with the given `(quotient_bits,
    /// remainder_bits)`, without requiring a constructed filter.
    ///
    /// # Examples
    ///
    /// ```
    /// use quotient_filter::quotient::QuotientFilter;
    ///
    /// assert_eq!(QuotientFilter::table_size_bytes(3, 3), 8);
    /// ```
    pub fn table_size_bytes(quotient_bits: u8, remainder_bits: u8) -> usize {
        let slot_bits = (remainder_bits + METADATA_BITS) as usize;
        let len = 1usize << quotient_bits;
        SlotArray::table_size_bytes(slot_bits, len)
    }

    /// Returns the estimated false positive probability of the filter. This increases
    /// monotonically as more fingerprints are inserted.
    ///
    /// # Examples
    ///
    /// ```
    /// use quotient_filter::quotient::QuotientFilter;
    ///
    /// let mut filter = QuotientFilter::from_fpp(100, 0.05).unwrap();
    /// assert!(filter.estimated_fpp() < std::f64::EPSILON);
    ///
    /// filter.insert(1);
    /// assert!(filter.estimated_fpp() > std::f64::EPSILON);
    /// assert!(filter.estimated_fpp() < 0.05);
    /// ```
    pub fn estimated_fpp(&self) -> f64 {
        let fill_ratio = self.len() as f64 / self.capacity() as f64;
        1.0 - consts::E.powf(-fill_ratio / 2.0f64.powf(f64::from(self.remainder_bits)))
    }
}

impl fmt::Debug for QuotientFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.capacity() {
            let slot = self.slots.get(i);
            write!(f, "{}|{}:{:03b} ", i, remainder_of(slot), slot & METADATA_MASK)?;
        }
        Ok(())
    }
}

/// A borrowing iterator over the fingerprints stored in a [`QuotientFilter`].
///
/// Yields each stored `(quotient_bits + remainder_bits)`-bit fingerprint exactly once in
/// slot-index order. Cannot outlive the filter it borrows, and the filter cannot be mutated
/// while an iterator over it is live — both are enforced by the borrow checker rather than by
/// caller discipline.
pub struct Iter<'a> {
    filter: &'a QuotientFilter,
    index: usize,
    quotient: usize,
    visited: usize,
}

impl<'a> Iter<'a> {
    fn new(filter: &'a QuotientFilter) -> Self {
        let mut index = 0;
        if filter.len != 0 {
            while !is_cluster_start(filter.slots.get(index)) {
                index += 1;
            }
        }
        Iter {
            filter,
            index,
            quotient: 0,
            visited: 0,
        }
    }

    /// Returns `true` if every stored fingerprint has already been yielded.
    pub fn is_done(&self) -> bool {
        self.visited == self.filter.len
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        while !self.is_done() {
            let elt = self.filter.slots.get(self.index);

            if is_cluster_start(elt) {
                self.quotient = self.index;
            } else if is_run_start(elt) {
                let mut quotient = self.quotient;
                loop {
                    self.filter.increment_index(&mut quotient);
                    if is_occupied(self.filter.slots.get(quotient)) {
                        break;
                    }
                }
                self.quotient = quotient;
            }

            self.filter.increment_index(&mut self.index);

            if !is_empty(elt) {
                let hash =
                    ((self.quotient as u64) << self.filter.remainder_bits) | remainder_of(elt);
                self.visited += 1;
                return Some(hash);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.filter.len - self.visited;
        (remaining, Some(remaining))
    }
}
