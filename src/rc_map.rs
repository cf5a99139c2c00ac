//! Values shared between several owners, counted per key.
//!
//! A value whose count drops to zero is parked rather than dropped, and stays available (and revivable)
//! until [`RcMap::drain_released`] is called.

use core::hash::Hash;
use hashbrown::{hash_map::Entry, HashMap};
use num_traits::{CheckedAdd, CheckedSub, One, Zero};

struct Counted<C, V> {
	count: C,
	value: V,
}

/// What became of a value after [`RcMap::release`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Released {
	/// Other references remain.
	Shared,
	/// That was the last reference. The value is parked until drained.
	Parked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RcMapError {
	UnknownKey,
	CountSaturated,
}

pub struct RcMap<K, C, V> {
	entries: HashMap<K, Counted<C, V>>,
	parked: Vec<K>,
}

impl<K, C, V> RcMap<K, C, V>
where
	K: Hash + Eq + Clone,
	C: CheckedAdd + CheckedSub + One + Zero,
{
	#[must_use]
	pub fn new() -> Self {
		Self {
			entries: HashMap::new(),
			parked: Vec::new(),
		}
	}

	/// Counts a new reference to `key`, calling `make` only if there's no live or parked value yet.
	pub fn acquire(&mut self, key: K, make: impl FnOnce() -> V) -> Result<&V, RcMapError> {
		match self.entries.entry(key) {
			Entry::Occupied(occupied) => {
				let counted = occupied.into_mut();
				counted.count = counted.count.checked_add(&C::one()).ok_or(RcMapError::CountSaturated)?;
				Ok(&counted.value)
			}
			Entry::Vacant(vacant) => Ok(&vacant
				.insert(Counted {
					count: C::one(),
					value: make(),
				})
				.value),
		}
	}

	pub fn get(&self, key: &K) -> Option<&V> {
		self.entries.get(key).map(|counted| &counted.value)
	}

	pub fn release(&mut self, key: &K) -> Result<Released, RcMapError> {
		let counted = self.entries.get_mut(key).ok_or(RcMapError::UnknownKey)?;
		counted.count = counted.count.checked_sub(&C::one()).ok_or(RcMapError::CountSaturated)?;
		if counted.count.is_zero() {
			self.parked.push(key.clone());
			Ok(Released::Parked)
		} else {
			Ok(Released::Shared)
		}
	}

	/// Removes and yields parked values that weren't acquired again in the meantime.
	pub fn drain_released(&mut self) -> impl Iterator<Item = (K, V)> + '_ {
		let entries = &mut self.entries;
		self.parked.drain(..).filter_map(move |key| match entries.entry(key) {
			Entry::Occupied(occupied) if occupied.get().count.is_zero() => {
				let (key, counted) = occupied.remove_entry();
				Some((key, counted.value))
			}
			_ => None,
		})
	}
}
