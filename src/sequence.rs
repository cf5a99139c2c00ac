//! Greedy single-pass diff between two ordered sequences.
//!
//! The resulting [`Operation`]s map one-to-one onto splices of a live list:
//! Applied in emitted order to a working copy of `old`, with every index interpreted against the working copy *as it is at that point*,
//! they turn it into `new` (up to `equals`).
//!
//! Ordering:
//!
//! 1. Items of `old` that have no counterpart anywhere in `new` are removed first, front to back.
//! 2. `new` is then scanned left to right. Each target position is filled by exactly one of
//!    [`Operation::Noop`] (the item there already matches),
//!    [`Operation::Move`] (a match exists further back and is pulled forward) or
//!    [`Operation::Add`] (no unplaced match is left).
//! 3. Whatever wasn't placed (surplus duplicates) is removed from the tail.
//!
//! Matching is greedy in sequence order, so among pairwise-equivalent items the first unplaced one wins.
//! This can under-report moves among indistinguishable items, which is fine as long as they really are interchangeable.

/// One edit step. `item` refers into `new`, except for [`Operation::Remove`], where it refers into `old`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operation<'a, T> {
	Add {
		index: usize,
		item: &'a T,
	},
	Remove {
		index: usize,
		original_index: usize,
		item: &'a T,
	},
	Move {
		original_index: usize,
		from_index: usize,
		to_index: usize,
		item: &'a T,
	},
	Noop {
		original_index: usize,
		index: usize,
		item: &'a T,
	},
}

/// `O(n·m)` in the number of `equals` calls, which is fine for child lists.
///
/// `equals` is called as `equals(old_item, new_item)`.
pub fn diff_sequence<'a, T>(old: &'a [T], new: &'a [T], mut equals: impl FnMut(&T, &T) -> bool) -> Vec<Operation<'a, T>> {
	let mut operations = Vec::with_capacity(old.len().max(new.len()));

	// Original indices of the working copy's unplaced tail, which always begins at the current target position.
	let mut pending = Vec::with_capacity(old.len());

	for (original_index, item) in old.iter().enumerate() {
		if new.iter().any(|candidate| equals(item, candidate)) {
			pending.push(original_index);
		} else {
			operations.push(Operation::Remove {
				index: pending.len(),
				original_index,
				item,
			});
		}
	}

	for (index, item) in new.iter().enumerate() {
		match pending.iter().position(|&original_index| equals(&old[original_index], item)) {
			Some(0) => operations.push(Operation::Noop {
				original_index: pending.remove(0),
				index,
				item,
			}),
			Some(offset) => operations.push(Operation::Move {
				original_index: pending.remove(offset),
				from_index: index + offset,
				to_index: index,
				item,
			}),
			None => operations.push(Operation::Add { index, item }),
		}
	}

	for original_index in pending {
		operations.push(Operation::Remove {
			index: new.len(),
			original_index,
			item: &old[original_index],
		});
	}

	operations
}
