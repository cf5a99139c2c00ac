use indexmap::IndexSet;

/// A pair of reusable token sets for class diffs, so that patching doesn't allocate once the capacity has settled.
pub struct TempTokenSets(IndexSet<&'static str>, IndexSet<&'static str>);
impl TempTokenSets {
	pub fn new() -> Self {
		Self(IndexSet::new(), IndexSet::new())
	}

	pub fn temp<'a>(&mut self) -> (&mut IndexSet<&'a str>, &mut IndexSet<&'a str>) {
		self.0.clear();
		self.1.clear();
		unsafe {
			//SAFETY: Both sets are cleared before each borrow, so no tokens can leak between them.
			// Dropping a set with stale entries never dereferences them.
			(
				&mut *(&mut self.0 as *mut IndexSet<&'static str>).cast::<IndexSet<&'a str>>(),
				&mut *(&mut self.1 as *mut IndexSet<&'static str>).cast::<IndexSet<&'a str>>(),
			)
		}
	}

	/// Retrieves the combined capacity without clearing first.
	pub fn capacity(&self) -> usize {
		self.0.capacity() + self.1.capacity()
	}
}

impl core::fmt::Debug for TempTokenSets {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("TempTokenSets").field("capacity", &self.capacity()).finish()
	}
}
