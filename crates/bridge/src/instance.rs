//! Engine instances and the table that owns them.
//!
//! Each instance carries its own arena, reset between runs, so one run's
//! grammar structures never leak into the next. Handles are move-only: the
//! only way to get one is [`InstanceTable::create`], and destroying an
//! instance consumes its handle, so a destroyed instance cannot be named
//! again without going through the table's error path.

use bumpalo::Bump;
use hashbrown::HashMap;

/// Opaque handle to a live engine instance.
///
/// Deliberately not `Clone` or `Copy`: a handle is a capability, and
/// [`InstanceTable::destroy`] takes it by value.
#[derive(PartialEq, Eq, Debug)]
pub struct InstanceHandle(u32);

impl InstanceHandle {
    /// Raw id, for logging
    pub fn id(&self) -> u32 {
        self.0
    }
}

/// A single engine instance: an arena plus run statistics.
pub struct Instance {
    arena: Bump,
    runs: u64,
}

impl Instance {
    fn new() -> Self {
        Self {
            arena: Bump::new(),
            runs: 0,
        }
    }

    /// Reset the arena for a fresh run and borrow it.
    pub fn fresh_arena(&mut self) -> &Bump {
        self.arena.reset();
        self.runs += 1;
        &self.arena
    }

    /// Number of runs this instance has served
    pub fn runs(&self) -> u64 {
        self.runs
    }
}

/// Table of live instances. Ids are monotonic and never recycled, so a
/// stale id can never alias a newer instance.
pub struct InstanceTable {
    instances: HashMap<u32, Instance>,
    next_id: u32,
}

impl InstanceTable {
    pub fn new() -> Self {
        Self {
            instances: HashMap::new(),
            // 0 is reserved as "no instance"
            next_id: 1,
        }
    }

    pub fn create(&mut self) -> InstanceHandle {
        let id = self.next_id;
        self.next_id += 1;
        self.instances.insert(id, Instance::new());
        InstanceHandle(id)
    }

    pub fn get_mut(&mut self, handle: &InstanceHandle) -> Option<&mut Instance> {
        self.instances.get_mut(&handle.0)
    }

    /// Destroy an instance, consuming its handle. Returns false if the id
    /// was not live (possible when ids arrive over the boundary as raw
    /// integers rather than through [`create`]).
    pub fn destroy(&mut self, handle: InstanceHandle) -> bool {
        self.instances.remove(&handle.0).is_some()
    }

    /// Rehydrate a handle from a raw id that crossed the boundary. Returns
    /// `None` when no such instance is live.
    pub fn handle_from_raw(&self, id: u32) -> Option<InstanceHandle> {
        if self.instances.contains_key(&id) {
            Some(InstanceHandle(id))
        } else {
            None
        }
    }

    pub fn live_count(&self) -> usize {
        self.instances.len()
    }
}

impl Default for InstanceTable {
    fn default() -> Self {
        Self::new()
    }
}
