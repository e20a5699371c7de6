use std::{cell::Cell, fmt, rc::Rc};

/// Opaque resource handle.
///
/// Every server-side object (texture, canvas, item, layer, viewport) is addressed by a `Rid`.
/// Handles are strictly increasing and never reused within a process; `0` is the null handle.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct Rid(pub u64);

impl Rid {
    /// The null handle. Never returned by [`HandleAllocator::allocate`].
    pub const INVALID: Rid = Rid(0);

    pub fn is_valid(self) -> bool {
        self.0 > 0
    }

    pub fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Rid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rid({})", self.0)
    }
}

/// Monotonic handle counter shared by the server subsystems.
///
/// Cloning yields another view onto the same counter, so storage, cull and viewport
/// subsystems draw from one sequence without any global state. Single-threaded (`Rc`).
#[derive(Clone, Debug)]
pub struct HandleAllocator {
    next: Rc<Cell<u64>>,
}

impl Default for HandleAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl HandleAllocator {
    pub fn new() -> Self {
        Self {
            next: Rc::new(Cell::new(1)),
        }
    }

    /// Issue the next handle, starting at 1.
    pub fn allocate(&self) -> Rid {
        let id = self.next.get();
        self.next.set(id.saturating_add(1));
        Rid(id)
    }

    /// Number of handles issued so far.
    pub fn issued(&self) -> u64 {
        self.next.get() - 1
    }
}
