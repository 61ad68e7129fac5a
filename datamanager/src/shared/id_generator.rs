/// An integer type that can be handed out by an [`IdGenerator`].
pub trait GeneratedId: Copy + Ord {
    /// The first ID handed out. Zero is reserved by the simulator for
    /// "unused" and for the user object, therefore generation starts at one.
    const FIRST: Self;

    fn successor(self) -> Self;
}

impl GeneratedId for u32 {
    const FIRST: Self = 1;

    fn successor(self) -> Self {
        self + 1
    }
}

impl GeneratedId for u64 {
    const FIRST: Self = 1;

    fn successor(self) -> Self {
        self + 1
    }
}

/// Hands out strictly increasing IDs which are never reused during the lifetime
/// of the generator.
#[derive(Debug)]
pub struct IdGenerator<T: GeneratedId> {
    next: T,
}
impl<T: GeneratedId> IdGenerator<T> {
    pub fn new() -> Self {
        Self { next: T::FIRST }
    }

    pub fn next_id(&mut self) -> T {
        let id = self.next;
        self.next = id.successor();
        id
    }
}
impl<T: GeneratedId> Default for IdGenerator<T> {
    fn default() -> Self {
        Self::new()
    }
}
