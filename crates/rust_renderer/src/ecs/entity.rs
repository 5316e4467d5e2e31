//! Entity identifier

/// Entity identifier
///
/// An entity carries no data of its own. Its id doubles as the index into the
/// per-entity redirection table of every component pool and into the
/// per-frame object buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Entity {
    id: u32,
}

impl Entity {
    pub(crate) const fn new(id: u32) -> Self {
        Self { id }
    }

    /// Get the entity ID
    #[must_use]
    pub const fn id(self) -> u32 {
        self.id
    }

    /// The entity ID as a table index
    #[must_use]
    pub const fn index(self) -> usize {
        self.id as usize
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({})", self.id)
    }
}
