/// Stamped on a heap slot each time it is allocated.
///
/// A slot that is freed and reused gets a new identity, so a [`NodeId`] that outlived its node never resolves to
/// whatever was allocated in its place.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Identity {
    pub nonce: u64,
    pub generation: u64,
}

/// A handle to one node in a [`Heap`](crate::heap::Heap).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct NodeId {
    pub(crate) index: usize,
    pub(crate) identity: Identity,
}

impl NodeId {
    #[must_use]
    pub fn index(self) -> usize {
        self.index
    }

    #[must_use]
    pub fn identity(self) -> Identity {
        self.identity
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Tag {
    Head,
    Atom,
    List,
}

/// One node of a generalized list.
///
/// A `Head` starts a level and carries the sharing count. `Atom` and `List` are the elements of a level, chained
/// through `next`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Node {
    Head {
        /// Owners of the level: handles plus `List` slots.
        refs: usize,
        /// How many of those owners are `List` slots.
        holders: usize,
        first: Option<NodeId>,
    },
    Atom {
        value: char,
        next: Option<NodeId>,
    },
    List {
        sub: NodeId,
        next: Option<NodeId>,
    },
}

impl Node {
    /// A fresh, empty level owned by whoever asked for it.
    pub const fn head() -> Self {
        Node::Head {
            refs: 1,
            holders: 0,
            first: None,
        }
    }

    pub fn tag(&self) -> Tag {
        match self {
            Node::Head { .. } => Tag::Head,
            Node::Atom { .. } => Tag::Atom,
            Node::List { .. } => Tag::List,
        }
    }

    /// The following sibling. Heads have no siblings.
    pub fn next(&self) -> Option<NodeId> {
        match self {
            Node::Head { .. } => None,
            Node::Atom { next, .. } | Node::List { next, .. } => *next,
        }
    }

    pub(crate) fn next_mut(&mut self) -> Option<&mut Option<NodeId>> {
        match self {
            Node::Head { .. } => None,
            Node::Atom { next, .. } | Node::List { next, .. } => Some(next),
        }
    }
}
