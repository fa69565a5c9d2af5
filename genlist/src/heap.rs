use alloc::{collections::BTreeSet, string::String, vec, vec::Vec};

use crate::{
    error::ListError,
    node::{Identity, Node, NodeId},
};

struct Slot {
    identity: Identity,
    node: Option<Node>,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct HeapStats {
    /// Nodes currently allocated.
    pub live: usize,
    /// Vacated slots waiting to be reused.
    pub free: usize,
    /// Slots ever created.
    pub capacity: usize,
}

/// Storage for every node of every generalized list.
///
/// Nodes live in a vector of slots and are addressed by [`NodeId`]. Freed slots go on a free list and are reused by
/// later allocations. Heads carry an explicit reference count; a level is torn down when its count reaches zero.
pub struct Heap {
    slots: Vec<Slot>,
    // Invariant: `free.capacity() >= slots.len()`, so vacating a slot never allocates.
    free: Vec<usize>,
    live: usize,
    limit: Option<usize>,
    seq: u64,
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

impl Heap {
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
            limit: None,
            seq: 0,
        }
    }

    /// A heap that refuses to hold more than `limit` live nodes at once.
    pub const fn with_limit(limit: usize) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
            limit: Some(limit),
            seq: 0,
        }
    }

    pub fn stats(&self) -> HeapStats {
        HeapStats {
            live: self.live,
            free: self.free.len(),
            capacity: self.slots.len(),
        }
    }

    fn next_identity(&mut self) -> Identity {
        self.seq += 1;

        Identity {
            nonce: Self::nonce(),
            generation: self.seq,
        }
    }

    #[cfg(feature = "std")]
    fn nonce() -> u64 {
        rand::random()
    }

    #[cfg(not(feature = "std"))]
    fn nonce() -> u64 {
        use rand::{rngs::OsRng, RngCore};

        OsRng.next_u64()
    }

    pub fn allocate(&mut self, node: Node) -> Result<NodeId, ListError> {
        if self.limit.is_some_and(|limit| self.live >= limit) {
            return Err(ListError::AllocationFailure);
        }

        let tag = node.tag();
        let identity = self.next_identity();

        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index] = Slot {
                    identity,
                    node: Some(node),
                };
                index
            }
            None => {
                self.slots.try_reserve(1)?;
                self.free
                    .try_reserve((self.slots.len() + 1).saturating_sub(self.free.len()))?;

                self.slots.push(Slot {
                    identity,
                    node: Some(node),
                });
                self.slots.len() - 1
            }
        };

        self.live += 1;

        log::trace!("allocated {:?} node in slot {}", tag, index);

        Ok(NodeId { index, identity })
    }

    pub fn is_present(&self, id: NodeId) -> bool {
        self.get(id).is_ok()
    }

    pub fn get(&self, id: NodeId) -> Result<&Node, ListError> {
        match self.slots.get(id.index) {
            Some(Slot {
                identity,
                node: Some(node),
            }) if *identity == id.identity => Ok(node),
            _ => Err(ListError::InvalidReference),
        }
    }

    pub fn get_mut(&mut self, id: NodeId) -> Result<&mut Node, ListError> {
        match self.slots.get_mut(id.index) {
            Some(Slot {
                identity,
                node: Some(node),
            }) if *identity == id.identity => Ok(node),
            _ => Err(ListError::InvalidReference),
        }
    }

    /// Vacates a slot and hands back the node that was in it.
    pub fn free(&mut self, id: NodeId) -> Result<Node, ListError> {
        let node = self
            .slots
            .get_mut(id.index)
            .filter(|slot| slot.identity == id.identity)
            .and_then(|slot| slot.node.take())
            .ok_or(ListError::InvalidReference)?;

        self.free.push(id.index);
        self.live -= 1;

        log::trace!("freed {:?} node in slot {}", node.tag(), id.index);

        Ok(node)
    }

    fn head(&self, head: NodeId) -> Result<(usize, Option<NodeId>), ListError> {
        match self.get(head)? {
            Node::Head { refs, first, .. } => Ok((*refs, *first)),
            _ => Err(ListError::InvalidReference),
        }
    }

    fn head_mut(&mut self, head: NodeId) -> Result<(&mut usize, &mut Option<NodeId>), ListError> {
        match self.get_mut(head)? {
            Node::Head { refs, first, .. } => Ok((refs, first)),
            _ => Err(ListError::InvalidReference),
        }
    }

    fn holders(&self, head: NodeId) -> Result<usize, ListError> {
        match self.get(head)? {
            Node::Head { holders, .. } => Ok(*holders),
            _ => Err(ListError::InvalidReference),
        }
    }

    fn holders_mut(&mut self, head: NodeId) -> Result<&mut usize, ListError> {
        match self.get_mut(head)? {
            Node::Head { holders, .. } => Ok(holders),
            _ => Err(ListError::InvalidReference),
        }
    }

    /// Elements of the level starting at `head`, in order.
    fn level(&self, head: NodeId) -> Result<Level<'_>, ListError> {
        Ok(Level {
            heap: self,
            cursor: self.first(head)?,
        })
    }

    pub fn new_list(&mut self) -> Result<NodeId, ListError> {
        self.allocate(Node::head())
    }

    pub fn first(&self, head: NodeId) -> Result<Option<NodeId>, ListError> {
        self.head(head).map(|(_, first)| first)
    }

    pub fn ref_count(&self, head: NodeId) -> Result<usize, ListError> {
        self.head(head).map(|(refs, _)| refs)
    }

    pub fn len(&self, head: NodeId) -> Result<usize, ListError> {
        self.level(head)?.try_fold(0, |len, entry| entry.map(|_| len + 1))
    }

    /// Adds one owner to `head`.
    pub fn retain(&mut self, head: NodeId) -> Result<(), ListError> {
        let (refs, _) = self.head_mut(head)?;
        *refs += 1;
        Ok(())
    }

    /// Drops one owner from `head`, tearing the level down if that was the last one.
    ///
    /// Teardown walks iteratively: every element of the level is freed, and each sublist it referred to loses one
    /// owner in turn.
    pub fn release(&mut self, head: NodeId) -> Result<(), ListError> {
        let mut pending = vec![head];

        while let Some(head) = pending.pop() {
            let (refs, _) = self.head_mut(head)?;
            *refs -= 1;

            if *refs > 0 {
                continue;
            }

            let mut cursor = match self.free(head)? {
                Node::Head { first, .. } => first,
                _ => return Err(ListError::InvalidReference),
            };

            log::debug!("last owner of list in slot {} released", head.index);

            while let Some(id) = cursor {
                cursor = match self.free(id)? {
                    Node::Atom { next, .. } => next,
                    Node::List { sub, next } => {
                        *self.holders_mut(sub)? -= 1;
                        pending.push(sub);
                        next
                    }
                    Node::Head { .. } => return Err(ListError::InvalidReference),
                };
            }
        }

        Ok(())
    }

    /// Appends `element` to the level at `head`, after `tail` (or as the first element when `tail` is `None`).
    pub(crate) fn link_after(
        &mut self,
        head: NodeId,
        tail: Option<NodeId>,
        element: NodeId,
    ) -> Result<(), ListError> {
        let slot = match tail {
            Some(tail) => self
                .get_mut(tail)?
                .next_mut()
                .ok_or(ListError::InvalidReference)?,
            None => self.head_mut(head)?.1,
        };

        *slot = Some(element);
        Ok(())
    }

    /// Allocates a `List` slot referring to `sub`. The slot takes over one of `sub`'s existing owners; callers that
    /// are not handing one over retain `sub` first.
    pub(crate) fn allocate_slot(&mut self, sub: NodeId, next: Option<NodeId>) -> Result<NodeId, ListError> {
        // `sub` must be a live head before anything is allocated for it.
        self.holders(sub)?;

        let slot = self.allocate(Node::List { sub, next })?;
        *self.holders_mut(sub)? += 1;

        Ok(slot)
    }

    pub fn push_atom(&mut self, head: NodeId, value: char) -> Result<(), ListError> {
        let first = self.first(head)?;
        let atom = self.allocate(Node::Atom { value, next: first })?;

        *self.head_mut(head)?.1 = Some(atom);
        Ok(())
    }

    /// Prepends a slot that shares `sub`. Mutations made through `sub` later remain visible through `head`.
    ///
    /// A level that no slot holds can only be reached from itself, so the cycle walk over `sub` runs only when `head`
    /// is nested somewhere.
    pub fn push_list(&mut self, head: NodeId, sub: NodeId) -> Result<(), ListError> {
        let first = self.first(head)?;
        let cycle = sub == head || (self.holders(head)? > 0 && self.reaches(sub, head)?);

        if cycle {
            log::warn!(
                "refusing to push list in slot {} into list in slot {}: it would contain itself",
                sub.index,
                head.index
            );
            return Err(ListError::WouldCycle);
        }

        let slot = self.allocate_slot(sub, first)?;
        self.retain(sub)?;

        *self.head_mut(head)?.1 = Some(slot);
        Ok(())
    }

    /// Whether `target` is `from` or is nested anywhere inside it.
    pub fn reaches(&self, from: NodeId, target: NodeId) -> Result<bool, ListError> {
        let mut visited = BTreeSet::new();
        let mut pending = vec![from];

        while let Some(head) = pending.pop() {
            if head == target {
                return Ok(true);
            }

            if !visited.insert(head) {
                continue;
            }

            for entry in self.level(head)? {
                if let (_, Node::List { sub, .. }) = entry? {
                    pending.push(*sub);
                }
            }
        }

        Ok(false)
    }

    /// Builds an unshared replica of `source`. Every head in the copy has exactly one owner.
    ///
    /// On failure nothing allocated by the copy stays live.
    pub fn copy_list(&mut self, source: NodeId) -> Result<NodeId, ListError> {
        let copy = self.new_list()?;

        match self.copy_into(source, copy) {
            Ok(()) => Ok(copy),
            Err(error) => {
                log::debug!("copy of list in slot {} failed: {}", source.index, error);
                self.release(copy)?;
                Err(error)
            }
        }
    }

    /// Fills the empty level `copy` with a replica of `source`. Each sublist copy is linked into its parent as soon as
    /// its head exists, so releasing `copy` frees everything made so far.
    fn copy_into(&mut self, source: NodeId, copy: NodeId) -> Result<(), ListError> {
        let mut pending = vec![CopyFrame {
            cursor: self.first(source)?,
            copy,
            tail: None,
        }];

        while let Some(frame) = pending.last_mut() {
            let Some(id) = frame.cursor else {
                pending.pop();
                continue;
            };

            let node = self.get(id)?.clone();

            let (element, next, nested) = match node {
                Node::Atom { value, next } => {
                    (self.allocate(Node::Atom { value, next: None })?, next, None)
                }
                Node::List { sub, next } => {
                    let sub_copy = self.new_list()?;

                    match self.allocate_slot(sub_copy, None) {
                        Ok(element) => (element, next, Some((sub, sub_copy))),
                        Err(error) => {
                            self.release(sub_copy)?;
                            return Err(error);
                        }
                    }
                }
                Node::Head { .. } => return Err(ListError::InvalidReference),
            };

            self.link_after(frame.copy, frame.tail, element)?;
            frame.tail = Some(element);
            frame.cursor = next;

            if let Some((sub, sub_copy)) = nested {
                pending.push(CopyFrame {
                    cursor: self.first(sub)?,
                    copy: sub_copy,
                    tail: None,
                });
            }
        }

        Ok(())
    }

    /// 1 for an empty list, otherwise 1 + the deepest sublist.
    ///
    /// A sublist shared at several positions is walked once per position.
    pub fn depth(&self, head: NodeId) -> Result<usize, ListError> {
        let mut deepest = 0;
        let mut pending = vec![(head, 1)];

        while let Some((head, depth)) = pending.pop() {
            deepest = deepest.max(depth);

            for entry in self.level(head)? {
                if let (_, Node::List { sub, .. }) = entry? {
                    pending.push((*sub, depth + 1));
                }
            }
        }

        Ok(deepest)
    }

    /// Renders `head` as `(e1, e2, ..., en)`.
    pub fn show(&self, head: NodeId) -> Result<String, ListError> {
        let mut out = String::new();
        self.write_list(&mut out, head)?;
        Ok(out)
    }

    fn write_list(&self, out: &mut String, head: NodeId) -> Result<(), ListError> {
        // One cursor per open parenthesis, with whether an element was already written at that level.
        let mut open = vec![(self.first(head)?, false)];
        out.push('(');

        while let Some((cursor, written)) = open.last_mut() {
            let Some(id) = *cursor else {
                out.push(')');
                open.pop();
                continue;
            };

            if *written {
                out.push_str(", ");
            }

            let node = self.get(id)?;
            *cursor = node.next();
            *written = true;

            match node {
                Node::Atom { value, .. } => out.push(*value),
                Node::List { sub, .. } => {
                    out.push('(');
                    open.push((self.first(*sub)?, false));
                }
                Node::Head { .. } => return Err(ListError::InvalidReference),
            }
        }

        Ok(())
    }
}

struct CopyFrame {
    cursor: Option<NodeId>,
    copy: NodeId,
    tail: Option<NodeId>,
}

struct Level<'a> {
    heap: &'a Heap,
    cursor: Option<NodeId>,
}

impl<'a> Iterator for Level<'a> {
    type Item = Result<(NodeId, &'a Node), ListError>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor.take()?;

        Some(match self.heap.get(id) {
            Ok(Node::Head { .. }) => Err(ListError::InvalidReference),
            Ok(node) => {
                self.cursor = node.next();
                Ok((id, node))
            }
            Err(error) => Err(error),
        })
    }
}
