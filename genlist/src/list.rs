use core::{fmt, marker::PhantomData, str::FromStr};

use crate::{
    error::ListError,
    heap::Heap,
    lock_default_heap,
    node::{Node, NodeId},
    read::{read_list, ReaderConfig},
};

/// An owning handle to a generalized list on the default heap.
///
/// Each handle owns one count on its head. Dropping the last owner of a head tears down the level and releases
/// every sublist it referred to.
///
/// [`push_list`](Self::push_list) and [`share`](Self::share) share structure: mutations made through any owner of a
/// head are visible through all of them. [`Clone`] and [`assign_from`](Self::assign_from) make deep, unshared
/// copies.
pub struct GenList {
    head: NodeId,
}

/// Names one element of one list level.
///
/// Obtained from [`GenList::first`] and [`GenList::next`]. A reference is only accepted by handles on the level it
/// came from, and only while the element is still alive.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct ElementRef {
    node: NodeId,
    level: NodeId,
}

impl ElementRef {
    /// Checks whether the element still exists.
    ///
    /// NOTE: the element may be released at any time after this returns if its last owner is dropped.
    pub fn is_present(&self) -> bool {
        lock_default_heap(|heap| heap.is_present(self.level) && heap.is_present(self.node))
    }
}

#[derive(Debug)]
pub enum Element {
    Atom(char),
    /// A handle sharing the sublist held in the slot.
    List(GenList),
}

impl Element {
    pub fn as_atom(&self) -> Option<char> {
        match self {
            Element::Atom(value) => Some(*value),
            Element::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&GenList> {
        match self {
            Element::Atom(_) => None,
            Element::List(list) => Some(list),
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Atom(value) => write!(f, "{value}"),
            Element::List(list) => fmt::Display::fmt(list, f),
        }
    }
}

enum Resolved {
    Atom(char),
    // Already retained on behalf of the new handle.
    List(NodeId),
}

impl Resolved {
    fn into_element(self) -> Element {
        match self {
            Resolved::Atom(value) => Element::Atom(value),
            Resolved::List(head) => Element::List(GenList { head }),
        }
    }
}

fn resolve(heap: &mut Heap, node: NodeId) -> Result<(Resolved, Option<NodeId>), ListError> {
    let node = heap.get(node)?.clone();

    match node {
        Node::Atom { value, next } => Ok((Resolved::Atom(value), next)),
        Node::List { sub, next } => {
            heap.retain(sub)?;
            Ok((Resolved::List(sub), next))
        }
        Node::Head { .. } => Err(ListError::InvalidReference),
    }
}

/// Handles always own a live head, so heap lookups on their own head cannot fail unless the heap is corrupt.
fn live<T>(result: Result<T, ListError>) -> T {
    result.unwrap_or_else(|error| panic!("generalized list handle refers to a dead head: {error}"))
}

impl GenList {
    /// Creates an empty list.
    pub fn new() -> Result<Self, ListError> {
        lock_default_heap(|heap| heap.new_list()).map(|head| Self { head })
    }

    /// Parses `(a, (b, c), d)` notation with the default [`ReaderConfig`].
    pub fn parse(text: &str) -> Result<Self, ListError> {
        Self::parse_with(text, &ReaderConfig::default())
    }

    pub fn parse_with(text: &str, config: &ReaderConfig) -> Result<Self, ListError> {
        lock_default_heap(|heap| read_list(heap, text, config)).map(|head| Self { head })
    }

    /// Makes an unshared deep copy.
    pub fn try_clone(&self) -> Result<Self, ListError> {
        lock_default_heap(|heap| heap.copy_list(self.head)).map(|head| Self { head })
    }

    /// Replaces this handle's contents with a deep copy of `source`.
    ///
    /// The copy is taken before the old contents are released, so `source` may share this handle's head.
    pub fn assign_from(&mut self, source: &GenList) -> Result<(), ListError> {
        lock_default_heap(|heap| {
            let copy = heap.copy_list(source.head)?;
            let released = heap.release(self.head);
            self.head = copy;
            released
        })
    }

    /// Replaces this handle's contents with a list parsed from `text`.
    ///
    /// On error the handle is left untouched.
    pub fn set_from_text(&mut self, text: &str, config: &ReaderConfig) -> Result<(), ListError> {
        lock_default_heap(|heap| {
            let head = read_list(heap, text, config)?;
            let released = heap.release(self.head);
            self.head = head;
            released
        })
    }

    /// Another owner of the same head.
    pub fn share(&self) -> Self {
        live(lock_default_heap(|heap| heap.retain(self.head)));
        Self { head: self.head }
    }

    /// Whether both handles own the same head.
    pub fn ptr_eq(&self, other: &GenList) -> bool {
        self.head == other.head
    }

    /// Number of owners of this handle's head, including this one.
    pub fn ref_count(&self) -> usize {
        live(lock_default_heap(|heap| heap.ref_count(self.head)))
    }

    pub fn is_empty(&self) -> bool {
        self.first().is_none()
    }

    /// Number of elements on this level. Sublists count as one element each.
    pub fn len(&self) -> usize {
        live(lock_default_heap(|heap| heap.len(self.head)))
    }

    pub fn first(&self) -> Option<ElementRef> {
        live(lock_default_heap(|heap| heap.first(self.head))).map(|node| ElementRef {
            node,
            level: self.head,
        })
    }

    /// The element following `elem`, if any.
    pub fn next(&self, elem: ElementRef) -> Result<Option<ElementRef>, ListError> {
        self.check(elem)?;

        lock_default_heap(|heap| heap.get(elem.node).map(Node::next)).map(|next| {
            next.map(|node| ElementRef {
                node,
                level: self.head,
            })
        })
    }

    pub fn element(&self, elem: ElementRef) -> Result<Element, ListError> {
        self.check(elem)?;

        lock_default_heap(|heap| resolve(heap, elem.node)).map(|(resolved, _)| resolved.into_element())
    }

    fn check(&self, elem: ElementRef) -> Result<(), ListError> {
        if elem.level == self.head {
            Ok(())
        } else {
            Err(ListError::InvalidReference)
        }
    }

    pub fn iter(&self) -> Elements<'_> {
        Elements {
            _list: PhantomData,
            cursor: live(lock_default_heap(|heap| heap.first(self.head))),
        }
    }

    /// Prepends an atom. Any character is accepted, though a whitespace atom shows as text that
    /// [`parse`](Self::parse) will not read back.
    pub fn push_atom(&mut self, value: char) -> Result<(), ListError> {
        lock_default_heap(|heap| heap.push_atom(self.head, value))
    }

    /// Prepends a slot that shares `sub`.
    ///
    /// `sub` keeps its own count and stays usable; anything pushed onto it later shows up here too. Fails with
    /// [`ListError::WouldCycle`] if this list is `sub` or is nested inside it.
    ///
    /// Constant time while this list is not itself a sublist of anything. Otherwise the push first walks all of `sub`
    /// looking for this list, so it costs O(size of `sub`).
    pub fn push_list(&mut self, sub: &GenList) -> Result<(), ListError> {
        lock_default_heap(|heap| heap.push_list(self.head, sub.head))
    }

    /// 1 for an empty list, otherwise 1 + the depth of the deepest sublist.
    pub fn depth(&self) -> usize {
        live(lock_default_heap(|heap| heap.depth(self.head)))
    }
}

impl Default for GenList {
    fn default() -> Self {
        Self::new().unwrap_or_else(|error| panic!("failed to allocate an empty list: {error}"))
    }
}

impl Clone for GenList {
    fn clone(&self) -> Self {
        self.try_clone()
            .unwrap_or_else(|error| panic!("failed to copy list: {error}"))
    }

    fn clone_from(&mut self, source: &Self) {
        if let Err(error) = self.assign_from(source) {
            panic!("failed to copy list: {error}");
        }
    }
}

impl Drop for GenList {
    fn drop(&mut self) {
        if let Err(error) = lock_default_heap(|heap| heap.release(self.head)) {
            log::error!(
                "failed to release list in slot {}: {}",
                self.head.index(),
                error
            );
        }
    }
}

impl FromStr for GenList {
    type Err = ListError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for GenList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = lock_default_heap(|heap| heap.show(self.head)).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

impl fmt::Debug for GenList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GenList({self})")
    }
}

impl<'a> IntoIterator for &'a GenList {
    type Item = Element;
    type IntoIter = Elements<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterates the elements of one level. Sublists come out as shared handles.
pub struct Elements<'a> {
    // Borrowing the list keeps its level, and with it every element on the level, alive.
    _list: PhantomData<&'a GenList>,
    cursor: Option<NodeId>,
}

impl Iterator for Elements<'_> {
    type Item = Element;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.cursor.take()?;

        let (resolved, next) = live(lock_default_heap(|heap| resolve(heap, node)));
        self.cursor = next;

        Some(resolved.into_element())
    }
}
