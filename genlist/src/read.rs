//! Reads generalized lists written as `(a, (b, c), d)`.
//!
//! ```text
//! List    := '(' ')' | '(' Element (',' Element)* ')'
//! Element := Atom | List
//! Atom    := any single character except '(', ')' and ','
//! ```
//!
//! Whitespace may precede any token. An atom is always exactly one character, and never whitespace: a blank where an
//! atom belongs is skipped like any other.

use crate::{
    error::{ListError, ParseError, ParseErrorKind},
    heap::Heap,
    node::{Node, NodeId},
};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReaderConfig {
    /// Deepest nesting accepted, counting the outermost list as 1.
    pub max_nesting: usize,
}

impl ReaderConfig {
    pub const DEFAULT_MAX_NESTING: usize = 512;

    #[must_use]
    pub fn with_max_nesting(mut self, max_nesting: usize) -> Self {
        self.max_nesting = max_nesting;
        self
    }
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            max_nesting: Self::DEFAULT_MAX_NESTING,
        }
    }
}

/// Parses `text` into a new list on `heap` and returns its head, owned once by the caller.
///
/// On error every node allocated along the way has already been released.
pub fn read_list(heap: &mut Heap, text: &str, config: &ReaderConfig) -> Result<NodeId, ListError> {
    let mut reader = Reader {
        input: text,
        pos: 0,
        config,
    };

    let result = reader.list(heap, 0).and_then(|head| {
        reader.skip_whitespace();

        match reader.peek() {
            None => Ok(head),
            Some(found) => {
                heap.release(head)?;
                Err(reader.error(ParseErrorKind::TrailingInput { found }))
            }
        }
    });

    if let Err(error) = &result {
        log::debug!("failed to read list {:?}: {}", text, error);
    }

    result
}

struct Reader<'a> {
    input: &'a str,
    pos: usize,
    config: &'a ReaderConfig,
}

impl Reader<'_> {
    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn error(&self, kind: ParseErrorKind) -> ListError {
        ListError::Parse(ParseError {
            position: self.pos,
            kind,
        })
    }

    fn list(&mut self, heap: &mut Heap, nesting: usize) -> Result<NodeId, ListError> {
        self.skip_whitespace();

        match self.peek() {
            Some('(') if nesting >= self.config.max_nesting => {
                return Err(self.error(ParseErrorKind::TooDeep {
                    limit: self.config.max_nesting,
                }))
            }
            Some('(') => {
                self.bump();
            }
            Some(found) => return Err(self.error(ParseErrorKind::MissingOpen { found })),
            None => return Err(self.error(ParseErrorKind::UnexpectedEnd)),
        }

        let head = heap.new_list()?;

        match self.elements(heap, head, nesting) {
            Ok(()) => Ok(head),
            Err(error) => {
                heap.release(head)?;
                Err(error)
            }
        }
    }

    fn elements(&mut self, heap: &mut Heap, head: NodeId, nesting: usize) -> Result<(), ListError> {
        self.skip_whitespace();

        if self.peek() == Some(')') {
            self.bump();
            return Ok(());
        }

        let mut tail = None;

        loop {
            let element = self.element(heap, nesting)?;
            heap.link_after(head, tail, element)?;
            tail = Some(element);

            self.skip_whitespace();

            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some(')') => {
                    self.bump();
                    return Ok(());
                }
                Some(found) => return Err(self.error(ParseErrorKind::MissingSeparator { found })),
                None => return Err(self.error(ParseErrorKind::MissingClose)),
            }
        }
    }

    fn element(&mut self, heap: &mut Heap, nesting: usize) -> Result<NodeId, ListError> {
        self.skip_whitespace();

        match self.peek() {
            Some('(') => {
                // The slot adopts the count the sublist was created with.
                let sub = self.list(heap, nesting + 1)?;

                match heap.allocate_slot(sub, None) {
                    Ok(slot) => Ok(slot),
                    Err(error) => {
                        heap.release(sub)?;
                        Err(error)
                    }
                }
            }
            Some(found @ (')' | ',')) => {
                Err(self.error(ParseErrorKind::UnexpectedDelimiter { found }))
            }
            Some(value) => {
                self.bump();
                heap.allocate(Node::Atom { value, next: None })
            }
            None => Err(self.error(ParseErrorKind::UnexpectedEnd)),
        }
    }
}
