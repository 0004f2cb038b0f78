use crate::cache::node::{Node, Slot};
use std::iter::FusedIterator;
use std::mem;

/// A reference to a node of a [`RecencyList`].
///
/// Handles stay valid until their node is removed from the list. After that the handle is stale:
/// every operation given a stale handle is a no-op, even if the node's slot got reused in the
/// meantime.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeHandle {
    index: usize,
    generation: u32,
}

/// Doubly-linked list of key-value pairs ordered from least recently used (front) to most
/// recently used (back).
///
/// Nodes are stored in an arena and linked by their slot index, which keeps insertion, removal
/// and relocation O(1) without any reference juggling. Freed slots are recycled.
#[derive(Debug)]
pub struct RecencyList<K, V> {
    slots: Vec<Slot<K, V>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl<K, V> Default for RecencyList<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> RecencyList<K, V> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty list with room for `capacity` nodes before the arena reallocates.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns a handle to the least recently used node.
    pub fn front(&self) -> Option<NodeHandle> {
        self.head.map(|index| self.handle(index))
    }

    /// Returns a handle to the most recently used node.
    pub fn back(&self) -> Option<NodeHandle> {
        self.tail.map(|index| self.handle(index))
    }

    /// Appends a node after the current back.
    pub fn push_back(&mut self, key: K, value: V) -> NodeHandle {
        let index = self.allocate(Node::new(key, value, self.tail, None));

        match self.tail {
            Some(tail) => self.node_mut(tail).next = Some(index),
            None => self.head = Some(index),
        }

        self.tail = Some(index);
        self.len += 1;
        self.handle(index)
    }

    /// Prepends a node before the current front.
    pub fn push_front(&mut self, key: K, value: V) -> NodeHandle {
        let index = self.allocate(Node::new(key, value, None, self.head));

        match self.head {
            Some(head) => self.node_mut(head).prev = Some(index),
            None => self.tail = Some(index),
        }

        self.head = Some(index);
        self.len += 1;
        self.handle(index)
    }

    /// Removes the front node and returns its key and value.
    ///
    /// If the list is empty, [None] is returned.
    pub fn pop_front(&mut self) -> Option<(K, V)> {
        let head = self.head?;
        Some(self.release(head))
    }

    /// Removes the back node and returns its key and value.
    ///
    /// If the list is empty, [None] is returned.
    pub fn pop_back(&mut self) -> Option<(K, V)> {
        let tail = self.tail?;
        Some(self.release(tail))
    }

    /// Relinks the node as the new back of the list.
    ///
    /// Returns `false` if the handle is stale.
    pub fn move_to_back(&mut self, handle: NodeHandle) -> bool {
        let Some(index) = self.resolve(handle) else {
            return false;
        };

        if self.tail == Some(index) {
            return true;
        }

        self.unlink(index);

        let tail = self.tail;
        let node = self.node_mut(index);
        node.prev = tail;

        match tail {
            Some(tail) => self.node_mut(tail).next = Some(index),
            None => self.head = Some(index),
        }

        self.tail = Some(index);
        true
    }

    /// Unlinks the node from any position and returns its key and value.
    ///
    /// Returns [None] if the handle is stale.
    pub fn remove(&mut self, handle: NodeHandle) -> Option<(K, V)> {
        let index = self.resolve(handle)?;
        Some(self.release(index))
    }

    /// Reverses the direction of the list in place.
    pub fn reverse(&mut self) {
        let mut cursor = self.head;

        while let Some(index) = cursor {
            let node = self.node_mut(index);
            mem::swap(&mut node.prev, &mut node.next);
            // prev now holds the old next
            cursor = node.prev;
        }

        mem::swap(&mut self.head, &mut self.tail);
    }

    pub fn get(&self, handle: NodeHandle) -> Option<(&K, &V)> {
        let index = self.resolve(handle)?;
        let node = self.node(index);
        Some((node.key(), node.value()))
    }

    pub fn get_mut(&mut self, handle: NodeHandle) -> Option<&mut V> {
        let index = self.resolve(handle)?;
        Some(self.node_mut(index).value_mut())
    }

    /// Removes all nodes. Every handle handed out so far becomes stale.
    pub fn clear(&mut self) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.node.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index);
            }
        }

        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    /// Iterates from the least to the most recently used node.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            list: self,
            front: self.head,
            back: self.tail,
            remaining: self.len,
        }
    }

    fn allocate(&mut self, node: Node<K, V>) -> usize {
        match self.free.pop() {
            Some(index) => {
                self.slots[index].node = Some(node);
                index
            }
            None => {
                self.slots.push(Slot::occupied(node));
                self.slots.len() - 1
            }
        }
    }

    fn release(&mut self, index: usize) -> (K, V) {
        self.unlink(index);

        let slot = &mut self.slots[index];
        slot.generation = slot.generation.wrapping_add(1);
        let node = slot
            .node
            .take()
            .expect("a linked index must point at an occupied slot");

        self.free.push(index);
        self.len -= 1;

        node.into_entry()
    }

    fn unlink(&mut self, index: usize) {
        let node = self.node_mut(index);
        let (prev, next) = (node.prev, node.next);
        node.unlinked();

        match prev {
            Some(prev) => self.node_mut(prev).next = next,
            None => self.head = next,
        }

        match next {
            Some(next) => self.node_mut(next).prev = prev,
            None => self.tail = prev,
        }
    }

    fn resolve(&self, handle: NodeHandle) -> Option<usize> {
        self.slots
            .get(handle.index)
            .filter(|slot| slot.generation == handle.generation && slot.node.is_some())
            .map(|_| handle.index)
    }

    fn handle(&self, index: usize) -> NodeHandle {
        NodeHandle {
            index,
            generation: self.slots[index].generation,
        }
    }

    fn node(&self, index: usize) -> &Node<K, V> {
        self.slots[index]
            .node
            .as_ref()
            .expect("a linked index must point at an occupied slot")
    }

    fn node_mut(&mut self, index: usize) -> &mut Node<K, V> {
        self.slots[index]
            .node
            .as_mut()
            .expect("a linked index must point at an occupied slot")
    }
}

impl<'a, K, V> IntoIterator for &'a RecencyList<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the entries of a [`RecencyList`], least recently used first.
#[derive(Debug)]
pub struct Iter<'a, K, V> {
    list: &'a RecencyList<K, V>,
    front: Option<usize>,
    back: Option<usize>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let node = self.list.node(self.front?);
        self.front = node.next;
        self.remaining -= 1;

        Some((node.key(), node.value()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> DoubleEndedIterator for Iter<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let node = self.list.node(self.back?);
        self.back = node.prev;
        self.remaining -= 1;

        Some((node.key(), node.value()))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> FusedIterator for Iter<'_, K, V> {}
