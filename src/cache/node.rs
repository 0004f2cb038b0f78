/// An entry of the recency list. Links are slot indices into the list's arena.
#[derive(Debug)]
pub(crate) struct Node<K, V> {
    key: K,
    value: V,
    pub(crate) prev: Option<usize>,
    pub(crate) next: Option<usize>,
}

impl<K, V> Node<K, V> {
    pub(crate) fn new(key: K, value: V, prev: Option<usize>, next: Option<usize>) -> Self {
        Self {
            key,
            value,
            prev,
            next,
        }
    }

    pub(crate) fn into_entry(self) -> (K, V) {
        (self.key, self.value)
    }

    pub(crate) fn key(&self) -> &K {
        &self.key
    }

    pub(crate) fn value(&self) -> &V {
        &self.value
    }

    pub(crate) fn value_mut(&mut self) -> &mut V {
        &mut self.value
    }

    pub(crate) fn unlinked(&mut self) {
        self.prev = None;
        self.next = None;
    }
}

/// A slot of the arena. The generation is bumped every time the slot's node is released, which
/// invalidates all handles pointing at the old node.
#[derive(Debug)]
pub(crate) struct Slot<K, V> {
    pub(crate) generation: u32,
    pub(crate) node: Option<Node<K, V>>,
}

impl<K, V> Slot<K, V> {
    pub(crate) fn occupied(node: Node<K, V>) -> Self {
        Self {
            generation: 0,
            node: Some(node),
        }
    }
}
