//! Doubly linked list stored in a slab arena
//!
//! Nodes keep the indices of their neighbours instead of pointers, so
//! insertion at the tail and removal of any node are both O(1). A [`Key`] is
//! valid until its node is removed; the slot may be reused afterwards.

use slab::Slab;

/// Index of a node in a [`LinkedList`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key(usize);

#[derive(Debug)]
struct Node<T> {
    value: T,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Arena backed doubly linked list
#[derive(Debug)]
pub struct LinkedList<T> {
    nodes: Slab<Node<T>>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl<T> Default for LinkedList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LinkedList<T> {
    /// Creates an empty list
    pub fn new() -> Self {
        Self {
            nodes: Slab::new(),
            head: None,
            tail: None,
        }
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the list is empty
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Appends a value and returns its key
    pub fn push_back(&mut self, value: T) -> Key {
        let index = self.nodes.insert(Node {
            value,
            prev: self.tail,
            next: None,
        });
        match self.tail {
            Some(tail) => self.nodes[tail].next = Some(index),
            None => self.head = Some(index),
        }
        self.tail = Some(index);
        Key(index)
    }

    /// Unlinks a node
    pub fn remove(&mut self, key: Key) -> Option<T> {
        let node = self.nodes.try_remove(key.0)?;
        match node.prev {
            Some(prev) => self.nodes[prev].next = node.next,
            None => self.head = node.next,
        }
        match node.next {
            Some(next) => self.nodes[next].prev = node.prev,
            None => self.tail = node.prev,
        }
        Some(node.value)
    }

    /// Removes the first value
    pub fn pop_front(&mut self) -> Option<T> {
        let head = self.head?;
        self.remove(Key(head))
    }

    /// Key of the first node
    pub fn first(&self) -> Option<Key> {
        self.head.map(Key)
    }

    /// Key of the node that follows `key`
    pub fn next(&self, key: Key) -> Option<Key> {
        self.nodes.get(key.0).and_then(|node| node.next).map(Key)
    }

    /// Reference to the first value
    pub fn front(&self) -> Option<&T> {
        self.head.map(|head| &self.nodes[head].value)
    }

    /// Reference to a value
    pub fn get(&self, key: Key) -> Option<&T> {
        self.nodes.get(key.0).map(|node| &node.value)
    }

    /// Mutable reference to a value
    pub fn get_mut(&mut self, key: Key) -> Option<&mut T> {
        self.nodes.get_mut(key.0).map(|node| &mut node.value)
    }

    /// Iterates from head to tail
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }

    /// Keeps only the values for which `f` returns true
    pub fn retain(&mut self, mut f: impl FnMut(&mut T) -> bool) {
        let mut cursor = self.head;
        while let Some(index) = cursor {
            cursor = self.nodes[index].next;
            if !f(&mut self.nodes[index].value) {
                self.remove(Key(index));
            }
        }
    }

    /// Removes every value in order
    pub fn drain(&mut self) -> Vec<T> {
        let mut values = Vec::with_capacity(self.len());
        while let Some(value) = self.pop_front() {
            values.push(value);
        }
        values
    }
}

/// Iterator over the keys and values of a [`LinkedList`]
#[derive(Debug)]
pub struct Iter<'a, T> {
    list: &'a LinkedList<T>,
    cursor: Option<usize>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (Key, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.cursor?;
        let list: &'a LinkedList<T> = self.list;
        let node = &list.nodes[index];
        self.cursor = node.next;
        Some((Key(index), &node.value))
    }
}

#[cfg(test)]
mod tests {
    use rand::Rng;

    use super::*;

    fn values(list: &LinkedList<u32>) -> Vec<u32> {
        list.iter().map(|(_, v)| *v).collect()
    }

    #[test]
    fn remove_head_middle_and_tail() {
        let mut list = LinkedList::new();
        let a = list.push_back(1);
        let b = list.push_back(2);
        let c = list.push_back(3);
        let d = list.push_back(4);

        assert_eq!(list.remove(b), Some(2));
        assert_eq!(values(&list), vec![1, 3, 4]);
        assert_eq!(list.remove(a), Some(1));
        assert_eq!(list.front(), Some(&3));
        assert_eq!(list.remove(d), Some(4));
        assert_eq!(values(&list), vec![3]);
        assert_eq!(list.next(c), None);
        assert_eq!(list.remove(c), Some(3));
        assert!(list.is_empty());
        assert_eq!(list.remove(c), None);

        list.push_back(5);
        assert_eq!(values(&list), vec![5]);
    }

    #[test]
    fn retain_and_drain_keep_order() {
        let mut list = LinkedList::new();
        for i in 0..10 {
            list.push_back(i);
        }
        list.retain(|v| *v % 3 != 0);
        assert_eq!(values(&list), vec![1, 2, 4, 5, 7, 8]);
        assert_eq!(list.drain(), vec![1, 2, 4, 5, 7, 8]);
        assert!(list.is_empty());
        assert_eq!(list.first(), None);
    }

    #[test]
    fn random_operations_match_vec() {
        let mut rng = rand::thread_rng();
        let mut list = LinkedList::new();
        let mut model: Vec<(Key, u32)> = Vec::new();

        for i in 0..1000u32 {
            if model.is_empty() || rng.gen_bool(0.6) {
                let key = list.push_back(i);
                model.push((key, i));
            } else {
                let index = rng.gen_range(0..model.len());
                let (key, value) = model.remove(index);
                assert_eq!(list.remove(key), Some(value));
            }
            assert_eq!(list.len(), model.len());
        }
        let expected: Vec<u32> = model.iter().map(|(_, v)| *v).collect();
        assert_eq!(values(&list), expected);
    }
}
