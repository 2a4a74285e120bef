//! Fixed-capacity FIFO of small copyable handles.
//!
//! Every blocking structure in the kernel (ready queues, send-wait queues,
//! event-wait queues) is one of these holding task ids. The queue never owns
//! the records it refers to.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    Full,
    /// The reference element is absent or has nothing behind it.
    NoSuccessor,
}

impl core::fmt::Display for QueueError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            QueueError::Full => write!(f, "Queue full"),
            QueueError::NoSuccessor => write!(f, "No element follows the given element"),
        }
    }
}

/// Ring buffer with room for `N` handles.
#[derive(Debug, Clone)]
pub struct Queue<T: Copy, const N: usize> {
    slots: [Option<T>; N],
    head: usize,
    len: usize,
}

impl<T: Copy, const N: usize> Default for Queue<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy, const N: usize> Queue<T, N> {
    pub const fn new() -> Self {
        Queue {
            slots: [None; N],
            head: 0,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        N
    }

    fn slot(&self, pos: usize) -> usize {
        (self.head + pos) % N
    }

    /// Appends `item` at the back.
    pub fn push_back(&mut self, item: T) -> Result<(), QueueError> {
        if self.len == N {
            return Err(QueueError::Full);
        }
        let tail = self.slot(self.len);
        self.slots[tail] = Some(item);
        self.len += 1;
        Ok(())
    }

    /// Inserts `item` ahead of everything already queued.
    pub fn push_front(&mut self, item: T) -> Result<(), QueueError> {
        if self.len == N {
            return Err(QueueError::Full);
        }
        self.head = (self.head + N - 1) % N;
        self.slots[self.head] = Some(item);
        self.len += 1;
        Ok(())
    }

    pub fn pop_front(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let item = self.slots[self.head].take();
        self.head = (self.head + 1) % N;
        self.len -= 1;
        item
    }

    pub fn peek(&self) -> Option<T> {
        if self.len == 0 {
            None
        } else {
            self.slots[self.head]
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        (0..self.len).filter_map(move |pos| self.slots[self.slot(pos)])
    }

    pub fn clear(&mut self) {
        while self.pop_front().is_some() {}
    }
}

impl<T: Copy + PartialEq, const N: usize> Queue<T, N> {
    pub fn contains(&self, item: T) -> bool {
        self.iter().any(|queued| queued == item)
    }

    pub fn count(&self, item: T) -> usize {
        self.iter().filter(|&queued| queued == item).count()
    }

    /// Moves the element directly behind `parent` to the front of the queue.
    ///
    /// Everything else keeps its relative order.
    pub fn move_to_front(&mut self, parent: T) -> Result<(), QueueError> {
        let parent_pos = self
            .iter()
            .position(|queued| queued == parent)
            .ok_or(QueueError::NoSuccessor)?;
        let target_pos = parent_pos + 1;
        if target_pos >= self.len {
            return Err(QueueError::NoSuccessor);
        }

        let target_slot = self.slot(target_pos);
        let promoted = self.slots[target_slot];
        for pos in (1..=target_pos).rev() {
            let dst = self.slot(pos);
            let src = self.slot(pos - 1);
            self.slots[dst] = self.slots[src];
        }
        self.slots[self.head] = promoted;
        Ok(())
    }
}
