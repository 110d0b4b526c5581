//! Fixed-capacity binary heap ordered by a caller-supplied comparator.
//!
//! `BoundedPriorityQueue` is a max-heap with respect to its comparator: the
//! element that compares `Greater` than every other is dequeued first. The
//! capacity is validated once at construction and must be an exact power of
//! two. Backing storage grows on demand up to that capacity and is never
//! released by `clear`.
//!
//! There is no secondary index, so decrease-key is not supported; a re-scored
//! element is simply enqueued again.

use std::cmp::Ordering;
use thiserror::Error;

/// Errors reported by [`BoundedPriorityQueue`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    #[error("queue capacity {0} is not a power of two")]
    CapacityNotPowerOfTwo(usize),
    #[error("queue is full (capacity {capacity})")]
    Full { capacity: usize },
    #[error("queue is empty")]
    Empty,
}

/// An array-backed binary heap with a hard element limit.
pub struct BoundedPriorityQueue<T, F>
where
    F: Fn(&T, &T) -> Ordering,
{
    data: Vec<T>,
    capacity: usize,
    compare: F,
}

impl<T, F> BoundedPriorityQueue<T, F>
where
    F: Fn(&T, &T) -> Ordering,
{
    /// Creates an empty queue.
    ///
    /// # Arguments
    /// * `capacity`: maximum number of elements; must be a power of two.
    /// * `compare`: returns `Greater` when the first argument has strictly
    ///   higher priority than the second.
    ///
    /// # Returns
    /// * `Err(QueueError::CapacityNotPowerOfTwo)` for `0` or any other value
    ///   that is not an exact power of two.
    ///
    /// # Examples
    /// ```
    /// use potion_solver::queue::BoundedPriorityQueue;
    ///
    /// let mut queue = BoundedPriorityQueue::new(4, |a: &i32, b: &i32| a.cmp(b)).unwrap();
    /// queue.enqueue(3).unwrap();
    /// queue.enqueue(7).unwrap();
    /// assert_eq!(queue.dequeue(), Ok(7));
    /// assert!(BoundedPriorityQueue::new(6, |a: &i32, b: &i32| a.cmp(b)).is_err());
    /// ```
    pub fn new(capacity: usize, compare: F) -> Result<Self, QueueError> {
        if !capacity.is_power_of_two() {
            return Err(QueueError::CapacityNotPowerOfTwo(capacity));
        }
        Ok(BoundedPriorityQueue {
            data: Vec::new(),
            capacity,
            compare,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Drops every element but keeps the allocated storage.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn peek(&self) -> Option<&T> {
        self.data.first()
    }

    /// Inserts `value`, failing with `QueueError::Full` when the queue
    /// already holds `capacity` elements. The rejected value is dropped.
    pub fn enqueue(&mut self, value: T) -> Result<(), QueueError> {
        if self.data.len() >= self.capacity {
            return Err(QueueError::Full {
                capacity: self.capacity,
            });
        }
        self.data.push(value);
        self.sift_up(self.data.len() - 1);
        Ok(())
    }

    /// Removes and returns the highest-priority element.
    pub fn dequeue(&mut self) -> Result<T, QueueError> {
        if self.data.is_empty() {
            return Err(QueueError::Empty);
        }
        // swap_remove moves the last element into the root slot.
        let top = self.data.swap_remove(0);
        if !self.data.is_empty() {
            self.sift_down(0);
        }
        Ok(top)
    }

    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if (self.compare)(&self.data[parent], &self.data[index]) == Ordering::Greater {
                break;
            }
            self.data.swap(parent, index);
            index = parent;
        }
    }

    fn sift_down(&mut self, mut index: usize) {
        let len = self.data.len();
        loop {
            let left = 2 * index + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            // Ties between siblings go to the right child.
            let child = if right < len
                && (self.compare)(&self.data[right], &self.data[left]) != Ordering::Less
            {
                right
            } else {
                left
            };
            if (self.compare)(&self.data[child], &self.data[index]) != Ordering::Greater {
                break;
            }
            self.data.swap(child, index);
            index = child;
        }
    }
}
