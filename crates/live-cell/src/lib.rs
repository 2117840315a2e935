//! Observable mutable cells.
//!
//! A [`LiveCell`] holds the latest value of one piece of reactive state. The
//! owner writes it; any number of [`CellReader`]s read the latest value
//! synchronously and can wait for the next change.
//!
//! # Design Principles
//!
//! - Reads never block and never observe a half-written value
//! - Writers never wait for readers; a write with no readers is a no-op for them
//! - Readers only see the latest value, intermediate writes may be coalesced

use tokio::sync::watch;

/// The writable side of an observable cell.
#[derive(Debug)]
pub struct LiveCell<T> {
    sender: watch::Sender<T>,
}

impl<T> LiveCell<T> {
    /// Creates a cell holding `value`.
    pub fn new(value: T) -> Self {
        let (sender, _) = watch::channel(value);
        Self { sender }
    }

    /// Returns a clone of the current value.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.sender.borrow().clone()
    }

    /// Runs `f` against the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.sender.borrow())
    }

    /// Replaces the value and notifies every reader.
    pub fn set(&self, value: T) {
        self.sender.send_replace(value);
    }

    /// Replaces the value only if it differs structurally from the current one.
    ///
    /// Returns true when readers were notified.
    pub fn set_if_changed(&self, value: T) -> bool
    where
        T: PartialEq,
    {
        self.sender.send_if_modified(move |current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        })
    }

    /// Mutates the value in place and notifies every reader.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        self.sender.send_modify(f);
    }

    /// Creates a read-only handle. The handle treats the current value as seen.
    pub fn reader(&self) -> CellReader<T> {
        CellReader {
            receiver: self.sender.subscribe(),
        }
    }

    /// Number of live readers.
    pub fn reader_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl<T: Default> Default for LiveCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// A read-only view of a [`LiveCell`].
#[derive(Debug, Clone)]
pub struct CellReader<T> {
    receiver: watch::Receiver<T>,
}

impl<T> CellReader<T> {
    /// Returns a clone of the latest value.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.receiver.borrow().clone()
    }

    /// Runs `f` against the latest value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.receiver.borrow())
    }

    /// Returns the latest value and marks it as seen.
    pub fn current(&mut self) -> T
    where
        T: Clone,
    {
        self.receiver.borrow_and_update().clone()
    }

    /// Returns true if a value was written since the last one this reader saw.
    ///
    /// A closed cell reports no change.
    pub fn has_changed(&self) -> bool {
        self.receiver.has_changed().unwrap_or(false)
    }

    /// Waits for the next write and returns the new value.
    ///
    /// Returns `None` once the owning cell has been dropped.
    pub async fn changed(&mut self) -> Option<T>
    where
        T: Clone,
    {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }
}
