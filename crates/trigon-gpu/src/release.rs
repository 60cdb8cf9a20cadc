//! Scoped release of GPU resources.
//!
//! Every resource acquired during startup registers its release here. The
//! stack is drained last-in-first-out, so teardown is always the exact reverse
//! of acquisition, including when startup stops halfway.

use std::fmt;

type ReleaseFn = Box<dyn FnOnce()>;

/// LIFO list of pending resource releases.
#[derive(Default)]
pub struct ReleaseStack {
    entries: Vec<(String, ReleaseFn)>,
}

impl ReleaseStack {
    /// Create an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the release of a resource that was just acquired.
    pub fn push(&mut self, label: impl Into<String>, release: impl FnOnce() + 'static) {
        self.entries.push((label.into(), Box::new(release)));
    }

    /// Number of pending releases.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Labels in acquisition order.
    pub fn labels(&self) -> Vec<&str> {
        self.entries.iter().map(|(label, _)| label.as_str()).collect()
    }

    /// Run every pending release, newest first.
    pub fn release_all(&mut self) {
        while let Some((label, release)) = self.entries.pop() {
            release();
            tracing::trace!("Released {label}");
        }
    }
}

impl Drop for ReleaseStack {
    fn drop(&mut self) {
        self.release_all();
    }
}

impl fmt::Debug for ReleaseStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReleaseStack")
            .field("entries", &self.labels())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorder() -> Rc<RefCell<Vec<String>>> {
        Rc::new(RefCell::new(Vec::new()))
    }

    fn push_recorded(stack: &mut ReleaseStack, log: &Rc<RefCell<Vec<String>>>, label: &str) {
        let log = Rc::clone(log);
        let name = label.to_string();
        stack.push(label, move || log.borrow_mut().push(name));
    }

    #[test]
    fn drop_releases_in_reverse() {
        let log = recorder();
        {
            let mut stack = ReleaseStack::new();
            for label in ["instance", "messenger", "surface", "device"] {
                push_recorded(&mut stack, &log, label);
            }
            assert_eq!(stack.labels(), ["instance", "messenger", "surface", "device"]);
        }
        assert_eq!(*log.borrow(), ["device", "surface", "messenger", "instance"]);
    }

    #[test]
    fn release_all_empties_and_is_idempotent() {
        let log = recorder();
        let mut stack = ReleaseStack::new();
        push_recorded(&mut stack, &log, "a");
        push_recorded(&mut stack, &log, "b");
        stack.release_all();
        assert!(stack.is_empty());
        stack.release_all();
        drop(stack);
        assert_eq!(*log.borrow(), ["b", "a"]);
    }

    #[test]
    fn pushes_after_release_still_run() {
        let log = recorder();
        let mut stack = ReleaseStack::new();
        push_recorded(&mut stack, &log, "first");
        stack.release_all();
        push_recorded(&mut stack, &log, "second");
        assert_eq!(stack.len(), 1);
        drop(stack);
        assert_eq!(*log.borrow(), ["first", "second"]);
    }
}
