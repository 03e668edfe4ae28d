//! The set of known tasks for the lifetime of a trace (spec §4.5).
//!
//! Grounded on the teacher's `ThreadGroup` as a collection of task handles
//! (`examples/isgasho-rd/src/thread_group.rs`), simplified from a
//! `Weak`-pointer set scoped to one thread group into a flat registry
//! scoped to the whole traced process tree, since this spec's registry
//! spans every thread group the tree ever creates.

use crate::task::{Status, Task, TaskSharedPtr};
use libc::pid_t;

#[derive(Default)]
pub struct Registry {
    tasks: Vec<TaskSharedPtr>,
}

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }

    /// Registers a freshly-created task. The kernel may reuse a `tid` that
    /// belongs to a now-`Free` slot; the registry does not attempt to
    /// recycle that slot's storage, it simply tracks both as distinct
    /// entries (only the most recent non-`Free` one is returned by
    /// `find_by_tid`).
    pub fn insert(&mut self, task: Task) -> TaskSharedPtr {
        let shared = task.shared();
        self.tasks.push(shared.clone());
        shared
    }

    /// Registers an already-shared task handle, e.g. one a test built
    /// directly with `Task::shared`.
    pub fn insert_shared(&mut self, task: TaskSharedPtr) -> TaskSharedPtr {
        self.tasks.push(task.clone());
        task
    }

    /// Finds the live (non-`Free`) task with the given `tid`, if any.
    pub fn find_by_tid(&self, tid: pid_t) -> Option<TaskSharedPtr> {
        self.tasks
            .iter()
            .rev()
            .find(|t| {
                let t = t.borrow();
                t.tid == tid && t.status != Status::Free
            })
            .cloned()
    }

    /// Implements spec §4.3.7 step 2: find the sibling thread in the same
    /// thread group that is mid-execve with the given syscall number.
    pub fn find_execve_sibling(&self, tgid: pid_t, execve_syscall: i64) -> Option<TaskSharedPtr> {
        self.tasks
            .iter()
            .find(|t| {
                let t = t.borrow();
                t.tgid == tgid && t.is_execve_in_flight(execve_syscall)
            })
            .cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaskSharedPtr> {
        self.tasks.iter()
    }

    /// `(live_count, unattached_count)`, used for the verbosity ≥ 2 fork
    /// narration in spec §4.3.8.
    pub fn counts(&self) -> (usize, usize) {
        let mut live = 0;
        let mut unattached = 0;
        for t in &self.tasks {
            let t = t.borrow();
            if t.status != Status::Free {
                live += 1;
                if t.status != Status::Attached {
                    unattached += 1;
                }
            }
        }
        (live, unattached)
    }
}
