//! The external collaborators this crate talks to but does not implement
//! (spec §6): the database Event Sink and the `/proc/<pid>` scraper.

use bitflags::bitflags;
use libc::pid_t;

bitflags! {
    /// The four mode bits emitted to the Event Sink (spec GLOSSARY). Values
    /// are fixed by the spec and must not change.
    pub struct FileMode: u32 {
        const FILE_READ  = 1;
        const FILE_WRITE = 2;
        const FILE_WDIR  = 4;
        const FILE_STAT  = 8;
    }
}

/// Opaque id vended by the Event Sink on `add_process`; the foreign key for
/// every subsequent event about that task.
pub type EventId = u64;

/// The surrounding database layer. Implemented by the embedding
/// application; this crate only calls it.
pub trait EventSink {
    /// Registers a new task, returns a stable opaque id. `parent` is `None`
    /// only for the very first traced process.
    fn add_process(&mut self, parent: Option<EventId>, wd: &str) -> Result<EventId, String>;

    fn add_file_open(
        &mut self,
        id: EventId,
        path: &str,
        mode: FileMode,
        is_dir: bool,
    ) -> Result<(), String>;

    fn add_exec(
        &mut self,
        id: EventId,
        binary: &str,
        argv: &[String],
        envp: &[String],
        wd: &str,
    ) -> Result<(), String>;

    fn add_exit(&mut self, id: EventId, exit_code: i32) -> Result<(), String>;
}

/// Enumerates initially-open file descriptors and shared-library
/// dependencies from `/proc/<tid>` right after a successful execve.
pub trait ProcScraper {
    fn add_files_from_proc(
        &mut self,
        id: EventId,
        tid: pid_t,
        binary_hint: &str,
    ) -> Result<(), String>;
}
