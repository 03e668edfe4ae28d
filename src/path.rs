//! Joins a tracee-read path against the traced process's current working
//! directory if it is relative (spec §4.2). Never touches the filesystem.
//!
//! Grounded on `abs_path_arg`/`abspath` in
//! `examples/original_source/reprozip/native/syscalls.c`.

/// Resolve `raw` (as read out of a tracee) against `wd`, returning an
/// absolute, lexically-normalized path. `wd` is assumed already absolute
/// (spec §3 invariant: `wd` is non-null and absolute for every non-FREE
/// task).
pub fn resolve_path(wd: &str, raw: &str) -> String {
    if raw.starts_with('/') {
        normalize(raw)
    } else {
        let joined = format!("{}/{}", wd.trim_end_matches('/'), raw);
        normalize(&joined)
    }
}

/// Lexically collapse `.` and `..` segments without consulting the
/// filesystem (so it behaves identically whether or not the path exists,
/// unlike `std::fs::canonicalize`).
fn normalize(path: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                out.pop();
            }
            s => out.push(s),
        }
    }
    format!("/{}", out.join("/"))
}
