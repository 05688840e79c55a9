use gag::Gag;
use log::LevelFilter;

/// Silences the `log` facade and the process's stdout and stderr until
/// dropped.
///
/// The maximum level and the standard streams are process-wide state. Both
/// are restored on drop, so they come back on early returns and during
/// unwinding. A stream that is already redirected elsewhere is left alone.
/// Overlapping scopes on different threads are not coordinated.
#[must_use = "diagnostics are restored as soon as the scope is dropped"]
pub struct QuietScope {
    previous: LevelFilter,
    // Dropped after `Drop::drop` runs, which puts the file descriptors back.
    _stdout: Option<Gag>,
    _stderr: Option<Gag>,
}

impl QuietScope {
    pub fn enter() -> Self {
        let stdout = gag_stream("stdout", Gag::stdout());
        let stderr = gag_stream("stderr", Gag::stderr());
        let previous = log::max_level();
        log::set_max_level(LevelFilter::Off);
        QuietScope {
            previous,
            _stdout: stdout,
            _stderr: stderr,
        }
    }
}

fn gag_stream(stream: &str, gag: std::io::Result<Gag>) -> Option<Gag> {
    match gag {
        Ok(gag) => Some(gag),
        Err(e) => {
            log::debug!("Leaving {} as is, it cannot be redirected: {}", stream, e);
            None
        }
    }
}

impl Drop for QuietScope {
    fn drop(&mut self) {
        log::set_max_level(self.previous);
    }
}
