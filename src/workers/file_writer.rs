//! Offloads blocking file writes onto a child thread, so a latency-sensitive main
//! thread can hand off a line of text and move on rather than blocking on disk I/O.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use crate::core::message::{input_fn, Named, OutputMessage};
use crate::core::msg_thread::{MsgThread, MsgThreadBuilder};
use crate::manager::Manager;

pub struct FileWriterWorker {
    thread: Arc<MsgThread>,
}

struct WriteFailed {
    path: PathBuf,
    error: String,
}

impl Named for WriteFailed {
    fn name(&self) -> &str {
        "file-writer::write-failed"
    }
}

impl OutputMessage for WriteFailed {
    fn process(&mut self) -> bool {
        tracing::warn!(path = %self.path.display(), error = %self.error, "write failed");
        true
    }
}

impl FileWriterWorker {
    pub fn spawn(name: impl Into<String>, manager: &Arc<Manager>) -> Self {
        let thread = MsgThreadBuilder::new(name).build(manager);
        thread.start();
        Self { thread }
    }

    /// Appends `line` (plus a trailing newline) to `path` on the child thread.
    /// Forced: shutdown should not silently drop data already accepted for writing.
    pub fn write_line(&self, path: impl Into<PathBuf>, line: impl Into<String>) -> bool {
        let path = path.into();
        let line = line.into();
        let out = self.thread.clone();
        self.thread.send_in(
            input_fn("write-line", move || {
                let result = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)
                    .and_then(|mut f| writeln!(f, "{line}"));

                if let Err(e) = result {
                    out.send_out(
                        WriteFailed {
                            path: path.clone(),
                            error: e.to_string(),
                        },
                        true,
                    );
                }
                true
            }),
            true,
        )
    }

    pub fn retrieve_errors(&self) -> usize {
        self.thread.retrieve_out(16)
    }

    pub fn stop(&self) {
        self.thread.stop();
    }

    pub fn join(&self) -> std::thread::Result<()> {
        self.thread.join()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_lines_to_disk_off_the_main_thread() {
        let dir = std::env::temp_dir().join(format!("msgthread-file-writer-test-{:?}", std::thread::current().id()));
        let _ = std::fs::remove_file(&dir);

        let manager = Arc::new(Manager::new());
        let worker = FileWriterWorker::spawn("file-writer", &manager);

        worker.write_line(&dir, "first");
        worker.write_line(&dir, "second");

        worker.stop();
        worker.join().unwrap();

        let content = std::fs::read_to_string(&dir).unwrap();
        assert_eq!(content, "first\nsecond\n");

        let _ = std::fs::remove_file(&dir);
    }
}
