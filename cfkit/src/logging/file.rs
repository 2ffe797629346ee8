use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use cfkit_client::{LoggedRequest, LoggedResponse, RequestLoggerOutput};

use crate::ui::Ui;

/// Appends traced requests to a log file.
///
/// The file and its parent directories are created on first write. The
/// file stays open from `start` to `stop` so a block lands in one append
/// session. A failure to write is reported once through the terminal as a
/// warning.
pub struct FileWriter {
    ui: Arc<dyn Ui>,
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl FileWriter {
    pub fn new(ui: Arc<dyn Ui>, path: impl Into<PathBuf>) -> Self {
        Self {
            ui,
            path: path.into(),
            file: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> io::Result<File> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        OpenOptions::new().create(true).append(true).open(&self.path)
    }

    fn append(&self, text: &str) -> io::Result<()> {
        let mut slot = self.file.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match slot.as_mut() {
            Some(file) => writeln!(file, "{}", text),
            None => writeln!(self.open()?, "{}", text),
        }
    }
}

impl RequestLoggerOutput for FileWriter {
    fn start(&self) -> io::Result<()> {
        let file = self.open()?;
        *self.file.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(file);
        Ok(())
    }

    fn stop(&self) -> io::Result<()> {
        let file = self.file.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).take();
        match file {
            Some(mut file) => file.flush(),
            None => Ok(()),
        }
    }

    fn display_request(&self, request: &LoggedRequest) -> io::Result<()> {
        self.append(&request.to_string())
    }

    fn display_response(&self, response: &LoggedResponse) -> io::Result<()> {
        self.append(&response.to_string())
    }

    fn handle_internal_error(&self, err: &io::Error) {
        self.ui.display_warning(&format!(
            "Failed to write request trace to {}: {}",
            self.path.display(),
            err
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::tests::test_ui;
    use cfkit_client::{LoggedBody, StatusCode};
    use chrono::Utc;

    fn response(body: &str) -> LoggedResponse {
        LoggedResponse {
            time: Utc::now(),
            status: StatusCode::NOT_FOUND,
            headers: vec![],
            body: LoggedBody::Text(body.into()),
        }
    }

    #[test]
    fn test_appends_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("cf.log");
        let (ui, _, _) = test_ui("");
        let writer = FileWriter::new(Arc::new(ui), &path);

        writer.display_response(&response("first")).unwrap();
        writer.display_response(&response("second")).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let first = text.find("first").unwrap();
        let second = text.find("second").unwrap();
        assert!(first < second);
        assert_eq!(text.matches("HTTP/1.1 404 Not Found").count(), 2);
    }

    #[test]
    fn test_block_is_written_between_start_and_stop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cf.log");
        let (ui, _, _) = test_ui("");
        let writer = FileWriter::new(Arc::new(ui), &path);

        writer.start().unwrap();
        assert!(writer.file.lock().unwrap().is_some());
        writer.display_response(&response("inside")).unwrap();
        writer.stop().unwrap();
        assert!(writer.file.lock().unwrap().is_none());

        assert!(fs::read_to_string(&path).unwrap().contains("inside"));
        writer.stop().unwrap();
    }

    #[test]
    fn test_start_fails_when_path_is_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let (ui, _, _) = test_ui("");
        let writer = FileWriter::new(Arc::new(ui), dir.path());
        assert!(writer.start().is_err());
        assert!(writer.stop().is_ok());
    }

    #[test]
    fn test_write_failure_is_reported_as_warning() {
        let dir = tempfile::tempdir().unwrap();
        let (ui, _, err) = test_ui("");
        // A directory cannot be opened for appending.
        let writer = FileWriter::new(Arc::new(ui), dir.path());

        let result = writer.display_response(&response("lost"));
        let io_err = result.unwrap_err();
        writer.handle_internal_error(&io_err);

        assert!(err.contents().contains("Failed to write request trace to"));
    }
}
