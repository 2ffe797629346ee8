use std::io;
use std::sync::Arc;

use cfkit_client::{LoggedRequest, LoggedResponse, RequestLoggerOutput};

use crate::ui::Ui;

/// Writes traced requests to the terminal.
pub struct TerminalDisplay {
    ui: Arc<dyn Ui>,
}

impl TerminalDisplay {
    pub fn new(ui: Arc<dyn Ui>) -> Self {
        Self { ui }
    }
}

impl RequestLoggerOutput for TerminalDisplay {
    fn display_request(&self, request: &LoggedRequest) -> io::Result<()> {
        self.ui.write_trace(&request.to_string())
    }

    fn display_response(&self, response: &LoggedResponse) -> io::Result<()> {
        self.ui.write_trace(&response.to_string())
    }

    fn handle_internal_error(&self, err: &io::Error) {
        self.ui
            .display_warning(&format!("Failed to write request trace: {}", err));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::tests::test_ui;
    use cfkit_client::{LoggedBody, Method, StatusCode};
    use chrono::Utc;

    #[test]
    fn test_writes_request_and_response() {
        let (ui, out, _) = test_ui("");
        let display = TerminalDisplay::new(Arc::new(ui));

        display
            .display_request(&LoggedRequest {
                time: Utc::now(),
                method: Method::GET,
                url: "https://api.example.com/v2/info".into(),
                headers: vec![("Authorization".into(), "[PRIVATE DATA HIDDEN]".into())],
                body: LoggedBody::Empty,
            })
            .unwrap();
        display
            .display_response(&LoggedResponse {
                time: Utc::now(),
                status: StatusCode::OK,
                headers: vec![],
                body: LoggedBody::Text("ok".into()),
            })
            .unwrap();

        let text = out.contents();
        assert!(text.contains("GET /v2/info HTTP/1.1"));
        assert!(text.contains("Host: api.example.com"));
        assert!(text.contains("Authorization: [PRIVATE DATA HIDDEN]"));
        assert!(text.contains("HTTP/1.1 200 OK"));
    }
}
