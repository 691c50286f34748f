//! Mock scan-code renderer for testing.

use std::sync::Mutex;

use crate::scan_code::{ScanCodeError, ScanCodeRenderer};

/// Records payloads and returns a deterministic fake PNG.
#[derive(Debug, Default)]
pub struct MockScanCodeRenderer {
    rendered: Mutex<Vec<String>>,
    next_error: Mutex<Option<String>>,
}

impl MockScanCodeRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The bytes produced for `payload`: PNG signature followed by the payload.
    pub fn png_for(payload: &str) -> Vec<u8> {
        let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
        bytes.extend_from_slice(payload.as_bytes());
        bytes
    }

    /// Payloads rendered so far, in call order.
    pub fn rendered(&self) -> Vec<String> {
        self.rendered.lock().unwrap().clone()
    }

    /// Make the next render call fail.
    pub fn fail_next(&self, message: &str) {
        *self.next_error.lock().unwrap() = Some(message.to_string());
    }
}

impl ScanCodeRenderer for MockScanCodeRenderer {
    fn render(&self, payload: &str) -> Result<Vec<u8>, ScanCodeError> {
        if let Some(message) = self.next_error.lock().unwrap().take() {
            return Err(ScanCodeError::Render(message));
        }
        self.rendered.lock().unwrap().push(payload.to_string());
        Ok(Self::png_for(payload))
    }
}
