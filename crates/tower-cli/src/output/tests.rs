// Tests for output formatting and the output writer

use super::*;
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

/// Writer that keeps everything it receives
#[derive(Clone, Default)]
struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SharedBuffer {
    fn contents(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).unwrap()
    }
}

fn writer(format: OutputFormat, quiet: bool) -> (OutputWriter, SharedBuffer) {
    let buffer = SharedBuffer::default();
    let output = OutputWriter::with_writer(format, false, quiet, Box::new(buffer.clone()));
    (output, buffer)
}

fn sample_outcome() -> RequestOutcome {
    RequestOutcome {
        status_code: 200,
        json: json!({"id": 5, "name": "Demo Inventory"}),
    }
}

#[test]
fn test_outcome_human() {
    let (mut output, buffer) = writer(OutputFormat::Human, false);
    output.outcome(&sample_outcome()).unwrap();

    let text = buffer.contents();
    assert!(text.starts_with("HTTP 200\n"));
    assert!(text.contains("\"name\": \"Demo Inventory\""));
}

#[test]
fn test_outcome_json() {
    let (mut output, buffer) = writer(OutputFormat::Json, false);
    output.outcome(&sample_outcome()).unwrap();

    let parsed: serde_json::Value = serde_json::from_str(buffer.contents().trim()).unwrap();
    assert_eq!(parsed["status_code"], 200);
    assert_eq!(parsed["json"]["id"], 5);
}

#[test]
fn test_data_yaml() {
    let (mut output, buffer) = writer(OutputFormat::Yaml, false);
    output.data(&json!({"version": "21.0.0"})).unwrap();

    assert_eq!(buffer.contents(), "version: 21.0.0\n");
}

#[test]
fn test_info_suppressed_when_quiet_or_machine_format() {
    let (mut output, buffer) = writer(OutputFormat::Human, true);
    output.info("hidden").unwrap();
    output.success("hidden").unwrap();
    assert!(buffer.contents().is_empty());

    let (mut output, buffer) = writer(OutputFormat::JsonPretty, false);
    output.section("Settings").unwrap();
    assert!(buffer.contents().is_empty());

    let (mut output, buffer) = writer(OutputFormat::Human, false);
    output.section("Settings").unwrap();
    assert_eq!(buffer.contents(), "=== Settings ===\n");
}
