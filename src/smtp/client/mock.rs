//! An in-memory stream with a scripted read side, for exercising the wire
//! loop without a server.

use std::io::{self, Cursor, Read, Write};
use std::sync::{Arc, Mutex};

type MockCursor = Cursor<Vec<u8>>;

/// A duplex stream whose reads come from a scripted buffer and whose writes
/// are captured for inspection.
#[derive(Clone, Debug, Default)]
pub struct MockStream {
    reader: Arc<Mutex<MockCursor>>,
    writer: Arc<Mutex<MockCursor>>,
}

impl MockStream {
    /// Creates an empty mock stream.
    pub fn new() -> MockStream {
        MockStream::default()
    }

    /// Creates a mock stream that will serve `script` to readers.
    pub fn with_script(script: &[u8]) -> MockStream {
        let mock = MockStream::new();
        mock.push_script(script);
        mock
    }

    /// Replaces the pending scripted input with `script`.
    pub fn push_script(&self, script: &[u8]) {
        let mut cursor = self.reader.lock().unwrap();
        cursor.set_position(0);
        cursor.get_mut().clear();
        cursor.get_mut().extend_from_slice(script);
    }

    /// Takes everything written so far, clearing the capture buffer.
    pub fn take_written(&self) -> Vec<u8> {
        let mut cursor = self.writer.lock().unwrap();
        let written = cursor.get_ref().clone();
        cursor.set_position(0);
        cursor.get_mut().clear();
        written
    }
}

impl Write for MockStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.lock().unwrap().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.lock().unwrap().flush()
    }
}

impl Read for MockStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.lock().unwrap().read(buf)
    }
}
