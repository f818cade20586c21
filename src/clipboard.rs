use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::io::{self, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("no message to copy")]
    NothingToCopy,

    #[error("failed to write clipboard sequence: {0}")]
    Io(#[from] io::Error),
}

/// Destination for copied text
pub trait Clipboard: Send {
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// OSC 52 escape that asks the terminal to place `text` on the system
/// clipboard
pub fn osc52_sequence(text: &str) -> String {
    format!("\x1b]52;c;{}\x07", STANDARD.encode(text))
}

/// Clipboard that writes OSC 52 sequences to a terminal stream
pub struct Osc52Clipboard<W> {
    writer: W,
}

impl Osc52Clipboard<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> Osc52Clipboard<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> Clipboard for Osc52Clipboard<W> {
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        self.writer.write_all(osc52_sequence(text).as_bytes())?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_wraps_base64_payload() {
        assert_eq!(osc52_sequence("soil"), "\x1b]52;c;c29pbA==\x07");
    }

    #[test]
    fn writes_sequence_to_stream() {
        let mut clipboard = Osc52Clipboard::new(Vec::new());
        clipboard.set_text("cafe").unwrap();
        let written = String::from_utf8(clipboard.into_inner()).unwrap();
        assert_eq!(written, osc52_sequence("cafe"));
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_failure_is_reported() {
        let mut clipboard = Osc52Clipboard::new(BrokenPipe);
        assert!(matches!(
            clipboard.set_text("x"),
            Err(ClipboardError::Io(_))
        ));
    }
}
