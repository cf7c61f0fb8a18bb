use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("clipboard error: {0}")]
    Backend(#[from] arboard::Error),

    #[error("clipboard disabled")]
    Disabled,
}

pub trait Clipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// System clipboard, opened lazily on first write.
#[derive(Default)]
pub struct SystemClipboard {
    inner: Option<arboard::Clipboard>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self { inner: None }
    }
}

impl Clipboard for SystemClipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        let mut clipboard = match self.inner.take() {
            Some(clipboard) => clipboard,
            None => arboard::Clipboard::new()?,
        };
        let result = clipboard.set_text(text.to_string());
        self.inner = Some(clipboard);
        result.map_err(ClipboardError::from)
    }
}

/// Used with `--no-clipboard` and on headless hosts; every write is refused.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoClipboard;

impl Clipboard for NoClipboard {
    fn write_text(&mut self, _text: &str) -> Result<(), ClipboardError> {
        Err(ClipboardError::Disabled)
    }
}

pub fn open(enabled: bool) -> Box<dyn Clipboard> {
    if enabled {
        Box::new(SystemClipboard::new())
    } else {
        Box::new(NoClipboard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_clipboard_refuses_writes() {
        let mut clipboard = open(false);
        assert!(matches!(
            clipboard.write_text("abc"),
            Err(ClipboardError::Disabled)
        ));
    }
}
