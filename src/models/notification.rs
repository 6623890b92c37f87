use std::fmt;

#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("filename", &self.filename)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// A single outbound chat message. Lives only for the duration of one send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationMessage {
    pub channel_id: u64,
    pub content: String,
    pub attachment: Option<Attachment>,
}

impl NotificationMessage {
    pub fn text(channel_id: u64, content: impl Into<String>) -> Self {
        Self {
            channel_id,
            content: content.into(),
            attachment: None,
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }
}
