//! Message fan-out.
//!
//! Tasks narrate what they do through a [`Messenger`]. Each registered sink
//! declares a [`MessageType`] mask; a message reaches a sink when every bit of
//! the message's type is present in that mask. Messages nobody accepts are
//! dropped.

use chrono::Local;
use serde::Serialize;
use std::cell::RefCell;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::ops::{BitAnd, BitOr};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageType(u8);

impl MessageType {
    pub const INFO: MessageType = MessageType(1);
    pub const DEBUG: MessageType = MessageType(2);
    pub const ALL: MessageType = MessageType(1 | 2);

    /// True when every bit of `kind` is set in `self`.
    pub fn accepts(self, kind: MessageType) -> bool {
        (self & kind) == kind
    }

    pub fn label(self) -> &'static str {
        match self.0 {
            1 => "info",
            2 => "debug",
            _ => "mixed",
        }
    }
}

impl BitOr for MessageType {
    type Output = MessageType;

    fn bitor(self, rhs: MessageType) -> MessageType {
        MessageType(self.0 | rhs.0)
    }
}

impl BitAnd for MessageType {
    type Output = MessageType;

    fn bitand(self, rhs: MessageType) -> MessageType {
        MessageType(self.0 & rhs.0)
    }
}

impl Serialize for MessageType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub text: String,
    pub kind: MessageType,
}

pub trait MessageSink {
    fn handle(&self, message: &Message);
}

struct Registration {
    mask: MessageType,
    sink: Box<dyn MessageSink>,
}

#[derive(Default)]
pub struct Messenger {
    sinks: Vec<Registration>,
}

impl Messenger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sink(&mut self, sink: impl MessageSink + 'static, mask: MessageType) -> &mut Self {
        self.sinks.push(Registration {
            mask,
            sink: Box::new(sink),
        });
        self
    }

    pub fn message(&self, text: impl Into<String>, kind: MessageType) {
        let message = Message {
            text: text.into(),
            kind,
        };
        for registration in &self.sinks {
            if registration.mask.accepts(kind) {
                registration.sink.handle(&message);
            }
        }
    }

    pub fn info(&self, text: impl Into<String>) {
        self.message(text, MessageType::INFO);
    }

    pub fn debug(&self, text: impl Into<String>) {
        self.message(text, MessageType::DEBUG);
    }

    /// Debug line describing one remote command and its response.
    pub fn command_debug(&self, command: &str, response: &str) {
        let response = response.trim().replace('\n', " ");
        let response = if response.is_empty() {
            "N/a"
        } else {
            response.as_str()
        };
        self.debug(format!(
            "[SSH COMMAND] {} [SSH RESPONSE] {}",
            command.trim(),
            response
        ));
    }
}

/// Writes each message as a line on stderr; stdout carries the JSON report.
pub struct ConsoleSink;

impl MessageSink for ConsoleSink {
    fn handle(&self, message: &Message) {
        let stderr = io::stderr();
        let mut handle = stderr.lock();
        let _ = writeln!(handle, "{}", message.text);
    }
}

/// Appends timestamped lines to a log file, opening it per message.
pub struct LogFileSink {
    path: PathBuf,
}

impl LogFileSink {
    /// Fails early if the file cannot be opened for appending.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        open_append(&path)?;
        Ok(Self { path })
    }
}

fn open_append(path: &Path) -> Result<std::fs::File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| Error::internal_io(e.to_string(), Some(format!("open {}", path.display()))))
}

impl MessageSink for LogFileSink {
    fn handle(&self, message: &Message) {
        if let Ok(mut file) = open_append(&self.path) {
            let stamp = Local::now().format("%d/%m/%y %H:%M:%S");
            let _ = writeln!(file, "[{}] {}", stamp, message.text);
        }
    }
}

/// Collects messages in memory for callers that want to inspect a run.
#[derive(Clone, Default)]
pub struct BufferSink {
    messages: std::rc::Rc<RefCell<Vec<Message>>>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.messages.borrow().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.messages.borrow().iter().map(|m| m.text.clone()).collect()
    }

    pub fn take(&self) -> Vec<Message> {
        std::mem::take(&mut *self.messages.borrow_mut())
    }
}

impl MessageSink for BufferSink {
    fn handle(&self, message: &Message) {
        self.messages.borrow_mut().push(message.clone());
    }
}
