// src/entity/mod.rs

//! Request body abstraction for the HTTP method layer.
//!
//! An entity reports whether it can be replayed (`is_repeatable`), its
//! content type, and its length — a negative length means "unknown, use
//! chunked transfer encoding". Repeatability is what makes a request
//! retryable after an authentication challenge: the method layer must
//! refuse to resend a request whose entity cannot be replayed.

mod multipart;

pub use multipart::{MultipartEntity, Part};

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use bytes::Bytes;

/// Content length sentinel: unknown, send with chunked transfer encoding.
pub const CONTENT_LENGTH_CHUNKED: i64 = -1;

/// Content length sentinel for [`StreamEntity`]: buffer the stream on the
/// first length query and report the buffered size.
const CONTENT_LENGTH_AUTO: i64 = -2;

/// A request body.
///
/// `content_length` and `write_to` take `&mut self` because computing a
/// length may require consuming and buffering an underlying stream.
pub trait RequestEntity: Send {
    /// Whether the entity can be written more than once.
    fn is_repeatable(&self) -> bool;

    /// The `Content-Type` header value, if the entity carries one.
    fn content_type(&self) -> Option<String>;

    /// Byte count of the body, or a negative sentinel when unknown.
    fn content_length(&mut self) -> i64;

    /// Writes the body to `out`.
    fn write_to(&mut self, out: &mut dyn Write) -> io::Result<()>;
}

/// An in-memory entity backed by [`Bytes`]. Always repeatable.
#[derive(Debug, Clone)]
pub struct BytesEntity {
    content: Bytes,
    content_type: Option<String>,
}

impl BytesEntity {
    pub fn new(content: impl Into<Bytes>, content_type: Option<&str>) -> BytesEntity {
        BytesEntity {
            content: content.into(),
            content_type: content_type.map(str::to_string),
        }
    }
}

impl RequestEntity for BytesEntity {
    fn is_repeatable(&self) -> bool {
        true
    }

    fn content_type(&self) -> Option<String> {
        self.content_type.clone()
    }

    fn content_length(&mut self) -> i64 {
        self.content.len() as i64
    }

    fn write_to(&mut self, out: &mut dyn Write) -> io::Result<()> {
        out.write_all(&self.content)
    }
}

/// A text entity encoded in an explicit charset at construction time.
///
/// The charset is resolved through `encoding_rs` labels and appended to the
/// content type when the caller did not already specify one.
#[derive(Debug, Clone)]
pub struct StringEntity {
    content: Bytes,
    content_type: Option<String>,
}

impl StringEntity {
    pub fn new(content: &str, content_type: Option<&str>, charset: &str) -> StringEntity {
        let encoding = encoding_rs::Encoding::for_label(charset.as_bytes()).unwrap_or_else(|| {
            log::warn!("unknown charset label {:?}, falling back to UTF-8", charset);
            encoding_rs::UTF_8
        });
        let (encoded, _, _) = encoding.encode(content);

        let content_type = content_type.map(|ct| {
            if ct.to_ascii_lowercase().contains("charset=") {
                ct.to_string()
            } else {
                format!("{}; charset={}", ct, charset)
            }
        });

        StringEntity {
            content: Bytes::from(encoded.into_owned()),
            content_type,
        }
    }
}

impl RequestEntity for StringEntity {
    fn is_repeatable(&self) -> bool {
        true
    }

    fn content_type(&self) -> Option<String> {
        self.content_type.clone()
    }

    fn content_length(&mut self) -> i64 {
        self.content.len() as i64
    }

    fn write_to(&mut self, out: &mut dyn Write) -> io::Result<()> {
        out.write_all(&self.content)
    }
}

/// An entity that streams a file from disk on each write. Repeatable.
#[derive(Debug, Clone)]
pub struct FileEntity {
    path: PathBuf,
    content_type: Option<String>,
}

impl FileEntity {
    pub fn new(path: impl Into<PathBuf>, content_type: Option<&str>) -> FileEntity {
        FileEntity {
            path: path.into(),
            content_type: content_type.map(str::to_string),
        }
    }
}

impl RequestEntity for FileEntity {
    fn is_repeatable(&self) -> bool {
        true
    }

    fn content_type(&self) -> Option<String> {
        self.content_type.clone()
    }

    fn content_length(&mut self) -> i64 {
        match std::fs::metadata(&self.path) {
            Ok(meta) => meta.len() as i64,
            Err(e) => {
                log::warn!("cannot stat {:?}: {}", self.path, e);
                CONTENT_LENGTH_CHUNKED
            }
        }
    }

    fn write_to(&mut self, out: &mut dyn Write) -> io::Result<()> {
        let mut file = File::open(&self.path)?;
        io::copy(&mut file, out)?;
        Ok(())
    }
}

/// An entity reading from an arbitrary stream.
///
/// With a declared length (or [`CONTENT_LENGTH_CHUNKED`]) the stream is
/// consumed directly and the entity is not repeatable: a second write
/// fails rather than silently sending an exhausted stream. In auto mode
/// the entire stream is buffered into memory on the first
/// `content_length` call — trading memory for a precise length and
/// repeatability.
pub struct StreamEntity {
    source: Option<Box<dyn Read + Send>>,
    buffer: Option<Bytes>,
    length: i64,
    content_type: Option<String>,
}

impl StreamEntity {
    /// Wraps a stream with a declared content length. Pass
    /// [`CONTENT_LENGTH_CHUNKED`] when the length is unknown.
    pub fn new(
        source: impl Read + Send + 'static,
        length: i64,
        content_type: Option<&str>,
    ) -> StreamEntity {
        StreamEntity {
            source: Some(Box::new(source)),
            buffer: None,
            length,
            content_type: content_type.map(str::to_string),
        }
    }

    /// Wraps a stream in auto-length mode: the stream is fully buffered on
    /// the first `content_length` call.
    pub fn auto(source: impl Read + Send + 'static, content_type: Option<&str>) -> StreamEntity {
        StreamEntity {
            source: Some(Box::new(source)),
            buffer: None,
            length: CONTENT_LENGTH_AUTO,
            content_type: content_type.map(str::to_string),
        }
    }

    fn buffer_content(&mut self) {
        let Some(mut source) = self.source.take() else {
            return;
        };
        let mut buf = Vec::new();
        match source.read_to_end(&mut buf) {
            Ok(_) => self.buffer = Some(Bytes::from(buf)),
            Err(e) => {
                log::error!("buffering stream entity failed: {}", e);
                self.length = CONTENT_LENGTH_CHUNKED;
            }
        }
    }
}

impl RequestEntity for StreamEntity {
    fn is_repeatable(&self) -> bool {
        self.buffer.is_some()
    }

    fn content_type(&self) -> Option<String> {
        self.content_type.clone()
    }

    fn content_length(&mut self) -> i64 {
        if self.length == CONTENT_LENGTH_AUTO && self.buffer.is_none() {
            self.buffer_content();
        }
        match &self.buffer {
            Some(buffer) => buffer.len() as i64,
            None => self.length,
        }
    }

    fn write_to(&mut self, out: &mut dyn Write) -> io::Result<()> {
        if self.length == CONTENT_LENGTH_AUTO && self.buffer.is_none() {
            self.buffer_content();
        }
        if let Some(buffer) = &self.buffer {
            return out.write_all(buffer);
        }
        match self.source.take() {
            Some(mut source) => {
                io::copy(&mut source, out)?;
                Ok(())
            }
            None => Err(io::Error::new(
                io::ErrorKind::Other,
                "stream entity already consumed",
            )),
        }
    }
}

impl std::fmt::Debug for StreamEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamEntity")
            .field("buffered", &self.buffer.is_some())
            .field("length", &self.length)
            .field("content_type", &self.content_type)
            .finish()
    }
}
