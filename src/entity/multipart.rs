// src/entity/multipart.rs

//! `multipart/form-data` request entity.

use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use md5::{Digest, Md5};

use super::{RequestEntity, CONTENT_LENGTH_CHUNKED};

const CRLF: &str = "\r\n";

/// One part of a multipart body.
pub struct Part {
    name: String,
    file_name: Option<String>,
    content_type: Option<String>,
    body: PartBody,
}

enum PartBody {
    Bytes(Bytes),
    File(PathBuf),
}

impl Part {
    /// A plain text field.
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Part {
        Part {
            name: name.into(),
            file_name: None,
            content_type: None,
            body: PartBody::Bytes(Bytes::from(value.into())),
        }
    }

    /// A binary field with explicit filename and content type.
    pub fn bytes(
        name: impl Into<String>,
        file_name: impl Into<String>,
        content_type: Option<&str>,
        content: impl Into<Bytes>,
    ) -> Part {
        Part {
            name: name.into(),
            file_name: Some(file_name.into()),
            content_type: content_type.map(str::to_string),
            body: PartBody::Bytes(content.into()),
        }
    }

    /// A file upload field. The content type is guessed from the file
    /// extension, defaulting to `application/octet-stream`.
    pub fn file(name: impl Into<String>, path: impl AsRef<Path>) -> Part {
        let path = path.as_ref().to_path_buf();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned());
        let mime = mime_guess::from_path(&path).first_or_octet_stream();
        Part {
            name: name.into(),
            file_name,
            content_type: Some(mime.essence_str().to_string()),
            body: PartBody::File(path),
        }
    }

    /// The part headers, rendered exactly as they appear on the wire.
    fn header_block(&self) -> String {
        let mut block = format!(
            "Content-Disposition: form-data; name=\"{}\"",
            self.name
        );
        if let Some(file_name) = &self.file_name {
            block.push_str(&format!("; filename=\"{}\"", file_name));
        }
        block.push_str(CRLF);
        if let Some(content_type) = &self.content_type {
            block.push_str(&format!("Content-Type: {}{}", content_type, CRLF));
        }
        block.push_str(CRLF);
        block
    }

    fn body_length(&self) -> i64 {
        match &self.body {
            PartBody::Bytes(content) => content.len() as i64,
            PartBody::File(path) => match std::fs::metadata(path) {
                Ok(meta) => meta.len() as i64,
                Err(e) => {
                    log::warn!("cannot stat multipart file {:?}: {}", path, e);
                    CONTENT_LENGTH_CHUNKED
                }
            },
        }
    }

    fn write_body(&self, out: &mut dyn Write) -> io::Result<()> {
        match &self.body {
            PartBody::Bytes(content) => out.write_all(content),
            PartBody::File(path) => {
                let mut file = File::open(path)?;
                io::copy(&mut file, out)?;
                Ok(())
            }
        }
    }
}

impl fmt::Debug for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Part")
            .field("name", &self.name)
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .finish()
    }
}

/// A `multipart/form-data` body. Repeatable as long as its file parts
/// remain readable.
#[derive(Debug)]
pub struct MultipartEntity {
    parts: Vec<Part>,
    boundary: String,
}

impl Default for MultipartEntity {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartEntity {
    pub fn new() -> MultipartEntity {
        MultipartEntity {
            parts: Vec::new(),
            boundary: generate_boundary(),
        }
    }

    pub fn add_part(&mut self, part: Part) -> &mut MultipartEntity {
        self.parts.push(part);
        self
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }
}

impl RequestEntity for MultipartEntity {
    fn is_repeatable(&self) -> bool {
        true
    }

    fn content_type(&self) -> Option<String> {
        Some(format!("multipart/form-data; boundary={}", self.boundary))
    }

    fn content_length(&mut self) -> i64 {
        let mut total: i64 = 0;
        for part in &self.parts {
            let body = part.body_length();
            if body < 0 {
                return CONTENT_LENGTH_CHUNKED;
            }
            // "--boundary\r\n" + headers + body + "\r\n"
            total += (2 + self.boundary.len() + CRLF.len()) as i64;
            total += part.header_block().len() as i64;
            total += body;
            total += CRLF.len() as i64;
        }
        // closing "--boundary--\r\n"
        total += (2 + self.boundary.len() + 2 + CRLF.len()) as i64;
        total
    }

    fn write_to(&mut self, out: &mut dyn Write) -> io::Result<()> {
        for part in &self.parts {
            write!(out, "--{}{}", self.boundary, CRLF)?;
            out.write_all(part.header_block().as_bytes())?;
            part.write_body(out)?;
            out.write_all(CRLF.as_bytes())?;
        }
        write!(out, "--{}--{}", self.boundary, CRLF)?;
        Ok(())
    }
}

/// A boundary unlikely to collide with body content, derived from the
/// current time.
fn generate_boundary() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let digest = Md5::digest(nanos.to_string().as_bytes());
    format!("--------------------{}", hex::encode(&digest[..8]))
}
