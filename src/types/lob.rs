//! LOB (Large Object) types
//!
//! A LOB parameter is either a handle to a LOB the engine already stores,
//! an in-memory value that must be created engine-side before execution, or
//! a stream of known length that is read and staged at execute time.

use bytes::Bytes;
use tokio::io::AsyncRead;

use crate::error::{Error, Result};

/// Largest 1-based position a local LOB operation accepts
pub const MAX_POS: u64 = 1 + i32::MAX as u64;

fn out_of_range(what: &str, value: u64) -> Error {
    Error::InvalidArgument(format!("{}: {}", what, value))
}

fn remote(kind: LobKind) -> Error {
    Error::Unsupported(format!(
        "{} content is stored by the engine; read it through the session",
        kind.name()
    ))
}

/// 0-based start of a write of `len` units at 1-based `pos`
fn write_start(pos: u64, len: usize) -> Result<usize> {
    if pos < 1 || pos > MAX_POS.saturating_sub(len as u64) {
        return Err(out_of_range("pos", pos));
    }
    Ok((pos - 1) as usize)
}

/// 1-based position of `pattern` in `data`, searching from 1-based `start`
fn find<T: PartialEq>(data: &[T], pattern: &[T], start: u64) -> Result<Option<u64>> {
    if start < 1 {
        return Err(out_of_range("start", start));
    }
    if pattern.is_empty() || pattern.len() > data.len() {
        return Ok(None);
    }
    if start - 1 > (data.len() - pattern.len()) as u64 {
        return Ok(None);
    }
    let from = (start - 1) as usize;
    Ok(data[from..]
        .windows(pattern.len())
        .position(|window| window == pattern)
        .map(|i| (from + i + 1) as u64))
}

/// Kind of large object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LobKind {
    /// Binary large object
    Binary,
    /// Character large object
    Character,
}

impl LobKind {
    /// SQL name of the kind
    pub fn name(&self) -> &'static str {
        match self {
            LobKind::Binary => "BLOB",
            LobKind::Character => "CLOB",
        }
    }
}

/// Reference to a LOB stored by the engine
///
/// Handles are scoped to the session that created them. Length is in bytes
/// for binary LOBs and characters for character LOBs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LobHandle {
    /// Engine-assigned LOB identifier
    pub id: i64,
    /// Session that owns the LOB
    pub session_id: i64,
    /// Length in bytes or characters
    pub length: u64,
    /// Binary or character
    pub kind: LobKind,
}

impl LobHandle {
    /// Create a new handle
    pub fn new(id: i64, session_id: i64, length: u64, kind: LobKind) -> Self {
        Self {
            id,
            session_id,
            length,
            kind,
        }
    }

    /// Check if this handle belongs to the given session
    pub fn belongs_to(&self, session_id: i64) -> bool {
        self.session_id == session_id
    }
}

/// Binary large object value
#[derive(Debug, Clone, PartialEq)]
pub enum Blob {
    /// LOB already stored by the engine
    Remote(LobHandle),
    /// Client-side content, created engine-side at execute time
    Local(Bytes),
}

impl Blob {
    /// Length in bytes
    pub fn len(&self) -> u64 {
        match self {
            Blob::Remote(handle) => handle.length,
            Blob::Local(data) => data.len() as u64,
        }
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Engine handle, if the content is stored remotely
    pub fn handle(&self) -> Option<&LobHandle> {
        match self {
            Blob::Remote(handle) => Some(handle),
            Blob::Local(_) => None,
        }
    }

    fn local(&self) -> Result<&Bytes> {
        match self {
            Blob::Local(data) => Ok(data),
            Blob::Remote(_) => Err(remote(LobKind::Binary)),
        }
    }

    /// Copy `length` bytes starting at 1-based `pos`
    ///
    /// `pos` may be one past the end when `length` is zero.
    pub fn get_bytes(&self, pos: u64, length: usize) -> Result<Bytes> {
        let data = self.local()?;
        if pos < 1 || pos > data.len() as u64 + 1 {
            return Err(out_of_range("pos", pos));
        }
        let start = (pos - 1) as usize;
        if length > data.len() - start {
            return Err(out_of_range("length", length as u64));
        }
        Ok(data.slice(start..start + length))
    }

    /// 1-based position of `pattern`, searching from 1-based `start`
    pub fn position(&self, pattern: &[u8], start: u64) -> Result<Option<u64>> {
        find(self.local()?, pattern, start)
    }

    /// Overwrite bytes from 1-based `pos`, growing the value as needed
    ///
    /// A gap between the current end and `pos` is filled with zero bytes.
    /// Returns the number of bytes written.
    pub fn set_bytes(&mut self, pos: u64, bytes: &[u8]) -> Result<usize> {
        let start = write_start(pos, bytes.len())?;
        let mut data = self.local()?.to_vec();
        let end = start + bytes.len();
        if end > data.len() {
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(bytes);
        *self = Blob::Local(Bytes::from(data));
        Ok(bytes.len())
    }

    /// Shorten the value to `len` bytes
    pub fn truncate(&mut self, len: u64) -> Result<()> {
        let data = self.local()?;
        if len > data.len() as u64 {
            return Err(out_of_range("len", len));
        }
        let kept = data.slice(..len as usize);
        *self = Blob::Local(kept);
        Ok(())
    }
}

impl From<Bytes> for Blob {
    fn from(data: Bytes) -> Self {
        Blob::Local(data)
    }
}

impl From<Vec<u8>> for Blob {
    fn from(data: Vec<u8>) -> Self {
        Blob::Local(Bytes::from(data))
    }
}

/// Character large object value
#[derive(Debug, Clone, PartialEq)]
pub enum Clob {
    /// LOB already stored by the engine
    Remote(LobHandle),
    /// Client-side content, created engine-side at execute time
    Local(String),
}

impl Clob {
    /// Length in characters
    pub fn len(&self) -> u64 {
        match self {
            Clob::Remote(handle) => handle.length,
            Clob::Local(text) => text.chars().count() as u64,
        }
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Engine handle, if the content is stored remotely
    pub fn handle(&self) -> Option<&LobHandle> {
        match self {
            Clob::Remote(handle) => Some(handle),
            Clob::Local(_) => None,
        }
    }

    fn local(&self) -> Result<&str> {
        match self {
            Clob::Local(text) => Ok(text),
            Clob::Remote(_) => Err(remote(LobKind::Character)),
        }
    }

    /// Copy `length` characters starting at 1-based `pos`
    pub fn sub_string(&self, pos: u64, length: usize) -> Result<String> {
        let text = self.local()?;
        let count = text.chars().count();
        if pos < 1 || pos > count as u64 + 1 {
            return Err(out_of_range("pos", pos));
        }
        let start = (pos - 1) as usize;
        if length > count - start {
            return Err(out_of_range("length", length as u64));
        }
        Ok(text.chars().skip(start).take(length).collect())
    }

    /// 1-based character position of `pattern`, searching from 1-based `start`
    pub fn position(&self, pattern: &str, start: u64) -> Result<Option<u64>> {
        let text: Vec<char> = self.local()?.chars().collect();
        let pattern: Vec<char> = pattern.chars().collect();
        find(&text, &pattern, start)
    }

    /// Overwrite characters from 1-based `pos`, growing the value as needed
    ///
    /// `pos` may be at most one past the end. Returns the number of
    /// characters written.
    pub fn set_string(&mut self, pos: u64, text: &str) -> Result<usize> {
        let written: Vec<char> = text.chars().collect();
        let start = write_start(pos, written.len())?;
        let mut chars: Vec<char> = self.local()?.chars().collect();
        if start > chars.len() {
            return Err(out_of_range("pos", pos));
        }
        let end = start + written.len();
        if end > chars.len() {
            chars.resize(end, ' ');
        }
        chars[start..end].copy_from_slice(&written);
        *self = Clob::Local(chars.into_iter().collect());
        Ok(written.len())
    }

    /// Shorten the value to `len` characters
    pub fn truncate(&mut self, len: u64) -> Result<()> {
        let text = self.local()?;
        if len > text.chars().count() as u64 {
            return Err(out_of_range("len", len));
        }
        let kept: String = text.chars().take(len as usize).collect();
        *self = Clob::Local(kept);
        Ok(())
    }
}

impl From<String> for Clob {
    fn from(text: String) -> Self {
        Clob::Local(text)
    }
}

impl From<&str> for Clob {
    fn from(text: &str) -> Self {
        Clob::Local(text.to_string())
    }
}

/// How the bytes of a stream parameter are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEncoding {
    /// Raw bytes for binary targets
    Binary,
    /// One byte per character
    Ascii,
    /// UTF-8 encoded characters
    Utf8,
}

/// Stream supplied for a parameter, read once at execute time
///
/// The declared length is in bytes for binary streams and characters for
/// character streams. A stream without a declared length is read to its end.
pub struct LobSource {
    reader: Box<dyn AsyncRead + Send + Unpin>,
    encoding: StreamEncoding,
    length: Option<u64>,
}

impl LobSource {
    /// Wrap an async reader
    pub fn new<R>(reader: R, encoding: StreamEncoding) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        Self {
            reader: Box::new(reader),
            encoding,
            length: None,
        }
    }

    /// Set the declared length
    pub fn with_length(mut self, length: u64) -> Self {
        self.length = Some(length);
        self
    }

    /// Binary stream over in-memory bytes
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let length = data.len() as u64;
        Self::new(std::io::Cursor::new(data), StreamEncoding::Binary).with_length(length)
    }

    /// UTF-8 character stream over in-memory text
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let length = text.chars().count() as u64;
        Self::new(std::io::Cursor::new(text.into_bytes()), StreamEncoding::Utf8)
            .with_length(length)
    }

    /// Declared length, if any
    pub fn length(&self) -> Option<u64> {
        self.length
    }

    /// Encoding of the stream content
    pub fn encoding(&self) -> StreamEncoding {
        self.encoding
    }

    /// Take the underlying reader
    pub fn into_reader(self) -> Box<dyn AsyncRead + Send + Unpin> {
        self.reader
    }
}

impl std::fmt::Debug for LobSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LobSource")
            .field("encoding", &self.encoding)
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}

/// LOB content sent to or read from the engine
#[derive(Debug, Clone, PartialEq)]
pub enum LobData {
    /// Character content (CLOB)
    String(String),
    /// Binary content (BLOB)
    Bytes(Bytes),
}

impl LobData {
    /// Get as string (for CLOB)
    pub fn as_string(&self) -> Option<&String> {
        match self {
            LobData::String(s) => Some(s),
            LobData::Bytes(_) => None,
        }
    }

    /// Get as bytes (for BLOB)
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            LobData::Bytes(b) => Some(b),
            LobData::String(_) => None,
        }
    }

    /// Convert to bytes (consumes self)
    pub fn into_bytes(self) -> Option<Bytes> {
        match self {
            LobData::Bytes(b) => Some(b),
            LobData::String(_) => None,
        }
    }

    /// Kind of LOB this content belongs in
    pub fn kind(&self) -> LobKind {
        match self {
            LobData::String(_) => LobKind::Character,
            LobData::Bytes(_) => LobKind::Binary,
        }
    }

    /// Length in characters (CLOB) or bytes (BLOB)
    pub fn len(&self) -> u64 {
        match self {
            LobData::String(s) => s.chars().count() as u64,
            LobData::Bytes(b) => b.len() as u64,
        }
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
