//! LOB staging
//!
//! Before an execute or batch request is built, every binding that needs
//! engine work is resolved into a plain [`SqlValue`]:
//!
//! - BLOB/CLOB handles owned by this session pass through unchanged
//! - local LOB content and LOB-typed streams are read, allocated with
//!   `create_blob`/`create_clob`, and attached as [`LobCreate`]
//!   sub-requests to the outgoing request
//! - streams bound to character or binary slots are read into memory
//! - remote BLOBs bound to binary slots are read with `read_lob`
//!
//! Staging runs immediately before execution, never at bind time. Every
//! stream of a row (or of a whole batch) is read and length-checked before
//! the first allocation.

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::trace;

use crate::constants::SqlType;
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::params::{Binding, PendingStream};
use crate::request::LobCreate;
use crate::types::{Blob, Clob, LobData, LobHandle, LobKind, SqlValue, StreamEncoding};

/// Resolves LOB bindings against an engine session
pub struct LobStager<'a> {
    engine: &'a mut dyn Engine,
    session_id: i64,
    lobs: Vec<LobCreate>,
}

impl<'a> LobStager<'a> {
    /// Create a stager for the given engine session
    pub fn new(engine: &'a mut dyn Engine) -> Self {
        let session_id = engine.session_id();
        Self {
            engine,
            session_id,
            lobs: Vec::new(),
        }
    }

    /// Resolve every binding of a row, in parameter order
    ///
    /// All streams are read and checked before the first LOB is allocated,
    /// so a row that fails staging allocates nothing.
    pub async fn stage_row(&mut self, row: Vec<Binding>) -> Result<Vec<SqlValue>> {
        let mut rows = self.stage_rows(vec![row]).await?;
        Ok(rows.pop().unwrap_or_default())
    }

    /// Resolve the bindings of several rows, reading every row before
    /// allocating any LOB
    pub async fn stage_rows(&mut self, rows: Vec<Vec<Binding>>) -> Result<Vec<Vec<SqlValue>>> {
        let mut read = Vec::with_capacity(rows.len());
        for row in rows {
            let mut values = Vec::with_capacity(row.len());
            for (pos, binding) in row.into_iter().enumerate() {
                values.push(self.read(pos + 1, binding).await?);
            }
            read.push(values);
        }

        let mut staged = Vec::with_capacity(read.len());
        for row in read {
            let mut values = Vec::with_capacity(row.len());
            for (pos, value) in row.into_iter().enumerate() {
                values.push(self.allocate(pos + 1, value).await?);
            }
            staged.push(values);
        }
        Ok(staged)
    }

    /// LOB creation sub-requests produced so far
    pub fn finish(self) -> Vec<LobCreate> {
        self.lobs
    }

    async fn read(&mut self, index: usize, binding: Binding) -> Result<Staged> {
        match binding {
            Binding::Value(v) => Ok(Staged::Ready(v)),
            Binding::Blob(Blob::Remote(handle)) => {
                self.check_owned(index, &handle)?;
                Ok(Staged::Ready(SqlValue::Blob(handle)))
            }
            Binding::Clob(Clob::Remote(handle)) => {
                self.check_owned(index, &handle)?;
                Ok(Staged::Ready(SqlValue::Clob(handle)))
            }
            Binding::Blob(Blob::Local(data)) => Ok(Staged::Create(LobData::Bytes(data))),
            Binding::Clob(Clob::Local(text)) => Ok(Staged::Create(LobData::String(text))),
            Binding::MaterializeBinary(handle) => {
                self.check_owned(index, &handle)?;
                match self.engine.read_lob(&handle).await? {
                    LobData::Bytes(data) => Ok(Staged::Ready(SqlValue::Binary(data))),
                    LobData::String(_) => Err(Error::InvalidArgument(format!(
                        "parameter {}: CLOB cannot be bound to a binary type",
                        index
                    ))),
                }
            }
            Binding::Stream(pending) => read_stream(index, pending).await,
        }
    }

    async fn allocate(&mut self, index: usize, staged: Staged) -> Result<SqlValue> {
        match staged {
            Staged::Ready(value) => Ok(value),
            Staged::Create(data) => self.create(index, data).await,
        }
    }

    /// Read a pending stream and turn it into the value sent for its slot
    ///
    /// LOB-typed slots get a newly allocated handle; character and binary
    /// slots get the content inline. A stream whose length differs from its
    /// declared length fails with `StreamLengthMismatch`.
    pub async fn stage(&mut self, index: usize, pending: PendingStream) -> Result<SqlValue> {
        let staged = read_stream(index, pending).await?;
        self.allocate(index, staged).await
    }

    fn check_owned(&self, index: usize, handle: &LobHandle) -> Result<()> {
        if !handle.belongs_to(self.session_id) {
            return Err(Error::InvalidArgument(format!(
                "parameter {}: {} belongs to session {}, not {}",
                index,
                handle.kind.name(),
                handle.session_id,
                self.session_id
            )));
        }
        Ok(())
    }

    async fn create(&mut self, index: usize, data: LobData) -> Result<SqlValue> {
        let length = data.len();
        let handle = match data.kind() {
            LobKind::Binary => self.engine.create_blob(length).await?,
            LobKind::Character => self.engine.create_clob(length).await?,
        };
        trace!(
            index = index,
            lob_id = handle.id,
            length = length,
            kind = handle.kind.name(),
            "staged LOB parameter"
        );
        self.lobs.push(LobCreate { handle, data });
        Ok(match handle.kind {
            LobKind::Binary => SqlValue::Blob(handle),
            LobKind::Character => SqlValue::Clob(handle),
        })
    }
}

/// A binding after its content is read, before any engine allocation
enum Staged {
    Ready(SqlValue),
    Create(LobData),
}

async fn read_stream(index: usize, pending: PendingStream) -> Result<Staged> {
    let declared = pending.declared_length();
    let encoding = pending.source.encoding();
    let reader = pending.source.into_reader();

    match pending.target {
        SqlType::Blob => {
            let data = read_binary(index, reader, declared).await?;
            Ok(Staged::Create(LobData::Bytes(data)))
        }
        SqlType::Clob => {
            let text = read_text(index, reader, encoding, declared).await?;
            Ok(Staged::Create(LobData::String(text)))
        }
        t if t.is_character() => {
            let text = read_text(index, reader, encoding, declared).await?;
            Ok(Staged::Ready(SqlValue::Char(text)))
        }
        t if t.is_binary() => {
            let data = read_binary(index, reader, declared).await?;
            Ok(Staged::Ready(SqlValue::Binary(data)))
        }
        other => Err(Error::UnsupportedValueType(format!(
            "parameter {}: stream cannot be bound to {}",
            index, other
        ))),
    }
}

type Reader = Box<dyn AsyncRead + Send + Unpin>;

/// Read a binary stream; with a declared length, at most one extra byte is read
async fn read_binary(index: usize, reader: Reader, declared: Option<u64>) -> Result<Bytes> {
    let mut buf = Vec::new();
    match declared {
        Some(length) => {
            reader
                .take(length.saturating_add(1))
                .read_to_end(&mut buf)
                .await?;
            if buf.len() as u64 != length {
                return Err(Error::StreamLengthMismatch {
                    index,
                    declared: length,
                    actual: buf.len() as u64,
                });
            }
        }
        None => {
            let mut reader = reader;
            reader.read_to_end(&mut buf).await?;
        }
    }
    Ok(Bytes::from(buf))
}

/// Read a character stream; declared and actual lengths count characters
async fn read_text(
    index: usize,
    reader: Reader,
    encoding: StreamEncoding,
    declared: Option<u64>,
) -> Result<String> {
    let bytes_per_char: u64 = match encoding {
        StreamEncoding::Ascii => 1,
        _ => 4,
    };
    let mut buf = Vec::new();
    let cap = declared.map(|length| length.saturating_mul(bytes_per_char).saturating_add(bytes_per_char));
    match cap {
        Some(cap) => {
            reader.take(cap).read_to_end(&mut buf).await?;
        }
        None => {
            let mut reader = reader;
            reader.read_to_end(&mut buf).await?;
        }
    }
    let capped = cap.map(|cap| buf.len() as u64 >= cap).unwrap_or(false);

    let text = match encoding {
        StreamEncoding::Ascii => buf.iter().map(|&b| b as char).collect(),
        _ if capped => String::from_utf8_lossy(&buf).into_owned(),
        _ => String::from_utf8(buf).map_err(|e| {
            Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?,
    };

    if let Some(length) = declared {
        let actual = text.chars().count() as u64;
        if actual != length {
            return Err(Error::StreamLengthMismatch {
                index,
                declared: length,
                actual,
            });
        }
    }
    Ok(text)
}
