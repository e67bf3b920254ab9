//! Parameter slots of a prepared statement
//!
//! A [`ParameterSet`] holds one slot per declared parameter. Each slot
//! records the coerced binding and whether it was set as a plain value or
//! as a stream. Plain values survive execution and are reused by the next
//! one; streams are consumed by each execution and must be supplied again.

use crate::constants::{ParameterMode, SqlType};
use crate::error::{Error, Result};
use crate::metadata::ParameterInfo;
use crate::types::{Blob, Clob, LobHandle, LobSource, ParameterType, SqlValue};

/// Stream waiting to be read when the statement executes
#[derive(Debug)]
pub struct PendingStream {
    /// Source of the content
    pub source: LobSource,
    /// Declared type of the receiving slot
    pub target: SqlType,
}

impl PendingStream {
    /// Create a pending stream for a slot of the given type
    pub fn new(source: LobSource, target: SqlType) -> Self {
        Self { source, target }
    }

    /// Declared length of the stream, if any
    pub fn declared_length(&self) -> Option<u64> {
        self.source.length()
    }
}

/// Coerced content of a parameter slot
#[derive(Debug)]
pub enum Binding {
    /// Plain value, sent as is
    Value(SqlValue),
    /// BLOB value; local content is created engine-side before execution
    Blob(Blob),
    /// CLOB value; local content is created engine-side before execution
    Clob(Clob),
    /// Stream read and staged before execution
    Stream(PendingStream),
    /// Engine BLOB read into an in-memory binary value before execution
    MaterializeBinary(LobHandle),
}

impl Binding {
    /// Check if this binding is consumed by execution
    pub fn is_stream(&self) -> bool {
        matches!(self, Binding::Stream(_))
    }

    /// Copy a non-stream binding
    pub fn duplicate(&self) -> Option<Binding> {
        match self {
            Binding::Value(v) => Some(Binding::Value(v.clone())),
            Binding::Blob(b) => Some(Binding::Blob(b.clone())),
            Binding::Clob(c) => Some(Binding::Clob(c.clone())),
            Binding::MaterializeBinary(h) => Some(Binding::MaterializeBinary(*h)),
            Binding::Stream(_) => None,
        }
    }
}

#[derive(Debug, Default)]
struct Slot {
    binding: Option<Binding>,
    is_set: bool,
    is_stream: bool,
    stream_length: Option<u64>,
}

/// Bound parameter values of one prepared statement
#[derive(Debug)]
pub struct ParameterSet {
    types: Vec<ParameterType>,
    modes: Vec<ParameterMode>,
    slots: Vec<Slot>,
}

impl ParameterSet {
    /// Create an empty set for the described parameters
    pub fn new(parameters: &[ParameterInfo]) -> Self {
        Self {
            types: parameters.iter().map(|p| p.param_type).collect(),
            modes: parameters.iter().map(|p| p.mode).collect(),
            slots: parameters.iter().map(|_| Slot::default()).collect(),
        }
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if the statement takes no parameters
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn check_range(&self, index: usize) -> Result<usize> {
        if index < 1 || index > self.slots.len() {
            return Err(Error::IndexOutOfRange {
                index,
                count: self.slots.len(),
            });
        }
        Ok(index - 1)
    }

    /// Validate a 1-based index for setting; returns the slot position
    pub fn check_set_index(&self, index: usize) -> Result<usize> {
        let pos = self.check_range(index)?;
        let mode = self.modes[pos];
        if !mode.is_settable() {
            return Err(Error::ParameterModeViolation {
                index,
                mode,
                message: "OUT parameter cannot be set".to_string(),
            });
        }
        Ok(pos)
    }

    /// Validate a 1-based index for reading an output; returns the slot position
    pub fn check_get_index(&self, index: usize) -> Result<usize> {
        let pos = self.check_range(index)?;
        let mode = self.modes[pos];
        if !mode.is_readable() {
            return Err(Error::ParameterModeViolation {
                index,
                mode,
                message: "IN parameter cannot be read as output".to_string(),
            });
        }
        Ok(pos)
    }

    /// Declared type of the parameter at slot position `pos`
    pub fn param_type(&self, pos: usize) -> Option<&ParameterType> {
        self.types.get(pos)
    }

    /// Store a coerced binding at slot position `pos`
    pub fn bind(&mut self, pos: usize, binding: Binding) {
        let slot = &mut self.slots[pos];
        match &binding {
            Binding::Stream(pending) => {
                slot.is_stream = true;
                slot.is_set = false;
                slot.stream_length = pending.declared_length();
            }
            _ => {
                slot.is_stream = false;
                slot.is_set = true;
                slot.stream_length = None;
            }
        }
        slot.binding = Some(binding);
    }

    /// Ensure every IN and INOUT parameter has a value for this execution
    pub fn check_all_set(&self) -> Result<()> {
        for (pos, slot) in self.slots.iter().enumerate() {
            if self.modes[pos] == ParameterMode::Out {
                continue;
            }
            if !slot.is_set && !slot.is_stream {
                return Err(Error::ParameterNotSet { index: pos + 1 });
            }
        }
        Ok(())
    }

    /// Take the bindings for one execution or batch row
    ///
    /// Plain values are copied and stay bound. Streams are moved out and
    /// their slots emptied.
    pub fn take_row(&mut self) -> Vec<Binding> {
        self.slots
            .iter_mut()
            .map(|slot| {
                if slot.is_stream {
                    slot.is_stream = false;
                    slot.is_set = false;
                    slot.stream_length = None;
                    slot.binding
                        .take()
                        .unwrap_or(Binding::Value(SqlValue::Null))
                } else {
                    slot.binding
                        .as_ref()
                        .and_then(Binding::duplicate)
                        .unwrap_or(Binding::Value(SqlValue::Null))
                }
            })
            .collect()
    }

    /// Coerced value bound at a 1-based index, if it is a plain value
    pub fn value(&self, index: usize) -> Option<&SqlValue> {
        let slot = self.slots.get(index.checked_sub(1)?)?;
        match slot.binding.as_ref()? {
            Binding::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Declared length of the stream bound at a 1-based index
    pub fn stream_length(&self, index: usize) -> Option<u64> {
        self.slots.get(index.checked_sub(1)?)?.stream_length
    }

    /// Check if the parameter at a 1-based index is set for the next execution
    pub fn is_set(&self, index: usize) -> bool {
        index
            .checked_sub(1)
            .and_then(|pos| self.slots.get(pos))
            .map(|slot| slot.is_set || slot.is_stream)
            .unwrap_or(false)
    }

    /// Empty every slot
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = Slot::default();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn infos(modes: &[ParameterMode]) -> Vec<ParameterInfo> {
        modes
            .iter()
            .map(|m| ParameterInfo::new(ParameterType::new(SqlType::Integer), *m))
            .collect()
    }

    fn stream() -> Binding {
        Binding::Stream(PendingStream::new(
            LobSource::from_bytes(vec![1u8, 2, 3]),
            SqlType::Blob,
        ))
    }

    #[test]
    fn test_index_bounds() {
        let params = ParameterSet::new(&infos(&[ParameterMode::In, ParameterMode::In]));
        assert!(matches!(
            params.check_set_index(0),
            Err(Error::IndexOutOfRange { index: 0, count: 2 })
        ));
        assert!(matches!(
            params.check_set_index(3),
            Err(Error::IndexOutOfRange { index: 3, count: 2 })
        ));
        assert_eq!(params.check_set_index(2).unwrap(), 1);
    }

    #[test]
    fn test_mode_checks() {
        let params = ParameterSet::new(&infos(&[
            ParameterMode::In,
            ParameterMode::Out,
            ParameterMode::InOut,
        ]));
        assert!(matches!(
            params.check_set_index(2),
            Err(Error::ParameterModeViolation { index: 2, .. })
        ));
        assert!(matches!(
            params.check_get_index(1),
            Err(Error::ParameterModeViolation { index: 1, .. })
        ));
        assert!(params.check_get_index(2).is_ok());
        assert!(params.check_set_index(3).is_ok());
        assert!(params.check_get_index(3).is_ok());
    }

    #[test]
    fn test_check_all_set_skips_out() {
        let mut params = ParameterSet::new(&infos(&[ParameterMode::In, ParameterMode::Out]));
        assert!(matches!(
            params.check_all_set(),
            Err(Error::ParameterNotSet { index: 1 })
        ));
        params.bind(0, Binding::Value(SqlValue::Integer(1)));
        assert!(params.check_all_set().is_ok());
    }

    #[test]
    fn test_plain_values_survive_execution() {
        let mut params = ParameterSet::new(&infos(&[ParameterMode::In]));
        params.bind(0, Binding::Value(SqlValue::Integer(42)));

        let row = params.take_row();
        assert!(matches!(row[0], Binding::Value(SqlValue::Integer(42))));
        assert!(params.check_all_set().is_ok());
        assert_eq!(params.value(1), Some(&SqlValue::Integer(42)));
    }

    #[test]
    fn test_streams_must_be_reset() {
        let mut params = ParameterSet::new(&infos(&[ParameterMode::In]));
        params.bind(0, stream());
        assert!(params.is_set(1));
        assert_eq!(params.stream_length(1), Some(3));
        assert!(params.check_all_set().is_ok());

        let row = params.take_row();
        assert!(row[0].is_stream());
        assert!(!params.is_set(1));
        assert!(matches!(
            params.check_all_set(),
            Err(Error::ParameterNotSet { index: 1 })
        ));
    }

    #[test]
    fn test_value_replaces_stream() {
        let mut params = ParameterSet::new(&infos(&[ParameterMode::In]));
        params.bind(0, stream());
        params.bind(0, Binding::Value(SqlValue::Null));
        assert_eq!(params.stream_length(1), None);
        let _ = params.take_row();
        assert!(params.is_set(1));
    }

    #[test]
    fn test_clear() {
        let mut params = ParameterSet::new(&infos(&[ParameterMode::In]));
        params.bind(0, Binding::Value(SqlValue::Boolean(true)));
        params.clear();
        assert!(!params.is_set(1));
        assert!(params.value(1).is_none());
    }
}
