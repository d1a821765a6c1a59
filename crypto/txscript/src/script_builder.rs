use std::iter::once;

use crate::{
    MAX_SCRIPT_ELEMENT_SIZE, MAX_SCRIPTS_SIZE,
    opcodes::{OP_1_NEGATE_VAL, OP_DATA_MAX_VAL, OP_DATA_MIN_VAL, OP_SMALL_INT_MAX_VAL, codes::*},
};
use thiserror::Error;

/// Initial capacity of a script under construction. Unlocking scripts with
/// backtrace proofs are usually a few kilobytes and grow from there.
const DEFAULT_SCRIPT_ALLOC: usize = 512;

#[derive(Error, PartialEq, Eq, Debug, Clone, Copy)]
pub enum ScriptBuilderError {
    #[error("adding {0} opcodes would exceed the maximum script length of {MAX_SCRIPTS_SIZE}")]
    OpCodesRejected(usize),

    #[error("adding {0} bytes of data would exceed the maximum script length of {MAX_SCRIPTS_SIZE}")]
    DataRejected(usize),

    #[error("a data element of {0} bytes exceeds the maximum element size of {MAX_SCRIPT_ELEMENT_SIZE}")]
    ElementExceedsMaxSize(usize),

    #[error("adding integer {0} would exceed the maximum script length of {MAX_SCRIPTS_SIZE}")]
    IntegerRejected(i128),
}
pub type ScriptBuilderResult<T> = std::result::Result<T, ScriptBuilderError>;

/// Serializes an integer using the script number encoding: little-endian
/// magnitude, minimal length, with the sign carried in the most significant
/// bit of the last byte.
pub fn serialize_script_num(val: i128) -> Vec<u8> {
    if val == 0 {
        return vec![];
    }
    let negative = val < 0;
    let mut magnitude = val.unsigned_abs();
    let mut result = Vec::with_capacity(17);
    while magnitude > 0 {
        result.push((magnitude & 0xff) as u8);
        magnitude >>= 8;
    }
    // a high bit already in use needs an extra byte for the sign
    match result.last_mut() {
        Some(last) if *last & 0x80 != 0 => result.push(if negative { 0x80 } else { 0 }),
        Some(last) if negative => *last |= 0x80,
        _ => {}
    }
    result
}

/// Builds scripts out of opcodes, integers and data pushes, always choosing
/// the minimal push encoding. Pushes that would exceed [`MAX_SCRIPTS_SIZE`]
/// are rejected and leave the script untouched.
///
/// Contract unlocking scripts are a plain sequence of pushes, one per
/// positional argument:
///
/// ```
/// use sensible_txscript::script_builder::{ScriptBuilderResult, ScriptBuilder};
/// fn build_p2pkh_unlock(sig: &[u8], pub_key: &[u8]) -> ScriptBuilderResult<Vec<u8>> {
///     Ok(ScriptBuilder::new().add_data(sig)?.add_data(pub_key)?.drain())
/// }
/// ```
pub struct ScriptBuilder {
    script: Vec<u8>,
}

impl ScriptBuilder {
    pub fn new() -> Self {
        Self { script: Vec::with_capacity(DEFAULT_SCRIPT_ALLOC) }
    }

    /// Continues building on top of an existing script, e.g. a contract code part.
    pub fn with_prefix(prefix: &[u8]) -> Self {
        let mut script = Vec::with_capacity(prefix.len() + DEFAULT_SCRIPT_ALLOC);
        script.extend_from_slice(prefix);
        Self { script }
    }

    pub fn script(&self) -> &[u8] {
        &self.script
    }

    /// Takes the built script, leaving the builder empty.
    pub fn drain(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.script)
    }

    pub fn add_ops(&mut self, opcodes: &[u8]) -> ScriptBuilderResult<&mut Self> {
        if self.script.len() + opcodes.len() > MAX_SCRIPTS_SIZE {
            return Err(ScriptBuilderError::OpCodesRejected(opcodes.len()));
        }
        self.script.extend_from_slice(opcodes);
        Ok(self)
    }

    /// Appends bytes verbatim. Only meaningful after an `OpReturn`, where the
    /// remainder of the script is never executed.
    pub fn add_raw(&mut self, bytes: &[u8]) -> ScriptBuilderResult<&mut Self> {
        if self.script.len() + bytes.len() > MAX_SCRIPTS_SIZE {
            return Err(ScriptBuilderError::DataRejected(bytes.len()));
        }
        self.script.extend_from_slice(bytes);
        Ok(self)
    }

    /// Number of bytes `data` takes once pushed, opcode included.
    pub fn canonical_data_size(data: &[u8]) -> usize {
        let data_len = data.len();
        // empty data and single small integers collapse into one opcode
        if data_len == 0 || (data_len == 1 && (data[0] <= OP_SMALL_INT_MAX_VAL || data[0] == OP_1_NEGATE_VAL)) {
            return 1;
        }
        data_len + Self::push_prefix_size(data_len)
    }

    /// Size of the push opcode (plus length bytes) for a data element of `data_len` bytes.
    pub fn push_prefix_size(data_len: usize) -> usize {
        match data_len {
            n if n <= OP_DATA_MAX_VAL as usize => 1,
            n if n <= u8::MAX as usize => 2,
            n if n <= u16::MAX as usize => 3,
            _ => 5,
        }
    }

    /// Pushes `data` with its minimal encoding, without any size check.
    fn add_raw_data(&mut self, data: &[u8]) -> &mut Self {
        let data_len = data.len();
        match data {
            [] | [0] => {
                self.script.push(Op0);
                return self;
            }
            [n] if *n <= OP_SMALL_INT_MAX_VAL => {
                self.script.push((Op1 - 1) + n);
                return self;
            }
            [OP_1_NEGATE_VAL] => {
                self.script.push(Op1Negate);
                return self;
            }
            _ => {}
        }

        if data_len <= OP_DATA_MAX_VAL as usize {
            self.script.push((OP_DATA_MIN_VAL - 1) + data_len as u8);
        } else if data_len <= u8::MAX as usize {
            self.script.extend(once(OpPushData1).chain(once(data_len as u8)));
        } else if data_len <= u16::MAX as usize {
            self.script.extend(once(OpPushData2).chain((data_len as u16).to_le_bytes()));
        } else {
            self.script.extend(once(OpPushData4).chain((data_len as u32).to_le_bytes()));
        }
        self.script.extend(data);
        self
    }

    /// Pushes data past the script size limit, for size edge case tests.
    #[cfg(test)]
    pub fn add_data_unchecked(&mut self, data: &[u8]) -> &mut Self {
        self.add_raw_data(data)
    }

    /// Pushes `data` with its minimal encoding; an empty slice pushes `Op0`.
    pub fn add_data(&mut self, data: &[u8]) -> ScriptBuilderResult<&mut Self> {
        let data_size = Self::canonical_data_size(data);
        if self.script.len() + data_size > MAX_SCRIPTS_SIZE {
            return Err(ScriptBuilderError::DataRejected(data_size));
        }
        if data.len() > MAX_SCRIPT_ELEMENT_SIZE {
            return Err(ScriptBuilderError::ElementExceedsMaxSize(data.len()));
        }
        Ok(self.add_raw_data(data))
    }

    pub fn add_i64(&mut self, val: i64) -> ScriptBuilderResult<&mut Self> {
        self.add_num(val as i128)
    }

    /// Pushes an integer in script number encoding. Wide enough for any
    /// 64-bit token amount.
    pub fn add_num(&mut self, val: i128) -> ScriptBuilderResult<&mut Self> {
        if self.script.len() + 1 > MAX_SCRIPTS_SIZE {
            return Err(ScriptBuilderError::IntegerRejected(val));
        }
        match val {
            0 => self.script.push(Op0),
            -1 | 1..=16 => self.script.push(((Op1 as i128 - 1) + val) as u8),
            _ => return self.add_data(&serialize_script_num(val)),
        }
        Ok(self)
    }
}

impl Default for ScriptBuilder {
    fn default() -> Self {
        Self::new()
    }
}
