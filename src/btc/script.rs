//! Push-opcode decoding for scriptSig parsing

use thiserror::Error;

const OP_0: u8 = 0x00;
const OP_PUSHBYTES_75: u8 = 0x4b;
const OP_PUSHDATA1: u8 = 0x4c;
const OP_PUSHDATA2: u8 = 0x4d;
const OP_PUSHDATA4: u8 = 0x4e;
const OP_1NEGATE: u8 = 0x4f;
const OP_1: u8 = 0x51;
const OP_16: u8 = 0x60;

/// Operand produced by a single push opcode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOperand {
    Data(Vec<u8>),
    Number(i64),
}

impl PushOperand {
    pub fn as_data(&self) -> Option<&[u8]> {
        match self {
            PushOperand::Data(data) => Some(data),
            PushOperand::Number(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptDecodeError {
    #[error("opcode 0x{opcode:02x} at offset {offset} is not a push opcode")]
    NotAPush { opcode: u8, offset: usize },
    #[error("push at offset {offset} needs {needed} bytes but only {available} remain")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },
}

/// Decodes the push at the start of `script`.
///
/// # Returns
///
/// * `Ok((operand, consumed))` - The operand and the number of bytes read
/// * `Err(ScriptDecodeError)` - Leading opcode is not a push, or the push is truncated
pub fn decode_push(script: &[u8], offset: usize) -> Result<(PushOperand, usize), ScriptDecodeError> {
    let Some(&opcode) = script.get(offset) else {
        return Err(ScriptDecodeError::Truncated {
            offset,
            needed: 1,
            available: 0,
        });
    };
    let rest = &script[offset + 1..];

    let (len_size, data_len) = match opcode {
        OP_0 => return Ok((PushOperand::Data(Vec::new()), 1)),
        0x01..=OP_PUSHBYTES_75 => (0, opcode as usize),
        OP_PUSHDATA1 => (1, read_le(rest, 1, offset)?),
        OP_PUSHDATA2 => (2, read_le(rest, 2, offset)?),
        OP_PUSHDATA4 => (4, read_le(rest, 4, offset)?),
        OP_1NEGATE => return Ok((PushOperand::Number(-1), 1)),
        OP_1..=OP_16 => return Ok((PushOperand::Number((opcode - OP_1 + 1) as i64), 1)),
        _ => return Err(ScriptDecodeError::NotAPush { opcode, offset }),
    };

    let data = &rest[len_size..];
    if data.len() < data_len {
        return Err(ScriptDecodeError::Truncated {
            offset,
            needed: data_len,
            available: data.len(),
        });
    }
    Ok((
        PushOperand::Data(data[..data_len].to_vec()),
        1 + len_size + data_len,
    ))
}

/// Decodes a push-only script into its operands.
pub fn decode_pushes(script: &[u8]) -> Result<Vec<PushOperand>, ScriptDecodeError> {
    let mut operands = Vec::new();
    let mut offset = 0;
    while offset < script.len() {
        let (operand, consumed) = decode_push(script, offset)?;
        operands.push(operand);
        offset += consumed;
    }
    Ok(operands)
}

fn read_le(bytes: &[u8], size: usize, offset: usize) -> Result<usize, ScriptDecodeError> {
    if bytes.len() < size {
        return Err(ScriptDecodeError::Truncated {
            offset,
            needed: size,
            available: bytes.len(),
        });
    }
    let mut buf = [0u8; 4];
    buf[..size].copy_from_slice(&bytes[..size]);
    Ok(u32::from_le_bytes(buf) as usize)
}
