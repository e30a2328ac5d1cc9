//! Fixed-layout binary frames for commands and results
//!
//! Command frame (72 bytes, little-endian):
//!
//! | offset | size | field                                   |
//! |--------|------|-----------------------------------------|
//! | 0      | 4    | magic `NGCF`                            |
//! | 4      | 1    | version                                 |
//! | 5      | 1    | command kind code                       |
//! | 6      | 2    | presence bitmask, one bit per parameter |
//! | 8      | 60   | fifteen 4-byte parameter fields         |
//! | 68     | 4    | CRC32 of bytes 0..68                    |
//!
//! Result frame (21 bytes): magic `NGCR`, version, status `i32`, id `u32`,
//! value `f32`, CRC32 of everything before it.
//!
//! Absent parameters are encoded as zero with their presence bit cleared, so an
//! explicit zero survives the round trip.

use crate::{
    command::{Command, CommandKind, CommandParams, CommandResult},
    error::*,
    neuron::{ActivationFunction, NeuronParam, NeuronType},
    synapse::SynapseType,
};

/// Command frame magic
pub const COMMAND_MAGIC: [u8; 4] = *b"NGCF";

/// Result frame magic
pub const RESULT_MAGIC: [u8; 4] = *b"NGCR";

/// Frame format version
pub const FRAME_VERSION: u8 = 1;

/// Encoded command frame length
pub const COMMAND_FRAME_LEN: usize = 8 + PARAM_FIELDS * 4 + 4;

/// Encoded result frame length
pub const RESULT_FRAME_LEN: usize = 4 + 1 + 4 + 4 + 4 + 4;

const PARAM_FIELDS: usize = 15;

/// Encode a command frame
pub fn encode_command(command: &Command) -> Vec<u8> {
    let p = &command.params;
    let fields: [Option<u32>; PARAM_FIELDS] = [
        p.neuron_id,
        p.neuron_type.map(NeuronType::code),
        p.activation.map(ActivationFunction::code),
        p.threshold.map(f32::to_bits),
        p.rest_potential.map(f32::to_bits),
        p.refractory_period.map(f32::to_bits),
        p.target_id,
        p.synapse_id,
        p.synapse_type.map(SynapseType::code),
        p.weight.map(f32::to_bits),
        p.delay.map(f32::to_bits),
        p.time_step.map(f32::to_bits),
        p.num_steps,
        p.parameter.map(NeuronParam::code),
        p.value.map(f32::to_bits),
    ];

    let presence = fields
        .iter()
        .enumerate()
        .filter(|(_, field)| field.is_some())
        .fold(0u16, |mask, (bit, _)| mask | (1 << bit));

    let mut frame = Vec::with_capacity(COMMAND_FRAME_LEN);
    frame.extend_from_slice(&COMMAND_MAGIC);
    frame.push(FRAME_VERSION);
    frame.push(command.kind.code());
    frame.extend_from_slice(&presence.to_le_bytes());
    for field in fields {
        frame.extend_from_slice(&field.unwrap_or(0).to_le_bytes());
    }
    seal(frame)
}

/// Decode a command frame
///
/// Structural problems yield [`RuntimeError::InvalidFrame`] or
/// [`RuntimeError::ChecksumMismatch`]; an unknown enum code in a present field
/// yields [`RuntimeError::InvalidParameter`].
pub fn decode_command(frame: &[u8]) -> Result<Command> {
    let body = open(frame, COMMAND_MAGIC, COMMAND_FRAME_LEN)?;
    let kind = CommandKind::from_code(body[5])?;
    let presence = u16::from_le_bytes([body[6], body[7]]);
    if presence >> PARAM_FIELDS != 0 {
        return Err(RuntimeError::invalid_frame(format!(
            "unknown presence bits {:#06x}",
            presence
        )));
    }

    let mut fields = [None; PARAM_FIELDS];
    for (bit, field) in fields.iter_mut().enumerate() {
        if presence & (1 << bit) != 0 {
            *field = Some(read_u32(body, 8 + bit * 4));
        }
    }
    let float = |bit: usize| fields[bit].map(f32::from_bits);

    let params = CommandParams {
        neuron_id: fields[0],
        neuron_type: fields[1].map(NeuronType::from_code).transpose()?,
        activation: fields[2].map(ActivationFunction::from_code).transpose()?,
        threshold: float(3),
        rest_potential: float(4),
        refractory_period: float(5),
        target_id: fields[6],
        synapse_id: fields[7],
        synapse_type: fields[8].map(SynapseType::from_code).transpose()?,
        weight: float(9),
        delay: float(10),
        time_step: float(11),
        num_steps: fields[12],
        parameter: fields[13].map(NeuronParam::from_code).transpose()?,
        value: float(14),
    };

    Ok(Command { kind, params })
}

/// Encode a result frame
pub fn encode_result(result: &CommandResult) -> Vec<u8> {
    let mut frame = Vec::with_capacity(RESULT_FRAME_LEN);
    frame.extend_from_slice(&RESULT_MAGIC);
    frame.push(FRAME_VERSION);
    frame.extend_from_slice(&result.status.to_le_bytes());
    frame.extend_from_slice(&result.id.to_le_bytes());
    frame.extend_from_slice(&result.value.to_le_bytes());
    seal(frame)
}

/// Decode a result frame
pub fn decode_result(frame: &[u8]) -> Result<CommandResult> {
    let body = open(frame, RESULT_MAGIC, RESULT_FRAME_LEN)?;
    Ok(CommandResult {
        status: read_u32(body, 5) as i32,
        id: read_u32(body, 9),
        value: f32::from_bits(read_u32(body, 13)),
    })
}

fn seal(mut frame: Vec<u8>) -> Vec<u8> {
    let checksum = crc32fast::hash(&frame);
    frame.extend_from_slice(&checksum.to_le_bytes());
    frame
}

/// Check length, magic, version and checksum; returns the frame minus its trailer
fn open(frame: &[u8], magic: [u8; 4], len: usize) -> Result<&[u8]> {
    if frame.len() != len {
        return Err(RuntimeError::invalid_frame(format!(
            "expected {} bytes, got {}",
            len,
            frame.len()
        )));
    }
    if frame[..4] != magic {
        return Err(RuntimeError::invalid_frame("bad magic"));
    }
    if frame[4] != FRAME_VERSION {
        return Err(RuntimeError::invalid_frame(format!(
            "unsupported version {}",
            frame[4]
        )));
    }

    let (body, trailer) = frame.split_at(len - 4);
    let expected = read_u32(trailer, 0);
    let computed = crc32fast::hash(body);
    if expected != computed {
        return Err(RuntimeError::ChecksumMismatch { expected, computed });
    }
    Ok(body)
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(word)
}
