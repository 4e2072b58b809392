use tracing::trace;

use crate::{
    plan::{SlotSize, OFFSET_BYTES},
    BitPresenceVector, StableContainerError, StableSchema, StableValue, LOG_TARGET,
};

/// Largest payload a 4-byte offset can address.
const MAX_PAYLOAD_LEN: usize = u32::MAX as usize;

/// Fail unless `len` fits the 32-bit offset width and `max_len`.
fn check_offset_range(len: usize, max_len: usize) -> Result<u32, StableContainerError> {
    if len > max_len {
        return Err(StableContainerError::EncodingTooLarge { len });
    }
    u32::try_from(len).map_err(|_| StableContainerError::EncodingTooLarge { len })
}

/// Encode `value` under `schema`.
///
/// Absent fields cost nothing beyond their presence bit. Fails with
/// `InvalidValue` if the value does not match the schema, with
/// `InvalidPresenceBits` if a required field is absent and with
/// `EncodingTooLarge` if the payload exceeds the offset width.
pub fn encode(
    schema: &StableSchema,
    value: &StableValue,
) -> Result<Vec<u8>, StableContainerError> {
    encode_with_limit(schema, value, MAX_PAYLOAD_LEN)
}

/// `encode` with the payload capped at `max_len` bytes instead of the full
/// offset width.
fn encode_with_limit(
    schema: &StableSchema,
    value: &StableValue,
    max_len: usize,
) -> Result<Vec<u8>, StableContainerError> {
    schema.check_value(value)?;
    let presence = BitPresenceVector::build(schema, value);
    presence.validate(schema)?;

    let plan = schema.plan();
    let fixed_len = plan.fixed_region_len(presence.active_indices());
    let mut fixed = Vec::with_capacity(fixed_len);
    let mut variable = Vec::new();

    for (index, element) in value.active_elements() {
        let field = &schema.fields()[index];
        match plan.slots()[index].size {
            SlotSize::Fixed(_) => element.serialize_into(&field.element_type, &mut fixed)?,
            SlotSize::Variable => {
                let offset = check_offset_range(fixed_len + variable.len(), max_len)?;
                fixed.extend_from_slice(&offset.to_le_bytes());
                element.serialize_into(&field.element_type, &mut variable)?;
            }
        }
    }

    let payload_len = fixed.len() + variable.len();
    check_offset_range(payload_len, max_len)?;

    let mut out = Vec::with_capacity(presence.as_bytes().len() + payload_len);
    out.extend_from_slice(presence.as_bytes());
    out.extend_from_slice(&fixed);
    out.extend_from_slice(&variable);

    trace!(
        target: LOG_TARGET,
        schema = schema.name(),
        active = presence.count_active(),
        bytes = out.len(),
        "encoded stable container"
    );
    Ok(out)
}

/// Length of `encode(schema, value)` without producing the bytes.
pub fn encoded_len(
    schema: &StableSchema,
    value: &StableValue,
) -> Result<usize, StableContainerError> {
    schema.check_value(value)?;
    let presence = BitPresenceVector::build(schema, value);
    presence.validate(schema)?;

    let plan = schema.plan();
    let mut payload_len = 0usize;
    for (index, element) in value.active_elements() {
        let element_len = element.encoded_len(&schema.fields()[index].element_type)?;
        payload_len += match plan.slots()[index].size {
            SlotSize::Fixed(_) => element_len,
            SlotSize::Variable => OFFSET_BYTES + element_len,
        };
    }
    check_offset_range(payload_len, MAX_PAYLOAD_LEN)?;
    Ok(BitPresenceVector::byte_len(schema.capacity()) + payload_len)
}
