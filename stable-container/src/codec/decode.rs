use tracing::{debug, trace};

use crate::{
    plan::{SlotSize, OFFSET_BYTES},
    BitPresenceVector, Element, FieldValue, StableContainerError, StableSchema, StableValue,
    LOG_TARGET,
};

/// Decode a stable container encoded under `schema` or an earlier version
/// of it with the same capacity.
///
/// Fields the producer did not set, including fields appended after it was
/// built, come back as `FieldValue::Absent`. Nothing is returned unless the
/// whole input decodes.
pub fn decode(bytes: &[u8], schema: &StableSchema) -> Result<StableValue, StableContainerError> {
    decode_inner(bytes, schema).inspect_err(|e| {
        debug!(
            target: LOG_TARGET,
            schema = schema.name(),
            bytes = bytes.len(),
            error = %e,
            "rejected stable container encoding"
        );
    })
}

/// Decode bytes a producer declared under `producer_capacity`.
///
/// Capacity is part of the type identity: a producer using a different
/// capacity is rejected with `SchemaMismatch` before any byte is read.
pub fn decode_with_capacity(
    bytes: &[u8],
    schema: &StableSchema,
    producer_capacity: usize,
) -> Result<StableValue, StableContainerError> {
    if producer_capacity != schema.capacity() {
        debug!(
            target: LOG_TARGET,
            schema = schema.name(),
            producer_capacity,
            capacity = schema.capacity(),
            "rejected stable container from a different capacity"
        );
        return Err(StableContainerError::SchemaMismatch(format!(
            "producer capacity {} differs from {} capacity {}",
            producer_capacity,
            schema.name(),
            schema.capacity()
        )));
    }
    decode(bytes, schema)
}

/// Decode a container nested inside another one.
///
/// Rejections are reported by the outermost `decode` only.
pub(crate) fn decode_nested(
    bytes: &[u8],
    schema: &StableSchema,
) -> Result<StableValue, StableContainerError> {
    decode_inner(bytes, schema)
}

/// Where an active field's bytes were found in the fixed region.
enum Slot {
    Fixed(Element),
    Offset(usize),
}

fn decode_inner(bytes: &[u8], schema: &StableSchema) -> Result<StableValue, StableContainerError> {
    let presence_len = BitPresenceVector::byte_len(schema.capacity());
    if bytes.len() < presence_len {
        return Err(StableContainerError::TruncatedInput {
            needed: presence_len,
            available: bytes.len(),
        });
    }
    let (presence_bytes, payload) = bytes.split_at(presence_len);
    let presence = BitPresenceVector::from_bytes(presence_bytes, schema.capacity())?;
    presence.validate(schema)?;

    let plan = schema.plan();
    let active: Vec<usize> = presence.active_indices().collect();
    let fixed_len = plan.fixed_region_len(active.iter().copied());
    if payload.len() < fixed_len {
        return Err(StableContainerError::TruncatedInput {
            needed: presence_len + fixed_len,
            available: bytes.len(),
        });
    }

    // Fixed region: elements in place, offsets for variable-size fields
    let mut slots = Vec::with_capacity(active.len());
    let mut cursor = 0usize;
    for &index in &active {
        let field = &schema.fields()[index];
        match plan.slots()[index].size {
            SlotSize::Fixed(len) => {
                let element =
                    Element::deserialize(&payload[cursor..cursor + len], &field.element_type)?;
                slots.push((index, Slot::Fixed(element)));
                cursor += len;
            }
            SlotSize::Variable => {
                let mut raw = [0u8; OFFSET_BYTES];
                raw.copy_from_slice(&payload[cursor..cursor + OFFSET_BYTES]);
                slots.push((index, Slot::Offset(u32::from_le_bytes(raw) as usize)));
                cursor += OFFSET_BYTES;
            }
        }
    }

    let offsets: Vec<usize> = slots
        .iter()
        .filter_map(|(_, slot)| match slot {
            Slot::Offset(offset) => Some(*offset),
            Slot::Fixed(_) => None,
        })
        .collect();
    check_offsets(&offsets, fixed_len, payload.len())?;

    // Variable region: each part runs to the next offset or the end
    let mut fields = vec![FieldValue::Absent; schema.len()];
    let mut ends = offsets
        .iter()
        .skip(1)
        .copied()
        .chain(std::iter::once(payload.len()));
    for (index, slot) in slots {
        let element = match slot {
            Slot::Fixed(element) => element,
            Slot::Offset(start) => {
                let end = ends.next().unwrap_or(payload.len());
                Element::deserialize(&payload[start..end], &schema.fields()[index].element_type)?
            }
        };
        fields[index] = FieldValue::Present(element);
    }

    trace!(
        target: LOG_TARGET,
        schema = schema.name(),
        active = active.len(),
        bytes = bytes.len(),
        "decoded stable container"
    );
    Ok(StableValue::new(fields))
}

/// Offsets must start right after the fixed region, never decrease and stay
/// within the payload. With no variable-size field the payload must end
/// with the fixed region.
fn check_offsets(
    offsets: &[usize],
    fixed_len: usize,
    payload_len: usize,
) -> Result<(), StableContainerError> {
    let Some(&first) = offsets.first() else {
        if payload_len != fixed_len {
            return Err(StableContainerError::TrailingBytes {
                expected: fixed_len,
                actual: payload_len,
            });
        }
        return Ok(());
    };
    if first != fixed_len {
        return Err(StableContainerError::MalformedOffsets(format!(
            "first offset {} does not match fixed region length {}",
            first, fixed_len
        )));
    }
    for pair in offsets.windows(2) {
        if pair[1] < pair[0] {
            return Err(StableContainerError::MalformedOffsets(format!(
                "offset {} is smaller than preceding offset {}",
                pair[1], pair[0]
            )));
        }
    }
    if let Some(&last) = offsets.last() {
        if last > payload_len {
            return Err(StableContainerError::MalformedOffsets(format!(
                "offset {} is beyond payload length {}",
                last, payload_len
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use assert_matches::assert_matches;
    use tracing::{span, Event, Level, Metadata, Subscriber};

    use super::*;
    use crate::{codec::encode, ElementType, FieldDescriptor};

    fn example_schema() -> StableSchema {
        StableSchema::new(
            "Example",
            4,
            vec![
                FieldDescriptor::required("a", ElementType::Uint8),
                FieldDescriptor::optional("b", ElementType::Uint8),
            ],
        )
        .expect("schema")
    }

    fn mixed_schema() -> StableSchema {
        StableSchema::new(
            "Mixed",
            8,
            vec![
                FieldDescriptor::required("id", ElementType::Uint16),
                FieldDescriptor::optional("memo", ElementType::ByteList(16)),
                FieldDescriptor::optional("flag", ElementType::Boolean),
                FieldDescriptor::optional("data", ElementType::ByteList(16)),
            ],
        )
        .expect("schema")
    }

    #[test]
    fn test_decode_example_values() {
        let schema = example_schema();
        assert_eq!(
            decode(&[0b0000_0001, 0x05], &schema).unwrap(),
            StableValue::new(vec![Element::Uint8(5).into(), FieldValue::Absent])
        );
        assert_eq!(
            decode(&[0b0000_0011, 0x05, 0x07], &schema).unwrap(),
            StableValue::new(vec![Element::Uint8(5).into(), Element::Uint8(7).into()])
        );
    }

    #[test]
    fn test_decode_under_extended_schema() {
        let extended = example_schema()
            .extend([FieldDescriptor::optional("c", ElementType::Uint8)])
            .unwrap();
        assert_eq!(
            decode(&[0b0000_0001, 0x05], &extended).unwrap(),
            StableValue::new(vec![
                Element::Uint8(5).into(),
                FieldValue::Absent,
                FieldValue::Absent
            ])
        );
    }

    #[test]
    fn test_decode_rejects_newer_field_under_older_schema() {
        // Bit 2 is set by a producer that knows field c
        assert_matches!(
            decode(&[0b0000_0101, 0x05, 0x09], &example_schema()),
            Err(StableContainerError::InvalidPresenceBits(_))
        );
    }

    #[test]
    fn test_decode_rejects_missing_required() {
        assert_matches!(
            decode(&[0b0000_0010, 0x07], &example_schema()),
            Err(StableContainerError::InvalidPresenceBits(_))
        );
    }

    #[test]
    fn test_decode_rejects_truncated_input() {
        let schema = example_schema();
        assert_matches!(
            decode(&[], &schema),
            Err(StableContainerError::TruncatedInput {
                needed: 1,
                available: 0
            })
        );
        assert_matches!(
            decode(&[0b0000_0011, 0x05], &schema),
            Err(StableContainerError::TruncatedInput {
                needed: 3,
                available: 2
            })
        );
    }

    #[test]
    fn test_decode_rejects_trailing_bytes() {
        assert_matches!(
            decode(&[0b0000_0001, 0x05, 0x00], &example_schema()),
            Err(StableContainerError::TrailingBytes {
                expected: 1,
                actual: 2
            })
        );
    }

    #[test]
    fn test_decode_mixed_round_trip() {
        let schema = mixed_schema();
        let value = StableValue::new(vec![
            Element::Uint16(9).into(),
            Element::ByteList(vec![1, 2, 3]).into(),
            FieldValue::Absent,
            Element::ByteList(vec![]).into(),
        ]);
        let bytes = encode(&schema, &value).unwrap();
        assert_eq!(decode(&bytes, &schema).unwrap(), value);
    }

    #[test]
    fn test_decode_rejects_misplaced_first_offset() {
        // id + memo offset: fixed region is 6 bytes, offset claims 7
        let bytes = [0b0000_0011, 0x01, 0x00, 7, 0, 0, 0, 0xaa];
        assert_matches!(
            decode(&bytes, &mixed_schema()),
            Err(StableContainerError::MalformedOffsets(_))
        );
    }

    #[test]
    fn test_decode_rejects_decreasing_offsets() {
        // id, memo, data: fixed region 2 + 4 + 4 = 10
        let bytes = [
            0b0000_1011, 0x01, 0x00, 10, 0, 0, 0, 9, 0, 0, 0, 0xaa, 0xbb,
        ];
        assert_matches!(
            decode(&bytes, &mixed_schema()),
            Err(StableContainerError::MalformedOffsets(_))
        );
    }

    #[test]
    fn test_decode_rejects_offset_beyond_payload() {
        let bytes = [
            0b0000_1011, 0x01, 0x00, 10, 0, 0, 0, 40, 0, 0, 0, 0xaa, 0xbb,
        ];
        assert_matches!(
            decode(&bytes, &mixed_schema()),
            Err(StableContainerError::MalformedOffsets(_))
        );
    }

    #[test]
    fn test_decode_rejects_oversized_variable_element() {
        let schema = StableSchema::new(
            "Small",
            2,
            vec![FieldDescriptor::required("memo", ElementType::ByteList(2))],
        )
        .unwrap();
        let bytes = [0b0000_0001, 4, 0, 0, 0, 1, 2, 3];
        assert_matches!(
            decode(&bytes, &schema),
            Err(StableContainerError::InvalidElement(_))
        );
    }

    #[test]
    fn test_decode_with_capacity_rejects_other_capacity() {
        let schema = example_schema();
        assert_matches!(
            decode_with_capacity(&[0b0000_0001, 0x05], &schema, 8),
            Err(StableContainerError::SchemaMismatch(_))
        );
        assert!(decode_with_capacity(&[0b0000_0001, 0x05], &schema, 4).is_ok());
    }

    #[test]
    fn test_decode_nested_container() {
        let inner = Arc::new(
            StableSchema::new(
                "Inner",
                4,
                vec![
                    FieldDescriptor::required("x", ElementType::Uint8),
                    FieldDescriptor::optional("y", ElementType::ByteList(8)),
                ],
            )
            .unwrap(),
        );
        let outer = StableSchema::new(
            "Outer",
            4,
            vec![
                FieldDescriptor::required("tag", ElementType::Uint8),
                FieldDescriptor::optional("inner", ElementType::Stable(inner)),
            ],
        )
        .unwrap();
        let value = StableValue::new(vec![
            Element::Uint8(1).into(),
            Element::Stable(StableValue::new(vec![
                Element::Uint8(2).into(),
                Element::ByteList(vec![3, 4]).into(),
            ]))
            .into(),
        ]);
        let bytes = encode(&outer, &value).unwrap();
        assert_eq!(
            bytes,
            vec![
                0b0000_0011, // outer presence
                0x01,        // tag
                5, 0, 0, 0, // inner offset
                0b0000_0011, // inner presence
                0x02,        // x
                5, 0, 0, 0, // y offset
                3, 4, // y
            ]
        );
        assert_eq!(decode(&bytes, &outer).unwrap(), value);
    }

    /// Counts debug events under this crate's log target.
    struct RejectionCounter(Arc<AtomicUsize>);

    impl Subscriber for RejectionCounter {
        fn enabled(&self, _: &Metadata<'_>) -> bool {
            true
        }

        fn new_span(&self, _: &span::Attributes<'_>) -> span::Id {
            span::Id::from_u64(1)
        }

        fn record(&self, _: &span::Id, _: &span::Record<'_>) {}

        fn record_follows_from(&self, _: &span::Id, _: &span::Id) {}

        fn event(&self, event: &Event<'_>) {
            let metadata = event.metadata();
            if metadata.target() == LOG_TARGET && *metadata.level() == Level::DEBUG {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        fn enter(&self, _: &span::Id) {}

        fn exit(&self, _: &span::Id) {}
    }

    #[test]
    fn test_nested_rejection_is_logged_once() {
        let inner = StableSchema::new(
            "Inner",
            4,
            vec![FieldDescriptor::required("flag", ElementType::Boolean)],
        )
        .unwrap();
        let outer = StableSchema::new(
            "Outer",
            4,
            vec![FieldDescriptor::required(
                "inner",
                ElementType::Stable(Arc::new(inner)),
            )],
        )
        .unwrap();
        // outer presence, offset 4, then the inner container with flag = 2
        let bytes = [0x01, 4, 0, 0, 0, 0x01, 0x02];

        let rejections = Arc::new(AtomicUsize::new(0));
        let result = tracing::subscriber::with_default(
            RejectionCounter(Arc::clone(&rejections)),
            || decode(&bytes, &outer),
        );
        assert_matches!(result, Err(StableContainerError::InvalidElement(_)));
        assert_eq!(rejections.load(Ordering::SeqCst), 1);
    }
}
