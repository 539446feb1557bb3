//! Batch wire format for lists of names.
//!
//! A batch is two byte buffers:
//!
//! ```text
//! names:  per name [wide << 7 | len >> 8][len & 0xFF] then the payload;
//!         wide payloads are UTF-16LE, zero-padded to an even offset first
//! hashes: [HASH_ALGORITHM_ID: u64 LE] then one case-insensitive u64 LE
//!         hash per name
//! ```
//!
//! Saving is deterministic. Loading trusts the stored hashes only when the
//! algorithm id matches; otherwise every hash is recomputed.

use smallvec::SmallVec;

use crate::entry::NameEntryId;
use crate::error::BatchError;
use crate::hash::{lower_case_hash, HASH_ALGORITHM_ID};
use crate::pool::NamePool;
use crate::view::{NameBuf, NameView};

const WIDE_FLAG: u8 = 0x80;
const HASH_BYTES: usize = std::mem::size_of::<u64>();

/// Saved names and hashes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NameBatch {
    pub names: Vec<u8>,
    pub hashes: Vec<u8>,
}

impl NameBatch {
    /// Names described by the hash buffer.
    pub fn num_names(&self) -> usize {
        (self.hashes.len() / HASH_BYTES).saturating_sub(1)
    }
}

/// Serializes the strings behind `ids`, in order.
#[tracing::instrument(level = "debug", skip_all, fields(names = ids.len()))]
pub fn save_name_batch(pool: &NamePool, ids: &[NameEntryId]) -> NameBatch {
    let mut batch = NameBatch {
        names: Vec::with_capacity(40 * ids.len()),
        hashes: Vec::with_capacity((1 + ids.len()) * HASH_BYTES),
    };
    batch.hashes.extend_from_slice(&HASH_ALGORITHM_ID.to_le_bytes());

    for &id in ids {
        let entry = pool.resolve(id);
        let view = entry.view();
        write_record(&mut batch.names, view);
        batch
            .hashes
            .extend_from_slice(&lower_case_hash(view).to_le_bytes());
    }
    batch
}

fn write_record(out: &mut Vec<u8>, view: NameView<'_>) {
    let len = view.len();
    #[expect(clippy::cast_possible_truncation, reason = "len is at most 1023")]
    let header = [
        (u8::from(view.is_wide()) * WIDE_FLAG) | ((len >> 8) as u8 & !WIDE_FLAG),
        (len & 0xFF) as u8,
    ];
    out.extend_from_slice(&header);

    match view {
        NameView::Narrow(bytes) => out.extend_from_slice(bytes),
        NameView::Wide(units) => {
            if out.len() % 2 != 0 {
                out.push(0);
            }
            for unit in units {
                out.extend_from_slice(&unit.to_le_bytes());
            }
        }
    }
}

/// Interns every name of a saved batch and returns the ids in order.
///
/// The whole input is validated before anything is interned; on error the
/// pool is unchanged. Comparison entries are created under one batch guard.
/// In case-preserving pools each name is then linked into the display
/// tables, so the returned ids resolve with the saved casing.
#[tracing::instrument(level = "debug", skip_all, fields(name_bytes = names.len()))]
pub fn load_name_batch(
    pool: &NamePool,
    names: &[u8],
    hashes: &[u8],
) -> Result<Vec<NameEntryId>, BatchError> {
    let prepared = prepare(names, hashes, pool.config().max_name_len)
        .inspect_err(|err| tracing::warn!(%err, "rejected name batch"))?;

    let comparison_ids: Vec<NameEntryId> = {
        let mut batch = pool.batch();
        prepared
            .iter()
            .map(|(name, hash)| batch.store_hashed(name.as_view(), *hash))
            .collect()
    };
    if !pool.is_case_preserving() {
        return Ok(comparison_ids);
    }

    Ok(prepared
        .iter()
        .zip(comparison_ids)
        .map(|((name, _), comparison_id)| pool.display_id_for(name.as_view(), comparison_id))
        .collect())
}

/// Decoded names in their narrowest width, paired with their hashes.
fn prepare(
    names: &[u8],
    hashes: &[u8],
    max_len: usize,
) -> Result<Vec<(NameBuf, u64)>, BatchError> {
    if hashes.len() < HASH_BYTES {
        return Err(BatchError::MissingVersion);
    }
    if hashes.len() % HASH_BYTES != 0 {
        return Err(BatchError::MisalignedHashData { len: hashes.len() });
    }

    let mut words = hashes
        .chunks_exact(HASH_BYTES)
        .map(|chunk| u64::from_le_bytes(chunk.try_into().unwrap_or_default()));
    let version = words.next().unwrap_or_default();
    let supplied: Vec<u64> = words.collect();

    let records = parse_records(names, max_len)?;
    let trust_hashes = version == HASH_ALGORITHM_ID;
    if trust_hashes && records.len() != supplied.len() {
        return Err(BatchError::HashCountMismatch {
            names: records.len(),
            hashes: supplied.len(),
        });
    }
    if !trust_hashes {
        tracing::debug!(
            version = %format!("{version:#018x}"),
            "hash algorithm differs, recomputing hashes"
        );
    }

    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            if record.is_wide() && record.as_view().is_pure_ansi() {
                let name = record.as_view().to_narrowest();
                let hash = lower_case_hash(name.as_view());
                return Ok((name, hash));
            }
            if !trust_hashes {
                let hash = lower_case_hash(record.as_view());
                return Ok((record, hash));
            }

            let hash = supplied[index];
            if cfg!(debug_assertions) {
                let computed = lower_case_hash(record.as_view());
                if computed != hash {
                    return Err(BatchError::HashMismatch {
                        index,
                        supplied: hash,
                        computed,
                    });
                }
            }
            Ok((record, hash))
        })
        .collect()
}

fn parse_records(data: &[u8], max_len: usize) -> Result<Vec<NameBuf>, BatchError> {
    let mut records = Vec::new();
    let mut offset = 0;

    while offset < data.len() {
        let index = records.len();
        let truncated = BatchError::Truncated { index, offset };
        let header = data.get(offset..offset + 2).ok_or_else(|| truncated.clone())?;

        let is_wide = header[0] & WIDE_FLAG != 0;
        let len = (usize::from(header[0] & !WIDE_FLAG) << 8) | usize::from(header[1]);
        if len == 0 {
            return Err(BatchError::EmptyName { index });
        }
        if len > max_len {
            return Err(BatchError::NameTooLong {
                index,
                len,
                max: max_len,
            });
        }

        let mut start = offset + 2;
        let byte_len = if is_wide {
            start = start.next_multiple_of(2);
            len * 2
        } else {
            len
        };
        let payload = data.get(start..start + byte_len).ok_or(truncated)?;

        let record = if is_wide {
            NameBuf::Wide(
                payload
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                    .collect(),
            )
        } else if payload.is_ascii() {
            NameBuf::Narrow(SmallVec::from_slice(payload))
        } else {
            return Err(BatchError::NonAsciiNarrow { index });
        };

        records.push(record);
        offset = start + byte_len;
    }

    Ok(records)
}

/// Prepares the pool for loading a batch of the given buffer sizes, with
/// 20% slack.
pub fn reserve_name_batch(pool: &NamePool, name_bytes: usize, hash_bytes: usize) {
    let num_names = (hash_bytes / HASH_BYTES).saturating_sub(1);
    let slack = |n: usize| n * 6 / 5;
    pool.reserve(slack(name_bytes), slack(num_names));
}

#[cfg(test)]
mod tests;
