use crate::errors::SubmitError;

/// Partitions records into contiguous, non-overlapping groups of `size`,
/// the last group holding the remainder. A zero size is a caller error, not
/// "no batching".
pub fn batch<T>(records: &[T], size: usize) -> Result<Vec<&[T]>, SubmitError> {
    if size == 0 {
        return Err(SubmitError::InvalidBatchSize);
    }

    Ok(records.chunks(size).collect())
}
