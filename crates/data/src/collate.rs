//! Batch collation: left padding for variable-length samples.

use crate::instruct::PADDING_INDEX;
use crate::Sample;

/// Left-pad every sample and label sequence to the batch maximum with
/// [`PADDING_INDEX`], producing one rectangular `(x, y)` batch.
///
/// The same sentinel pads inputs and labels alike; padded label positions
/// are thereby excluded from the loss.
pub fn collate(batch: &[Sample]) -> (Vec<Vec<i64>>, Vec<Vec<i64>>) {
    let max_len = batch.iter().map(|(x, _)| x.len()).max().unwrap_or(0);

    let mut inputs = Vec::with_capacity(batch.len());
    let mut labels = Vec::with_capacity(batch.len());

    for (x, y) in batch {
        inputs.push(pad_left(x, max_len));
        labels.push(pad_left(y, max_len));
    }

    for (x, y) in inputs.iter().zip(&labels) {
        assert!(
            x.len() == max_len && y.len() == max_len,
            "sample / label batch shape mismatch"
        );
    }

    (inputs, labels)
}

fn pad_left(sequence: &[i64], target_len: usize) -> Vec<i64> {
    let mut padded = vec![PADDING_INDEX; target_len - sequence.len()];
    padded.extend_from_slice(sequence);
    padded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_is_rectangular() {
        let batch = vec![
            (vec![1, 2], vec![2, 3]),
            (vec![4, 5, 6, 7], vec![5, 6, 7, 8]),
        ];

        let (x, y) = collate(&batch);

        assert!(x.iter().all(|row| row.len() == 4));
        assert!(y.iter().all(|row| row.len() == 4));
    }

    #[test]
    fn short_rows_are_left_padded_with_the_sentinel() {
        let batch = vec![
            (vec![1, 2], vec![2, 3]),
            (vec![4, 5, 6, 7], vec![5, 6, 7, 8]),
        ];

        let (x, y) = collate(&batch);

        assert_eq!(x[0], vec![PADDING_INDEX, PADDING_INDEX, 1, 2]);
        assert_eq!(y[0], vec![PADDING_INDEX, PADDING_INDEX, 2, 3]);
        assert_eq!(x[1], vec![4, 5, 6, 7]);
        assert_eq!(y[1], vec![5, 6, 7, 8]);
    }

    #[test]
    fn empty_batch_collates_to_empty() {
        let (x, y) = collate(&[]);
        assert!(x.is_empty());
        assert!(y.is_empty());
    }
}
