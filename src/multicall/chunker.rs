//! Payload-size-bounded chunking
//!
//! RPC backends reject requests above a certain size, so a block group is
//! split into consecutive chunks whose cumulative calldata stays under a
//! configured limit.
//!
//! Lengths are raw calldata bytes. A limit quoted in hex characters of the
//! `0x…` string (Alchemy fails around 480k of them) is twice the byte count,
//! so 480k hex characters is roughly `240_000` here.

/// Split `lengths` (payload byte length of each call, in order) into ranges of
/// consecutive indices whose summed length does not exceed `max_data_length`.
///
/// `max_data_length == 0` disables splitting. A single call larger than the
/// limit gets a chunk of its own. Empty input yields no chunks.
pub fn chunk_ranges(lengths: &[usize], max_data_length: usize) -> Vec<std::ops::Range<usize>> {
    if lengths.is_empty() {
        return Vec::new();
    }
    if max_data_length == 0 {
        return vec![0..lengths.len()];
    }

    let mut ranges = Vec::new();
    let mut start = 0;
    let mut current = 0usize;

    for (i, &len) in lengths.iter().enumerate() {
        let next = current.saturating_add(len);

        if next > max_data_length && i > start {
            ranges.push(start..i);
            start = i;
            current = len;
        } else {
            current = next;
        }
    }
    ranges.push(start..lengths.len());

    ranges
}

/// Split owned items into ordered chunks using `chunk_ranges`
pub fn split_by_data_length<T>(
    items: Vec<T>,
    max_data_length: usize,
    data_length: impl Fn(&T) -> usize,
) -> Vec<Vec<T>> {
    let lengths: Vec<usize> = items.iter().map(&data_length).collect();
    let ranges = chunk_ranges(&lengths, max_data_length);

    let mut items = items.into_iter();
    ranges
        .into_iter()
        .map(|range| items.by_ref().take(range.len()).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbounded_is_single_chunk() {
        assert_eq!(chunk_ranges(&[10, 20, 30], 0), vec![0..3]);
    }

    #[test]
    fn test_empty_input() {
        assert!(chunk_ranges(&[], 100).is_empty());
        assert!(chunk_ranges(&[], 0).is_empty());
    }

    #[test]
    fn test_split_respects_limit() {
        let lengths = [40, 40, 40, 10, 90, 5];
        let ranges = chunk_ranges(&lengths, 100);

        assert_eq!(ranges, vec![0..2, 2..4, 4..6]);
        for range in &ranges {
            let total: usize = lengths[range.clone()].iter().sum();
            assert!(total <= 100);
        }
    }

    #[test]
    fn test_exact_fit_stays_together() {
        assert_eq!(chunk_ranges(&[50, 50, 1], 100), vec![0..2, 2..3]);
    }

    #[test]
    fn test_limit_counts_raw_bytes() {
        // Two 4-byte selectors are 8 bytes (20 hex characters with `0x` prefixes)
        let selectors = vec![vec![0x06, 0xfd, 0xde, 0x03], vec![0x95, 0xd8, 0x9b, 0x41]];
        let chunks = split_by_data_length(selectors, 8, |s: &Vec<u8>| s.len());
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_oversized_call_gets_own_chunk() {
        assert_eq!(chunk_ranges(&[500], 100), vec![0..1]);
        assert_eq!(chunk_ranges(&[10, 500, 10], 100), vec![0..1, 1..2, 2..3]);
    }

    #[test]
    fn test_split_preserves_order_and_items() {
        let items: Vec<Vec<u8>> = (0u8..20).map(|i| vec![i; (i as usize % 7) + 1]).collect();
        let chunks = split_by_data_length(items.clone(), 12, |item| item.len());

        assert!(chunks.iter().all(|c| !c.is_empty()));
        for chunk in &chunks {
            let total: usize = chunk.iter().map(Vec::len).sum();
            assert!(total <= 12 || chunk.len() == 1);
        }

        let flattened: Vec<Vec<u8>> = chunks.into_iter().flatten().collect();
        assert_eq!(flattened, items);
    }
}
