//! Run-length compression of decoded state paths (§4.10).

/// Run-length-encodes `path` into `(state, run_length)` pairs, one block at a time; a run never
/// crosses a block boundary even if the state happens to repeat across it.
///
/// # Panics
///
/// Panics if `block_sizes` does not sum to `path.len()`.
#[must_use]
pub fn compress(path: &[usize], block_sizes: &[usize]) -> Vec<Vec<(usize, usize)>> {
    assert_eq!(
        block_sizes.iter().sum::<usize>(),
        path.len(),
        "block sizes must sum to the path length"
    );

    let mut blocks = Vec::with_capacity(block_sizes.len());
    let mut offset = 0;

    for &size in block_sizes {
        let mut runs: Vec<(usize, usize)> = Vec::new();

        for &state in &path[offset..offset + size] {
            match runs.last_mut() {
                Some((last_state, length)) if *last_state == state => *length += 1,
                _ => runs.push((state, 1)),
            }
        }

        blocks.push(runs);
        offset += size;
    }

    blocks
}

/// Expands a compressed block history back into a flat path, the inverse of [`compress`].
#[must_use]
pub fn expand(blocks: &[Vec<(usize, usize)>]) -> Vec<usize> {
    let mut path = Vec::new();
    for block in blocks {
        for &(state, length) in block {
            path.extend(std::iter::repeat(state).take(length));
        }
    }
    path
}
