use bmx_core::derive_substream_seed;

/// Derives the seed of one attempt at one importance sample.
///
/// Attempt `0` of every sample is independent of how many retries earlier
/// samples needed.
pub fn sample_seed(master_seed: u64, sample_index: usize, attempt: usize) -> u64 {
    let intermediate = derive_substream_seed(master_seed, sample_index as u64);
    derive_substream_seed(intermediate, attempt as u64)
}
