//! Small helpers shared by the sinks and the engines.

/// Bytes needed to hold `bits` bits (`ceil(bits / 8)`).
pub(crate) fn bits_to_bytes(bits: u64) -> usize {
    bits.div_ceil(8) as usize
}

/// Splits `buf` into consecutive, disjoint mutable regions of the given sizes.
///
/// The sizes must not sum past `buf.len()`; any tail beyond their sum is dropped.
pub(crate) fn split_regions_mut<'a, I>(mut buf: &'a mut [u8], sizes: I) -> Vec<&'a mut [u8]>
where
    I: IntoIterator<Item = usize>,
{
    let mut regions = Vec::new();
    for size in sizes {
        let (region, rest) = std::mem::take(&mut buf).split_at_mut(size);
        regions.push(region);
        buf = rest;
    }
    regions
}
