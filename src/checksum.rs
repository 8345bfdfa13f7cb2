//! PE image checksum recomputation.
//!
//! Recomputes the optional-header checksum over the whole image buffer so it
//! can be compared against the stored value. A mismatch is a feature signal,
//! not an error.

/// Compute the PE checksum of `data`, excluding the stored checksum dword at
/// `checksum_offset` from its own sum.
///
/// `checksum_offset` is assumed dword-aligned (it is the optional header's
/// CheckSum field offset). The algorithm sums little-endian dwords with
/// carry folding, folds to 16 bits, and adds the file length.
pub fn generate_checksum(data: &[u8], checksum_offset: usize) -> u32 {
    let mut sum: u64 = 0;
    let mut i = 0usize;

    while i < data.len() {
        // The stored checksum dword does not participate in its own sum.
        if i == checksum_offset {
            i += 4;
            continue;
        }

        let end = (i + 4).min(data.len());
        let mut dword = [0u8; 4];
        dword[..end - i].copy_from_slice(&data[i..end]);

        sum += u32::from_le_bytes(dword) as u64;
        sum = (sum & 0xffff_ffff) + (sum >> 32);
        i += 4;
    }

    let mut sum = (sum & 0xffff) + (sum >> 16);
    sum += sum >> 16;
    sum &= 0xffff;

    (sum + data.len() as u64) as u32
}
