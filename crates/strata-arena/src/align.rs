//! Power-of-two address alignment.

use crate::error::ArenaError;

/// Validate that `align` is a non-zero power of two.
pub fn check_alignment(align: usize) -> Result<(), ArenaError> {
    if align.is_power_of_two() {
        Ok(())
    } else {
        Err(ArenaError::InvalidAlignment { align })
    }
}

/// Whether `address` is a multiple of `align`.
///
/// `align` must be a power of two; other values give meaningless answers.
/// An `align` of zero only accepts address zero.
pub const fn is_aligned(address: usize, align: usize) -> bool {
    address & align.wrapping_sub(1) == 0
}

/// Round `address` up to the next multiple of `align`, leaving it unchanged
/// if it is already aligned.
pub fn align_up(address: usize, align: usize) -> Result<usize, ArenaError> {
    check_alignment(align)?;
    let mask = align - 1;
    address
        .checked_add(mask)
        .map(|bumped| bumped & !mask)
        .ok_or(ArenaError::AddressOverflow { address, align })
}

/// Round `address` up to a multiple of `align` that is strictly greater
/// than `address`.
///
/// The result is between 1 and `align` bytes past `address`, so there is
/// always at least one byte in front of it that belongs to the gap.
pub fn align_up_with_padding(address: usize, align: usize) -> Result<usize, ArenaError> {
    check_alignment(align)?;
    let mask = align - 1;
    address
        .checked_add(align)
        .map(|bumped| bumped & !mask)
        .ok_or(ArenaError::AddressOverflow { address, align })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_up_rounds_to_next_multiple() {
        let alignments = vec![(1..8, 8), (9..16, 16), (17..24, 24), (25..32, 32)];

        for (addresses, expected) in alignments {
            for address in addresses {
                assert_eq!(align_up(address, 8), Ok(expected));
            }
        }
    }

    #[test]
    fn align_up_keeps_aligned_addresses() {
        for address in [0, 16, 4096, 1 << 20] {
            assert_eq!(align_up(address, 16), Ok(address));
        }
        assert_eq!(align_up(7, 1), Ok(7));
    }

    #[test]
    fn padding_variant_always_advances() {
        assert_eq!(align_up_with_padding(16, 16), Ok(32));
        assert_eq!(align_up_with_padding(17, 16), Ok(32));
        assert_eq!(align_up_with_padding(31, 16), Ok(32));
        assert_eq!(align_up_with_padding(5, 1), Ok(6));
    }

    #[test]
    fn non_power_of_two_is_rejected() {
        for align in [0, 3, 6, 12, 100] {
            assert_eq!(
                align_up(64, align),
                Err(ArenaError::InvalidAlignment { align })
            );
            assert_eq!(
                align_up_with_padding(64, align),
                Err(ArenaError::InvalidAlignment { align })
            );
        }
    }

    #[test]
    fn overflow_is_reported() {
        assert_eq!(
            align_up(usize::MAX, 8),
            Err(ArenaError::AddressOverflow {
                address: usize::MAX,
                align: 8
            })
        );
        assert!(align_up_with_padding(usize::MAX - 3, 4).is_err());
    }

    #[test]
    fn is_aligned_checks_low_bits() {
        assert!(is_aligned(0x40, 64));
        assert!(!is_aligned(0x41, 2));
        assert!(is_aligned(0x41, 1));
    }

    #[test]
    fn is_aligned_tolerates_zero_align() {
        assert!(!is_aligned(0x40, 0));
        assert!(is_aligned(0, 0));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn align_up_is_smallest_aligned_not_below(
                address in 0usize..(1 << 40),
                shift in 0u32..16,
            ) {
                let align = 1usize << shift;
                let aligned = align_up(address, align).unwrap();
                prop_assert!(is_aligned(aligned, align));
                prop_assert!(aligned >= address);
                prop_assert!(aligned - address < align);
            }

            #[test]
            fn padding_variant_advances_by_one_to_align(
                address in 0usize..(1 << 40),
                shift in 0u32..16,
            ) {
                let align = 1usize << shift;
                let aligned = align_up_with_padding(address, align).unwrap();
                prop_assert!(is_aligned(aligned, align));
                prop_assert!(aligned > address);
                prop_assert!(aligned - address <= align);
            }
        }
    }
}
