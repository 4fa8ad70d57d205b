//! Z-order (Morton) interleaving of grid coordinates.
//!
//! Row bits land on odd positions and column bits on even positions, so bit
//! `i` of the row becomes bit `2i + 1` of the key and bit `i` of the column
//! becomes bit `2i`. Every power-of-two aligned block of cells therefore maps
//! to one contiguous run of keys.

/// Integer key produced for a grid cell.
pub type HashKey = u64;

/// Interleaves `row` and `column` into a Morton key.
///
/// Bits `0..=cut_level` of each coordinate are used. Coordinates inside a
/// `2^cut_level` grid only need the low `cut_level` bits; the extra bit lets
/// callers index points just past the padded boundary. Coordinates of
/// `2^(cut_level + 1)` or more lose their high bits and alias cells inside
/// the grid.
///
/// # Examples
///
/// ```
/// use geoindex::compute::morton::interleave;
///
/// assert_eq!(interleave(0, 0, 2), 0);
/// assert_eq!(interleave(1, 0, 2), 2);
/// assert_eq!(interleave(0, 1, 2), 1);
/// assert_eq!(interleave(3, 3, 2), 15);
/// ```
pub fn interleave(row: u64, column: u64, cut_level: u32) -> HashKey {
    let mut key = 0u64;
    for i in 0..=cut_level {
        let x = (row >> i) & 1;
        let y = (column >> i) & 1;
        key |= (x << (2 * i + 1)) | (y << (2 * i));
    }
    key
}

/// Splits a Morton key back into `(row, column)`.
pub fn deinterleave(key: HashKey, cut_level: u32) -> (u64, u64) {
    let mut row = 0u64;
    let mut column = 0u64;
    for i in 0..=cut_level {
        row |= ((key >> (2 * i + 1)) & 1) << i;
        column |= ((key >> (2 * i)) & 1) << i;
    }
    (row, column)
}
