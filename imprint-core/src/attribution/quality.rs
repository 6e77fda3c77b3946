//! JPEG quality estimation from quantization tables.

use crate::inspect::QuantTable;

/// IJG (libjpeg) standard luminance quantization table, quality 50.
pub const IJG_LUMINANCE: [u16; 64] = [
    16, 11, 10, 16, 24, 40, 51, 61, //
    12, 12, 14, 19, 26, 58, 60, 55, //
    14, 13, 16, 24, 40, 57, 69, 56, //
    14, 17, 22, 29, 51, 87, 80, 62, //
    18, 22, 37, 56, 68, 109, 103, 77, //
    24, 35, 55, 64, 81, 104, 113, 92, //
    49, 64, 78, 87, 103, 121, 120, 101, //
    72, 92, 95, 98, 112, 100, 103, 99,
];

fn reference_mean() -> f64 {
    IJG_LUMINANCE.iter().map(|&v| v as f64).sum::<f64>() / 64.0
}

/// Invert the IJG quality scaling for a luminance table.
///
/// The table's mean is expressed as a scale factor `S` of the reference mean,
/// then mapped back through libjpeg's two-branch quality curve. Returns a value
/// in `1..=100`, or `None` for an empty table.
pub fn estimate_quality(table: &QuantTable) -> Option<u8> {
    let mean = table.mean();
    if mean <= 0.0 {
        return None;
    }
    let scale = 100.0 * mean / reference_mean();
    let quality = if scale <= 100.0 {
        (200.0 - scale) / 2.0
    } else {
        5000.0 / scale
    };
    Some(quality.round().clamp(1.0, 100.0) as u8)
}

/// Scale the reference table the way libjpeg does for `quality`.
pub fn ijg_table(quality: u8) -> QuantTable {
    let q = u32::from(quality.clamp(1, 100));
    let scale = if q < 50 { 5000 / q } else { 200 - 2 * q };
    let values = IJG_LUMINANCE
        .iter()
        .map(|&v| ((u32::from(v) * scale + 50) / 100).clamp(1, 255) as u16)
        .collect();
    QuantTable {
        id: 0,
        precision_bits: 8,
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_table_is_fifty() {
        assert_eq!(estimate_quality(&ijg_table(50)), Some(50));
    }

    #[test]
    fn test_inverts_common_qualities() {
        for q in [30u8, 70, 75, 85] {
            let est = estimate_quality(&ijg_table(q)).unwrap();
            assert!(est.abs_diff(q) <= 1, "q={q} est={est}");
        }
    }

    #[test]
    fn test_all_ones_is_maximum() {
        let table = QuantTable {
            id: 0,
            precision_bits: 8,
            values: vec![1; 64],
        };
        assert!(estimate_quality(&table).unwrap() >= 98);
    }

    #[test]
    fn test_empty_table() {
        let table = QuantTable {
            id: 0,
            precision_bits: 8,
            values: Vec::new(),
        };
        assert_eq!(estimate_quality(&table), None);
    }
}
