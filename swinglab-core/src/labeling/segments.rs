use crate::domain::{PivotKind, PivotPoint, SwingDirection, WaveSegment};

/// Build the segments spanning each pair of consecutive confirmed pivots.
///
/// Unconfirmed pivots are ignored. A trough→peak pair is an up segment and a
/// peak→trough pair is a down segment.
pub fn segments_from_pivots(pivots: &[PivotPoint]) -> Vec<WaveSegment> {
    let confirmed: Vec<&PivotPoint> = pivots.iter().filter(|p| p.confirmed).collect();
    confirmed
        .windows(2)
        .map(|pair| {
            let (start, end) = (*pair[0], *pair[1]);
            let direction = match start.kind {
                PivotKind::Trough => SwingDirection::Up,
                PivotKind::Peak => SwingDirection::Down,
            };
            WaveSegment {
                start,
                end,
                direction,
            }
        })
        .collect()
}
