//! Canton count policy

use crate::config::{CantonBand, PartitionConfig};

/// Derive the canton count of a territory from its archetype band
///
/// Rounds `area / target_area`, clamps into the band, then clamps down so
/// every canton can reach `min_area`. Territories no larger than `min_area`
/// get a single canton.
pub fn canton_count(area: usize, band: &CantonBand, min_area: usize) -> usize {
    let target_area = band.target_area.max(1);
    let rounded = (area + target_area / 2) / target_area;
    let banded = rounded.clamp(band.min_count.max(1), band.max_count.max(1));
    clamp_to_floor(banded, area, min_area)
}

/// Clamp a canton count down to `floor(area / min_area)`, never below 1
pub fn clamp_to_floor(count: usize, area: usize, min_area: usize) -> usize {
    let min_area = min_area.max(1);
    if area <= min_area {
        return 1;
    }
    count.min(area / min_area).max(1)
}

/// Canton count for a territory under a configuration
///
/// An explicit request replaces the archetype band but still honors the
/// minimum-area floor.
pub fn configured_canton_count(area: usize, config: &PartitionConfig) -> usize {
    match config.canton_count_override {
        Some(requested) => clamp_to_floor(requested, area, config.min_canton_area),
        None => canton_count(area, &config.band(), config.min_canton_area),
    }
}
