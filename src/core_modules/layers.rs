// THEORY:
// Metadata lives in two specially named layers sitting alongside the artwork:
// a group map and a lock map. This module owns everything about those layers
// that is host-independent: the canonical name lists (with their legacy
// aliases), the creation parameters an adapter uses when a map is missing,
// and the `LayerLocator` seam through which the engine asks a host for a
// layer without ever touching the host's document model. Lookups are
// case-insensitive because artists rename layers freely and the maps must
// still be found.
//
// The creation parameters are tuned for overlay editing rather than
// display fidelity: the group map sits at 55% opacity in multiply blend so
// the nearly-black compact bytes read as a tint over the art, and the lock
// map at 40% normal so locked regions show as a haze. Both start filled
// with byte zero, painted as a gray triple since hosts paint in RGB even on
// grayscale maps.

use crate::core_modules::channel_codec::channel_codec::Byte;
use crate::core_modules::sampler::sampler::PixelRegion;

/// Accepted names for the group map layer, preferred name first.
pub const GROUP_LAYER_NAMES: [&str; 2] = ["GRIN_GROUPS", "GRIN_GROUP_MAP"];
/// Accepted names for the lock map layer, preferred name first.
pub const LOCK_LAYER_NAMES: [&str; 2] = ["GRIN_LOCK", "GRIN_LOCK_MAP"];

/// Blend modes a host adapter applies when provisioning a metadata layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    Normal,
    Multiply,
}

/// Creation parameters for one metadata layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSpec {
    /// Canonical name the layer is created under.
    pub name: &'static str,
    /// Layer opacity in percent.
    pub opacity: f64,
    pub blend: BlendMode,
    /// Initial grayscale fill byte.
    pub fill_value: Byte,
}

/// Provisioning spec for the group map overlay.
pub fn group_layer_spec() -> LayerSpec {
    LayerSpec {
        name: GROUP_LAYER_NAMES[0],
        opacity: 55.0,
        blend: BlendMode::Multiply,
        fill_value: 0,
    }
}

/// Provisioning spec for the lock map overlay.
pub fn lock_layer_spec() -> LayerSpec {
    LayerSpec {
        name: LOCK_LAYER_NAMES[0],
        opacity: 40.0,
        blend: BlendMode::Normal,
        fill_value: 0,
    }
}

/// Expands a grayscale byte into the RGB triple hosts paint with.
pub fn fill_rgb(value: Byte) -> [Byte; 3] {
    [value, value, value]
}

/// Case-insensitive membership test against a layer name list.
pub fn name_matches(candidate: &str, targets: &[String]) -> bool {
    targets
        .iter()
        .any(|target| target.eq_ignore_ascii_case(candidate))
}

/// Owned copy of the default group layer name list.
pub fn default_group_layer_names() -> Vec<String> {
    GROUP_LAYER_NAMES.iter().map(|name| name.to_string()).collect()
}

/// Owned copy of the default lock layer name list.
pub fn default_lock_layer_names() -> Vec<String> {
    LOCK_LAYER_NAMES.iter().map(|name| name.to_string()).collect()
}

/// Name-based metadata layer lookup, supplied by the host adapter.
///
/// Implementations walk whatever layer tree the host has (including nested
/// layer groups) and return the first layer whose name matches any entry in
/// `names`, case-insensitively. `None` means the document carries no such
/// map, which the engine treats as normal absence rather than an error.
pub trait LayerLocator {
    fn find_by_names(&self, names: &[String]) -> Option<&dyn PixelRegion>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_spec_is_a_multiply_overlay() {
        let spec = group_layer_spec();
        assert_eq!(spec.name, "GRIN_GROUPS");
        assert_eq!(spec.opacity, 55.0);
        assert_eq!(spec.blend, BlendMode::Multiply);
        assert_eq!(spec.fill_value, 0);
    }

    #[test]
    fn lock_spec_is_a_normal_overlay() {
        let spec = lock_layer_spec();
        assert_eq!(spec.name, "GRIN_LOCK");
        assert_eq!(spec.opacity, 40.0);
        assert_eq!(spec.blend, BlendMode::Normal);
        assert_eq!(spec.fill_value, 0);
    }

    #[test]
    fn name_matching_ignores_case_and_accepts_aliases() {
        let names = default_group_layer_names();
        assert!(name_matches("GRIN_GROUPS", &names));
        assert!(name_matches("grin_groups", &names));
        assert!(name_matches("Grin_Group_Map", &names));
        assert!(!name_matches("GRIN_LOCK", &names));
        assert!(!name_matches("background", &names));
    }

    #[test]
    fn fill_expands_to_gray_triple() {
        assert_eq!(fill_rgb(0), [0, 0, 0]);
        assert_eq!(fill_rgb(15), [15, 15, 15]);
        assert_eq!(fill_rgb(255), [255, 255, 255]);
    }
}
