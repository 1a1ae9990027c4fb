//! Fog of war.
//!
//! Each side has its own [`VisibilityField`]. A tile starts [`Unseen`],
//! becomes [`Visible`] while inside some vision disk, and drops back to
//! [`Explored`] once nothing sees it any more. Explored tiles remember the
//! terrain that was last observed on them.
//!
//! [`Unseen`]: TileVisibility::Unseen
//! [`Visible`]: TileVisibility::Visible
//! [`Explored`]: TileVisibility::Explored

use serde::{Deserialize, Serialize};

use crate::map::{Map, TerrainKind, TilePos};

/// Per-tile fog state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TileVisibility {
    /// Never seen.
    #[default]
    Unseen,
    /// Seen before, not in view now.
    Explored,
    /// Currently in view.
    Visible,
}

/// A vision disk centred on a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisionSource {
    /// Centre tile.
    pub tile: TilePos,
    /// Radius in tiles.
    pub radius: u32,
}

impl VisionSource {
    /// Create a vision source.
    #[must_use]
    pub const fn new(tile: TilePos, radius: u32) -> Self {
        Self { tile, radius }
    }
}

/// Fog-of-war state for one side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityField {
    width: u32,
    height: u32,
    states: Vec<TileVisibility>,
    remembered: Vec<Option<TerrainKind>>,
    /// Indices that were marked visible by the last recompute.
    visible: Vec<usize>,
    explored: usize,
}

impl VisibilityField {
    /// All-unseen field.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        let count = (width as usize) * (height as usize);
        Self {
            width,
            height,
            states: vec![TileVisibility::Unseen; count],
            remembered: vec![None; count],
            visible: Vec::new(),
            explored: 0,
        }
    }

    fn index(&self, pos: TilePos) -> Option<usize> {
        (pos.x < self.width && pos.y < self.height)
            .then(|| (pos.y as usize) * (self.width as usize) + (pos.x as usize))
    }

    /// Rebuild the visible set from scratch.
    ///
    /// Tiles visible before the call are demoted to explored first, then
    /// every tile with `dx² + dy² <= r²` around a source is marked visible
    /// and its terrain remembered. Only each source's bounding box is
    /// scanned.
    pub fn recompute(&mut self, map: &Map, sources: impl IntoIterator<Item = VisionSource>) {
        for index in self.visible.drain(..) {
            self.states[index] = TileVisibility::Explored;
        }

        for source in sources {
            let r = source.radius;
            let r2 = u64::from(r) * u64::from(r);
            let min_x = source.tile.x.saturating_sub(r);
            let min_y = source.tile.y.saturating_sub(r);
            let max_x = source.tile.x.saturating_add(r).min(self.width.saturating_sub(1));
            let max_y = source.tile.y.saturating_add(r).min(self.height.saturating_sub(1));

            for y in min_y..=max_y {
                for x in min_x..=max_x {
                    let pos = TilePos::new(x, y);
                    if pos.distance_squared(source.tile) > r2 {
                        continue;
                    }
                    let Some(index) = self.index(pos) else {
                        continue;
                    };
                    match self.states[index] {
                        TileVisibility::Visible => continue,
                        TileVisibility::Unseen => self.explored += 1,
                        TileVisibility::Explored => {}
                    }
                    self.states[index] = TileVisibility::Visible;
                    self.remembered[index] = map.terrain(pos);
                    self.visible.push(index);
                }
            }
        }
    }

    /// Fog state at a position. Off-map tiles read as unseen.
    #[must_use]
    pub fn state(&self, pos: TilePos) -> TileVisibility {
        self.index(pos)
            .map_or(TileVisibility::Unseen, |i| self.states[i])
    }

    /// Whether the tile is currently in view.
    #[must_use]
    pub fn is_visible(&self, pos: TilePos) -> bool {
        self.state(pos) == TileVisibility::Visible
    }

    /// Whether the tile has ever been seen (explored or visible).
    #[must_use]
    pub fn is_explored(&self, pos: TilePos) -> bool {
        self.state(pos) != TileVisibility::Unseen
    }

    /// Terrain as last observed, if the tile was ever seen.
    #[must_use]
    pub fn remembered_terrain(&self, pos: TilePos) -> Option<TerrainKind> {
        self.index(pos).and_then(|i| self.remembered[i])
    }

    /// Number of tiles in view.
    #[must_use]
    pub fn visible_count(&self) -> usize {
        self.visible.len()
    }

    /// Number of tiles ever seen.
    #[must_use]
    pub const fn explored_count(&self) -> usize {
        self.explored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_and_map() -> (VisibilityField, Map) {
        (VisibilityField::new(30, 30), Map::blank(30, 30))
    }

    #[test]
    fn test_starts_unseen() {
        let (field, _) = field_and_map();
        assert_eq!(field.state(TilePos::new(3, 3)), TileVisibility::Unseen);
        assert_eq!(field.explored_count(), 0);
    }

    #[test]
    fn test_disk_uses_euclidean_radius() {
        let (mut field, map) = field_and_map();
        let center = TilePos::new(15, 15);
        field.recompute(&map, [VisionSource::new(center, 3)]);

        assert!(field.is_visible(center));
        assert!(field.is_visible(TilePos::new(18, 15)));
        assert!(field.is_visible(TilePos::new(17, 17)));
        // 3² + 1² = 10 > 9
        assert!(!field.is_visible(TilePos::new(18, 16)));
        assert_eq!(field.visible_count(), 29);
    }

    #[test]
    fn test_moving_source_leaves_explored_trail() {
        let (mut field, map) = field_and_map();
        field.recompute(&map, [VisionSource::new(TilePos::new(5, 5), 2)]);
        field.recompute(&map, [VisionSource::new(TilePos::new(20, 20), 2)]);

        assert_eq!(field.state(TilePos::new(5, 5)), TileVisibility::Explored);
        assert!(field.is_visible(TilePos::new(20, 20)));
        assert_eq!(field.explored_count(), 26);
    }

    #[test]
    fn test_zero_sources_clears_visible_keeps_explored() {
        let (mut field, map) = field_and_map();
        field.recompute(&map, [VisionSource::new(TilePos::new(10, 10), 4)]);
        let explored_before = field.explored_count();

        field.recompute(&map, std::iter::empty());

        assert_eq!(field.visible_count(), 0);
        assert_eq!(field.explored_count(), explored_before);
        assert_eq!(field.state(TilePos::new(10, 10)), TileVisibility::Explored);
    }

    #[test]
    fn test_remembered_terrain_is_stale_until_seen_again() {
        let (mut field, mut map) = field_and_map();
        let pos = TilePos::new(12, 12);
        map.set_terrain(pos, TerrainKind::Forest);
        field.recompute(&map, [VisionSource::new(pos, 1)]);
        field.recompute(&map, std::iter::empty());

        map.set_terrain(pos, TerrainKind::Grass);
        assert_eq!(field.remembered_terrain(pos), Some(TerrainKind::Forest));

        field.recompute(&map, [VisionSource::new(pos, 1)]);
        assert_eq!(field.remembered_terrain(pos), Some(TerrainKind::Grass));
    }

    #[test]
    fn test_overlapping_sources_count_once() {
        let (mut field, map) = field_and_map();
        let pos = TilePos::new(15, 15);
        field.recompute(&map, [VisionSource::new(pos, 2), VisionSource::new(pos, 2)]);
        assert_eq!(field.visible_count(), 13);
    }

    #[test]
    fn test_source_at_corner_clips() {
        let (mut field, map) = field_and_map();
        field.recompute(&map, [VisionSource::new(TilePos::new(0, 0), 1)]);
        assert_eq!(field.visible_count(), 3);
    }
}
