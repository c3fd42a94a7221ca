//! LED positions for the visualizer.
//!
//! The heightmap is a JSON array of `{"id": n, "x": .., "y": ..}` entries as
//! produced by a strip detector. Ids may be sparse and unordered; the loaded
//! map is dense over `0..=max_id`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Number;

use crate::packet::MAX_LED_COUNT;

/// Coordinates kept in the number form the heightmap used (`1` stays `1`).
pub type Position = [Number; 2];

/// One `(x, y)` pair per LED index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeometryMap {
    map: Vec<Position>,
}

#[derive(Debug, Deserialize)]
struct LedEntry {
    id: usize,
    x: Number,
    y: Number,
}

#[derive(Debug, thiserror::Error)]
pub enum GeometryError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed heightmap {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("heightmap {0} contains no LEDs")]
    Empty(PathBuf),
    #[error("heightmap {path} has LED id {id}, ids must be below {limit}")]
    IdOutOfRange { path: PathBuf, id: usize, limit: usize },
}

/// Why a set of entries cannot form a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unusable {
    Empty,
    IdOutOfRange(usize),
}

impl GeometryMap {
    pub fn load(path: &Path) -> Result<Self, GeometryError> {
        let text = std::fs::read_to_string(path).map_err(|source| GeometryError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let entries: Vec<LedEntry> =
            serde_json::from_str(&text).map_err(|source| GeometryError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_entries(entries).map_err(|reason| match reason {
            Unusable::Empty => GeometryError::Empty(path.to_path_buf()),
            Unusable::IdOutOfRange(id) => GeometryError::IdOutOfRange {
                path: path.to_path_buf(),
                id,
                limit: MAX_LED_COUNT,
            },
        })
    }

    /// Densifies sparse entries.
    ///
    /// A missing index copies the index just below it (which may itself have
    /// been filled). Leading gaps, having nothing below, copy the entry with
    /// the highest id. Duplicate ids keep the last occurrence. Ids must stay
    /// below `MAX_LED_COUNT`, the longest strip a frame can light.
    fn from_entries(entries: Vec<LedEntry>) -> Result<Self, Unusable> {
        let by_id: BTreeMap<usize, Position> =
            entries.into_iter().map(|e| (e.id, [e.x, e.y])).collect();
        let (&max_id, last) = by_id.last_key_value().ok_or(Unusable::Empty)?;
        if max_id >= MAX_LED_COUNT {
            return Err(Unusable::IdOutOfRange(max_id));
        }

        let mut map: Vec<Position> = Vec::with_capacity(max_id + 1);
        for i in 0..=max_id {
            let pos = match by_id.get(&i) {
                Some(pos) => pos.clone(),
                None => map.last().unwrap_or(last).clone(),
            };
            map.push(pos);
        }
        Ok(Self { map })
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entries(json: &str) -> Vec<LedEntry> {
        serde_json::from_str(json).unwrap()
    }

    fn densify(json: &str) -> serde_json::Value {
        let map = GeometryMap::from_entries(entries(json)).unwrap();
        serde_json::to_value(&map).unwrap()["map"].take()
    }

    #[test]
    fn test_contiguous_ids_in_any_order() {
        let map = densify(
            r#"[{"id": 2, "x": 2.0, "y": 20.0},
                {"id": 0, "x": 0.0, "y": 0.5},
                {"id": 1, "x": 1.0, "y": 10.0}]"#,
        );
        assert_eq!(map, json!([[0.0, 0.5], [1.0, 10.0], [2.0, 20.0]]));
    }

    #[test]
    fn test_gaps_copy_nearest_lower_entry() {
        let map = densify(
            r#"[{"id": 0, "x": 1, "y": 1},
                {"id": 4, "x": 5, "y": 5},
                {"id": 2, "x": 3, "y": 3}]"#,
        );
        assert_eq!(map, json!([[1, 1], [1, 1], [3, 3], [3, 3], [5, 5]]));
    }

    #[test]
    fn test_leading_gap_copies_highest_id() {
        let map = densify(
            r#"[{"id": 3, "x": 7, "y": 8},
                {"id": 5, "x": 9, "y": 10}]"#,
        );
        assert_eq!(
            map,
            json!([[9, 10], [9, 10], [9, 10], [7, 8], [7, 8], [9, 10]])
        );
    }

    #[test]
    fn test_single_entry() {
        let map = densify(r#"[{"id": 2, "x": 1.5, "y": -1}]"#);
        assert_eq!(map, json!([[1.5, -1], [1.5, -1], [1.5, -1]]));
    }

    #[test]
    fn test_number_form_is_kept() {
        let map = densify(r#"[{"id": 0, "x": 1, "y": 2.5}]"#);
        assert_eq!(map.to_string(), "[[1,2.5]]");
    }

    #[test]
    fn test_empty_entries() {
        assert_eq!(
            GeometryMap::from_entries(Vec::new()).err(),
            Some(Unusable::Empty)
        );
    }

    #[test]
    fn test_ids_beyond_strip_length_are_rejected() {
        let huge = entries(r#"[{"id": 18446744073709551615, "x": 1, "y": 2}]"#);
        assert_eq!(
            GeometryMap::from_entries(huge).err(),
            Some(Unusable::IdOutOfRange(usize::MAX))
        );

        let just_over = entries(r#"[{"id": 1000, "x": 1, "y": 2}]"#);
        assert_eq!(
            GeometryMap::from_entries(just_over).err(),
            Some(Unusable::IdOutOfRange(MAX_LED_COUNT))
        );

        let last_led = entries(r#"[{"id": 999, "x": 1, "y": 2}]"#);
        assert_eq!(GeometryMap::from_entries(last_led).unwrap().len(), MAX_LED_COUNT);
    }

    #[test]
    fn test_serializes_under_map_key() {
        let map = GeometryMap::from_entries(entries(r#"[{"id": 0, "x": 1, "y": 2}]"#)).unwrap();
        assert_eq!(serde_json::to_value(&map).unwrap(), json!({"map": [[1, 2]]}));
    }

    #[test]
    fn test_load_errors() {
        let dir = std::env::temp_dir().join(format!("ledsim-geometry-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let missing = dir.join("missing.json");
        assert!(matches!(
            GeometryMap::load(&missing),
            Err(GeometryError::Read { .. })
        ));

        let malformed = dir.join("malformed.json");
        std::fs::write(&malformed, "[{\"id\": 0, \"x\": 1}").unwrap();
        assert!(matches!(
            GeometryMap::load(&malformed),
            Err(GeometryError::Parse { .. })
        ));

        let empty = dir.join("empty.json");
        std::fs::write(&empty, "[]").unwrap();
        assert!(matches!(
            GeometryMap::load(&empty),
            Err(GeometryError::Empty(_))
        ));

        let huge = dir.join("huge.json");
        std::fs::write(&huge, r#"[{"id": 18446744073709551615, "x": 1, "y": 2}]"#).unwrap();
        match GeometryMap::load(&huge) {
            Err(GeometryError::IdOutOfRange { id, limit, .. }) => {
                assert_eq!(id, usize::MAX);
                assert_eq!(limit, MAX_LED_COUNT);
            }
            other => panic!("expected IdOutOfRange, got {other:?}"),
        }

        let scientific = dir.join("scientific.json");
        std::fs::write(&scientific, r#"[{"id": 1e12, "x": 1, "y": 2}]"#).unwrap();
        assert!(matches!(
            GeometryMap::load(&scientific),
            Err(GeometryError::Parse { .. })
        ));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_load_bundled_default() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("data/heightmap.default.json");
        let map = GeometryMap::load(&path).unwrap();
        assert_eq!(map.len(), 300);
    }
}
