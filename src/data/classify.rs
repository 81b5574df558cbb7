use std::collections::{BTreeMap, HashSet};

use super::model::{ItemType, Table};

/// Catalog identifier sets used to label rated items.
///
/// Built once before classification and never mutated afterwards.
#[derive(Debug, Clone, Default)]
pub struct IdentifierSets {
    artists: HashSet<i64>,
    genres: HashSet<i64>,
    albums: HashSet<i64>,
}

impl IdentifierSets {
    pub fn new(
        artists: impl IntoIterator<Item = i64>,
        genres: impl IntoIterator<Item = i64>,
        albums: impl IntoIterator<Item = i64>,
    ) -> Self {
        IdentifierSets {
            artists: artists.into_iter().collect(),
            genres: genres.into_iter().collect(),
            albums: albums.into_iter().collect(),
        }
    }

    /// Album ids come from the `AlbumID` column of the album table; null ids are ignored.
    pub fn from_album_table(artists: &[i64], genres: &[i64], albums: &Table) -> Self {
        let album_ids = albums
            .column("AlbumID")
            .map(|c| c.values.iter().filter_map(|v| v.as_i64()).collect::<Vec<_>>())
            .unwrap_or_default();
        Self::new(artists.iter().copied(), genres.iter().copied(), album_ids)
    }

    /// First match in the order Artist, Genre, Album; Track otherwise.
    pub fn classify(&self, item_id: i64) -> ItemType {
        if self.artists.contains(&item_id) {
            ItemType::Artist
        } else if self.genres.contains(&item_id) {
            ItemType::Genre
        } else if self.albums.contains(&item_id) {
            ItemType::Album
        } else {
            ItemType::Track
        }
    }

    /// Ids found in more than one set, with every category they belong to.
    /// Classification still resolves them by precedence.
    pub fn overlaps(&self) -> BTreeMap<i64, Vec<ItemType>> {
        let mut seen: BTreeMap<i64, Vec<ItemType>> = BTreeMap::new();
        for (set, kind) in [
            (&self.artists, ItemType::Artist),
            (&self.genres, ItemType::Genre),
            (&self.albums, ItemType::Album),
        ] {
            for &id in set {
                seen.entry(id).or_default().push(kind);
            }
        }
        seen.retain(|_, kinds| kinds.len() > 1);
        seen
    }

    /// Log a warning if the sets are not disjoint.
    pub fn warn_on_overlap(&self) {
        let overlaps = self.overlaps();
        if overlaps.is_empty() {
            return;
        }
        let sample: Vec<String> = overlaps
            .iter()
            .take(5)
            .map(|(id, kinds)| {
                let kinds: Vec<&str> = kinds.iter().map(|k| k.as_str()).collect();
                format!("{id} ({})", kinds.join("/"))
            })
            .collect();
        log::warn!(
            "{} identifiers belong to more than one catalog set, precedence decides their type: {}",
            overlaps.len(),
            sample.join(", ")
        );
    }

    /// Sizes of the (artist, genre, album) sets.
    pub fn sizes(&self) -> (usize, usize, usize) {
        (self.artists.len(), self.genres.len(), self.albums.len())
    }
}
