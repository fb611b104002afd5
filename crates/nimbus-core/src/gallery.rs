//! Persisted photo gallery.
//!
//! Photos are kept newest-first. Identifiers are capture times in
//! milliseconds, bumped forward when two captures land on the same
//! millisecond so they stay unique within the gallery.

use time::{Duration, OffsetDateTime};
use tracing::{info, warn};

use nimbus_store::Store;
use nimbus_types::Photo;

use crate::error::{Error, Result};

/// All photos, newest first. A read failure yields an empty gallery.
pub fn list_photos(store: &Store) -> Vec<Photo> {
    store.read_gallery().unwrap_or_else(|e| {
        warn!("Failed to read photo gallery, treating as empty: {}", e);
        Vec::new()
    })
}

/// Look up a single photo.
pub fn get_photo(store: &Store, id: &str) -> Option<Photo> {
    list_photos(store).into_iter().find(|p| p.id == id)
}

/// Prepend a captured still to the gallery.
///
/// `image_data` must be an image data URL (`data:image/...`).
pub fn add_photo(store: &Store, image_data: String, now: OffsetDateTime) -> Result<Photo> {
    if !image_data.starts_with("data:image/") {
        return Err(Error::InvalidImage(
            "expected a data:image/... URL".to_string(),
        ));
    }

    let mut photos = list_photos(store);
    let mut timestamp = now;
    let mut id = Photo::id_for(timestamp);
    while photos.iter().any(|p| p.id == id) {
        timestamp += Duration::milliseconds(1);
        id = Photo::id_for(timestamp);
    }

    let photo = Photo {
        id,
        image_data,
        timestamp: now,
    };
    photos.insert(0, photo.clone());
    store.write_gallery(&photos)?;

    info!("Saved photo {} ({} in gallery)", photo.id, photos.len());
    Ok(photo)
}

/// Remove exactly one photo. The remaining photos keep their order.
pub fn delete_photo(store: &Store, id: &str) -> Result<Photo> {
    let mut photos = list_photos(store);
    let index = photos
        .iter()
        .position(|p| p.id == id)
        .ok_or_else(|| Error::PhotoNotFound(id.to_string()))?;
    let removed = photos.remove(index);
    store.write_gallery(&photos)?;

    info!("Deleted photo {}", removed.id);
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATA: &str = "data:image/jpeg;base64,/9j/4AAQ";

    fn now() -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(1_714_564_800).unwrap()
    }

    #[test]
    fn test_add_prepends() {
        let store = Store::open_in_memory().unwrap();
        let first = add_photo(&store, DATA.into(), now()).unwrap();
        let second = add_photo(&store, DATA.into(), now() + Duration::seconds(1)).unwrap();

        let ids: Vec<_> = list_photos(&store).into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[test]
    fn test_same_millisecond_ids_are_unique() {
        let store = Store::open_in_memory().unwrap();
        let a = add_photo(&store, DATA.into(), now()).unwrap();
        let b = add_photo(&store, DATA.into(), now()).unwrap();
        let c = add_photo(&store, DATA.into(), now()).unwrap();

        assert_eq!(a.id, "1714564800000");
        assert_eq!(b.id, "1714564800001");
        assert_eq!(c.id, "1714564800002");
        assert_eq!(b.timestamp, now());
    }

    #[test]
    fn test_delete_removes_exactly_one() {
        let store = Store::open_in_memory().unwrap();
        for i in 0..5 {
            add_photo(&store, DATA.into(), now() + Duration::seconds(i)).unwrap();
        }
        let before: Vec<_> = list_photos(&store).into_iter().map(|p| p.id).collect();

        let removed = delete_photo(&store, &before[2]).unwrap();
        assert_eq!(removed.id, before[2]);

        let after: Vec<_> = list_photos(&store).into_iter().map(|p| p.id).collect();
        let mut expected = before.clone();
        expected.remove(2);
        assert_eq!(after, expected);
    }

    #[test]
    fn test_delete_unknown_id() {
        let store = Store::open_in_memory().unwrap();
        add_photo(&store, DATA.into(), now()).unwrap();
        assert!(matches!(
            delete_photo(&store, "nope"),
            Err(Error::PhotoNotFound(_))
        ));
        assert_eq!(list_photos(&store).len(), 1);
    }

    #[test]
    fn test_rejects_non_image_data() {
        let store = Store::open_in_memory().unwrap();
        assert!(matches!(
            add_photo(&store, "hello".into(), now()),
            Err(Error::InvalidImage(_))
        ));
        assert!(get_photo(&store, "1714564800000").is_none());
    }
}
