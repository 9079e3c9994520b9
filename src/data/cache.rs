use std::num::NonZeroUsize;

use chrono::NaiveDate;
use lru::LruCache;

use super::model::{BoundingBox, GriddedField};

/// Cache key: one request is one (date, region) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldKey {
    pub date: NaiveDate,
    bbox: Option<[u64; 4]>,
}

impl FieldKey {
    pub fn new(date: NaiveDate, bbox: Option<&BoundingBox>) -> Self {
        Self {
            date,
            bbox: bbox.map(BoundingBox::key_bits),
        }
    }
}

/// Bounded memoization of loaded fields, least recently used evicted first.
pub struct FieldCache {
    entries: LruCache<FieldKey, GriddedField>,
    hits: u64,
    misses: u64,
}

impl FieldCache {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Return the cached field for `key`, or run `load` and remember its
    /// result. Failed loads are not cached.
    pub fn get_or_load<E>(
        &mut self,
        key: FieldKey,
        load: impl FnOnce() -> Result<GriddedField, E>,
    ) -> Result<&GriddedField, E> {
        if self.entries.contains(&key) {
            self.hits += 1;
            log::debug!("Field cache hit for {}", key.date);
        } else {
            self.misses += 1;
            if self.entries.len() == self.entries.cap().get() {
                log::debug!("Field cache full, evicting least recently used entry");
            }
        }
        self.entries.try_get_or_insert(key, load)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `(hits, misses)` since creation.
    pub fn counters(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 8, d).unwrap()
    }

    fn field(v: f32) -> GriddedField {
        GriddedField::new(
            "anom",
            Utc.with_ymd_and_hms(2024, 8, 1, 12, 0, 0).unwrap(),
            vec![0.0],
            vec![0.0],
            vec![v],
        )
        .unwrap()
    }

    #[test]
    fn repeated_requests_load_once() {
        let mut cache = FieldCache::new(4);
        let key = FieldKey::new(date(1), None);
        let mut loads = 0;
        for _ in 0..3 {
            let f = cache
                .get_or_load(key, || {
                    loads += 1;
                    Ok::<_, ()>(field(1.0))
                })
                .unwrap();
            assert_eq!(f.values, vec![1.0]);
        }
        assert_eq!(loads, 1);
        assert_eq!(cache.counters(), (2, 1));
    }

    #[test]
    fn bbox_is_part_of_the_key() {
        let mut cache = FieldCache::new(4);
        let bbox = BoundingBox::new(0.0, 10.0, 170.0, -170.0);
        cache
            .get_or_load(FieldKey::new(date(1), None), || Ok::<_, ()>(field(1.0)))
            .unwrap();
        let regional = cache
            .get_or_load(FieldKey::new(date(1), Some(&bbox)), || Ok::<_, ()>(field(2.0)))
            .unwrap();
        assert_eq!(regional.values, vec![2.0]);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn least_recently_used_entry_is_evicted() {
        let mut cache = FieldCache::new(2);
        let (a, b, c) = (
            FieldKey::new(date(1), None),
            FieldKey::new(date(2), None),
            FieldKey::new(date(3), None),
        );
        cache.get_or_load(a, || Ok::<_, ()>(field(1.0))).unwrap();
        cache.get_or_load(b, || Ok::<_, ()>(field(2.0))).unwrap();
        // Touch `a` so `b` becomes the eviction candidate.
        cache.get_or_load(a, || Ok::<_, ()>(field(9.0))).unwrap();
        cache.get_or_load(c, || Ok::<_, ()>(field(3.0))).unwrap();

        let reloaded = cache.get_or_load(b, || Ok::<_, ()>(field(20.0))).unwrap();
        assert_eq!(reloaded.values, vec![20.0]);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn failures_are_not_cached() {
        let mut cache = FieldCache::new(2);
        let key = FieldKey::new(date(1), None);
        assert!(cache.get_or_load(key, || Err("offline")).is_err());
        assert_eq!(cache.len(), 0);
        let f = cache.get_or_load(key, || Ok::<_, &str>(field(1.0))).unwrap();
        assert_eq!(f.values, vec![1.0]);
    }

    #[test]
    fn zero_capacity_still_holds_one_entry() {
        let mut cache = FieldCache::new(0);
        cache
            .get_or_load(FieldKey::new(date(1), None), || Ok::<_, ()>(field(1.0)))
            .unwrap();
        assert_eq!(cache.len(), 1);
    }
}
