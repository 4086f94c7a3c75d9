use std::num::NonZeroUsize;

use lru::LruCache;
use ordered_float::OrderedFloat;
use tracing::debug;

use crate::curve::clamp_progress;
use crate::format::ImageFormat;
use crate::render::{RenderOptions, Renderer};
use crate::HillChartError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    t: OrderedFloat<f64>,
    format: ImageFormat,
    options: RenderOptions,
}

/// LRU cache of encoded chart images.
pub struct RenderCache {
    renderer: Renderer,
    cache: LruCache<CacheKey, Vec<u8>>,
    hits: u64,
    misses: u64,
}

impl RenderCache {
    /// A capacity of zero is treated as one.
    pub fn new(renderer: Renderer, capacity: usize) -> Self {
        Self {
            renderer,
            cache: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
            hits: 0,
            misses: 0,
        }
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// Returns the cached image for the clamped `t`, rendering it on a miss.
    /// Failed renders are not cached.
    pub fn render(
        &mut self,
        t: f64,
        format: ImageFormat,
        options: &RenderOptions,
    ) -> Result<Vec<u8>, HillChartError> {
        let key = Self::make_key(t, format, options);
        if let Some(bytes) = self.cache.get(&key) {
            self.hits += 1;
            debug!(t = key.t.0, %format, "render cache hit");
            return Ok(bytes.clone());
        }
        self.misses += 1;
        let bytes = self.renderer.render(key.t.0, format, options)?;
        self.cache.put(key, bytes.clone());
        Ok(bytes)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// `(hits, misses)` since creation.
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    fn make_key(t: f64, format: ImageFormat, options: &RenderOptions) -> CacheKey {
        // empty and missing titles draw the same image
        let options = RenderOptions {
            title: options.title_text().map(str::to_string),
            show_labels: options.show_labels,
        };
        CacheKey {
            t: OrderedFloat(clamp_progress(t)),
            format,
            options,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::Theme;

    fn small_cache(capacity: usize) -> RenderCache {
        let theme = Theme {
            base_height: 20,
            pixel_density: 1,
            ..Theme::default()
        };
        RenderCache::new(Renderer::new(theme).unwrap(), capacity)
    }

    #[test]
    fn test_cache_hit_returns_same_bytes() {
        let mut cache = small_cache(4);
        let options = RenderOptions::default();
        let first = cache.render(0.4, ImageFormat::Svg, &options).unwrap();
        let second = cache.render(0.4, ImageFormat::Svg, &options).unwrap();
        assert_eq!(first, second);
        assert_eq!(cache.stats(), (1, 1));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clamped_and_title_equivalent_keys() {
        let mut cache = small_cache(4);
        cache
            .render(-3.0, ImageFormat::Png, &RenderOptions::default())
            .unwrap();
        cache
            .render(0.0, ImageFormat::Png, &RenderOptions::default().with_title(""))
            .unwrap();
        assert_eq!(cache.stats(), (1, 1));
    }

    #[test]
    fn test_cache_miss_different_format() {
        let mut cache = small_cache(4);
        let options = RenderOptions::default();
        cache.render(0.5, ImageFormat::Png, &options).unwrap();
        cache.render(0.5, ImageFormat::Jpeg, &options).unwrap();
        assert_eq!(cache.stats(), (0, 2));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_cache_lru_eviction() {
        let mut cache = small_cache(2);
        let options = RenderOptions::default();
        cache.render(0.1, ImageFormat::Svg, &options).unwrap();
        cache.render(0.2, ImageFormat::Svg, &options).unwrap();
        cache.render(0.3, ImageFormat::Svg, &options).unwrap();
        assert_eq!(cache.len(), 2);
        // 0.1 was evicted
        cache.render(0.1, ImageFormat::Svg, &options).unwrap();
        assert_eq!(cache.stats(), (0, 4));
    }

    #[test]
    fn test_cache_clear() {
        let mut cache = small_cache(2);
        cache
            .render(0.1, ImageFormat::Svg, &RenderOptions::default())
            .unwrap();
        cache.clear();
        assert!(cache.is_empty());
    }
}
