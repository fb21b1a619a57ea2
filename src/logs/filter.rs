use crate::logs::entry::{RequestContext, StreamType};
use std::sync::Arc;

/// Decides whether an event on a stream should be recorded
pub trait Filter: Send + Sync {
    fn should_log(&self, ctx: &RequestContext, stream: StreamType) -> bool;
}

/// Path prefixes served by the drive/proxy download routes
const DRIVE_PREFIXES: [&str; 3] = ["/d/", "/p/", "/ad/"];

const IMAGE_EXTENSIONS: [&str; 20] = [
    ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".webp", ".svg", ".ico", ".tiff", ".tif", ".psd",
    ".raw", ".cr2", ".nef", ".orf", ".sr2", ".heic", ".heif", ".avif", ".jxl",
];

const VIDEO_EXTENSIONS: [&str; 20] = [
    ".mp4", ".avi", ".mov", ".wmv", ".flv", ".mkv", ".webm", ".m4v", ".3gp", ".f4v", ".asf",
    ".rm", ".rmvb", ".vob", ".ts", ".mts", ".m2ts", ".divx", ".xvid", ".ogv",
];

/// Records only image and video downloads under the drive routes.
///
/// Other streams pass through untouched.
#[derive(Debug, Default, Clone)]
pub struct MediaFilter;

impl MediaFilter {
    pub fn new() -> Self {
        Self
    }

    /// Check a request path against the drive prefixes and media extensions.
    ///
    /// The query string is not part of `path`; a raw path that still carries
    /// `?` or `&` after the extension is accepted.
    pub fn is_media_path(path: &str) -> bool {
        if !DRIVE_PREFIXES.iter().any(|p| path.starts_with(p)) {
            return false;
        }

        let lower = path.to_lowercase();
        IMAGE_EXTENSIONS
            .iter()
            .chain(VIDEO_EXTENSIONS.iter())
            .any(|ext| {
                lower.ends_with(ext)
                    || lower.contains(&format!("{}?", ext))
                    || lower.contains(&format!("{}&", ext))
            })
    }
}

impl Filter for MediaFilter {
    fn should_log(&self, ctx: &RequestContext, stream: StreamType) -> bool {
        if stream != StreamType::Media {
            return true;
        }
        Self::is_media_path(&ctx.path)
    }
}

/// Prefix-based include/exclude rules on the request path
#[derive(Debug, Default, Clone)]
pub struct PathFilter {
    exclude_paths: Vec<String>,
    include_paths: Vec<String>,
}

impl PathFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter excluding the health-check and favicon routes
    pub fn with_defaults() -> Self {
        let mut filter = Self::new();
        for path in ["/ping", "/health", "/favicon.ico"] {
            filter.add_exclude_path(path);
        }
        filter
    }

    pub fn add_exclude_path(&mut self, path: impl Into<String>) {
        self.exclude_paths.push(path.into());
    }

    pub fn add_include_path(&mut self, path: impl Into<String>) {
        self.include_paths.push(path.into());
    }

    pub fn exclude_paths(&self) -> &[String] {
        &self.exclude_paths
    }

    pub fn include_paths(&self) -> &[String] {
        &self.include_paths
    }
}

impl Filter for PathFilter {
    fn should_log(&self, ctx: &RequestContext, _stream: StreamType) -> bool {
        let path = ctx.path.as_str();

        if self.exclude_paths.iter().any(|p| path.starts_with(p.as_str())) {
            return false;
        }

        if !self.include_paths.is_empty() {
            return self.include_paths.iter().any(|p| path.starts_with(p.as_str()));
        }

        true
    }
}

/// Status-code include/exclude rules, applied to the access stream only
#[derive(Debug, Default, Clone)]
pub struct StatusCodeFilter {
    exclude_status: Vec<u16>,
    include_status: Vec<u16>,
}

impl StatusCodeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_exclude_status(&mut self, code: u16) {
        self.exclude_status.push(code);
    }

    pub fn add_include_status(&mut self, code: u16) {
        self.include_status.push(code);
    }
}

impl Filter for StatusCodeFilter {
    fn should_log(&self, ctx: &RequestContext, stream: StreamType) -> bool {
        if stream != StreamType::Access {
            return true;
        }

        let status = ctx.status_code;
        if self.exclude_status.contains(&status) {
            return false;
        }

        if !self.include_status.is_empty() {
            return self.include_status.contains(&status);
        }

        true
    }
}

/// How a [`CompositeFilter`] combines its members
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    /// Every member must pass
    And,
    /// At least one member must pass
    Or,
}

/// Ordered chain of filters combined with AND or OR.
///
/// An empty chain passes in both modes.
pub struct CompositeFilter {
    filters: Vec<Arc<dyn Filter>>,
    mode: FilterMode,
}

impl CompositeFilter {
    pub fn new(mode: FilterMode) -> Self {
        Self {
            filters: Vec::new(),
            mode,
        }
    }

    pub fn add_filter(&mut self, filter: Arc<dyn Filter>) {
        self.filters.push(filter);
    }

    pub fn with_filter(mut self, filter: Arc<dyn Filter>) -> Self {
        self.add_filter(filter);
        self
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl Filter for CompositeFilter {
    fn should_log(&self, ctx: &RequestContext, stream: StreamType) -> bool {
        if self.filters.is_empty() {
            return true;
        }

        match self.mode {
            FilterMode::And => self.filters.iter().all(|f| f.should_log(ctx, stream)),
            FilterMode::Or => self.filters.iter().any(|f| f.should_log(ctx, stream)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed {
        result: bool,
        calls: AtomicUsize,
    }

    impl Fixed {
        fn new(result: bool) -> Arc<Self> {
            Arc::new(Self {
                result,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl Filter for Fixed {
        fn should_log(&self, _ctx: &RequestContext, _stream: StreamType) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result
        }
    }

    fn media(path: &str) -> bool {
        MediaFilter::new().should_log(&RequestContext::new("GET", path), StreamType::Media)
    }

    #[test]
    fn test_media_filter_recognition() {
        assert!(media("/d/photo.JPG"));
        assert!(!media("/x/photo.jpg"));
        assert!(!media("/d/doc.pdf"));
        assert!(media("/p/movies/clip.mkv"));
        assert!(media("/ad/shows/ep1.M2TS"));
    }

    #[test]
    fn test_media_filter_query_suffix() {
        let ctx = RequestContext::new("GET", "/d/video.mp4").with_query("sign=abc");
        assert!(MediaFilter::new().should_log(&ctx, StreamType::Media));

        assert!(MediaFilter::is_media_path("/d/a.png&x=1"));
        assert!(!MediaFilter::is_media_path("/d/a.pngx"));
    }

    #[test]
    fn test_media_filter_ignores_query_extension() {
        let ctx = RequestContext::new("GET", "/d/readme.txt").with_query("thumb=cover.jpg");
        assert!(!MediaFilter::new().should_log(&ctx, StreamType::Media));
    }

    #[test]
    fn test_media_filter_prefix_is_case_sensitive() {
        assert!(!media("/D/photo.jpg"));
        assert!(!media("/data/photo.jpg"));
    }

    #[test]
    fn test_media_filter_ignores_other_streams() {
        let ctx = RequestContext::new("GET", "/api/me");
        let filter = MediaFilter::new();
        assert!(filter.should_log(&ctx, StreamType::Access));
        assert!(filter.should_log(&ctx, StreamType::Error));
        assert!(filter.should_log(&ctx, StreamType::System));
        assert!(!filter.should_log(&ctx, StreamType::Media));
    }

    #[test]
    fn test_path_filter_prefix_exclude() {
        let mut filter = PathFilter::new();
        filter.add_exclude_path("/ping");

        let check = |p: &str| filter.should_log(&RequestContext::new("GET", p), StreamType::Access);
        assert!(!check("/ping/health"));
        assert!(!check("/pingback"));
        assert!(check("/api/fs/list"));
    }

    #[test]
    fn test_path_filter_include() {
        let mut filter = PathFilter::new();
        filter.add_include_path("/api/");
        filter.add_exclude_path("/api/internal");

        let check = |p: &str| filter.should_log(&RequestContext::new("GET", p), StreamType::Access);
        assert!(check("/api/fs/get"));
        assert!(!check("/api/internal/stats"));
        assert!(!check("/assets/app.js"));
    }

    #[test]
    fn test_path_filter_defaults() {
        let filter = PathFilter::with_defaults();
        assert_eq!(filter.exclude_paths(), &["/ping", "/health", "/favicon.ico"]);
        assert!(filter.include_paths().is_empty());
    }

    #[test]
    fn test_status_filter_access_only() {
        let mut filter = StatusCodeFilter::new();
        filter.add_exclude_status(304);

        let ctx = RequestContext::new("GET", "/").with_status(304);
        assert!(!filter.should_log(&ctx, StreamType::Access));
        assert!(filter.should_log(&ctx, StreamType::Error));
    }

    #[test]
    fn test_status_filter_include() {
        let mut filter = StatusCodeFilter::new();
        filter.add_include_status(500);
        filter.add_include_status(502);

        let status = |code| {
            filter.should_log(
                &RequestContext::new("GET", "/").with_status(code),
                StreamType::Access,
            )
        };
        assert!(status(500));
        assert!(status(502));
        assert!(!status(200));
    }

    #[test]
    fn test_composite_empty_always_passes() {
        let ctx = RequestContext::new("GET", "/");
        assert!(CompositeFilter::new(FilterMode::And).should_log(&ctx, StreamType::Access));
        assert!(CompositeFilter::new(FilterMode::Or).should_log(&ctx, StreamType::Access));
    }

    #[test]
    fn test_composite_and_semantics() {
        let ctx = RequestContext::new("GET", "/");
        let cases = [
            (vec![true, true], true),
            (vec![true, false], false),
            (vec![false, true], false),
            (vec![false, false], false),
        ];
        for (members, expected) in cases {
            let mut composite = CompositeFilter::new(FilterMode::And);
            for m in &members {
                composite.add_filter(Fixed::new(*m));
            }
            assert_eq!(
                composite.should_log(&ctx, StreamType::Access),
                expected,
                "AND of {:?}",
                members
            );
        }
    }

    #[test]
    fn test_composite_or_semantics() {
        let ctx = RequestContext::new("GET", "/");
        let cases = [
            (vec![true, true], true),
            (vec![true, false], true),
            (vec![false, true], true),
            (vec![false, false], false),
        ];
        for (members, expected) in cases {
            let mut composite = CompositeFilter::new(FilterMode::Or);
            for m in &members {
                composite.add_filter(Fixed::new(*m));
            }
            assert_eq!(
                composite.should_log(&ctx, StreamType::Access),
                expected,
                "OR of {:?}",
                members
            );
        }
    }

    #[test]
    fn test_composite_short_circuits() {
        let ctx = RequestContext::new("GET", "/");

        let second = Fixed::new(true);
        let and = CompositeFilter::new(FilterMode::And)
            .with_filter(Fixed::new(false))
            .with_filter(second.clone());
        assert!(!and.should_log(&ctx, StreamType::Access));
        assert_eq!(second.calls.load(Ordering::SeqCst), 0);

        let second = Fixed::new(false);
        let or = CompositeFilter::new(FilterMode::Or)
            .with_filter(Fixed::new(true))
            .with_filter(second.clone());
        assert!(or.should_log(&ctx, StreamType::Access));
        assert_eq!(second.calls.load(Ordering::SeqCst), 0);
    }
}
