//! Cache-control policies for HTTP handlers.
//!
//! Learner-specific reads must never be served from a shared cache, while a
//! verified certificate is public and immutable enough to cache briefly.

/// Private responses must always be revalidated before reuse.
pub const PRIVATE_NO_CACHE_MUST_REVALIDATE: &str = "private, no-cache, must-revalidate";

/// Public responses may be reused by shared caches for five minutes.
pub const PUBLIC_SHORT_LIVED: &str = "public, max-age=300";

/// Header tuple for learner-specific responses.
pub const fn private_no_cache_header() -> (&'static str, &'static str) {
    ("Cache-Control", PRIVATE_NO_CACHE_MUST_REVALIDATE)
}

/// Header tuple for public verification responses.
pub const fn public_short_lived_header() -> (&'static str, &'static str) {
    ("Cache-Control", PUBLIC_SHORT_LIVED)
}
