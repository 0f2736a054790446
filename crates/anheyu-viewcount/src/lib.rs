//! View-count writeback and scheduled publisher (§4.4): periodic Redis→DB
//! reconciliation of article view counts, and a minute-granular publisher
//! that promotes scheduled drafts and invalidates downstream caches.

pub mod keys;
pub mod publisher;
pub mod writeback;

pub use publisher::Publisher;
pub use writeback::Writeback;
