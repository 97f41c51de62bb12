//! Tower layers applied to the whole router.

pub mod cors;
