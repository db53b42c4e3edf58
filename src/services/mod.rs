pub(crate) mod executor;
pub(crate) mod lifecycle;
pub(crate) mod scoring;
