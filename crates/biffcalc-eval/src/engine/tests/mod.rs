mod cache_invalidation;
mod common;
mod cycle_detection;
mod named_ranges;
