//! Core engine: bounded fan-out and the multi-provider aggregator.

pub mod aggregator;
pub mod fanout;
