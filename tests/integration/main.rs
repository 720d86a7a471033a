//! Integration tests: aggregate → compose → dispatch with in-memory
//! providers, channels and transports.

mod pipeline;
