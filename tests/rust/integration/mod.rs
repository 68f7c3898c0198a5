//! Integration tests - the full read/write path against an on-disk SQLite
//! database.
//!
//! Each test writes through one unit of work and reads back through a fresh
//! one, so results come from storage rather than from an identity map.

mod common;
mod eager_loading_tests;
mod inheritance_round_trip_tests;
mod write_back_tests;
