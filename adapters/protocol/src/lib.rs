#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Protocol adapters for the micromouse controller.
//!
//! [`TextProtocol`] speaks the line-based mms simulator protocol over any
//! pair of byte streams. [`Simulator`] answers the same requests in memory
//! from a [`WallLayout`], which can be parsed from an mms `.map` file or
//! generated from a seed.

mod layout;
mod map;
mod simulator;
mod text;

pub use layout::{LayoutError, WallLayout};
pub use map::{parse_map, MapParseError};
pub use simulator::{CommandCounts, Simulator};
pub use text::{direction_code, TextProtocol};
