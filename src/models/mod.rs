//! Core data models shared by the matcher, provider and resolver.

mod episode;
mod outcome;
mod playback;

pub use episode::*;
pub use outcome::*;
pub use playback::*;
