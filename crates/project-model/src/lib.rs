//! ReelForge Project Model
//!
//! Defines the data contracts for a single render job:
//! - **Segments:** Ordered visual inputs (still images and motion clips)
//! - **Profile:** Immutable frame size, encoder, color-grade and motion settings
//! - **Narration:** The authoritative audio track and its word-level transcript
//! - **Request:** The JSON manifest a caller hands to the engine
//!
//! Every value here is created fresh per job and never shared between jobs.

pub mod narration;
pub mod profile;
pub mod request;
pub mod segment;

pub use narration::*;
pub use profile::*;
pub use request::*;
pub use segment::*;
