//! ReelForge Processing Core: the timeline planner
//!
//! Turns an ordered list of media references plus a narration length into
//! per-segment timing and motion:
//! - **Classification:** Image vs clip by extension, clip durations via an injected probe
//! - **Reconciliation:** Hybrid duration allocation that makes segments sum to the narration
//! - **Motion:** Ken Burns zoom/pan curves and pass-through clip normalization
//!
//! This crate is pure computation. Probing is injected through
//! [`classify::DurationProbe`]; nothing here spawns processes or touches files.

pub mod classify;
pub mod motion;
pub mod reconcile;

pub use classify::{DurationProbe, MediaClassifier};
pub use motion::{MotionDescriptor, MotionSynthesizer, SegmentMotion};
pub use reconcile::{DurationReconciler, ReconcileReport};
