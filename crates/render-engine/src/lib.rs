//! ReelForge Render Engine
//!
//! Turns a planned timeline into a finished video with an external media
//! engine (ffmpeg).
//!
//! # Pipeline Architecture
//!
//! ```text
//! scene1.jpg ── scale/crop ── zoompan ──┐
//! scene2.mp4 ── scale/crop ─────────────┼── concat ── eq ──┐
//! scene3.jpg ── scale/crop ── zoompan ──┘                  │
//!                                                          ├── Encode (H.264, -t narration)
//! narration.mp3 ───────────────────────────────────────────┘         │
//!                                                                    ▼
//!                                                                base.mp4
//!                                                                    │
//! captions.ass ──────────────────────────────────────────── Subtitle Burn (-c:a copy)
//!                                                                    │
//!                                                                    ▼
//!                                                               output.mp4
//! ```
//!
//! Long-form jobs may be split into sections. Each section goes through the
//! pipeline above on its own, and the finished sections are joined with the
//! concat demuxer by stream copy.

pub mod compositor;
pub mod engine;
pub mod graph;
pub mod progress;
pub mod render;
pub mod workspace;

pub use compositor::{CompositeOutcome, Compositor};
pub use engine::{EngineInvocation, FfmpegEngine, MediaEngine};
pub use graph::{FilterGraph, FilterGraphBuilder};
pub use progress::{ProgressCallback, RenderProgress, RenderStage};
pub use render::{
    plan_render, render, render_blocking, render_sections, render_sections_blocking,
    RenderOptions, RenderPlan, RenderSummary, SectionedSummary,
};
pub use workspace::JobWorkspace;
