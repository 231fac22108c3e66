//! TrackMe Engine Library
//!
//! Declarative UI event tracking: page markup (marker classes and
//! `data-tracking-*` attributes) declares what to track, and the engine
//! turns interactions into (category, action, label) triples for an
//! analytics sink.
//!
//! # Architecture
//!
//! - Resolves tracking data from an element and its context
//! - Classifies the element (checkbox, radio, switch, form-gated, select,
//!   form field, default) and applies that kind's firing rules
//! - Keeps per-element guards and switch state in a side table
//! - Defers calls until a named event is broadcast (last arm wins)
//! - Expands `{{token}}` placeholders in labels
//!
//! The library does NOT:
//! - Subscribe to browser events (the host calls [`TrackingEngine::handle`])
//! - Transmit or retry analytics payloads
//! - Collect privacy consent
//!
//! # Example Usage
//!
//! ```
//! use track_me_engine::{Document, EngineConfig, ElementSpec, MemoryDocument, RecordingSink, TrackingEngine, TriggerKind};
//!
//! let mut doc = MemoryDocument::from_specs(&[ElementSpec::new("a")
//!     .class("click-trigger")
//!     .data("tracking-category", "shop")
//!     .data("tracking-action", "home")
//!     .data("tracking-label", "banner")]);
//! let link = doc.children(doc.body())[0];
//!
//! let sink = RecordingSink::new();
//! let mut engine = TrackingEngine::new(doc.body(), EngineConfig::new(), Box::new(sink.clone())).unwrap();
//! engine.handle(&mut doc, TriggerKind::Click, link);
//!
//! assert_eq!(sink.events()[0].label, "banner");
//! ```

// Public modules
pub mod config;
pub mod dom;
pub mod engine;
pub mod gate;
pub mod markers;
pub mod placeholder;
pub mod policy;
pub mod registry;
pub mod resolver;
pub mod sink;
pub mod state;
pub mod types;

// Internal modules (not exposed in public API)
mod form_tracking;

// Re-export main types for convenience
pub use config::{EngineConfig, FormTrackingConfig, TrackingDataUpdate, TrackingDefaults};
pub use dom::{Document, ElementSpec, MemoryDocument};
pub use engine::{InteractionReport, TrackingEngine};
pub use registry::TrackMe;
pub use sink::{
    AnalyticsSink, CheckedConsent, ConsentValidator, DebugPresenter, FormValidator, LogPresenter,
    RecordingPresenter, RecordingSink, SinkCall, ValidationRules,
};
pub use types::{
    DispatchOutcome, DropReason, ElementId, InteractionKind, Result, SinkError, Timestamp,
    TrackError, TrackedEvent, TrackingRequest, TriggerKind,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
