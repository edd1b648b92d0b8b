//! plotsel - region selection and shape drawing for 2-D charts
//!
//! Box and lasso selection, shape drawing and outline editing on cartesian
//! subplots. A host supplies a [`Layout`] snapshot and its traces, feeds
//! pointer events to an [`Interaction`] and receives selection events through
//! a [`SelectionEvents`] implementation.
//!
//! ```no_run
//! use plotsel::{Document, DragMode, Interaction, InteractionConfig, Layout, PointerEvent};
//! use plotsel_geom::Surface;
//! use web_time::Instant;
//!
//! let layout = Layout::single(Surface::new(0.0, 0.0, 400.0, 300.0), [0.0, 10.0], [0.0, 10.0]);
//! let config = InteractionConfig::default().with_dragmode(DragMode::Select);
//! let mut doc = Document::new(config, layout);
//! let mut interaction = Interaction::silent("plot", &doc.config);
//!
//! let t0 = Instant::now();
//! interaction.pointer_down(&mut doc, &PointerEvent::new(50.0, 50.0, t0));
//! interaction.pointer_move(&mut doc, &PointerEvent::new(150.0, 120.0, t0));
//! interaction.pointer_up(&mut doc, &PointerEvent::new(150.0, 120.0, t0));
//! ```

pub mod config;
pub mod document;
pub mod error;
pub mod events;
pub mod history;
pub mod hittest;
pub mod interaction;
pub mod layout;
pub mod outline;
pub mod region;
pub mod store;

pub use config::{DragMode, InteractionConfig, LogLevel};
pub use document::Document;
pub use error::{PlotselError, PlotselResult};
pub use events::{EmittedEvent, NoopEvents, RecordedEvents, SelectedPoint, SelectionEventData, SelectionEvents};
pub use hittest::{ScatterTrace, TraceModule};
pub use interaction::Interaction;
pub use interaction::gesture::{Modifiers, PointerEvent};
pub use layout::{Layout, Subplot};
pub use outline::{Handle, OutlineMesh};
pub use region::{Region, RegionField, RegionInput, RegionType};
pub use store::{RegionEdit, RegionKind, RegionStore};
