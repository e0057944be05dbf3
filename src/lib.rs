//! # TTML Compositor: Timed-Text Parsing and Temporal Composition
//!
//! This crate turns a TTML caption document into a queryable timeline. Parsing computes
//! an absolute activation interval and a cascaded style for every element; querying with a
//! playback time returns a pruned, styled presentation tree containing only what is visible
//! at that instant, ready to be inserted into any display surface.
//!
//! The main entry points are:
//! - [`parse_ttml`]: parses TTML text (with optional JSON settings overrides) into a [`Context`].
//! - [`Context::get_cues`]: builds the presentation tree for a playback time.
//! - [`Context::update_current_events`]: a cheap gate telling callers whether the set of
//!   active elements changed since the last query.
//!
//! ## Examples
//!
//! ```rust
//! use serde_json::json;
//! use ttml_compositor::{Dimensions, parse_ttml};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ttml_content = r#"
//!     <tt xmlns="http://www.w3.org/ns/ttml">
//!       <body>
//!         <div>
//!           <p begin="1s" end="3s">Hello</p>
//!           <p begin="3s" end="5s">world</p>
//!         </div>
//!       </body>
//!     </tt>
//!     "#;
//!
//!     let mut context = parse_ttml(ttml_content, &json!({ "cellResolution": { "rows": 15 } }))?;
//!     context.update_viewport(Dimensions::new(640.0, 360.0));
//!
//!     assert!(context.has_events());
//!     assert_eq!(context.next_event_after(0), Some(1000));
//!
//!     let cues = context.get_cues(2000);
//!     assert_eq!(cues.len(), 1);
//!     assert_eq!(cues[0].text_content(), "Hello");
//!
//!     // Nothing is active before the first cue.
//!     assert!(context.get_cues(500).is_empty());
//!     Ok(())
//! }
//! ```
//!
//! ## Settings
//!
//! [`Settings`] holds namespaces, frame and tick rates, the cell grid, the font map, the default
//! region style and the viewport size. Overrides are deep-merged over the defaults: nested objects
//! merge key by key, arrays and scalars replace.
//!
//! ## Logging
//!
//! The crate emits `tracing` events (compatibility allowances at `warn`, parse summaries at
//! `debug`, per-element timing at `trace`) and never installs a subscriber itself.

pub mod compositor;
pub mod document;
pub mod error;
pub mod parser;
pub mod settings;
pub mod time;

pub use compositor::{
    ActiveElement, Context,
    node::{NodeRole, PresentationNode},
};
pub use document::{Document, NodeId};
pub use error::{CompositorError, CompositorResult};
pub use parser::{
    constants::{ANONYMOUS_REGION_ID, END_OF_MEDIA, START_OF_MEDIA},
    metadata::DocumentMetadata,
    parse_document, parse_ttml, parse_ttml_bytes,
    state::{Event, StyleSet, TimingInterval},
    styles::StyleProperty,
};
pub use settings::{CellResolution, Dimensions, Namespaces, Settings};
pub use time::TimeParser;
