//! The pipeline's actors: `Producer → Router → Enricher → sink`, with enriched
//! replies flowing back to the producer.

pub mod enricher;
pub mod producer;
pub mod router;

pub use enricher::{DispatchMode, EnricherActor, ParseDispatchModeError};
pub use producer::{CameraFeed, Feed, FeedLoadError, FeedMessage, Producer, SampleFeed};
pub use router::Router;
