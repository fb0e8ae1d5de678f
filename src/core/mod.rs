pub mod config;
pub mod geometry;
pub mod model;
pub mod normalize;

pub use config::{FusionConfig, MatchMode};
pub use geometry::{Axis, BBox};
pub use model::{EngineBlockSet, MergeGroup, NormalizedBox, UnionRegion, WordToken};
pub use normalize::{normalize_box, normalize_page, PageExtent, RawBox};
