mod filter;
mod model;
mod stats;

pub use filter::{FilteredView, TypeFilter, filter_by_type, type_filters};
pub use model::{Edge, GraphSnapshot, Node, NodeKind, RelationKind, Severity};
pub use stats::GraphStats;
