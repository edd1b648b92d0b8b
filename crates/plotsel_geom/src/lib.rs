//! plotsel_geom - geometry for chart region selection
//!
//! Coordinate transforms between pixel and data space, the path notation
//! codec, polygon testers and the region booleans used to merge selections.

pub mod boolean;
mod error;
pub mod path;
mod point;
pub mod polygon;
pub mod transform;

pub use boolean::{difference, merge, union};
pub use error::{GeomError, GeomResult};
pub use path::{DecodeContext, Dim, EMPTY_PATH, Vertex, decode, encode};
pub use point::{Bounds, Point};
pub use polygon::{
    LassoFilter, MultiTester, PointTester, Polygon, PolygonTester, SelectionDef, Tester,
    multi_tester,
};
pub use transform::{Axis, AxisKind, Frame, Position, RefMode, Surface};
