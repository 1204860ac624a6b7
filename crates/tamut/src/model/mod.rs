//! Timed-automaton components: locations, edges and declarations.
//!
//! # Example
//!
//! ```yaml
//! name: "Machine"
//! declarations:
//!   clocks: ["y"]
//!   inputs: ["coin"]
//!   outputs: ["cof"]
//! locations:
//!   - id: "L0"
//!     kind: initial
//!     invariant: "y <= 6"
//!   - id: "L1"
//! edges:
//!   - source: "L0"
//!     target: "L1"
//!     direction: input
//!     sync: "coin"
//!     update: "y = 0"
//! ```

mod component;

pub use component::{
    BoundedInt, Component, Declarations, Direction, Edge, Location, LocationType, ModelError,
};
