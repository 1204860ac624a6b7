//! Timed-automaton component schema.
//!
//! Locations and edges live in flat collections and reference each other by
//! location id, so cloning a component is a plain structural copy.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Role of a location in the automaton.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LocationType {
    /// Ordinary location
    #[default]
    Normal,
    /// The unique initial location
    Initial,
    /// Completion location that accepts nothing
    Inconsistent,
    /// Completion location that accepts everything
    Universal,
}

impl LocationType {
    /// Whether this location was added by completion and must not be mutated.
    #[must_use]
    pub const fn is_completion(self) -> bool {
        matches!(self, Self::Inconsistent | Self::Universal)
    }
}

/// A location of the automaton.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Location {
    /// Stable identifier
    pub id: String,
    /// Invariant expression (empty = true)
    #[serde(default)]
    pub invariant: String,
    /// Location role
    #[serde(default)]
    pub kind: LocationType,
}

impl Location {
    /// Create a normal location without invariant
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            invariant: String::new(),
            kind: LocationType::Normal,
        }
    }

    /// Set the invariant
    #[must_use]
    pub fn with_invariant(mut self, invariant: impl Into<String>) -> Self {
        self.invariant = invariant.into();
        self
    }

    /// Set the location type
    #[must_use]
    pub const fn with_kind(mut self, kind: LocationType) -> Self {
        self.kind = kind;
        self
    }
}

/// Direction of a synchronisation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Received action (`?`)
    Input,
    /// Emitted action (`!`)
    Output,
}

impl Direction {
    /// The marker appended to a sync label
    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            Self::Input => '?',
            Self::Output => '!',
        }
    }

    /// Split `label?` / `label!` into label and direction
    #[must_use]
    pub fn split_label(text: &str) -> Option<(&str, Self)> {
        if let Some(label) = text.strip_suffix('?') {
            Some((label, Self::Input))
        } else {
            text.strip_suffix('!').map(|label| (label, Self::Output))
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => write!(f, "input"),
            Self::Output => write!(f, "output"),
        }
    }
}

/// An edge between two locations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Edge {
    /// Source location id
    pub source: String,
    /// Target location id
    pub target: String,
    /// Synchronisation direction
    pub direction: Direction,
    /// Sync label without the `?`/`!` marker
    pub sync: String,
    /// Guard (`&&`-separated simple relations, empty = true)
    #[serde(default)]
    pub guard: String,
    /// Update (comma-separated assignments, empty = none)
    #[serde(default)]
    pub update: String,
    /// True iff incident to an inconsistent or universal location
    #[serde(default, skip_serializing)]
    pub locked: bool,
}

impl Edge {
    /// Create an edge without guard or update
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        direction: Direction,
        sync: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            direction,
            sync: sync.into(),
            guard: String::new(),
            update: String::new(),
            locked: false,
        }
    }

    /// Set the guard
    #[must_use]
    pub fn with_guard(mut self, guard: impl Into<String>) -> Self {
        self.guard = guard.into();
        self
    }

    /// Set the update
    #[must_use]
    pub fn with_update(mut self, update: impl Into<String>) -> Self {
        self.update = update.into();
        self
    }

    /// `label?` or `label!`
    #[must_use]
    pub fn sync_text(&self) -> String {
        format!("{}{}", self.sync, self.direction.symbol())
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} [{}", self.source, self.target, self.sync_text())?;
        if !self.guard.is_empty() {
            write!(f, ", guard: {}", self.guard)?;
        }
        if !self.update.is_empty() {
            write!(f, ", update: {}", self.update)?;
        }
        write!(f, "]")
    }
}

/// A bounded integer local variable.
///
/// A declaration without `initial` starts at 0 when the range holds it, and at
/// `lower` otherwise.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "BoundedIntDecl")]
pub struct BoundedInt {
    /// Variable name
    pub name: String,
    /// Inclusive lower bound
    pub lower: i64,
    /// Inclusive upper bound
    pub upper: i64,
    /// Initial value
    pub initial: i64,
}

#[derive(Deserialize)]
struct BoundedIntDecl {
    name: String,
    lower: i64,
    upper: i64,
    #[serde(default)]
    initial: Option<i64>,
}

impl From<BoundedIntDecl> for BoundedInt {
    fn from(decl: BoundedIntDecl) -> Self {
        let initial = decl.initial.unwrap_or(if decl.lower <= 0 && 0 <= decl.upper {
            0
        } else {
            decl.lower
        });
        Self {
            name: decl.name,
            lower: decl.lower,
            upper: decl.upper,
            initial,
        }
    }
}

impl BoundedInt {
    /// Create a bounded variable starting at `lower`
    #[must_use]
    pub fn new(name: impl Into<String>, lower: i64, upper: i64) -> Self {
        Self {
            name: name.into(),
            lower,
            upper,
            initial: lower,
        }
    }

    /// Whether `value` lies inside the declared range
    #[must_use]
    pub const fn contains(&self, value: i64) -> bool {
        value >= self.lower && value <= self.upper
    }

    /// Number of values in the range, saturating at `usize::MAX`
    #[must_use]
    pub fn range_size(&self) -> usize {
        if self.upper < self.lower {
            return 0;
        }
        let span = i128::from(self.upper) - i128::from(self.lower) + 1;
        usize::try_from(span).unwrap_or(usize::MAX)
    }
}

/// Declared clocks, locals and action vocabularies.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Declarations {
    /// Clock names
    #[serde(default)]
    pub clocks: Vec<String>,
    /// Bounded integer locals
    #[serde(default)]
    pub locals: Vec<BoundedInt>,
    /// Input sync labels
    #[serde(default)]
    pub inputs: Vec<String>,
    /// Output sync labels
    #[serde(default)]
    pub outputs: Vec<String>,
}

impl Declarations {
    /// Labels declared for a direction
    #[must_use]
    pub fn labels(&self, direction: Direction) -> &[String] {
        match direction {
            Direction::Input => &self.inputs,
            Direction::Output => &self.outputs,
        }
    }
}

/// A timed-automaton component.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Component {
    /// Component name
    pub name: String,
    /// Declarations
    #[serde(default)]
    pub declarations: Declarations,
    /// Locations in declaration order
    pub locations: Vec<Location>,
    /// Edges in declaration order
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Component {
    /// Create an empty component
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declarations: Declarations::default(),
            locations: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Parse a component from YAML and validate it.
    ///
    /// # Errors
    /// Returns error if YAML is invalid or validation fails.
    pub fn from_yaml(yaml: &str) -> Result<Self, ModelError> {
        let mut component: Self =
            serde_yaml_ng::from_str(yaml).map_err(|e| ModelError::ParseError(e.to_string()))?;
        component.refresh_locks();
        component.validate()?;
        Ok(component)
    }

    /// Parse a component from JSON and validate it.
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let mut component: Self =
            serde_json::from_str(json).map_err(|e| ModelError::ParseError(e.to_string()))?;
        component.refresh_locks();
        component.validate()?;
        Ok(component)
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> Result<String, ModelError> {
        serde_yaml_ng::to_string(self).map_err(|e| ModelError::ParseError(e.to_string()))
    }

    /// Validate the component structure.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.locations.is_empty() {
            return Err(ModelError::EmptyLocations);
        }

        let mut ids = HashSet::new();
        for location in &self.locations {
            if !ids.insert(location.id.as_str()) {
                return Err(ModelError::DuplicateLocation(location.id.clone()));
            }
        }

        let initial_count = self
            .locations
            .iter()
            .filter(|l| l.kind == LocationType::Initial)
            .count();
        match initial_count {
            0 => return Err(ModelError::NoInitialLocation),
            1 => {}
            _ => return Err(ModelError::MultipleInitialLocations),
        }

        for (index, edge) in self.edges.iter().enumerate() {
            for endpoint in [&edge.source, &edge.target] {
                if !ids.contains(endpoint.as_str()) {
                    return Err(ModelError::UnknownLocation {
                        edge_index: index,
                        location_id: endpoint.clone(),
                    });
                }
            }
            if !self
                .declarations
                .labels(edge.direction)
                .iter()
                .any(|label| *label == edge.sync)
            {
                return Err(ModelError::UndeclaredSync {
                    edge_index: index,
                    label: edge.sync_text(),
                });
            }
        }

        for local in &self.declarations.locals {
            if local.lower > local.upper || !local.contains(local.initial) {
                return Err(ModelError::InvalidBounds(local.name.clone()));
            }
        }

        Ok(())
    }

    /// Recompute every edge's locked flag.
    pub fn refresh_locks(&mut self) {
        let completion: HashSet<String> = self
            .locations
            .iter()
            .filter(|l| l.kind.is_completion())
            .map(|l| l.id.clone())
            .collect();
        for edge in &mut self.edges {
            edge.locked = completion.contains(&edge.source) || completion.contains(&edge.target);
        }
    }

    /// Deep, independent copy used as the basis of a mutant
    #[must_use]
    pub fn clone_for_verification(&self) -> Self {
        self.clone()
    }

    /// The initial location
    #[must_use]
    pub fn initial_location(&self) -> Option<&Location> {
        self.locations
            .iter()
            .find(|l| l.kind == LocationType::Initial)
    }

    /// Look up a location by id
    #[must_use]
    pub fn location(&self, id: &str) -> Option<&Location> {
        self.locations.iter().find(|l| l.id == id)
    }

    /// Edges leaving `location_id`, in declaration order
    pub fn outgoing<'a>(&'a self, location_id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.source == location_id)
    }

    /// Add a location, refreshing edge locks
    pub fn add_location(&mut self, location: Location) {
        self.locations.push(location);
        self.refresh_locks();
    }

    /// Add an edge, refreshing edge locks
    pub fn add_edge(&mut self, edge: Edge) {
        self.edges.push(edge);
        self.refresh_locks();
    }

    /// A location id starting with `prefix` not used by any location
    #[must_use]
    pub fn fresh_location_id(&self, prefix: &str) -> String {
        if self.location(prefix).is_none() {
            return prefix.to_string();
        }
        (1..)
            .map(|n| format!("{prefix}{n}"))
            .find(|id| self.location(id).is_none())
            .unwrap_or_else(|| prefix.to_string())
    }

    /// Whether `name` is a declared clock
    #[must_use]
    pub fn is_clock(&self, name: &str) -> bool {
        self.declarations.clocks.iter().any(|c| c == name)
    }

    /// Look up a declared local
    #[must_use]
    pub fn local(&self, name: &str) -> Option<&BoundedInt> {
        self.declarations.locals.iter().find(|l| l.name == name)
    }
}

/// Errors that can occur while loading or validating a component.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("Failed to parse component: {0}")]
    ParseError(String),

    #[error("Component has no locations")]
    EmptyLocations,

    #[error("Duplicate location id '{0}'")]
    DuplicateLocation(String),

    #[error("Component has no initial location")]
    NoInitialLocation,

    #[error("Component has more than one initial location")]
    MultipleInitialLocations,

    #[error("Edge {edge_index} references non-existent location '{location_id}'")]
    UnknownLocation {
        edge_index: usize,
        location_id: String,
    },

    #[error("Edge {edge_index} uses undeclared sync '{label}'")]
    UndeclaredSync { edge_index: usize, label: String },

    #[error("Local '{0}' has an empty range or an initial value outside it")]
    InvalidBounds(String),
}
