// SPDX-License-Identifier: MIT OR Apache-2.0
//! Plug definitions for node inputs/outputs.

use crate::component::PlugId;
use bitflags::bitflags;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Plug direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Receives data
    In,
    /// Provides data
    Out,
}

bitflags! {
    /// Behaviour flags of a plug
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct PlugFlags: u32 {
        /// Added at runtime rather than by the node type
        const DYNAMIC = 1;
        /// Saved with the document
        const SERIALISABLE = 1 << 1;
        /// May be given an input
        const ACCEPTS_INPUTS = 1 << 2;
        /// Neither its input nor its value may change
        const READ_ONLY = 1 << 3;
        /// Dependency edges into this plug are not recorded
        const ACCEPTS_DEPENDENCY_CYCLES = 1 << 4;
    }
}

impl Default for PlugFlags {
    fn default() -> Self {
        Self::SERIALISABLE | Self::ACCEPTS_INPUTS
    }
}

/// Data type that can flow through plugs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlugType {
    /// Boolean value
    Bool,
    /// Integer value
    Int,
    /// Floating point value
    Float,
    /// 2D vector
    Vector2,
    /// 3D vector
    Vector3,
    /// 4D vector
    Vector4,
    /// Color (RGBA)
    Color,
    /// String value
    String,
    /// Container of child plugs
    Compound,
    /// Any type (for generic nodes)
    Any,
}

impl PlugType {
    /// Check if this type can connect to another type
    pub fn can_connect_to(&self, other: &PlugType) -> bool {
        // Compounds only connect to compounds
        if matches!(self, Self::Compound) || matches!(other, Self::Compound) {
            return self == other;
        }

        if matches!(self, Self::Any) || matches!(other, Self::Any) {
            return true;
        }

        if self == other {
            return true;
        }

        // Implicit conversions
        match (self, other) {
            (Self::Int, Self::Float) | (Self::Float, Self::Int) => true,
            (Self::Bool, Self::Int) => true,
            (Self::Float, Self::Vector2 | Self::Vector3 | Self::Vector4) => true,
            (Self::Vector2, Self::Vector3 | Self::Vector4) => true,
            (Self::Vector3, Self::Vector4) => true,
            (Self::Color, Self::Vector4) | (Self::Vector4, Self::Color) => true,
            _ => false,
        }
    }
}

/// Static value held by a leaf plug
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlugValue {
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i32),
    /// Float
    Float(f32),
    /// 2D vector
    Vector2([f32; 2]),
    /// 3D vector
    Vector3([f32; 3]),
    /// 4D vector
    Vector4([f32; 4]),
    /// Color
    Color([f32; 4]),
    /// String
    String(String),
}

impl PlugValue {
    /// Get the plug type for this value
    pub fn plug_type(&self) -> PlugType {
        match self {
            Self::Bool(_) => PlugType::Bool,
            Self::Int(_) => PlugType::Int,
            Self::Float(_) => PlugType::Float,
            Self::Vector2(_) => PlugType::Vector2,
            Self::Vector3(_) => PlugType::Vector3,
            Self::Vector4(_) => PlugType::Vector4,
            Self::Color(_) => PlugType::Color,
            Self::String(_) => PlugType::String,
        }
    }
}

/// Description of a plug hierarchy to create
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlugSpec {
    /// Plug name
    pub name: String,
    /// Plug direction
    pub direction: Direction,
    /// Data type
    pub plug_type: PlugType,
    /// Behaviour flags
    pub flags: PlugFlags,
    /// Default value (leaf plugs only)
    pub default_value: Option<PlugValue>,
    /// Child plugs, all sharing `direction`
    pub children: Vec<PlugSpec>,
}

impl PlugSpec {
    /// Create a new plug spec
    pub fn new(name: impl Into<String>, plug_type: PlugType, direction: Direction) -> Self {
        Self {
            name: name.into(),
            direction,
            plug_type,
            flags: PlugFlags::default(),
            default_value: None,
            children: Vec::new(),
        }
    }

    /// Create a new input plug spec
    pub fn input(name: impl Into<String>, plug_type: PlugType) -> Self {
        Self::new(name, plug_type, Direction::In)
    }

    /// Create a new output plug spec
    pub fn output(name: impl Into<String>, plug_type: PlugType) -> Self {
        Self::new(name, plug_type, Direction::Out)
    }

    /// Create a compound plug spec from its children.
    ///
    /// Children are switched to the compound's direction.
    pub fn compound(
        name: impl Into<String>,
        direction: Direction,
        children: impl IntoIterator<Item = PlugSpec>,
    ) -> Self {
        let children = children
            .into_iter()
            .map(|mut child| {
                child.set_direction(direction);
                child
            })
            .collect();
        Self {
            children,
            ..Self::new(name, PlugType::Compound, direction)
        }
    }

    /// Set the default value
    pub fn with_default(mut self, value: PlugValue) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Replace all flags
    pub fn with_flags(mut self, flags: PlugFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Turn individual flags on or off
    pub fn with_flag(mut self, flag: PlugFlags, enabled: bool) -> Self {
        self.flags.set(flag, enabled);
        self
    }

    fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
        for child in &mut self.children {
            child.set_direction(direction);
        }
    }
}

/// Whether a plug recomputes its input when a child's input changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum InputSync {
    /// Recompute from children
    #[default]
    Auto,
    /// Skip exactly one recompute; used while a structural cascade is
    /// preserving the plug's current connection
    SkipNext,
}

/// Plug-specific component data
#[derive(Debug, Clone)]
pub struct PlugData {
    pub(crate) direction: Direction,
    pub(crate) flags: PlugFlags,
    pub(crate) plug_type: PlugType,
    pub(crate) input: Option<PlugId>,
    pub(crate) outputs: IndexSet<PlugId>,
    pub(crate) default_value: Option<PlugValue>,
    pub(crate) value: Option<PlugValue>,
    pub(crate) input_sync: InputSync,
}

impl PlugData {
    pub(crate) fn from_spec(spec: &PlugSpec) -> Self {
        Self {
            direction: spec.direction,
            flags: spec.flags,
            plug_type: spec.plug_type,
            input: None,
            outputs: IndexSet::new(),
            default_value: spec.default_value.clone(),
            value: None,
            input_sync: InputSync::Auto,
        }
    }

    /// Plug direction
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Behaviour flags
    pub fn flags(&self) -> PlugFlags {
        self.flags
    }

    /// Data type
    pub fn plug_type(&self) -> PlugType {
        self.plug_type
    }

    /// Connected input
    pub fn input(&self) -> Option<PlugId> {
        self.input
    }

    /// Plugs using this one as their input, in connection order
    pub fn outputs(&self) -> &IndexSet<PlugId> {
        &self.outputs
    }

    /// Default value
    pub fn default_value(&self) -> Option<&PlugValue> {
        self.default_value.as_ref()
    }

    /// Static value, falling back to the default
    pub fn value(&self) -> Option<&PlugValue> {
        self.value.as_ref().or(self.default_value.as_ref())
    }
}
