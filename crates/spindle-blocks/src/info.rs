//! Block metadata shared by both definition variants.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use spindle_core::{ParamDescriptor, PortDescriptor};

/// Category of block for organization and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockCategory {
    /// Physical inputs and outputs (ADC, DAC, pots)
    Io,
    /// Arithmetic on signals
    Math,
    /// Summing and routing
    Mix,
    /// Delay memory
    Memory,
    /// Filters
    Filter,
    /// Control-rate shaping
    Control,
    /// LFOs and ramps
    Modulation,
    /// Anything else
    #[serde(other)]
    Other,
}

impl BlockCategory {
    /// All categories in display order.
    pub const ALL: [BlockCategory; 8] = [
        BlockCategory::Io,
        BlockCategory::Math,
        BlockCategory::Mix,
        BlockCategory::Memory,
        BlockCategory::Filter,
        BlockCategory::Control,
        BlockCategory::Modulation,
        BlockCategory::Other,
    ];

    /// Returns a human-readable name for the category.
    pub const fn name(&self) -> &'static str {
        match self {
            BlockCategory::Io => "Input/Output",
            BlockCategory::Math => "Math",
            BlockCategory::Mix => "Mixing",
            BlockCategory::Memory => "Delay Memory",
            BlockCategory::Filter => "Filter",
            BlockCategory::Control => "Control",
            BlockCategory::Modulation => "Modulation",
            BlockCategory::Other => "Other",
        }
    }

    /// Returns a description of the category.
    pub const fn description(&self) -> &'static str {
        match self {
            BlockCategory::Io => "ADC inputs, DAC outputs and potentiometers",
            BlockCategory::Math => "Gain, inversion, multiplication and other arithmetic",
            BlockCategory::Mix => "Mixers and signal routing",
            BlockCategory::Memory => "Delay lines backed by the chip's sample memory",
            BlockCategory::Filter => "Low-pass, high-pass and other filters",
            BlockCategory::Control => "Scaling and shaping of control signals",
            BlockCategory::Modulation => "Oscillators and ramps",
            BlockCategory::Other => "Uncategorized blocks",
        }
    }
}

/// Describes a block type: identity, display metadata, ports and parameters.
///
/// Template files carry this as their TOML header, so field names here are
/// the file format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockInfo {
    /// Type identifier referenced by graph documents, e.g. `math.gain`.
    #[serde(rename = "type")]
    pub type_id: String,
    /// Human-readable name.
    pub name: String,
    /// Category for organization.
    pub category: BlockCategory,
    /// Optional finer grouping within the category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    /// Brief description.
    #[serde(default)]
    pub description: String,
    /// Editor color, e.g. `#4a90d9`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Editor width in grid units.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Ordered input ports.
    #[serde(default)]
    pub inputs: Vec<PortDescriptor>,
    /// Ordered output ports.
    #[serde(default)]
    pub outputs: Vec<PortDescriptor>,
    /// Ordered parameters.
    #[serde(default, alias = "parameters")]
    pub params: Vec<ParamDescriptor>,
    /// Reads and writes delay memory, so it can close a feedback loop.
    #[serde(default)]
    pub memory_bearing: bool,
}

impl BlockInfo {
    /// Creates metadata with no ports or parameters.
    pub fn new(type_id: &str, name: &str, category: BlockCategory, description: &str) -> Self {
        Self {
            type_id: type_id.to_string(),
            name: name.to_string(),
            category,
            subcategory: None,
            description: description.to_string(),
            color: None,
            width: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
            params: Vec::new(),
            memory_bearing: false,
        }
    }

    /// Adds an input port.
    pub fn input(mut self, port: PortDescriptor) -> Self {
        self.inputs.push(port);
        self
    }

    /// Adds an output port.
    pub fn output(mut self, port: PortDescriptor) -> Self {
        self.outputs.push(port);
        self
    }

    /// Adds a parameter.
    pub fn param(mut self, param: ParamDescriptor) -> Self {
        self.params.push(param);
        self
    }

    /// Marks the block as memory-bearing.
    pub fn memory_bearing(mut self) -> Self {
        self.memory_bearing = true;
        self
    }

    /// Looks up an input port.
    pub fn input_port(&self, id: &str) -> Option<&PortDescriptor> {
        self.inputs.iter().find(|p| p.id == id)
    }

    /// Looks up an output port.
    pub fn output_port(&self, id: &str) -> Option<&PortDescriptor> {
        self.outputs.iter().find(|p| p.id == id)
    }

    /// Looks up a parameter.
    pub fn param_descriptor(&self, id: &str) -> Option<&ParamDescriptor> {
        self.params.iter().find(|p| p.id == id)
    }

    /// Every parameter at its default value.
    pub fn default_params(&self) -> BTreeMap<String, f64> {
        self.params
            .iter()
            .map(|p| (p.id.clone(), p.default))
            .collect()
    }

    /// Checks internal consistency: unique port and parameter ids, sane ranges.
    pub fn check(&self) -> Result<(), String> {
        if self.type_id.trim().is_empty() {
            return Err("block type id is empty".to_string());
        }
        for (kind, ports) in [("input", &self.inputs), ("output", &self.outputs)] {
            for (i, port) in ports.iter().enumerate() {
                if ports[..i].iter().any(|p| p.id == port.id) {
                    return Err(format!("duplicate {kind} port '{}'", port.id));
                }
            }
        }
        for (i, param) in self.params.iter().enumerate() {
            if self.params[..i].iter().any(|p| p.id == param.id) {
                return Err(format!("duplicate parameter '{}'", param.id));
            }
            if param.min > param.max {
                return Err(format!(
                    "parameter '{}' has min {} above max {}",
                    param.id, param.min, param.max
                ));
            }
            if !param.contains(param.default) {
                return Err(format!(
                    "parameter '{}' default {} is outside [{}, {}]",
                    param.id, param.default, param.min, param.max
                ));
            }
        }
        Ok(())
    }
}
