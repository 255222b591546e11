//! Graph document model.
//!
//! A [`Graph`] is the immutable input snapshot handed to the compiler: blocks
//! placed by the user, each with a type reference and parameter values, plus
//! the connections between their ports. It serializes to the JSON document
//! exchanged with the diagram editor:
//!
//! ```json
//! {
//!   "metadata": { "name": "Simple gain" },
//!   "blocks": [
//!     { "id": "in", "type": "io.adc", "parameters": {} },
//!     { "id": "g", "type": "math.gain", "parameters": { "gain": 0.5 } },
//!     { "id": "out", "type": "io.dac", "parameters": {} }
//!   ],
//!   "connections": [
//!     { "from": { "blockId": "in", "portId": "left" }, "to": { "blockId": "g", "portId": "in" } },
//!     { "from": { "blockId": "g", "portId": "out" }, "to": { "blockId": "out", "portId": "left" } }
//!   ]
//! }
//! ```
//!
//! The model does no validation of its own; the compiler checks references,
//! signal kinds and driver counts against the block registry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Free-form document metadata.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphMetadata {
    /// Patch name, echoed into the generated program header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Optional author.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Editor-specific keys preserved as-is.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A parameter value as stored in a graph document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Numeric value.
    Number(f64),
    /// Boolean toggle, read as 0.0 / 1.0.
    Bool(bool),
    /// Text; accepted if it parses as a number.
    Text(String),
}

impl ParamValue {
    /// Numeric interpretation, if there is one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Number(n) => Some(*n),
            ParamValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            ParamValue::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Number(value)
    }
}

/// One placed block.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockInstance {
    /// Unique id within the graph.
    pub id: String,
    /// Block definition type id, e.g. `io.adc`.
    #[serde(rename = "type")]
    pub block_type: String,
    /// Parameter id to value.
    #[serde(default)]
    pub parameters: BTreeMap<String, ParamValue>,
}

impl BlockInstance {
    /// Creates a block with no parameters set.
    pub fn new(id: impl Into<String>, block_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            block_type: block_type.into(),
            parameters: BTreeMap::new(),
        }
    }

    /// Sets a numeric parameter.
    pub fn with_param(mut self, id: impl Into<String>, value: f64) -> Self {
        self.parameters.insert(id.into(), ParamValue::Number(value));
        self
    }

    /// Raw numeric parameter value, if set and numeric.
    pub fn param(&self, id: &str) -> Option<f64> {
        self.parameters.get(id).and_then(ParamValue::as_f64)
    }
}

/// One end of a connection.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortRef {
    /// Block id.
    pub block_id: String,
    /// Port id on that block.
    pub port_id: String,
}

impl PortRef {
    /// Creates a port reference.
    pub fn new(block_id: impl Into<String>, port_id: impl Into<String>) -> Self {
        Self {
            block_id: block_id.into(),
            port_id: port_id.into(),
        }
    }
}

/// A directed connection from an output port to an input port.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// Driving output.
    pub from: PortRef,
    /// Driven input.
    pub to: PortRef,
}

impl Connection {
    /// Creates a connection `from_block.from_port -> to_block.to_port`.
    pub fn new(from_block: &str, from_port: &str, to_block: &str, to_port: &str) -> Self {
        Self {
            from: PortRef::new(from_block, from_port),
            to: PortRef::new(to_block, to_port),
        }
    }
}

/// A complete dataflow graph document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    /// Document metadata.
    #[serde(default)]
    pub metadata: GraphMetadata,
    /// Blocks in document order.
    #[serde(default)]
    pub blocks: Vec<BlockInstance>,
    /// Connections in document order.
    #[serde(default)]
    pub connections: Vec<Connection>,
}

impl Graph {
    /// Creates an empty graph with a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            metadata: GraphMetadata {
                name: Some(name.into()),
                ..GraphMetadata::default()
            },
            ..Self::default()
        }
    }

    /// Parses a JSON graph document.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serializes to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Adds a block.
    pub fn with_block(mut self, block: BlockInstance) -> Self {
        self.blocks.push(block);
        self
    }

    /// Adds a connection.
    pub fn with_connection(
        mut self,
        from_block: &str,
        from_port: &str,
        to_block: &str,
        to_port: &str,
    ) -> Self {
        self.connections
            .push(Connection::new(from_block, from_port, to_block, to_port));
        self
    }

    /// Finds a block by id.
    pub fn block(&self, id: &str) -> Option<&BlockInstance> {
        self.blocks.iter().find(|b| b.id == id)
    }

    /// Document index of a block.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.blocks.iter().position(|b| b.id == id)
    }

    /// Connections driving the given input port.
    pub fn drivers_of<'a>(
        &'a self,
        block_id: &'a str,
        port_id: &'a str,
    ) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections
            .iter()
            .filter(move |c| c.to.block_id == block_id && c.to.port_id == port_id)
    }

    /// Returns `true` if the given input port has a driver.
    pub fn is_input_connected(&self, block_id: &str, port_id: &str) -> bool {
        self.drivers_of(block_id, port_id).next().is_some()
    }

    /// Returns `true` if the given output port feeds at least one input.
    pub fn is_output_connected(&self, block_id: &str, port_id: &str) -> bool {
        self.connections
            .iter()
            .any(|c| c.from.block_id == block_id && c.from.port_id == port_id)
    }
}
