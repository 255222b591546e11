//! Parameter and port metadata for block definitions.
//!
//! A block definition advertises ordered input ports, ordered output ports,
//! and ordered parameters. These types carry that metadata. They are plain
//! data: the same descriptors are built in code for fixed-logic blocks and
//! deserialized from the metadata header of template files.
//!
//! # Example
//!
//! ```rust
//! use spindle_core::{ParamDescriptor, DisplayTransform};
//!
//! let gain = ParamDescriptor::new("gain", "Gain", 1.0, -2.0, 1.99)
//!     .with_step(0.01)
//!     .with_display(DisplayTransform::Decibels);
//!
//! assert_eq!(gain.clamp(3.0), 1.99);
//! assert_eq!(gain.display(1.0), "0.0 dB");
//! ```

use serde::{Deserialize, Serialize};

use crate::chip::SAMPLE_RATE;

/// The kind of signal a port carries.
///
/// Connections are only legal between ports of the same kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    /// Audio-rate sample stream.
    #[default]
    Audio,
    /// Slowly varying control value (pots, LFOs, envelopes).
    Control,
}

impl SignalKind {
    /// Lowercase name.
    pub const fn name(self) -> &'static str {
        match self {
            SignalKind::Audio => "audio",
            SignalKind::Control => "control",
        }
    }
}

/// Describes one input or output port of a block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortDescriptor {
    /// Port identifier, unique among the block's inputs or outputs.
    pub id: String,
    /// Display name; defaults to the id.
    #[serde(default)]
    pub name: String,
    /// Signal kind.
    #[serde(default)]
    pub kind: SignalKind,
    /// For inputs: the block cannot generate meaningful code without it.
    #[serde(default)]
    pub required: bool,
}

impl PortDescriptor {
    /// An audio port.
    pub fn audio(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind: SignalKind::Audio,
            required: false,
        }
    }

    /// A control port.
    pub fn control(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind: SignalKind::Control,
            required: false,
        }
    }

    /// Marks the port as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Display name, falling back to the id.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

/// How a parameter value is shown to the user.
///
/// Stored values are always plain numbers; the transform only affects display.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayTransform {
    /// Shown as stored.
    #[default]
    Linear,
    /// Linear gain shown in decibels.
    Decibels,
    /// 0..1 shown as a percentage.
    Percent,
    /// Sample count shown in milliseconds at the chip sample rate.
    Milliseconds,
    /// Frequency in hertz.
    Hertz,
}

impl DisplayTransform {
    /// Formats a stored value for display.
    pub fn format(self, value: f64) -> String {
        match self {
            DisplayTransform::Linear => format!("{value:.3}"),
            DisplayTransform::Decibels => {
                if value <= 0.0 {
                    "-inf dB".to_string()
                } else {
                    format!("{:.1} dB", 20.0 * value.log10())
                }
            }
            DisplayTransform::Percent => format!("{:.0}%", value * 100.0),
            DisplayTransform::Milliseconds => format!("{:.1} ms", value * 1000.0 / SAMPLE_RATE),
            DisplayTransform::Hertz => format!("{value:.1} Hz"),
        }
    }
}

/// Describes one block parameter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParamDescriptor {
    /// Parameter identifier used in graph documents and templates.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Value used when the graph does not set one.
    pub default: f64,
    /// Minimum allowed value.
    pub min: f64,
    /// Maximum allowed value.
    pub max: f64,
    /// Recommended editing increment.
    #[serde(default = "default_step")]
    pub step: f64,
    /// Display transform.
    #[serde(default)]
    pub display: DisplayTransform,
    /// Labels for a discrete selector; the value is the option index.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

fn default_step() -> f64 {
    0.01
}

impl ParamDescriptor {
    /// Creates a continuous parameter.
    pub fn new(id: &str, name: &str, default: f64, min: f64, max: f64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            default,
            min,
            max,
            step: default_step(),
            display: DisplayTransform::Linear,
            options: Vec::new(),
        }
    }

    /// Creates a linear gain parameter spanning the S1.14 range.
    pub fn gain(id: &str, name: &str, default: f64) -> Self {
        Self::new(id, name, default, -2.0, 1.99).with_display(DisplayTransform::Decibels)
    }

    /// Creates a discrete selector over `options`.
    pub fn select(id: &str, name: &str, default: usize, options: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            default: default as f64,
            min: 0.0,
            max: options.len().saturating_sub(1) as f64,
            step: 1.0,
            display: DisplayTransform::Linear,
            options: options.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    /// Sets the step.
    pub fn with_step(mut self, step: f64) -> Self {
        self.step = step;
        self
    }

    /// Sets the display transform.
    pub fn with_display(mut self, display: DisplayTransform) -> Self {
        self.display = display;
        self
    }

    /// Clamps a value to `[min, max]`.
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    /// Returns `true` if `value` lies within `[min, max]`.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Formats a value for display, using option labels for selectors.
    pub fn display(&self, value: f64) -> String {
        if !self.options.is_empty() {
            let index = value.round().max(0.0) as usize;
            if let Some(label) = self.options.get(index) {
                return label.clone();
            }
        }
        self.display.format(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_and_contains() {
        let p = ParamDescriptor::new("x", "X", 0.5, 0.0, 1.0);
        assert_eq!(p.clamp(-1.0), 0.0);
        assert_eq!(p.clamp(2.0), 1.0);
        assert!(p.contains(0.25));
        assert!(!p.contains(1.5));
    }

    #[test]
    fn select_uses_option_labels() {
        let p = ParamDescriptor::select("pot", "Pot", 0, &["POT0", "POT1", "POT2"]);
        assert_eq!(p.max, 2.0);
        assert_eq!(p.display(1.0), "POT1");
    }

    #[test]
    fn display_transforms() {
        assert_eq!(DisplayTransform::Decibels.format(1.0), "0.0 dB");
        assert_eq!(DisplayTransform::Decibels.format(0.0), "-inf dB");
        assert_eq!(DisplayTransform::Percent.format(0.25), "25%");
        assert_eq!(DisplayTransform::Milliseconds.format(32768.0), "1000.0 ms");
    }

    #[test]
    fn port_display_name_falls_back_to_id() {
        let mut p = PortDescriptor::audio("in", "");
        assert_eq!(p.display_name(), "in");
        p.name = "Input".into();
        assert_eq!(p.display_name(), "Input");
    }
}
