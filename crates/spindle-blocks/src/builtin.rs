//! Built-in fixed-logic blocks.
//!
//! These implement chip-specific code generation directly in Rust. Each is a
//! [`FixedBlock`]: metadata plus plain function pointers for generation and
//! optional extra validation.
//!
//! Every block leaves the accumulator at zero when it finishes.

use spindle_core::chip::{Channel, pot_register};
use spindle_core::{
    BlockInstance, CodegenContext, DisplayTransform, FixedFormat, Graph, ParamDescriptor,
    PortDescriptor, Section,
};

use crate::BlockEnv;
use crate::error::GenerateError;
use crate::info::{BlockCategory, BlockInfo};

/// Code generation entry point of a fixed block.
pub type GenerateFn = fn(&BlockEnv<'_>, &mut CodegenContext) -> Result<(), GenerateError>;

/// Block-specific validation beyond required-port checks.
pub type ValidateFn = fn(&BlockInstance, &Graph) -> Result<(), String>;

/// A block whose code generation is written in Rust.
#[derive(Clone, Debug)]
pub struct FixedBlock {
    info: BlockInfo,
    generate: GenerateFn,
    validate: Option<ValidateFn>,
}

impl FixedBlock {
    /// Creates a fixed block.
    pub fn new(info: BlockInfo, generate: GenerateFn) -> Self {
        Self {
            info,
            generate,
            validate: None,
        }
    }

    /// Adds a validation hook.
    pub fn with_validate(mut self, validate: ValidateFn) -> Self {
        self.validate = Some(validate);
        self
    }

    /// Block metadata.
    pub fn info(&self) -> &BlockInfo {
        &self.info
    }

    /// Runs the validation hook, if any.
    pub fn validate(&self, block: &BlockInstance, graph: &Graph) -> Result<(), String> {
        self.validate.map_or(Ok(()), |f| f(block, graph))
    }

    /// Generates code for one instance.
    pub fn generate(&self, env: &BlockEnv<'_>, ctx: &mut CodegenContext) -> Result<(), GenerateError> {
        (self.generate)(env, ctx)
    }
}

/// All built-in fixed blocks, in listing order.
pub fn fixed_blocks() -> Vec<FixedBlock> {
    vec![adc(), dac(), pot(), mixer(), delay()]
}

const CHANNELS: [(Channel, &str); 2] = [(Channel::Left, "left"), (Channel::Right, "right")];

// --- io.adc ---

fn adc() -> FixedBlock {
    FixedBlock::new(
        BlockInfo::new(
            "io.adc",
            "ADC Input",
            BlockCategory::Io,
            "Reads the left and right analog inputs",
        )
        .output(PortDescriptor::audio("left", "Left"))
        .output(PortDescriptor::audio("right", "Right"))
        .param(ParamDescriptor::gain("gain", "Input Gain", 1.0)),
        generate_adc,
    )
}

fn generate_adc(env: &BlockEnv<'_>, ctx: &mut CodegenContext) -> Result<(), GenerateError> {
    for (channel, port) in CHANNELS {
        if !ctx.is_output_connected(env.id, port) {
            continue;
        }
        let reg = ctx.allocate_register(env.id, port)?;
        let gain = ctx.fixed_operand(Section::Input, env.param("gain"), FixedFormat::S1_14);
        ctx.instruction(Section::Input, "rdax", &[channel.adc(), gain.as_str()])?;
        ctx.instruction(Section::Input, "wrax", &[reg.name().as_str(), "0.0"])?;
    }
    Ok(())
}

// --- io.dac ---

fn dac() -> FixedBlock {
    FixedBlock::new(
        BlockInfo::new(
            "io.dac",
            "DAC Output",
            BlockCategory::Io,
            "Writes the left and right analog outputs",
        )
        .input(PortDescriptor::audio("left", "Left"))
        .input(PortDescriptor::audio("right", "Right"))
        .param(ParamDescriptor::gain("gain", "Output Gain", 1.0)),
        generate_dac,
    )
    .with_validate(validate_dac)
}

fn validate_dac(block: &BlockInstance, graph: &Graph) -> Result<(), String> {
    let any = CHANNELS
        .iter()
        .any(|(_, port)| graph.is_input_connected(&block.id, port));
    if any {
        Ok(())
    } else {
        Err("DAC output has no connected input".to_string())
    }
}

fn generate_dac(env: &BlockEnv<'_>, ctx: &mut CodegenContext) -> Result<(), GenerateError> {
    for (channel, port) in CHANNELS {
        match ctx.input_register(env.id, port)? {
            Some(reg) => {
                let gain = ctx.fixed_operand(Section::Output, env.param("gain"), FixedFormat::S1_14);
                ctx.instruction(Section::Output, "rdax", &[reg.name().as_str(), gain.as_str()])?;
            }
            None => ctx.instruction(Section::Output, "clr", &[] as &[&str])?,
        }
        ctx.instruction(Section::Output, "wrax", &[channel.dac(), "0.0"])?;
    }
    Ok(())
}

// --- io.pot ---

fn pot() -> FixedBlock {
    FixedBlock::new(
        BlockInfo::new(
            "io.pot",
            "Potentiometer",
            BlockCategory::Io,
            "Reads one of the three control pots",
        )
        .output(PortDescriptor::control("value", "Value"))
        .param(ParamDescriptor::select("pot", "Pot", 0, &["POT0", "POT1", "POT2"])),
        generate_pot,
    )
}

fn generate_pot(env: &BlockEnv<'_>, ctx: &mut CodegenContext) -> Result<(), GenerateError> {
    if !ctx.is_output_connected(env.id, "value") {
        return Ok(());
    }
    let index = env.param("pot").round().max(0.0) as usize;
    let source = pot_register(index).unwrap_or("POT0");
    let reg = ctx.allocate_register(env.id, "value")?;
    ctx.instruction(Section::Input, "rdax", &[source, "1.0"])?;
    ctx.instruction(Section::Input, "wrax", &[reg.name().as_str(), "0.0"])?;
    Ok(())
}

// --- mix.mixer ---

const MIXER_INPUTS: [(&str, &str); 4] = [
    ("in1", "gain1"),
    ("in2", "gain2"),
    ("in3", "gain3"),
    ("in4", "gain4"),
];

fn mixer() -> FixedBlock {
    let mut info = BlockInfo::new(
        "mix.mixer",
        "Mixer",
        BlockCategory::Mix,
        "Sums up to four inputs with individual gains",
    );
    for (i, (port, gain)) in MIXER_INPUTS.iter().enumerate() {
        info = info
            .input(PortDescriptor::audio(port, &format!("Input {}", i + 1)))
            .param(ParamDescriptor::gain(gain, &format!("Gain {}", i + 1), 0.5));
    }
    FixedBlock::new(info.output(PortDescriptor::audio("out", "Out")), generate_mixer)
}

fn generate_mixer(env: &BlockEnv<'_>, ctx: &mut CodegenContext) -> Result<(), GenerateError> {
    if !ctx.is_output_connected(env.id, "out") {
        return Ok(());
    }
    let mut any = false;
    for (port, gain) in MIXER_INPUTS {
        let Some(reg) = ctx.input_register(env.id, port)? else {
            continue;
        };
        let gain = ctx.fixed_operand(Section::Main, env.param(gain), FixedFormat::S1_14);
        ctx.instruction(Section::Main, "rdax", &[reg.name().as_str(), gain.as_str()])?;
        any = true;
    }
    if !any {
        ctx.instruction(Section::Main, "clr", &[] as &[&str])?;
    }
    let out = ctx.allocate_register(env.id, "out")?;
    ctx.instruction(Section::Main, "wrax", &[out.name().as_str(), "0.0"])?;
    Ok(())
}

// --- memory.delay ---

fn delay() -> FixedBlock {
    FixedBlock::new(
        BlockInfo::new(
            "memory.delay",
            "Delay",
            BlockCategory::Memory,
            "Fixed delay line in sample memory; may close feedback loops",
        )
        .input(PortDescriptor::audio("in", "In"))
        .output(PortDescriptor::audio("out", "Out"))
        .param(
            ParamDescriptor::new("length", "Length", 8192.0, 1.0, 32767.0)
                .with_step(1.0)
                .with_display(DisplayTransform::Milliseconds),
        )
        .param(ParamDescriptor::new("level", "Level", 1.0, -2.0, 1.99))
        .memory_bearing(),
        generate_delay,
    )
}

fn generate_delay(env: &BlockEnv<'_>, ctx: &mut CodegenContext) -> Result<(), GenerateError> {
    let length = env.param("length").round().max(1.0) as usize;
    let line = ctx.allocate_memory(env.id, "line", length)?;

    if ctx.is_output_connected(env.id, "out") {
        let level = ctx.fixed_operand(Section::Main, env.param("level"), FixedFormat::S1_9);
        let out = ctx.allocate_register(env.id, "out")?;
        ctx.instruction(Section::Main, "rda", &[line.end().as_str(), level.as_str()])?;
        ctx.instruction(Section::Main, "wrax", &[out.name().as_str(), "0.0"])?;
    }

    if let Some(input) = ctx.input_register(env.id, "in")? {
        ctx.instruction(Section::Output, "rdax", &[input.name().as_str(), "1.0"])?;
        ctx.instruction(Section::Output, "wra", &[line.start().as_str(), "0.0"])?;
    }
    Ok(())
}
