use std::borrow::Cow;

use crate::mesh::Vertex;
use crate::primitive::VertexInput;

use super::{ShaderError, ShaderInterface};

/// WGSL source of one shader program plus the metadata needed to build pipelines.
///
/// Vertex and fragment stages live in the same module. Built-in programs use
/// borrowed (`'static`) text; caller-registered programs may own theirs.
///
/// `vertex_inputs` lists the vertex buffers the pipeline reads, slot by slot.
/// It defaults to the interleaved [`Vertex`] stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    pub name: Cow<'static, str>,
    pub description: Cow<'static, str>,
    pub wgsl: Cow<'static, str>,
    pub vertex_entry: Cow<'static, str>,
    pub fragment_entry: Cow<'static, str>,
    pub vertex_inputs: Cow<'static, [VertexInput]>,
}

impl ShaderSource {
    /// Entry point names used by every built-in program.
    pub const DEFAULT_VERTEX_ENTRY: &'static str = "vs_main";
    pub const DEFAULT_FRAGMENT_ENTRY: &'static str = "fs_main";

    /// Static program with the default `vs_main` / `fs_main` entry points.
    pub const fn from_static(
        name: &'static str,
        description: &'static str,
        wgsl: &'static str,
    ) -> Self {
        Self {
            name: Cow::Borrowed(name),
            description: Cow::Borrowed(description),
            wgsl: Cow::Borrowed(wgsl),
            vertex_entry: Cow::Borrowed(Self::DEFAULT_VERTEX_ENTRY),
            fragment_entry: Cow::Borrowed(Self::DEFAULT_FRAGMENT_ENTRY),
            vertex_inputs: Cow::Borrowed(Vertex::INPUTS),
        }
    }

    /// Owned program with the default entry points.
    pub fn new(name: impl Into<String>, wgsl: impl Into<String>) -> Self {
        Self {
            name: Cow::Owned(name.into()),
            description: Cow::Borrowed(""),
            wgsl: Cow::Owned(wgsl.into()),
            vertex_entry: Cow::Borrowed(Self::DEFAULT_VERTEX_ENTRY),
            fragment_entry: Cow::Borrowed(Self::DEFAULT_FRAGMENT_ENTRY),
            vertex_inputs: Cow::Borrowed(Vertex::INPUTS),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Cow::Owned(description.into());
        self
    }

    pub fn with_entry_points(
        mut self,
        vertex: impl Into<String>,
        fragment: impl Into<String>,
    ) -> Self {
        self.vertex_entry = Cow::Owned(vertex.into());
        self.fragment_entry = Cow::Owned(fragment.into());
        self
    }

    pub fn with_vertex_inputs(mut self, inputs: impl Into<Cow<'static, [VertexInput]>>) -> Self {
        self.vertex_inputs = inputs.into();
        self
    }

    /// Checks the program on the CPU before it reaches the GPU.
    ///
    /// Parses and validates the WGSL with naga, checks that both entry
    /// points exist for the right stage and that `vertex_inputs` feed every
    /// vertex location exactly once. wgpu treats invalid modules as device
    /// errors, so this runs before `create_shader_module`.
    pub fn validate(&self) -> Result<ShaderInterface, ShaderError> {
        if self.name.trim().is_empty() {
            return Err(ShaderError::EmptyName);
        }

        let module = naga::front::wgsl::parse_str(&self.wgsl).map_err(|e| ShaderError::Parse {
            name: self.name.to_string(),
            message: e.emit_to_string(&self.wgsl),
        })?;

        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::default(),
        );
        let info = validator
            .validate(&module)
            .map_err(|e| ShaderError::Invalid {
                name: self.name.to_string(),
                message: e.as_inner().to_string(),
            })?;

        let vertex =
            self.require_entry(&module, &self.vertex_entry, naga::ShaderStage::Vertex, "vertex")?;
        let fragment = self.require_entry(
            &module,
            &self.fragment_entry,
            naga::ShaderStage::Fragment,
            "fragment",
        )?;

        let interface = ShaderInterface::reflect(&module, &info, vertex, fragment);
        self.check_inputs(&interface)?;
        Ok(interface)
    }

    /// Index of `entry` among the module's entry points.
    fn require_entry(
        &self,
        module: &naga::Module,
        entry: &str,
        stage: naga::ShaderStage,
        stage_name: &'static str,
    ) -> Result<usize, ShaderError> {
        module
            .entry_points
            .iter()
            .position(|ep| ep.name == entry && ep.stage == stage)
            .ok_or_else(|| ShaderError::MissingEntryPoint {
                name: self.name.to_string(),
                entry: entry.to_string(),
                stage: stage_name,
            })
    }

    fn check_inputs(&self, interface: &ShaderInterface) -> Result<(), ShaderError> {
        let fail = |message: String| ShaderError::Interface {
            name: self.name.to_string(),
            message,
        };

        let mut provided: Vec<u32> = self
            .vertex_inputs
            .iter()
            .flat_map(|input| input.attributes.iter().map(|a| a.shader_location))
            .collect();
        provided.sort_unstable();
        if let Some(w) = provided.windows(2).find(|w| w[0] == w[1]) {
            return Err(fail(format!("vertex inputs provide @location({}) twice", w[0])));
        }

        for &location in &interface.vertex_locations {
            if provided.binary_search(&location).is_err() {
                return Err(fail(format!(
                    "vertex entry `{}` reads @location({location}), which no vertex input provides",
                    self.vertex_entry
                )));
            }
        }
        Ok(())
    }
}
