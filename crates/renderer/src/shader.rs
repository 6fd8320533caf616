//! Shader program construction.
//!
//! A program is a vertex module plus a fragment module. Building one happens
//! in two steps:
//!
//! 1. [`ShaderProgramBuilder::compile`] runs entirely on the CPU: each WGSL
//!    source is parsed and validated by naga, then the two stages are
//!    "linked" by checking the inter-stage interface and the resource
//!    bindings they share. Every diagnostic is kept, including warnings on a
//!    successful build.
//! 2. [`CompiledProgram::create`] creates the GPU modules, collects any
//!    compilation messages reported by the device, and builds the bind group
//!    and pipeline layouts from the reflected resources.
//!
//! Uniforms are addressed by the name of their WGSL global.
//! [`ShaderProgram::uniform_location`] returns `None` for names the program
//! does not declare, so callers can upload a fixed uniform set to any variant.

use std::{
    borrow::Cow,
    collections::{BTreeMap, HashMap},
    fmt,
    io,
    num::NonZeroU64,
    path::Path,
};

use corelib::features::ShaderVariant;
use naga::{
    AddressSpace, Binding, Handle, ImageClass, ImageDimension, Module, ScalarKind, Type, TypeInner,
};
use thiserror::Error;

use crate::error::{RenderError, RenderResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StageKind {
    Vertex,
    Fragment,
}

impl StageKind {
    fn naga(self) -> naga::ShaderStage {
        match self {
            StageKind::Vertex => naga::ShaderStage::Vertex,
            StageKind::Fragment => naga::ShaderStage::Fragment,
        }
    }

    fn wgpu(self) -> wgpu::ShaderStages {
        match self {
            StageKind::Vertex => wgpu::ShaderStages::VERTEX,
            StageKind::Fragment => wgpu::ShaderStages::FRAGMENT,
        }
    }

    fn file_suffix(self) -> &'static str {
        match self {
            StageKind::Vertex => "vert.wgsl",
            StageKind::Fragment => "frag.wgsl",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageKind::Vertex => f.write_str("vertex"),
            StageKind::Fragment => f.write_str("fragment"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("{stage} shader failed to compile:\n{log}")]
    Compile { stage: StageKind, log: String },
    #[error("{stage} shader has no @{stage} entry point")]
    MissingEntryPoint { stage: StageKind },
    #[error("program failed to link:\n{log}")]
    Link { log: String },
    #[error("{stage} shader resource `{name}` is not supported: {reason}")]
    UnsupportedResource {
        stage: StageKind,
        name: String,
        reason: &'static str,
    },
}

impl ShaderError {
    /// Full diagnostic text for the failure.
    pub fn log(&self) -> String {
        match self {
            ShaderError::Compile { log, .. } | ShaderError::Link { log } => log.clone(),
            other => other.to_string(),
        }
    }
}

/// What to do when the program fails to compile or link.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ShaderFailurePolicy {
    /// Abort setup with the diagnostic.
    #[default]
    FailFast,
    /// Log the diagnostic and keep running without drawing the mesh.
    WarnAndContinue,
}

/// Binding point of a named shader resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UniformLocation {
    pub group: u32,
    pub binding: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceKind {
    UniformBuffer { size: u64 },
    Texture,
    Sampler,
}

/// A resource global declared by one or both stages.
#[derive(Clone, Debug, PartialEq)]
pub struct ResourceSlot {
    pub name: String,
    pub location: UniformLocation,
    pub kind: ResourceKind,
    pub visibility: wgpu::ShaderStages,
}

impl ResourceSlot {
    fn layout_entry(&self) -> wgpu::BindGroupLayoutEntry {
        let ty = match self.kind {
            ResourceKind::UniformBuffer { size } => wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: NonZeroU64::new(size),
            },
            ResourceKind::Texture => wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            ResourceKind::Sampler => {
                wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering)
            }
        };
        wgpu::BindGroupLayoutEntry {
            binding: self.location.binding,
            visibility: self.visibility,
            ty,
            count: None,
        }
    }
}

/// Vertex and fragment WGSL text for one program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderSources {
    pub label: String,
    pub vertex: String,
    pub fragment: String,
}

impl ShaderSources {
    /// Sources compiled into the binary.
    pub fn builtin(variant: ShaderVariant) -> Self {
        Self {
            label: variant.file_stem().to_owned(),
            vertex: builtin_source(variant, StageKind::Vertex).to_owned(),
            fragment: builtin_source(variant, StageKind::Fragment).to_owned(),
        }
    }

    /// Read `<stem>.vert.wgsl` / `<stem>.frag.wgsl` from `dir`.
    ///
    /// A missing file is not an error: the built-in source for that stage
    /// is used instead and a warning is logged.
    pub fn load(dir: Option<&Path>, variant: ShaderVariant) -> RenderResult<Self> {
        let Some(dir) = dir else {
            return Ok(Self::builtin(variant));
        };
        let read = |stage: StageKind| -> RenderResult<String> {
            let path = dir.join(format!("{}.{}", variant.file_stem(), stage.file_suffix()));
            match std::fs::read_to_string(&path) {
                Ok(text) => {
                    log::info!("Loaded {stage} shader from {}", path.display());
                    Ok(text)
                }
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    log::warn!(
                        "{stage} shader {} not found; using built-in `{}`",
                        path.display(),
                        variant.file_stem()
                    );
                    Ok(builtin_source(variant, stage).to_owned())
                }
                Err(source) => Err(RenderError::ShaderFile {
                    stage,
                    path: path.display().to_string(),
                    source,
                }),
            }
        };
        Ok(Self {
            label: variant.file_stem().to_owned(),
            vertex: read(StageKind::Vertex)?,
            fragment: read(StageKind::Fragment)?,
        })
    }
}

fn builtin_source(variant: ShaderVariant, stage: StageKind) -> &'static str {
    match (variant, stage) {
        (ShaderVariant::Flat, StageKind::Vertex) => include_str!("shaders/flat.vert.wgsl"),
        (ShaderVariant::Flat, StageKind::Fragment) => include_str!("shaders/flat.frag.wgsl"),
        (ShaderVariant::Textured, StageKind::Vertex) => include_str!("shaders/textured.vert.wgsl"),
        (ShaderVariant::Textured, StageKind::Fragment) => {
            include_str!("shaders/textured.frag.wgsl")
        }
        (ShaderVariant::NormalMapped, StageKind::Vertex) => {
            include_str!("shaders/normal_mapped.vert.wgsl")
        }
        (ShaderVariant::NormalMapped, StageKind::Fragment) => {
            include_str!("shaders/normal_mapped.frag.wgsl")
        }
    }
}

/// A parsed and validated stage.
struct StageModule {
    kind: StageKind,
    source: String,
    module: Module,
    entry_index: usize,
    entry_point: String,
}

/// A location-bound value crossing a stage boundary.
struct InterfaceVar {
    location: u32,
    name: String,
    ty: TypeInner,
}

pub struct ShaderProgramBuilder {
    sources: ShaderSources,
}

impl ShaderProgramBuilder {
    pub fn new(sources: ShaderSources) -> Self {
        Self { sources }
    }

    pub fn from_wgsl(label: &str, vertex: &str, fragment: &str) -> Self {
        Self::new(ShaderSources {
            label: label.to_owned(),
            vertex: vertex.to_owned(),
            fragment: fragment.to_owned(),
        })
    }

    /// Compile both stages and link them. Warnings are logged and kept on
    /// the result; failures carry the full diagnostic log.
    pub fn compile(self) -> Result<CompiledProgram, ShaderError> {
        let ShaderSources {
            label,
            vertex,
            fragment,
        } = self.sources;
        let vertex = compile_stage(StageKind::Vertex, vertex)?;
        let fragment = compile_stage(StageKind::Fragment, fragment)?;

        let warnings = link_interface(&vertex, &fragment)?;
        let resources = link_resources(&vertex, &fragment)?;
        let vertex_inputs = entry_inputs(&vertex)
            .into_iter()
            .map(|var| var.location)
            .collect();

        for warning in &warnings {
            log::warn!("shader `{label}`: {warning}");
        }
        log::info!(
            "Compiled shader program `{label}` ({} resources, {} warnings)",
            resources.len(),
            warnings.len()
        );

        Ok(CompiledProgram {
            label,
            vertex,
            fragment,
            resources,
            vertex_inputs,
            diagnostics: warnings,
        })
    }
}

fn compile_stage(kind: StageKind, source: String) -> Result<StageModule, ShaderError> {
    let module = naga::front::wgsl::parse_str(&source).map_err(|e| ShaderError::Compile {
        stage: kind,
        log: e.emit_to_string(&source),
    })?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::default(),
    );
    validator
        .validate(&module)
        .map_err(|e| ShaderError::Compile {
            stage: kind,
            log: e.emit_to_string(&source),
        })?;

    let entry_index = module
        .entry_points
        .iter()
        .position(|ep| ep.stage == kind.naga())
        .ok_or(ShaderError::MissingEntryPoint { stage: kind })?;
    let entry_point = module.entry_points[entry_index].name.clone();

    Ok(StageModule {
        kind,
        source,
        module,
        entry_index,
        entry_point,
    })
}

fn entry(stage: &StageModule) -> &naga::EntryPoint {
    &stage.module.entry_points[stage.entry_index]
}

fn entry_inputs(stage: &StageModule) -> Vec<InterfaceVar> {
    let mut vars = Vec::new();
    for arg in &entry(stage).function.arguments {
        collect_locations(
            &stage.module,
            arg.name.as_deref(),
            arg.ty,
            arg.binding.as_ref(),
            &mut vars,
        );
    }
    vars
}

fn entry_outputs(stage: &StageModule) -> Vec<InterfaceVar> {
    let mut vars = Vec::new();
    if let Some(result) = &entry(stage).function.result {
        collect_locations(
            &stage.module,
            None,
            result.ty,
            result.binding.as_ref(),
            &mut vars,
        );
    }
    vars
}

fn collect_locations(
    module: &Module,
    name: Option<&str>,
    ty: Handle<Type>,
    binding: Option<&Binding>,
    out: &mut Vec<InterfaceVar>,
) {
    match binding {
        Some(Binding::Location { location, .. }) => out.push(InterfaceVar {
            location: *location,
            name: name.unwrap_or("<unnamed>").to_owned(),
            ty: module.types[ty].inner.clone(),
        }),
        Some(Binding::BuiltIn(_)) => {}
        None => {
            if let TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    collect_locations(
                        module,
                        member.name.as_deref(),
                        member.ty,
                        member.binding.as_ref(),
                        out,
                    );
                }
            }
        }
    }
}

/// Match fragment inputs against vertex outputs. Returns warnings on success.
fn link_interface(
    vertex: &StageModule,
    fragment: &StageModule,
) -> Result<Vec<String>, ShaderError> {
    let outputs: BTreeMap<u32, InterfaceVar> = entry_outputs(vertex)
        .into_iter()
        .map(|var| (var.location, var))
        .collect();
    let inputs = entry_inputs(fragment);

    let mut errors = Vec::new();
    for input in &inputs {
        match outputs.get(&input.location) {
            None => errors.push(format!(
                "error: fragment input `{}` at location {} has no matching vertex output",
                input.name, input.location
            )),
            Some(output) if output.ty != input.ty => errors.push(format!(
                "error: location {}: vertex output `{}` is {:?} but fragment input `{}` is {:?}",
                input.location, output.name, output.ty, input.name, input.ty
            )),
            Some(_) => {}
        }
    }
    if !errors.is_empty() {
        return Err(ShaderError::Link {
            log: errors.join("\n"),
        });
    }

    Ok(outputs
        .values()
        .filter(|out| inputs.iter().all(|input| input.location != out.location))
        .map(|out| {
            format!(
                "warning: vertex output `{}` at location {} is never read by the fragment stage",
                out.name, out.location
            )
        })
        .collect())
}

fn reflect_resources(stage: &StageModule) -> Result<Vec<ResourceSlot>, ShaderError> {
    let module = &stage.module;
    let mut slots = Vec::new();
    for (_, var) in module.global_variables.iter() {
        let Some(binding) = &var.binding else {
            continue;
        };
        let name = var.name.clone().unwrap_or_default();
        let unsupported = |reason| ShaderError::UnsupportedResource {
            stage: stage.kind,
            name: name.clone(),
            reason,
        };
        if name.is_empty() {
            return Err(unsupported("resources must be named"));
        }

        let inner = &module.types[var.ty].inner;
        let kind = match (var.space, inner) {
            (AddressSpace::Uniform, inner) => ResourceKind::UniformBuffer {
                size: u64::from(inner.size(module.to_ctx())),
            },
            (
                AddressSpace::Handle,
                TypeInner::Image {
                    dim: ImageDimension::D2,
                    arrayed: false,
                    class:
                        ImageClass::Sampled {
                            kind: ScalarKind::Float,
                            multi: false,
                        },
                },
            ) => ResourceKind::Texture,
            (AddressSpace::Handle, TypeInner::Sampler { comparison: false }) => {
                ResourceKind::Sampler
            }
            (AddressSpace::Handle, _) => {
                return Err(unsupported("only texture_2d<f32> and sampler handles are supported"));
            }
            _ => return Err(unsupported("only uniform buffers and handles are supported")),
        };

        slots.push(ResourceSlot {
            name,
            location: UniformLocation {
                group: binding.group,
                binding: binding.binding,
            },
            kind,
            visibility: stage.kind.wgpu(),
        });
    }
    Ok(slots)
}

/// Merge the resources of both stages. A name declared by both must agree
/// on binding point and kind, and one binding point cannot carry two names.
fn link_resources(
    vertex: &StageModule,
    fragment: &StageModule,
) -> Result<Vec<ResourceSlot>, ShaderError> {
    let mut by_name: BTreeMap<String, ResourceSlot> = BTreeMap::new();
    let mut errors = Vec::new();

    for slot in reflect_resources(vertex)?
        .into_iter()
        .chain(reflect_resources(fragment)?)
    {
        match by_name.get_mut(&slot.name) {
            None => {
                by_name.insert(slot.name.clone(), slot);
            }
            Some(existing) if existing.location == slot.location && existing.kind == slot.kind => {
                existing.visibility |= slot.visibility;
            }
            Some(existing) => errors.push(format!(
                "error: `{}` is declared as {:?} at {:?} in one stage and {:?} at {:?} in the other",
                slot.name, existing.kind, existing.location, slot.kind, slot.location
            )),
        }
    }

    let mut by_location: HashMap<UniformLocation, &str> = HashMap::new();
    for slot in by_name.values() {
        if let Some(other) = by_location.insert(slot.location, &slot.name) {
            errors.push(format!(
                "error: `{}` and `{}` share group {} binding {}",
                other, slot.name, slot.location.group, slot.location.binding
            ));
        }
    }

    if !errors.is_empty() {
        return Err(ShaderError::Link {
            log: errors.join("\n"),
        });
    }
    let mut slots: Vec<_> = by_name.into_values().collect();
    slots.sort_by_key(|slot| slot.location);
    Ok(slots)
}

/// A linked program that has not been uploaded to a device yet.
pub struct CompiledProgram {
    label: String,
    vertex: StageModule,
    fragment: StageModule,
    resources: Vec<ResourceSlot>,
    vertex_inputs: Vec<u32>,
    diagnostics: Vec<String>,
}

impl CompiledProgram {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Non-fatal diagnostics produced while compiling and linking.
    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }

    pub fn resources(&self) -> &[ResourceSlot] {
        &self.resources
    }

    /// Attribute locations read by the vertex entry point.
    pub fn vertex_inputs(&self) -> &[u32] {
        &self.vertex_inputs
    }

    pub fn uniform_location(&self, name: &str) -> Option<UniformLocation> {
        find_location(&self.resources, name)
    }

    /// Create the GPU modules and layouts.
    pub async fn create(self, device: &wgpu::Device) -> Result<ShaderProgram, ShaderError> {
        let mut diagnostics = self.diagnostics;
        let vertex_module =
            create_module(device, &self.label, &self.vertex, &mut diagnostics).await?;
        let fragment_module =
            create_module(device, &self.label, &self.fragment, &mut diagnostics).await?;

        let group_count = self
            .resources
            .iter()
            .map(|slot| slot.location.group + 1)
            .max()
            .unwrap_or(0);
        let bind_group_layouts: Vec<wgpu::BindGroupLayout> = (0..group_count)
            .map(|group| {
                let entries: Vec<_> = self
                    .resources
                    .iter()
                    .filter(|slot| slot.location.group == group)
                    .map(ResourceSlot::layout_entry)
                    .collect();
                device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some(&format!("{} group {group}", self.label)),
                    entries: &entries,
                })
            })
            .collect();
        let layout_refs: Vec<&wgpu::BindGroupLayout> = bind_group_layouts.iter().collect();
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&self.label),
            bind_group_layouts: &layout_refs,
            push_constant_ranges: &[],
        });

        Ok(ShaderProgram {
            pipeline_layout,
            bind_group_layouts,
            fragment_module,
            vertex_module,
            vertex_entry: self.vertex.entry_point,
            fragment_entry: self.fragment.entry_point,
            resources: self.resources,
            vertex_inputs: self.vertex_inputs,
            diagnostics,
            label: self.label,
        })
    }
}

async fn create_module(
    device: &wgpu::Device,
    label: &str,
    stage: &StageModule,
    diagnostics: &mut Vec<String>,
) -> Result<wgpu::ShaderModule, ShaderError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(&format!("{label} {}", stage.kind)),
        source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(&stage.source)),
    });
    let scope_error = device.pop_error_scope().await;

    let info = module.get_compilation_info().await;
    let mut errors = Vec::new();
    for message in info.messages {
        let line = match message.location {
            Some(loc) => format!("{}:{}: {}", loc.line_number, loc.line_position, message.message),
            None => message.message,
        };
        match message.message_type {
            wgpu::CompilationMessageType::Error => errors.push(format!("error: {line}")),
            wgpu::CompilationMessageType::Warning => {
                log::warn!("shader `{label}` ({}): {line}", stage.kind);
                diagnostics.push(format!("warning: {line}"));
            }
            wgpu::CompilationMessageType::Info => {
                log::info!("shader `{label}` ({}): {line}", stage.kind);
                diagnostics.push(format!("info: {line}"));
            }
        }
    }
    if let Some(err) = scope_error {
        errors.push(format!("error: {err}"));
    }
    if !errors.is_empty() {
        return Err(ShaderError::Compile {
            stage: stage.kind,
            log: errors.join("\n"),
        });
    }
    Ok(module)
}

fn find_location(resources: &[ResourceSlot], name: &str) -> Option<UniformLocation> {
    resources
        .iter()
        .find(|slot| slot.name == name)
        .map(|slot| slot.location)
}

/// Linked GPU program: both stage modules and the layouts derived from them.
pub struct ShaderProgram {
    pipeline_layout: wgpu::PipelineLayout,
    bind_group_layouts: Vec<wgpu::BindGroupLayout>,
    fragment_module: wgpu::ShaderModule,
    vertex_module: wgpu::ShaderModule,
    vertex_entry: String,
    fragment_entry: String,
    resources: Vec<ResourceSlot>,
    vertex_inputs: Vec<u32>,
    diagnostics: Vec<String>,
    label: String,
}

impl ShaderProgram {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Binding point of `name`, or `None` when this program does not declare it.
    pub fn uniform_location(&self, name: &str) -> Option<UniformLocation> {
        find_location(&self.resources, name)
    }

    pub fn resources(&self) -> &[ResourceSlot] {
        &self.resources
    }

    pub fn vertex_inputs(&self) -> &[u32] {
        &self.vertex_inputs
    }

    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }

    pub fn bind_group_layouts(&self) -> &[wgpu::BindGroupLayout] {
        &self.bind_group_layouts
    }

    pub fn pipeline_layout(&self) -> &wgpu::PipelineLayout {
        &self.pipeline_layout
    }

    pub fn vertex_state<'a>(
        &'a self,
        buffers: &'a [wgpu::VertexBufferLayout<'a>],
    ) -> wgpu::VertexState<'a> {
        wgpu::VertexState {
            module: &self.vertex_module,
            entry_point: Some(self.vertex_entry.as_str()),
            buffers,
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }
    }

    pub fn fragment_state<'a>(
        &'a self,
        targets: &'a [Option<wgpu::ColorTargetState>],
    ) -> wgpu::FragmentState<'a> {
        wgpu::FragmentState {
            module: &self.fragment_module,
            entry_point: Some(self.fragment_entry.as_str()),
            targets,
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }
    }
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        log::debug!("Releasing shader program `{}`", self.label);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builtin(variant: ShaderVariant) -> CompiledProgram {
        ShaderProgramBuilder::new(ShaderSources::builtin(variant))
            .compile()
            .expect("built-in program compiles")
    }

    #[test]
    fn builtin_variants_compile_cleanly() {
        for variant in [
            ShaderVariant::Flat,
            ShaderVariant::Textured,
            ShaderVariant::NormalMapped,
        ] {
            let program = builtin(variant);
            assert!(
                program.diagnostics().is_empty(),
                "{variant:?}: {:?}",
                program.diagnostics()
            );
        }
    }

    #[test]
    fn textured_program_resolves_uniforms_by_name() {
        let program = builtin(ShaderVariant::Textured);
        let at = |group, binding| Some(UniformLocation { group, binding });
        assert_eq!(program.uniform_location("MVP"), at(0, 0));
        assert_eq!(program.uniform_location("M"), at(0, 1));
        assert_eq!(program.uniform_location("V"), at(0, 2));
        assert_eq!(program.uniform_location("LightPosition_worldspace"), at(0, 3));
        assert_eq!(program.uniform_location("myTextureSampler"), at(1, 0));
        assert_eq!(program.uniform_location("diffuse"), None);
        assert_eq!(program.vertex_inputs(), &[0, 1, 2]);

        let light = program
            .resources()
            .iter()
            .find(|slot| slot.name == "LightPosition_worldspace")
            .unwrap();
        assert_eq!(light.kind, ResourceKind::UniformBuffer { size: 12 });
        assert_eq!(light.visibility, wgpu::ShaderStages::VERTEX_FRAGMENT);
    }

    #[test]
    fn flat_program_has_only_mvp() {
        let program = builtin(ShaderVariant::Flat);
        assert_eq!(program.resources().len(), 1);
        assert_eq!(
            program.resources()[0].kind,
            ResourceKind::UniformBuffer { size: 64 }
        );
        assert_eq!(program.uniform_location("M"), None);
        assert_eq!(program.vertex_inputs(), &[0]);
    }

    #[test]
    fn normal_mapped_program_reads_tangent_frame() {
        let program = builtin(ShaderVariant::NormalMapped);
        assert_eq!(program.vertex_inputs(), &[0, 1, 2, 3, 4]);
        for name in ["diffuse", "diffuse_sampler", "tangentnm", "tangentnm_sampler"] {
            assert!(program.uniform_location(name).is_some(), "{name}");
        }
    }

    #[test]
    fn invalid_source_reports_compile_log() {
        let err = ShaderProgramBuilder::from_wgsl(
            "broken",
            "@vertex fn vs_main( -> @builtin(position) vec4<f32> {",
            builtin_source(ShaderVariant::Flat, StageKind::Fragment),
        )
        .compile()
        .err()
        .expect("compilation must fail");

        assert!(matches!(
            err,
            ShaderError::Compile {
                stage: StageKind::Vertex,
                ..
            }
        ));
        assert!(!err.log().trim().is_empty());
    }

    #[test]
    fn validation_errors_are_reported() {
        let vertex = "@vertex fn vs_main() -> @builtin(position) vec4<f32> { return 1.0; }";
        let err = ShaderProgramBuilder::from_wgsl(
            "mistyped",
            vertex,
            builtin_source(ShaderVariant::Flat, StageKind::Fragment),
        )
        .compile()
        .err()
        .expect("type error");
        assert!(matches!(err, ShaderError::Compile { .. }));
        assert!(!err.log().is_empty());
    }

    #[test]
    fn stage_without_entry_point_is_rejected() {
        let flat_fragment = builtin_source(ShaderVariant::Flat, StageKind::Fragment);
        let err = ShaderProgramBuilder::from_wgsl("swapped", flat_fragment, flat_fragment)
            .compile()
            .err()
            .expect("no vertex entry point");
        assert!(matches!(
            err,
            ShaderError::MissingEntryPoint {
                stage: StageKind::Vertex
            }
        ));
    }

    #[test]
    fn unmatched_fragment_input_fails_to_link() {
        let fragment = r#"
            @fragment
            fn fs_main(@location(7) shade: vec3<f32>) -> @location(0) vec4<f32> {
                return vec4<f32>(shade, 1.0);
            }
        "#;
        let err = ShaderProgramBuilder::from_wgsl(
            "unlinked",
            builtin_source(ShaderVariant::Flat, StageKind::Vertex),
            fragment,
        )
        .compile()
        .err()
        .expect("link failure");
        match err {
            ShaderError::Link { log } => assert!(log.contains("location 7"), "{log}"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn conflicting_bindings_fail_to_link() {
        let vertex = r#"
            @group(0) @binding(0) var<uniform> MVP: mat4x4<f32>;
            @vertex
            fn vs_main(@location(0) p: vec3<f32>) -> @builtin(position) vec4<f32> {
                return MVP * vec4<f32>(p, 1.0);
            }
        "#;
        let fragment = r#"
            @group(0) @binding(1) var<uniform> MVP: mat4x4<f32>;
            @fragment
            fn fs_main() -> @location(0) vec4<f32> {
                return MVP[0];
            }
        "#;
        let err = ShaderProgramBuilder::from_wgsl("clash", vertex, fragment)
            .compile()
            .err()
            .expect("link failure");
        assert!(matches!(err, ShaderError::Link { .. }));
    }

    #[test]
    fn unread_vertex_output_is_a_warning() {
        let vertex = r#"
            struct Out {
                @builtin(position) clip: vec4<f32>,
                @location(0) extra: vec2<f32>,
            };
            @vertex
            fn vs_main(@location(0) p: vec3<f32>) -> Out {
                var out: Out;
                out.clip = vec4<f32>(p, 1.0);
                out.extra = p.xy;
                return out;
            }
        "#;
        let program = ShaderProgramBuilder::from_wgsl(
            "chatty",
            vertex,
            builtin_source(ShaderVariant::Flat, StageKind::Fragment),
        )
        .compile()
        .expect("links with a warning");
        assert_eq!(program.diagnostics().len(), 1);
        assert!(program.diagnostics()[0].contains("extra"));
    }

    #[test]
    fn storage_buffers_are_unsupported() {
        let vertex = r#"
            @group(0) @binding(0) var<storage, read> data: array<vec4<f32>>;
            @vertex
            fn vs_main(@builtin(vertex_index) i: u32) -> @builtin(position) vec4<f32> {
                return data[i];
            }
        "#;
        let err = ShaderProgramBuilder::from_wgsl(
            "storage",
            vertex,
            builtin_source(ShaderVariant::Flat, StageKind::Fragment),
        )
        .compile()
        .err()
        .expect("unsupported");
        assert!(matches!(err, ShaderError::UnsupportedResource { .. }));
    }

    #[test]
    fn missing_shader_files_fall_back_to_builtin() {
        let dir = std::env::temp_dir().join("meshview-missing-shader-dir");
        let sources = ShaderSources::load(Some(&dir), ShaderVariant::Textured).unwrap();
        assert_eq!(sources, ShaderSources::builtin(ShaderVariant::Textured));
    }
}
