//! Compiles the three fixed render pipelines and one compute pipeline per
//! catalog entry. Every compute pipeline shares a single fixed 13-slot bind
//! group layout, so any entry can be swapped in without relinking bind
//! groups; in exchange every effect program declares only the bindings it
//! touches out of the shared set.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fs;

use anyhow::{anyhow, Context, Result};
use tracing::{debug, warn};
use wgpu::naga;

use catalog::{EffectCategory, EffectDescriptor};

const PROCEDURAL_WGSL: &str = include_str!("../shaders/procedural.wgsl");
const MEDIA_WGSL: &str = include_str!("../shaders/media.wgsl");
const BLIT_WGSL: &str = include_str!("../shaders/blit.wgsl");

/// A fixed render pipeline and the explicit layout its bind groups use.
pub(crate) struct RenderBundle {
    pub pipeline: wgpu::RenderPipeline,
    pub bind_layout: wgpu::BindGroupLayout,
}

pub(crate) struct PipelineLayouts {
    pub compute_bind_layout: wgpu::BindGroupLayout,
    compute_pipeline_layout: wgpu::PipelineLayout,
    pub procedural: RenderBundle,
    pub media: RenderBundle,
    pub blit: RenderBundle,
}

impl PipelineLayouts {
    pub(crate) fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat) -> Self {
        let compute_bind_layout = create_compute_bind_layout(device);
        let compute_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("effect pipeline layout"),
                bind_group_layouts: &[&compute_bind_layout],
                push_constant_ranges: &[],
            });

        let procedural = create_render_bundle(
            device,
            surface_format,
            "procedural",
            PROCEDURAL_WGSL,
            &[
                uniform_entry(0),
                sampler_entry(1, wgpu::SamplerBindingType::Filtering),
                texture_entry(2),
            ],
            wgpu::PrimitiveTopology::TriangleList,
        );
        let media = create_render_bundle(
            device,
            surface_format,
            "media",
            MEDIA_WGSL,
            &[
                sampler_entry(0, wgpu::SamplerBindingType::Filtering),
                texture_entry(1),
                uniform_entry(2),
            ],
            wgpu::PrimitiveTopology::TriangleStrip,
        );
        let blit = create_render_bundle(
            device,
            surface_format,
            "blit",
            BLIT_WGSL,
            &[
                sampler_entry(0, wgpu::SamplerBindingType::Filtering),
                texture_entry(1),
            ],
            wgpu::PrimitiveTopology::TriangleStrip,
        );

        Self {
            compute_bind_layout,
            compute_pipeline_layout,
            procedural,
            media,
            blit,
        }
    }
}

/// Compiled compute pipelines keyed by effect id. Entries whose source fails
/// to compile are simply absent; the catalog still lists them.
#[derive(Default)]
pub(crate) struct PipelineRegistry {
    pipelines: HashMap<String, wgpu::ComputePipeline>,
}

impl PipelineRegistry {
    /// Compiles every compute entry in the catalog. Partial success is the
    /// normal case: authors ship broken effect sources, and a bad entry must
    /// never take the engine down.
    pub(crate) fn compile(
        device: &wgpu::Device,
        layouts: &PipelineLayouts,
        entries: &[EffectDescriptor],
    ) -> Self {
        let mut pipelines = HashMap::new();
        for entry in entries {
            if entry.category != EffectCategory::Compute {
                continue;
            }
            match compile_effect(device, layouts, entry) {
                Ok(pipeline) => {
                    debug!(effect = %entry.id, "compiled effect pipeline");
                    pipelines.insert(entry.id.clone(), pipeline);
                }
                Err(err) => {
                    warn!(effect = %entry.id, error = %err, "skipping effect");
                }
            }
        }
        Self { pipelines }
    }

    pub(crate) fn get(&self, id: &str) -> Option<&wgpu::ComputePipeline> {
        self.pipelines.get(id)
    }

    pub(crate) fn len(&self) -> usize {
        self.pipelines.len()
    }
}

fn compile_effect(
    device: &wgpu::Device,
    layouts: &PipelineLayouts,
    entry: &EffectDescriptor,
) -> Result<wgpu::ComputePipeline> {
    let source = fs::read_to_string(&entry.source)
        .with_context(|| format!("failed to read effect source at {}", entry.source.display()))?;
    validate_wgsl(&source)?;

    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(&format!("effect module '{}'", entry.id)),
        source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(&source)),
    });

    // Layout incompatibilities surface as validation errors; scope them so a
    // bad entry is omitted instead of hitting the uncaptured-error handler.
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some(&format!("effect pipeline '{}'", entry.id)),
        layout: Some(&layouts.compute_pipeline_layout),
        module: &module,
        entry_point: Some("main"),
        compilation_options: wgpu::PipelineCompilationOptions::default(),
        cache: None,
    });
    if let Some(error) = pollster::block_on(device.pop_error_scope()) {
        return Err(anyhow!("pipeline validation failed: {error}"));
    }
    Ok(pipeline)
}

/// Front-end validation through naga before the module ever reaches the
/// device, so malformed sources produce a readable error instead of a device
/// loss.
fn validate_wgsl(source: &str) -> Result<()> {
    let module = naga::front::wgsl::parse_str(source)
        .map_err(|err| anyhow!("WGSL parse error: {}", err.message()))?;
    if !module.entry_points.iter().any(|ep| ep.name == "main") {
        anyhow::bail!("effect source has no 'main' entry point");
    }
    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|err| anyhow!("WGSL validation error: {err}"))?;
    Ok(())
}

fn create_render_bundle(
    device: &wgpu::Device,
    surface_format: wgpu::TextureFormat,
    name: &str,
    source: &str,
    entries: &[wgpu::BindGroupLayoutEntry],
    topology: wgpu::PrimitiveTopology,
) -> RenderBundle {
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(&format!("{name} shader")),
        source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(source)),
    });
    let bind_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(&format!("{name} bind layout")),
        entries,
    });
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(&format!("{name} pipeline layout")),
        bind_group_layouts: &[&bind_layout],
        push_constant_ranges: &[],
    });
    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(&format!("{name} pipeline")),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &module,
            entry_point: Some("vs_main"),
            buffers: &[],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: &module,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: surface_format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview: None,
        cache: None,
    });
    RenderBundle {
        pipeline,
        bind_layout,
    }
}

fn create_compute_bind_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("shared effect bind layout"),
        entries: &[
            sampler_compute(0, wgpu::SamplerBindingType::Filtering),
            texture_compute(1),
            storage_texture_compute(2, wgpu::TextureFormat::Rgba32Float),
            wgpu::BindGroupLayoutEntry {
                binding: 3,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            // Depth field is r32float; reads pair with the non-filtering
            // sampler or go through textureLoad.
            wgpu::BindGroupLayoutEntry {
                binding: 4,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: false },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            sampler_compute(5, wgpu::SamplerBindingType::NonFiltering),
            storage_texture_compute(6, wgpu::TextureFormat::R32Float),
            storage_texture_compute(7, wgpu::TextureFormat::Rgba32Float),
            storage_texture_compute(8, wgpu::TextureFormat::Rgba32Float),
            texture_compute(9),
            wgpu::BindGroupLayoutEntry {
                binding: 10,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: false },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            sampler_compute(11, wgpu::SamplerBindingType::Comparison),
            wgpu::BindGroupLayoutEntry {
                binding: 12,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: true },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
    })
}

fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32, kind: wgpu::SamplerBindingType) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(kind),
        count: None,
    }
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_compute(binding: u32, kind: wgpu::SamplerBindingType) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Sampler(kind),
        count: None,
    }
}

fn texture_compute(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn storage_texture_compute(
    binding: u32,
    format: wgpu::TextureFormat,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::StorageTexture {
            access: wgpu::StorageTextureAccess::WriteOnly,
            format,
            view_dimension: wgpu::TextureViewDimension::D2,
        },
        count: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_well_formed_compute_source() {
        let source = r#"
            @group(0) @binding(2)
            var output_tex: texture_storage_2d<rgba32float, write>;

            @compute @workgroup_size(8, 8)
            fn main(@builtin(global_invocation_id) gid: vec3<u32>) {
                textureStore(output_tex, vec2<i32>(gid.xy), vec4<f32>(0.0));
            }
        "#;
        assert!(validate_wgsl(source).is_ok());
    }

    #[test]
    fn rejects_parse_errors() {
        assert!(validate_wgsl("fn main( {").is_err());
    }

    #[test]
    fn rejects_missing_entry_point() {
        let source = r#"
            @compute @workgroup_size(8, 8)
            fn not_main() {}
        "#;
        assert!(validate_wgsl(source).is_err());
    }

    #[test]
    fn builtin_shaders_parse() {
        for source in [PROCEDURAL_WGSL, MEDIA_WGSL, BLIT_WGSL] {
            naga::front::wgsl::parse_str(source).unwrap();
        }
    }
}
