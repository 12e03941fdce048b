//! Ties concrete resources to the pipelines' declared layouts. Render bind
//! groups are cached by logical name and rebuilt wholesale whenever the
//! resource generation changes; partial patching is unsupported because most
//! roles are interdependent (the depth pair must match, the media group must
//! track the live input texture). The compute bind group is rebuilt every
//! dispatch because the depth roles swap each frame.

use std::collections::HashMap;

use crate::types::InputKind;

use super::pipeline::PipelineLayouts;
use super::resources::ResourceSet;

pub(crate) const GROUP_PROCEDURAL: &str = "procedural";
pub(crate) const GROUP_IMAGE: &str = "image";
pub(crate) const GROUP_VIDEO: &str = "video";
pub(crate) const GROUP_BLIT: &str = "blit";

/// Selects the texture feeding the input binding. Falls back to the image
/// texture until the first video frame arrives.
pub(crate) fn input_texture(resources: &ResourceSet, kind: InputKind) -> &wgpu::Texture {
    match kind {
        InputKind::Video => resources
            .video_texture
            .as_ref()
            .unwrap_or(&resources.image_texture),
        InputKind::Image => &resources.image_texture,
    }
}

#[derive(Default)]
pub(crate) struct BindingCache {
    generation: Option<u64>,
    input: Option<InputKind>,
    groups: HashMap<&'static str, wgpu::BindGroup>,
}

impl BindingCache {
    /// Recomputes every cached group when the resource generation or the
    /// selected input source changed since the last refresh. Runs
    /// synchronously at the top of each frame, before any group is used, so
    /// a group referencing a destroyed resource can never reach a pass.
    pub(crate) fn refresh(
        &mut self,
        device: &wgpu::Device,
        layouts: &PipelineLayouts,
        resources: &ResourceSet,
        input: InputKind,
    ) {
        if self.generation == Some(resources.generation()) && self.input == Some(input) {
            return;
        }
        self.groups.clear();

        let input_view = input_texture(resources, input)
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.groups.insert(
            GROUP_PROCEDURAL,
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("procedural bind group"),
                layout: &layouts.procedural.bind_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: resources.procedural_uniforms.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&resources.filtering_sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(&input_view),
                    },
                ],
            }),
        );

        let image_view = resources
            .image_texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.groups.insert(
            GROUP_IMAGE,
            self.media_group(device, layouts, resources, "image bind group", &image_view),
        );
        if let Some(video) = &resources.video_texture {
            let video_view = video.create_view(&wgpu::TextureViewDescriptor::default());
            self.groups.insert(
                GROUP_VIDEO,
                self.media_group(device, layouts, resources, "video bind group", &video_view),
            );
        }

        let write_view = resources
            .write_texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.groups.insert(
            GROUP_BLIT,
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("blit bind group"),
                layout: &layouts.blit.bind_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::Sampler(&resources.filtering_sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&write_view),
                    },
                ],
            }),
        );

        self.generation = Some(resources.generation());
        self.input = Some(input);
    }

    fn media_group(
        &self,
        device: &wgpu::Device,
        layouts: &PipelineLayouts,
        resources: &ResourceSet,
        label: &str,
        view: &wgpu::TextureView,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &layouts.media.bind_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::Sampler(&resources.filtering_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: resources.media_uniforms.as_entire_binding(),
                },
            ],
        })
    }

    pub(crate) fn get(&self, name: &str) -> Option<&wgpu::BindGroup> {
        self.groups.get(name)
    }
}

/// Builds the concrete bind group for the shared 13-slot compute layout.
/// Depth read/write views must be taken fresh each dispatch because the
/// roles swap every compute frame.
pub(crate) fn compute_bind_group(
    device: &wgpu::Device,
    layouts: &PipelineLayouts,
    resources: &ResourceSet,
    input_view: &wgpu::TextureView,
) -> wgpu::BindGroup {
    let output_view = resources
        .write_texture
        .create_view(&wgpu::TextureViewDescriptor::default());
    let depth_read_view = resources
        .depth_read
        .create_view(&wgpu::TextureViewDescriptor::default());
    let depth_write_view = resources
        .depth_write
        .create_view(&wgpu::TextureViewDescriptor::default());
    let data_a_view = resources
        .data_a
        .create_view(&wgpu::TextureViewDescriptor::default());
    let data_b_view = resources
        .data_b
        .create_view(&wgpu::TextureViewDescriptor::default());
    let data_c_view = resources
        .data_c
        .create_view(&wgpu::TextureViewDescriptor::default());

    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("effect bind group"),
        layout: &layouts.compute_bind_layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Sampler(&resources.filtering_sampler),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(input_view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::TextureView(&output_view),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: resources.compute_uniforms.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 4,
                resource: wgpu::BindingResource::TextureView(&depth_read_view),
            },
            wgpu::BindGroupEntry {
                binding: 5,
                resource: wgpu::BindingResource::Sampler(&resources.non_filtering_sampler),
            },
            wgpu::BindGroupEntry {
                binding: 6,
                resource: wgpu::BindingResource::TextureView(&depth_write_view),
            },
            wgpu::BindGroupEntry {
                binding: 7,
                resource: wgpu::BindingResource::TextureView(&data_a_view),
            },
            wgpu::BindGroupEntry {
                binding: 8,
                resource: wgpu::BindingResource::TextureView(&data_b_view),
            },
            wgpu::BindGroupEntry {
                binding: 9,
                resource: wgpu::BindingResource::TextureView(&data_c_view),
            },
            wgpu::BindGroupEntry {
                binding: 10,
                resource: resources.extra_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 11,
                resource: wgpu::BindingResource::Sampler(&resources.comparison_sampler),
            },
            wgpu::BindGroupEntry {
                binding: 12,
                resource: resources.plasma_buffer.as_entire_binding(),
            },
        ],
    })
}
