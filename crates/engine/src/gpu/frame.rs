//! Frame driver: owns the GPU context, the catalog-backed pipeline registry,
//! the persistent resources, and both CPU simulations, and turns a
//! `FrameRequest` into exactly one submitted command buffer.
//!
//! Types:
//! - `EffectEngine` is the public entry point hosts embed.
//!
//! Per-frame flow for a compute effect: tick simulations, pack the uniform
//! block, dispatch over the canvas, copy the history texture, then blit the
//! feedback texture to the surface. Built-in modes skip straight to their
//! fixed render pipeline.

use std::path::PathBuf;
use std::thread;
use std::time::Instant;

use anyhow::{Context as AnyhowContext, Result};
use catalog::{EffectDescriptor, EffectLibrary, EffectTraits, UniformLayout};
use crossbeam_channel::{Receiver, Sender};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::{debug, info, warn};
use winit::dpi::PhysicalSize;

use crate::gpu::bindings::{
    self, BindingCache, GROUP_BLIT, GROUP_IMAGE, GROUP_PROCEDURAL, GROUP_VIDEO,
};
use crate::gpu::context::GpuContext;
use crate::gpu::pipeline::{PipelineLayouts, PipelineRegistry};
use crate::gpu::resources::ResourceSet;
use crate::gpu::uniforms::{ComputeUniforms, MediaUniforms, ProceduralUniforms};
use crate::sim::plasma::PlasmaField;
use crate::sim::ripple::RippleField;
use crate::types::{
    dispatch_extent, DrawMode, FrameRequest, InputImage, InputKind, VideoFrame, MAX_PLASMA_BALLS,
    MAX_RIPPLES,
};

/// Nominal simulation step; plasma integration is frame-rate independent
/// enough at display cadence that a fixed step keeps replays deterministic.
const SIM_STEP: f32 = 1.0 / 60.0;

/// Real-time effect engine over a single presentable surface.
pub struct EffectEngine {
    context: GpuContext,
    layouts: PipelineLayouts,
    registry: PipelineRegistry,
    resources: ResourceSet,
    bindings: BindingCache,
    library: EffectLibrary,
    ripples: RippleField,
    plasma: PlasmaField,
    input: InputKind,
    loader: ImageLoader,
    started: Instant,
}

impl EffectEngine {
    /// Acquires the GPU, compiles every catalog compute entry, and allocates
    /// the persistent resource set at the initial canvas size.
    pub fn new<T>(target: &T, size: PhysicalSize<u32>, library: EffectLibrary) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let context = GpuContext::new(target, size)?;
        let layouts = PipelineLayouts::new(&context.device, context.surface_format);
        let registry = PipelineRegistry::compile(&context.device, &layouts, library.entries());
        info!(
            compiled = registry.len(),
            listed = library.len(),
            "effect pipelines ready"
        );
        let resources = ResourceSet::new(&context.device, &context.queue, size);

        Ok(Self {
            context,
            layouts,
            registry,
            resources,
            bindings: BindingCache::default(),
            library,
            ripples: RippleField::new(MAX_RIPPLES),
            plasma: PlasmaField::new(MAX_PLASMA_BALLS, rand::random()),
            input: InputKind::Image,
            loader: ImageLoader::spawn(),
            started: Instant::now(),
        })
    }

    /// Catalog entries in list order, including ones whose source failed to
    /// compile.
    pub fn available_effects(&self) -> &[EffectDescriptor] {
        self.library.entries()
    }

    /// Seconds since engine start; the time base every uniform block uses.
    pub fn elapsed(&self) -> f32 {
        self.started.elapsed().as_secs_f32()
    }

    /// Registers an interaction point in normalized canvas coordinates.
    /// Oldest points are dropped once the field is full.
    pub fn add_interaction_point(&mut self, x: f32, y: f32) {
        self.ripples.add_point(x, y, self.started.elapsed().as_secs_f32());
    }

    /// Launches a plasma ball. Silently ignored while the field is at
    /// capacity.
    pub fn fire_particle(&mut self, x: f32, y: f32, vx: f32, vy: f32) {
        self.plasma.fire(x, y, vx, vy);
    }

    /// Which persistent texture feeds the effect input binding.
    pub fn set_input_source(&mut self, kind: InputKind) {
        self.input = kind;
    }

    /// Uploads an already-decoded still frame synchronously.
    pub fn set_input_frame(&mut self, image: &InputImage) {
        self.resources
            .set_image(&self.context.device, &self.context.queue, image);
    }

    /// Decodes `path` on the loader thread; the result is applied at the
    /// start of a later `render` call. A newer request supersedes any decode
    /// still in flight.
    pub fn request_input_frame(&mut self, path: PathBuf) {
        self.loader.request(path);
    }

    /// Copies a host-decoded video frame into the video texture.
    pub fn set_video_frame(&mut self, frame: &VideoFrame) -> Result<()> {
        let expected = frame.width as usize * frame.height as usize * 4;
        anyhow::ensure!(
            frame.data.len() == expected,
            "video frame is {} bytes, expected {} for {}x{}",
            frame.data.len(),
            expected,
            frame.width,
            frame.height
        );
        self.resources.set_video_frame(
            &self.context.device,
            &self.context.queue,
            &frame.data,
            frame.width,
            frame.height,
        );
        Ok(())
    }

    /// Seeds both halves of the depth double-buffer with a scalar field.
    pub fn set_depth_field(&mut self, samples: &[f32], width: u32, height: u32) -> Result<()> {
        let expected = width as usize * height as usize;
        anyhow::ensure!(
            samples.len() == expected,
            "depth field is {} samples, expected {} for {}x{}",
            samples.len(),
            expected,
            width,
            height
        );
        self.resources
            .set_depth_field(&self.context.device, &self.context.queue, samples, width, height);
        Ok(())
    }

    /// Reconfigures the surface and recreates every canvas-sized texture.
    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        self.context.resize(size);
        self.resources.resize(&self.context.device, size);
    }

    /// Renders one frame. `Err` only surfaces swapchain conditions the host
    /// must react to (resize on `Outdated`/`Lost`, back off on `OutOfMemory`).
    pub fn render(&mut self, request: &FrameRequest) -> std::result::Result<(), wgpu::SurfaceError> {
        let now = self.started.elapsed().as_secs_f32();
        self.apply_decoded_frames();
        self.bindings
            .refresh(&self.context.device, &self.layouts, &self.resources, self.input);

        let resolved = self
            .library
            .get(&request.effect_id)
            .map(|entry| (DrawMode::from_category(entry.category), entry.traits()));
        if resolved.is_none() {
            debug!(effect = %request.effect_id, "unknown effect id, presenting input");
        }

        // Media passes display the ripple array too, so interaction points
        // must keep aging while a passthrough entry is selected.
        if let Some((DrawMode::Media(_), traits)) = resolved {
            self.ripples.tick(now, traits.ripple_lifetime);
        }

        let frame = self.context.surface.get_current_texture()?;
        let surface_view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("frame encoder"),
                });

        let mut computed = false;
        if let Some((DrawMode::Compute, traits)) = resolved {
            computed = self.encode_compute(&mut encoder, request, traits, now);
            if !computed {
                debug!(effect = %request.effect_id, "no compiled pipeline, presenting input");
            }
        }

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("present pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &surface_view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            match resolved {
                Some((DrawMode::Compute, _)) if computed => {
                    pass.set_pipeline(&self.layouts.blit.pipeline);
                    if let Some(group) = self.bindings.get(GROUP_BLIT) {
                        pass.set_bind_group(0, group, &[]);
                        pass.draw(0..4, 0..1);
                    }
                }
                Some((DrawMode::Procedural, _)) => {
                    let block =
                        ProceduralUniforms::new(now, request.zoom, request.pan_x, request.pan_y);
                    self.context.queue.write_buffer(
                        &self.resources.procedural_uniforms,
                        0,
                        bytemuck::bytes_of(&block),
                    );
                    pass.set_pipeline(&self.layouts.procedural.pipeline);
                    if let Some(group) = self.bindings.get(GROUP_PROCEDURAL) {
                        pass.set_bind_group(0, group, &[]);
                        pass.draw(0..6, 0..1);
                    }
                }
                Some((DrawMode::Media(kind), traits)) => {
                    self.draw_media(&mut pass, kind, traits, now);
                }
                // Unknown id and compute entries without a usable pipeline
                // fall back to presenting the current input untouched.
                _ => {
                    let input = self.input;
                    self.draw_media(&mut pass, input, EffectTraits::default(), now);
                }
            }
        }

        self.context.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }

    /// Tears the engine down, destroying GPU textures eagerly instead of
    /// waiting for the device to be collected.
    pub fn destroy(mut self) {
        self.resources.release();
    }

    /// Advances both simulations, packs the compute uniform block, and
    /// records the dispatch plus the history-texture copy. Returns false when
    /// the effect has no compiled pipeline; nothing is recorded in that case.
    fn encode_compute(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        request: &FrameRequest,
        traits: EffectTraits,
        now: f32,
    ) -> bool {
        let Some(pipeline) = self.registry.get(&request.effect_id) else {
            return false;
        };
        let queue = &self.context.queue;
        let width = self.context.size.width;
        let height = self.context.size.height;

        if traits.plasma_driven {
            self.plasma.tick(SIM_STEP);
            queue.write_buffer(
                &self.resources.plasma_buffer,
                0,
                bytemuck::cast_slice(&self.plasma.packed()),
            );
        }
        self.ripples.tick(now, traits.ripple_lifetime);

        // Pointer-driven effects track the live pointer when present; every
        // other effect follows the caller's hint point.
        let pointer_live = traits.pointer_driven && request.pointer[0] >= 0.0;
        let target = if pointer_live {
            request.pointer
        } else {
            request.hint_point
        };
        let mode_scalar = match traits.uniform_layout {
            UniformLayout::DepthFeedback => request.params.depth_threshold,
            UniformLayout::Standard if traits.pointer_driven => {
                if request.pointer_down {
                    1.0
                } else {
                    0.0
                }
            }
            UniformLayout::Standard => 0.0,
        };

        let mut block = ComputeUniforms::new();
        block.set_frame(now, self.ripples.len() as u32, width, height);
        block.set_target(now, target[0], target[1], mode_scalar);
        block.set_params(request.params.generic);
        block.set_ripples(&self.ripples.packed_slots());
        if traits.uniform_layout == UniformLayout::DepthFeedback {
            block.set_lighting(request.params.lighting);
        }
        queue.write_buffer(
            &self.resources.compute_uniforms,
            0,
            bytemuck::bytes_of(&block),
        );

        let input_view = bindings::input_texture(&self.resources, self.input)
            .create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = bindings::compute_bind_group(
            &self.context.device,
            &self.layouts,
            &self.resources,
            &input_view,
        );
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("effect pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(dispatch_extent(width), dispatch_extent(height), 1);
        }

        // History copy: stateful effects read last frame's data A through the
        // sampled data C binding.
        encoder.copy_texture_to_texture(
            self.resources.data_a.as_image_copy(),
            self.resources.data_c.as_image_copy(),
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );

        // Roles swap unconditionally after every dispatch, matching what the
        // effect just wrote.
        self.resources.swap_depth();
        true
    }

    fn draw_media(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        kind: InputKind,
        traits: EffectTraits,
        now: f32,
    ) {
        let source = bindings::input_texture(&self.resources, kind);
        let ripple_mode = if traits.pointer_driven { 1.0 } else { 0.0 };

        let mut block = MediaUniforms::new();
        block.set_sizes(
            self.context.size.width,
            self.context.size.height,
            source.width(),
            source.height(),
        );
        block.set_state(now, self.ripples.len() as u32, ripple_mode);
        block.set_ripples(&self.ripples.packed_slots());
        self.context.queue.write_buffer(
            &self.resources.media_uniforms,
            0,
            bytemuck::bytes_of(&block),
        );

        let group_name = match kind {
            InputKind::Video if self.resources.video_texture.is_some() => GROUP_VIDEO,
            _ => GROUP_IMAGE,
        };
        pass.set_pipeline(&self.layouts.media.pipeline);
        if let Some(group) = self.bindings.get(group_name) {
            pass.set_bind_group(0, group, &[]);
            pass.draw(0..4, 0..1);
        }
    }

    /// Drains the loader channel, applying only results for the newest
    /// request. Stale decodes are discarded without touching the textures.
    fn apply_decoded_frames(&mut self) {
        while let Ok((generation, result)) = self.loader.results.try_recv() {
            if generation != self.loader.generation {
                debug!(generation, "discarding superseded image decode");
                continue;
            }
            match result {
                Ok(image) => {
                    info!(width = image.width, height = image.height, "input frame ready");
                    self.resources
                        .set_image(&self.context.device, &self.context.queue, &image);
                }
                Err(err) => warn!(error = %err, "image decode failed"),
            }
        }
    }
}

/// Background still-image decoder. Requests carry a generation so the driver
/// can tell a fresh result from one a newer request has superseded.
struct ImageLoader {
    requests: Sender<(u64, PathBuf)>,
    results: Receiver<(u64, Result<InputImage>)>,
    generation: u64,
}

impl ImageLoader {
    fn spawn() -> Self {
        let (request_tx, request_rx) = crossbeam_channel::unbounded::<(u64, PathBuf)>();
        let (result_tx, result_rx) = crossbeam_channel::unbounded();
        thread::Builder::new()
            .name("image-loader".into())
            .spawn(move || {
                while let Ok((generation, path)) = request_rx.recv() {
                    let decoded = InputImage::open(&path)
                        .with_context(|| format!("loading {}", path.display()));
                    if result_tx.send((generation, decoded)).is_err() {
                        break;
                    }
                }
            })
            .ok();
        Self {
            requests: request_tx,
            results: result_rx,
            generation: 0,
        }
    }

    fn request(&mut self, path: PathBuf) {
        self.generation += 1;
        if self.requests.send((self.generation, path)).is_err() {
            warn!("image loader thread is gone, decode request dropped");
        }
    }
}
