//! Owns every device-side object: samplers, persistent textures, and the
//! uniform/storage buffers. Each texture recreation bumps a generation
//! counter; the binding composer keys its cache on it, so a stale bind group
//! can never survive a resource swap.

use winit::dpi::PhysicalSize;

use crate::types::{InputImage, MAX_PLASMA_BALLS, MAX_RIPPLES, PLASMA_RECORD_FLOATS};

/// Byte size of the compute uniform block (three header vec4s + ripple tail).
const COMPUTE_UNIFORM_BYTES: u64 = 48 + (MAX_RIPPLES as u64) * 16;
/// Byte size of the media uniform block (two header vec4s + ripple tail).
const MEDIA_UNIFORM_BYTES: u64 = 32 + (MAX_RIPPLES as u64) * 16;
/// The extra-data storage buffer is seeded with 256 zeroed floats.
const EXTRA_BUFFER_FLOATS: usize = 256;

pub(crate) struct ResourceSet {
    pub filtering_sampler: wgpu::Sampler,
    pub non_filtering_sampler: wgpu::Sampler,
    pub comparison_sampler: wgpu::Sampler,

    pub image_texture: wgpu::Texture,
    pub video_texture: Option<wgpu::Texture>,
    pub write_texture: wgpu::Texture,
    pub depth_read: wgpu::Texture,
    pub depth_write: wgpu::Texture,
    pub data_a: wgpu::Texture,
    pub data_b: wgpu::Texture,
    pub data_c: wgpu::Texture,

    pub compute_uniforms: wgpu::Buffer,
    pub media_uniforms: wgpu::Buffer,
    pub procedural_uniforms: wgpu::Buffer,
    pub extra_buffer: wgpu::Buffer,
    pub plasma_buffer: wgpu::Buffer,

    generation: u64,
}

impl ResourceSet {
    pub(crate) fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        size: PhysicalSize<u32>,
    ) -> Self {
        let filtering_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("filtering sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let non_filtering_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("non-filtering sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        let comparison_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("comparison sampler"),
            compare: Some(wgpu::CompareFunction::Less),
            ..Default::default()
        });

        // Placeholder input until the first frame arrives; bind groups need
        // a real texture from the start.
        let image_texture = create_input_texture(device, 1, 1);
        write_rgba32f(queue, &image_texture, &[0.0; 4], 1, 1);

        let (depth_read, depth_write) = create_depth_pair(device, 1, 1);
        write_r32f(queue, &depth_read, &[0.0], 1, 1);
        write_r32f(queue, &depth_write, &[0.0], 1, 1);

        let (write_texture, data_a, data_b, data_c) = create_canvas_textures(device, size);

        let compute_uniforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("compute uniform buffer"),
            size: COMPUTE_UNIFORM_BYTES,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let media_uniforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("media uniform buffer"),
            size: MEDIA_UNIFORM_BYTES,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let procedural_uniforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("procedural uniform buffer"),
            size: 16,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let extra_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("extra data buffer"),
            size: (EXTRA_BUFFER_FLOATS * 4) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        queue.write_buffer(
            &extra_buffer,
            0,
            bytemuck::cast_slice(&[0.0f32; EXTRA_BUFFER_FLOATS]),
        );
        let plasma_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("plasma storage buffer"),
            size: (MAX_PLASMA_BALLS * PLASMA_RECORD_FLOATS * 4) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            filtering_sampler,
            non_filtering_sampler,
            comparison_sampler,
            image_texture,
            video_texture: None,
            write_texture,
            depth_read,
            depth_write,
            data_a,
            data_b,
            data_c,
            compute_uniforms,
            media_uniforms,
            procedural_uniforms,
            extra_buffer,
            plasma_buffer,
            generation: 0,
        }
    }

    /// Monotonic identity of the current texture set. Bumped whenever any
    /// texture the bind groups reference is replaced.
    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Uploads a decoded still frame at its native resolution, recreating the
    /// input texture when dimensions change.
    pub(crate) fn set_image(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &InputImage,
    ) {
        if self.image_texture.width() != image.width || self.image_texture.height() != image.height
        {
            self.image_texture.destroy();
            self.image_texture = create_input_texture(device, image.width, image.height);
            self.generation += 1;
        }
        write_rgba32f(
            queue,
            &self.image_texture,
            &image.pixels,
            image.width,
            image.height,
        );
    }

    /// Copies a video frame into the persistently-sized video texture,
    /// recreating it only when the native resolution changes.
    pub(crate) fn set_video_frame(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        data: &[u8],
        width: u32,
        height: u32,
    ) {
        let stale = self
            .video_texture
            .as_ref()
            .is_some_and(|texture| texture.width() != width || texture.height() != height);
        if stale {
            if let Some(texture) = self.video_texture.take() {
                texture.destroy();
            }
        }
        if self.video_texture.is_none() {
            self.generation += 1;
        }
        let texture: &wgpu::Texture = self.video_texture.get_or_insert_with(|| {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some("video texture"),
                size: extent(width, height),
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            })
        });
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            extent(width, height),
        );
    }

    /// Uploads a scalar field into both halves of the depth double-buffer so
    /// stateful depth effects start from a consistent seed. The pair is
    /// always recreated together when dimensions change.
    pub(crate) fn set_depth_field(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        samples: &[f32],
        width: u32,
        height: u32,
    ) {
        if self.depth_read.width() != width || self.depth_read.height() != height {
            self.depth_read.destroy();
            self.depth_write.destroy();
            let (read, write) = create_depth_pair(device, width, height);
            self.depth_read = read;
            self.depth_write = write;
            self.generation += 1;
        }
        write_r32f(queue, &self.depth_read, samples, width, height);
        write_r32f(queue, &self.depth_write, samples, width, height);
    }

    /// Swapped, never copied, after every compute dispatch.
    pub(crate) fn swap_depth(&mut self) {
        std::mem::swap(&mut self.depth_read, &mut self.depth_write);
    }

    /// Recreates every canvas-sized intermediate texture. Pipelines are
    /// layout-stable and unaffected.
    pub(crate) fn resize(&mut self, device: &wgpu::Device, size: PhysicalSize<u32>) {
        for texture in [&self.write_texture, &self.data_a, &self.data_b, &self.data_c] {
            texture.destroy();
        }
        let (write_texture, data_a, data_b, data_c) = create_canvas_textures(device, size);
        self.write_texture = write_texture;
        self.data_a = data_a;
        self.data_b = data_b;
        self.data_c = data_c;
        self.generation += 1;
    }

    /// Releases every texture eagerly. Buffers and samplers go with the
    /// owning struct.
    pub(crate) fn release(&mut self) {
        self.image_texture.destroy();
        if let Some(texture) = self.video_texture.take() {
            texture.destroy();
        }
        self.write_texture.destroy();
        self.depth_read.destroy();
        self.depth_write.destroy();
        self.data_a.destroy();
        self.data_b.destroy();
        self.data_c.destroy();
    }
}

fn extent(width: u32, height: u32) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: width.max(1),
        height: height.max(1),
        depth_or_array_layers: 1,
    }
}

fn create_input_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::Texture {
    // Float32 keeps HDR/linear precision through the effect chain.
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some("input image texture"),
        size: extent(width, height),
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba32Float,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    })
}

fn create_depth_pair(
    device: &wgpu::Device,
    width: u32,
    height: u32,
) -> (wgpu::Texture, wgpu::Texture) {
    let descriptor = wgpu::TextureDescriptor {
        label: Some("depth field texture"),
        size: extent(width, height),
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::R32Float,
        usage: wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_DST
            | wgpu::TextureUsages::STORAGE_BINDING,
        view_formats: &[],
    };
    (
        device.create_texture(&descriptor),
        device.create_texture(&descriptor),
    )
}

fn create_canvas_textures(
    device: &wgpu::Device,
    size: PhysicalSize<u32>,
) -> (wgpu::Texture, wgpu::Texture, wgpu::Texture, wgpu::Texture) {
    let storage = wgpu::TextureDescriptor {
        label: Some("canvas storage texture"),
        size: extent(size.width, size.height),
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba32Float,
        usage: wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_DST
            | wgpu::TextureUsages::STORAGE_BINDING
            | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    };
    let write_texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("feedback write texture"),
        ..storage.clone()
    });
    let data_a = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("data texture A"),
        ..storage.clone()
    });
    let data_b = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("data texture B"),
        ..storage.clone()
    });
    // Data C is the read-only history copy of A; it is never a storage
    // target.
    let data_c = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("data texture C"),
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        ..storage
    });
    (write_texture, data_a, data_b, data_c)
}

fn write_rgba32f(
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    pixels: &[f32],
    width: u32,
    height: u32,
) {
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        bytemuck::cast_slice(pixels),
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(width * 16),
            rows_per_image: Some(height),
        },
        extent(width, height),
    );
}

fn write_r32f(
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    samples: &[f32],
    width: u32,
    height: u32,
) {
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        bytemuck::cast_slice(samples),
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(width * 4),
            rows_per_image: Some(height),
        },
        extent(width, height),
    );
}
