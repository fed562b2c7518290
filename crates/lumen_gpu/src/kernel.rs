//! Compute pipeline for the bounce kernel.

use crate::GpuError;

/// WGSL source of the bounce kernel.
pub const TRACE_SHADER: &str = include_str!("shaders/trace.wgsl");

/// Threads per workgroup, matching `@workgroup_size` in the shader.
pub const WORKGROUP_SIZE: u32 = 64;

const ENTRY_POINT: &str = "trace_bounce";

/// Compiled bounce kernel and its bind group layout.
pub struct TraceKernel {
    pub pipeline: wgpu::ComputePipeline,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

impl TraceKernel {
    /// Compile `source` and build the pipeline.
    ///
    /// Compiler and validation messages are gathered into the error's log.
    pub fn build(device: &wgpu::Device, source: &str) -> Result<Self, GpuError> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("trace kernel"),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("trace bind group layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                storage_entry(1, true),
                storage_entry(2, true),
                storage_entry(3, false),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("trace pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("trace pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: ENTRY_POINT,
            compilation_options: Default::default(),
            cache: None,
        });

        let info = pollster::block_on(shader.get_compilation_info());
        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            let mut log: Vec<String> = info
                .messages
                .iter()
                .map(|message| format!("{:?}: {}", message.message_type, message.message))
                .collect();
            if log.is_empty() {
                log.push(error.to_string());
            }
            return Err(GpuError::KernelBuild {
                log: log.join("\n"),
            });
        }

        for message in &info.messages {
            log::warn!("Kernel compiler {:?}: {}", message.message_type, message.message);
        }

        Ok(Self {
            pipeline,
            bind_group_layout,
        })
    }
}
