//! SPIR-V shader modules and graphics pipelines
//!
//! Both pipelines share fixed state: triangle lists, dynamic viewport and
//! scissor, depth testing, no culling. They differ in vertex input (mesh
//! vertices or none for the light billboards) and blending.

use crate::assets::Vertex;
use crate::config::ShaderPaths;
use crate::render::systems::PipelineHandles;
use crate::render::vulkan::{VulkanError, VulkanResult};
use ash::{vk, Device};
use std::ffi::CStr;
use std::fs::File;
use std::path::Path;

const ENTRY_POINT: &CStr = c"main";

/// Shader module wrapper with RAII cleanup
pub struct ShaderModule {
    device: Device,
    module: vk::ShaderModule,
}

impl ShaderModule {
    /// Load a shader from a SPIR-V file
    pub fn from_file<P: AsRef<Path>>(device: Device, path: P) -> VulkanResult<Self> {
        let path = path.as_ref();
        let shader_load = |source| VulkanError::ShaderLoad {
            path: path.display().to_string(),
            source,
        };
        let mut file = File::open(path).map_err(shader_load)?;
        let code = ash::util::read_spv(&mut file).map_err(shader_load)?;

        let create_info = vk::ShaderModuleCreateInfo::builder().code(&code);
        let module = unsafe { device.create_shader_module(&create_info, None).map_err(VulkanError::Api)? };

        Ok(Self { device, module })
    }

    /// Get shader module handle
    pub fn handle(&self) -> vk::ShaderModule {
        self.module
    }

    fn stage_info(&self, stage: vk::ShaderStageFlags) -> vk::PipelineShaderStageCreateInfo {
        vk::PipelineShaderStageCreateInfo::builder()
            .stage(stage)
            .module(self.module)
            .name(ENTRY_POINT)
            .build()
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_shader_module(self.module, None);
        }
    }
}

/// Vertex input consumed by a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexInput {
    /// Interleaved [`Vertex`] buffer at binding 0
    Mesh,
    /// Vertices generated in the shader from `gl_VertexIndex`
    None,
}

/// Colour blending for the single attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    /// Overwrite
    Opaque,
    /// Standard `src_alpha, 1 - src_alpha`
    Alpha,
}

/// Everything that varies between pipelines
pub struct PipelineConfig<'a> {
    /// Shader pair
    pub shaders: &'a ShaderPaths,
    /// Descriptor set layouts in set order
    pub set_layouts: &'a [vk::DescriptorSetLayout],
    /// Push constant ranges
    pub push_constant_ranges: &'a [vk::PushConstantRange],
    /// Vertex input
    pub vertex_input: VertexInput,
    /// Colour blending
    pub blend: BlendMode,
}

impl<'a> PipelineConfig<'a> {
    /// Opaque mesh pipeline
    pub fn opaque(shaders: &'a ShaderPaths, set_layouts: &'a [vk::DescriptorSetLayout]) -> Self {
        Self {
            shaders,
            set_layouts,
            push_constant_ranges: &[],
            vertex_input: VertexInput::Mesh,
            blend: BlendMode::Opaque,
        }
    }

    /// Alpha-blended billboard pipeline with no vertex buffers
    pub fn billboard(
        shaders: &'a ShaderPaths,
        set_layouts: &'a [vk::DescriptorSetLayout],
        push_constant_ranges: &'a [vk::PushConstantRange],
    ) -> Self {
        Self {
            shaders,
            set_layouts,
            push_constant_ranges,
            vertex_input: VertexInput::None,
            blend: BlendMode::Alpha,
        }
    }
}

/// Binding description for [`Vertex`]
pub fn vertex_binding_descriptions() -> [vk::VertexInputBindingDescription; 1] {
    [vk::VertexInputBindingDescription {
        binding: 0,
        stride: std::mem::size_of::<Vertex>() as u32,
        input_rate: vk::VertexInputRate::VERTEX,
    }]
}

/// Attribute descriptions for [`Vertex`]: position, colour, normal, uv at locations 0..=3
pub fn vertex_attribute_descriptions() -> [vk::VertexInputAttributeDescription; 4] {
    let attribute = |location: u32, format: vk::Format, offset: usize| vk::VertexInputAttributeDescription {
        binding: 0,
        location,
        format,
        offset: offset as u32,
    };
    [
        attribute(0, vk::Format::R32G32B32_SFLOAT, std::mem::offset_of!(Vertex, position)),
        attribute(1, vk::Format::R32G32B32_SFLOAT, std::mem::offset_of!(Vertex, color)),
        attribute(2, vk::Format::R32G32B32_SFLOAT, std::mem::offset_of!(Vertex, normal)),
        attribute(3, vk::Format::R32G32_SFLOAT, std::mem::offset_of!(Vertex, uv)),
    ]
}

fn color_blend_attachment(blend: BlendMode) -> vk::PipelineColorBlendAttachmentState {
    let builder = vk::PipelineColorBlendAttachmentState::builder().color_write_mask(vk::ColorComponentFlags::RGBA);
    match blend {
        BlendMode::Opaque => builder.blend_enable(false).build(),
        BlendMode::Alpha => builder
            .blend_enable(true)
            .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
            .dst_color_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
            .color_blend_op(vk::BlendOp::ADD)
            .src_alpha_blend_factor(vk::BlendFactor::ONE)
            .dst_alpha_blend_factor(vk::BlendFactor::ZERO)
            .alpha_blend_op(vk::BlendOp::ADD)
            .build(),
    }
}

/// Graphics pipeline wrapper with RAII cleanup
pub struct GraphicsPipeline {
    device: Device,
    pipeline: vk::Pipeline,
    layout: vk::PipelineLayout,
}

impl GraphicsPipeline {
    /// Build a pipeline for subpass 0 of `render_pass`
    pub fn new(device: Device, render_pass: vk::RenderPass, config: &PipelineConfig) -> VulkanResult<Self> {
        let vertex_shader = ShaderModule::from_file(device.clone(), &config.shaders.vertex)?;
        let fragment_shader = ShaderModule::from_file(device.clone(), &config.shaders.fragment)?;
        let shader_stages = [
            vertex_shader.stage_info(vk::ShaderStageFlags::VERTEX),
            fragment_shader.stage_info(vk::ShaderStageFlags::FRAGMENT),
        ];

        let bindings = vertex_binding_descriptions();
        let attributes = vertex_attribute_descriptions();
        let vertex_input_info = match config.vertex_input {
            VertexInput::Mesh => vk::PipelineVertexInputStateCreateInfo::builder()
                .vertex_binding_descriptions(&bindings)
                .vertex_attribute_descriptions(&attributes),
            VertexInput::None => vk::PipelineVertexInputStateCreateInfo::builder(),
        };

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::builder()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
            .primitive_restart_enable(false);

        // Counts only; the rectangles are dynamic state
        let viewport_state = vk::PipelineViewportStateCreateInfo::builder()
            .viewport_count(1)
            .scissor_count(1);

        let rasterizer = vk::PipelineRasterizationStateCreateInfo::builder()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(vk::CullModeFlags::NONE)
            .front_face(vk::FrontFace::CLOCKWISE)
            .depth_bias_enable(false);

        let multisampling = vk::PipelineMultisampleStateCreateInfo::builder()
            .sample_shading_enable(false)
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::builder()
            .depth_test_enable(true)
            .depth_write_enable(true)
            .depth_compare_op(vk::CompareOp::LESS)
            .depth_bounds_test_enable(false)
            .stencil_test_enable(false);

        let color_blend_attachments = [color_blend_attachment(config.blend)];
        let color_blending = vk::PipelineColorBlendStateCreateInfo::builder()
            .logic_op_enable(false)
            .attachments(&color_blend_attachments);

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state = vk::PipelineDynamicStateCreateInfo::builder().dynamic_states(&dynamic_states);

        let layout_info = vk::PipelineLayoutCreateInfo::builder()
            .set_layouts(config.set_layouts)
            .push_constant_ranges(config.push_constant_ranges);
        let layout = unsafe { device.create_pipeline_layout(&layout_info, None).map_err(VulkanError::Api)? };

        let pipeline_info = vk::GraphicsPipelineCreateInfo::builder()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input_info)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterizer)
            .multisample_state(&multisampling)
            .depth_stencil_state(&depth_stencil)
            .color_blend_state(&color_blending)
            .dynamic_state(&dynamic_state)
            .layout(layout)
            .render_pass(render_pass)
            .subpass(0);

        let pipelines = unsafe {
            device.create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info.build()], None)
        };
        let pipeline = match pipelines {
            Ok(pipelines) => pipelines[0],
            Err((_, err)) => {
                unsafe { device.destroy_pipeline_layout(layout, None) };
                return Err(VulkanError::Api(err));
            }
        };

        Ok(Self {
            device,
            pipeline,
            layout,
        })
    }

    /// Get pipeline handle
    pub fn handle(&self) -> vk::Pipeline {
        self.pipeline
    }

    /// Get layout handle
    pub fn layout(&self) -> vk::PipelineLayout {
        self.layout
    }

    /// Handles for a render system
    pub fn handles(&self) -> PipelineHandles {
        PipelineHandles {
            pipeline: self.pipeline,
            layout: self.layout,
        }
    }
}

impl Drop for GraphicsPipeline {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_pipeline(self.pipeline, None);
            self.device.destroy_pipeline_layout(self.layout, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_attributes_follow_struct_layout() {
        let attributes = vertex_attribute_descriptions();
        let offsets: Vec<u32> = attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 12, 24, 36]);
        assert_eq!(attributes[3].format, vk::Format::R32G32_SFLOAT);
        assert_eq!(vertex_binding_descriptions()[0].stride, 44);
    }

    #[test]
    fn test_billboards_blend_and_opaque_does_not() {
        assert_eq!(color_blend_attachment(BlendMode::Opaque).blend_enable, vk::FALSE);
        let alpha = color_blend_attachment(BlendMode::Alpha);
        assert_eq!(alpha.blend_enable, vk::TRUE);
        assert_eq!(alpha.src_color_blend_factor, vk::BlendFactor::SRC_ALPHA);
        assert_eq!(alpha.dst_color_blend_factor, vk::BlendFactor::ONE_MINUS_SRC_ALPHA);
    }
}
