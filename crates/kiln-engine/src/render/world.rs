use bytemuck::{Pod, Zeroable};

use crate::coords::Vec2i;

const IDENTITY: [[f32; 4]; 4] = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// World-transform uniform bound by draws inside a viewport.
///
/// `projection` maps target pixels (top-left origin, +Y down) to NDC after
/// shifting by the viewport offset. Column-major, as WGSL expects.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct WorldMatrix {
    pub projection: [[f32; 4]; 4],
    pub transform: [[f32; 4]; 4],
}

impl WorldMatrix {
    pub fn screen(size: Vec2i) -> Self {
        Self::with_offset(size, Vec2i::zero())
    }

    pub fn with_offset(size: Vec2i, offset: Vec2i) -> Self {
        let w = size.x.max(1) as f32;
        let h = size.y.max(1) as f32;

        Self {
            projection: [
                [2.0 / w, 0.0, 0.0, 0.0],
                [0.0, -2.0 / h, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [2.0 * offset.x as f32 / w - 1.0, 1.0 - 2.0 * offset.y as f32 / h, 0.0, 1.0],
            ],
            transform: IDENTITY,
        }
    }

    /// Maps a pixel position to NDC.
    pub fn project(&self, p: [f32; 2]) -> [f32; 2] {
        let m = &self.projection;
        [
            m[0][0] * p[0] + m[1][0] * p[1] + m[3][0],
            m[0][1] * p[0] + m[1][1] * p[1] + m[3][1],
        ]
    }
}

impl Default for WorldMatrix {
    fn default() -> Self {
        Self {
            projection: IDENTITY,
            transform: IDENTITY,
        }
    }
}

/// Render-side world binding: a projection plus the pixel offset it applies.
///
/// Viewports own one as their agent. Fills bound to it are shifted by
/// `offset` before clipping, and on the GPU projected through `uniform`.
#[derive(Debug, Default)]
pub struct WorldBinding {
    matrix: WorldMatrix,
    offset: Vec2i,
    uniform: Option<wgpu::Buffer>,
}

impl WorldBinding {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn matrix(&self) -> &WorldMatrix {
        &self.matrix
    }

    #[inline]
    pub fn offset(&self) -> Vec2i {
        self.offset
    }

    /// `None` until uploaded on a GPU context.
    pub fn uniform(&self) -> Option<&wgpu::Buffer> {
        self.uniform.as_ref()
    }

    pub(crate) fn set(&mut self, target_size: Vec2i, offset: Vec2i) {
        self.matrix = WorldMatrix::with_offset(target_size, offset);
        self.offset = offset;
    }

    pub(crate) fn uniform_slot(&mut self) -> &mut Option<wgpu::Buffer> {
        &mut self.uniform
    }
}
