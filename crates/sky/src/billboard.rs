use firmament_common::{BillboardSetId, Colour, MaterialId, NodeId};
use firmament_render::{MaterialParam, RenderBackend};
use glam::Vec3;

use crate::error::SkyError;
use crate::moon::{MoonBody, MoonPhase, MoonState, appearance, phase_texture};

/// Distance from the sky root at which celestial billboards sit.
pub const SKY_DISTANCE: f32 = 1000.0;

/// Sprite edge length for a billboard of size 1.
pub const BILLBOARD_BASE_SIZE: f32 = 550.0;

/// Shader constant carrying the lit fraction of a moon disc.
pub const PHASE_ALPHA: &str = "phaseAlpha";

/// What a billboard draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillboardKind {
    Plain,
    Moon(MoonState),
}

/// A camera-facing sprite placed on the sky sphere.
///
/// Owns one scene node (a child of the sky root), one material and one
/// billboard set on the backend. View state is mirrored here so reads never
/// go back to the backend.
#[derive(Debug, Clone)]
pub struct Billboard {
    kind: BillboardKind,
    node: NodeId,
    material: MaterialId,
    set: BillboardSetId,
    colour: Colour,
    direction: Vec3,
    size: f32,
    visible: bool,
    visibility: f32,
    render_queue: u8,
}

impl Billboard {
    /// Create a plain billboard under `root`, placed along `position`.
    pub fn new<B: RenderBackend + ?Sized>(
        backend: &mut B,
        name: &str,
        texture: &str,
        size: f32,
        position: Vec3,
        root: NodeId,
    ) -> Result<Self, SkyError> {
        let direction = unit_direction(position)?;

        let node = backend.create_node(Some(root));
        backend.set_node_position(node, direction * SKY_DISTANCE);

        let material = backend.create_material(name);
        backend.set_material_param(material, MaterialParam::SelfIllumination(Colour::WHITE));
        backend.set_material_param(material, MaterialParam::Diffuse(Colour::new(0.0, 0.0, 0.0, 1.0)));
        backend.set_material_param(material, MaterialParam::Ambient(Colour::BLACK));
        backend.set_material_param(material, MaterialParam::texture(0, texture));

        let set = backend.create_billboard_set(node, material, BILLBOARD_BASE_SIZE * size);
        backend.set_billboard_direction(set, -direction);

        tracing::debug!(name, texture, size, "billboard created");

        Ok(Self {
            kind: BillboardKind::Plain,
            node,
            material,
            set,
            colour: Colour::WHITE,
            direction,
            size: 1.0,
            visible: true,
            visibility: 1.0,
            render_queue: 0,
        })
    }

    /// Create a moon billboard showing the full phase of `body`.
    pub fn moon<B: RenderBackend + ?Sized>(
        backend: &mut B,
        name: &str,
        body: MoonBody,
        size: f32,
        position: Vec3,
        root: NodeId,
    ) -> Result<Self, SkyError> {
        let phase = MoonPhase::Full;
        let mut billboard = Self::new(
            backend,
            name,
            &phase_texture(body, phase),
            size,
            position,
            root,
        )?;
        billboard.kind = BillboardKind::Moon(MoonState { phase, body });
        backend.set_material_param(billboard.material, MaterialParam::constant(PHASE_ALPHA, phase.alpha()));
        Ok(billboard)
    }

    pub fn kind(&self) -> BillboardKind {
        self.kind
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn material(&self) -> MaterialId {
        self.material
    }

    pub fn billboard_set(&self) -> BillboardSetId {
        self.set
    }

    pub fn colour(&self) -> Colour {
        self.colour
    }

    /// Unit direction from the sky root.
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Position relative to the sky root.
    pub fn position(&self) -> Vec3 {
        self.direction * SKY_DISTANCE
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn visibility(&self) -> f32 {
        self.visibility
    }

    pub fn render_queue(&self) -> u8 {
        self.render_queue
    }

    pub fn set_colour<B: RenderBackend + ?Sized>(&mut self, backend: &mut B, colour: Colour) {
        backend.set_material_param(self.material, MaterialParam::SelfIllumination(colour));
        self.colour = colour;
    }

    /// Move the billboard onto the sky sphere along `position` and turn it
    /// to face the root.
    pub fn set_position<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        position: Vec3,
    ) -> Result<(), SkyError> {
        let direction = unit_direction(position)?;
        backend.set_billboard_direction(self.set, -direction);
        backend.set_node_position(self.node, direction * SKY_DISTANCE);
        self.direction = direction;
        Ok(())
    }

    pub fn set_visible<B: RenderBackend + ?Sized>(&mut self, backend: &mut B, visible: bool) {
        if self.visible == visible {
            return;
        }
        backend.set_node_visible(self.node, visible);
        self.visible = visible;
    }

    pub fn set_render_queue<B: RenderBackend + ?Sized>(&mut self, backend: &mut B, id: u8) {
        backend.set_render_queue(self.set, id);
        self.render_queue = id;
    }

    pub fn set_size<B: RenderBackend + ?Sized>(&mut self, backend: &mut B, size: f32) {
        let size = if size.is_finite() { size.max(0.0) } else { 0.0 };
        if self.size == size {
            return;
        }
        backend.set_node_scale(self.node, size);
        self.size = size;
    }

    /// Set the transparency factor, written as the diffuse alpha.
    pub fn set_visibility<B: RenderBackend + ?Sized>(&mut self, backend: &mut B, visibility: f32) {
        let clamped = clamp_unit(visibility);
        if clamped != visibility {
            tracing::warn!(visibility, clamped, "billboard visibility outside [0, 1]");
        }
        backend.set_material_param(
            self.material,
            MaterialParam::Diffuse(Colour::new(0.0, 0.0, 0.0, clamped)),
        );
        self.visibility = clamped;
    }

    pub fn moon_state(&self) -> Option<MoonState> {
        match self.kind {
            BillboardKind::Moon(state) => Some(state),
            BillboardKind::Plain => None,
        }
    }

    pub fn phase(&self) -> Option<MoonPhase> {
        self.moon_state().map(|m| m.phase)
    }

    pub fn phase_int(&self) -> Option<u8> {
        self.phase().map(MoonPhase::phase_int)
    }

    pub fn body(&self) -> Option<MoonBody> {
        self.moon_state().map(|m| m.body)
    }

    /// Switch a moon to `phase`: swaps its texture and phase alpha.
    pub fn set_phase<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        phase: MoonPhase,
    ) -> Result<(), SkyError> {
        let BillboardKind::Moon(state) = &mut self.kind else {
            return Err(SkyError::NotAMoon);
        };
        state.phase = phase;
        let look = appearance(state.body, phase);
        backend.set_material_param(self.material, MaterialParam::texture(0, look.texture));
        backend.set_material_param(self.material, MaterialParam::constant(PHASE_ALPHA, look.alpha));
        Ok(())
    }

    /// Switch which moon this billboard draws, keeping the phase.
    pub fn set_body<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        body: MoonBody,
    ) -> Result<(), SkyError> {
        let BillboardKind::Moon(state) = &mut self.kind else {
            return Err(SkyError::NotAMoon);
        };
        state.body = body;
        let phase = state.phase;
        backend.set_material_param(self.material, MaterialParam::texture(0, phase_texture(body, phase)));
        Ok(())
    }

    /// Release the node, its billboard set and the material.
    pub fn destroy<B: RenderBackend + ?Sized>(&self, backend: &mut B) {
        backend.destroy_node(self.node);
        backend.destroy_material(self.material);
    }
}

pub(crate) fn unit_direction(v: Vec3) -> Result<Vec3, SkyError> {
    v.try_normalize().ok_or(SkyError::ZeroDirection)
}

pub(crate) fn clamp_unit(x: f32) -> f32 {
    if x.is_nan() { 0.0 } else { x.clamp(0.0, 1.0) }
}
