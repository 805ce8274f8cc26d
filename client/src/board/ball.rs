use glam::DVec2;
use pingball_shared::protocol::BallWire;

use super::geometry::CircleDef;

pub const BALL_RADIUS: f64 = 0.25;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BallId(pub u32);

#[derive(Clone, Debug, PartialEq)]
pub struct Ball {
    id: BallId,
    name: String,
    position: DVec2,
    velocity: DVec2,
    captured: bool,
}

impl Ball {
    pub fn new(id: BallId, name: impl Into<String>, position: DVec2, velocity: DVec2) -> Self {
        Self {
            id,
            name: name.into(),
            position,
            velocity,
            captured: false,
        }
    }

    pub fn from_wire(id: BallId, wire: &BallWire) -> Self {
        Self::new(
            id,
            wire.name.clone(),
            DVec2::new(wire.x, wire.y),
            DVec2::new(wire.vx, wire.vy),
        )
    }

    pub fn to_wire(&self) -> BallWire {
        BallWire {
            name: self.name.clone(),
            x: self.position.x,
            y: self.position.y,
            vx: self.velocity.x,
            vy: self.velocity.y,
        }
    }

    pub fn id(&self) -> BallId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn radius(&self) -> f64 {
        BALL_RADIUS
    }

    pub fn position(&self) -> DVec2 {
        self.position
    }

    pub fn velocity(&self) -> DVec2 {
        self.velocity
    }

    pub fn speed(&self) -> f64 {
        self.velocity.length()
    }

    pub fn shape(&self) -> CircleDef {
        CircleDef {
            center: self.position,
            radius: BALL_RADIUS,
        }
    }

    pub fn is_captured(&self) -> bool {
        self.captured
    }

    pub fn set_position(&mut self, position: DVec2) {
        self.position = position;
    }

    pub fn set_velocity(&mut self, velocity: DVec2) {
        self.velocity = velocity;
    }

    /// Parks the ball outside the playfield and takes it out of the physics.
    pub fn capture(&mut self, parking: DVec2) {
        self.captured = true;
        self.position = parking;
        self.velocity = DVec2::ZERO;
    }

    pub fn launch(&mut self, position: DVec2, velocity: DVec2) {
        self.captured = false;
        self.position = position;
        self.velocity = velocity;
    }

    /// `v' = v(1 - mu*dt - mu2*|v|*dt) + (0, g*dt)`, then moves by `dt * v'`.
    pub fn integrate(&mut self, dt: f64, gravity: f64, mu: f64, mu2: f64) {
        if self.captured {
            return;
        }
        let damping = 1.0 - mu * dt - mu2 * self.speed() * dt;
        self.velocity = self.velocity * damping + DVec2::new(0.0, gravity * dt);
        self.position += self.velocity * dt;
    }
}
