use glam::DVec2;
use pingball_shared::config::BOARD_SIZE;
use pingball_shared::protocol::Direction;

use super::absorber::Absorber;
use super::ball::Ball;
use super::flipper_logic::Flipper;
use super::geometry::{
    push_out_of_circle, push_out_of_segment, reflect_circle, reflect_segment,
    time_until_circle_collision, time_until_segment_collision, CircleDef, Segment,
};
use super::outline::Outline;
use crate::error::SimulationError;

pub const WALL_COEFF: f64 = 1.0;
pub const BUMPER_COEFF: f64 = 1.0;

/// Outer walls sit just outside the playfield.
const WALL_OFFSET: f64 = 0.01;

/// How far inside the receiving board a handed-off ball reappears.
pub const HANDOFF_INSET: f64 = 1.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GadgetId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Orientation {
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Orientation {
    pub fn from_degrees(degrees: u32) -> Option<Self> {
        match degrees {
            0 => Some(Orientation::Deg0),
            90 => Some(Orientation::Deg90),
            180 => Some(Orientation::Deg180),
            270 => Some(Orientation::Deg270),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct OuterWall {
    direction: Direction,
    segment: Segment,
    neighbor: Option<String>,
}

impl OuterWall {
    pub fn new(direction: Direction) -> Self {
        let lo = -WALL_OFFSET;
        let hi = f64::from(BOARD_SIZE) + WALL_OFFSET;
        // Each wall faces into the playfield.
        let (from, to, inward) = match direction {
            Direction::Top => (DVec2::new(lo, lo), DVec2::new(hi, lo), DVec2::Y),
            Direction::Bottom => (DVec2::new(lo, hi), DVec2::new(hi, hi), DVec2::NEG_Y),
            Direction::Left => (DVec2::new(lo, lo), DVec2::new(lo, hi), DVec2::X),
            Direction::Right => (DVec2::new(hi, lo), DVec2::new(hi, hi), DVec2::NEG_X),
        };
        Self {
            direction,
            segment: Segment::facing(from, to, inward),
            neighbor: None,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn neighbor(&self) -> Option<&str> {
        self.neighbor.as_deref()
    }

    /// A wall is invisible exactly while it has a neighbor.
    pub fn is_invisible(&self) -> bool {
        self.neighbor.is_some()
    }

    pub fn join(&mut self, neighbor: impl Into<String>) {
        self.neighbor = Some(neighbor.into());
    }

    pub fn restore(&mut self) {
        self.neighbor = None;
    }

    pub fn time_until_collision(&self, ball: &Ball) -> f64 {
        time_until_segment_collision(self.segment, ball.shape(), ball.velocity())
    }

    pub fn reflect(&self, ball: &mut Ball) {
        let vel = reflect_segment(self.segment, ball.position(), ball.velocity(), WALL_COEFF);
        ball.set_velocity(vel);
        ball.set_position(push_out_of_segment(self.segment, ball.shape()));
    }

    /// Moves `ball` to where it enters the neighbor across this wall.
    pub fn hand_off(&self, ball: &mut Ball) {
        let far = f64::from(BOARD_SIZE) - HANDOFF_INSET;
        let mut pos = ball.position();
        match self.direction {
            Direction::Top => pos.y = far,
            Direction::Bottom => pos.y = HANDOFF_INSET,
            Direction::Left => pos.x = far,
            Direction::Right => pos.x = HANDOFF_INSET,
        }
        ball.set_position(pos);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BumperShape {
    Square,
    Circle,
    Triangle(Orientation),
}

#[derive(Clone, Debug)]
enum BumperBody {
    Outline(Outline),
    Round(CircleDef),
}

#[derive(Clone, Debug)]
pub struct Bumper {
    shape: BumperShape,
    origin: DVec2,
    body: BumperBody,
}

impl Bumper {
    pub fn new(shape: BumperShape, origin: DVec2) -> Self {
        let at = |x: f64, y: f64| origin + DVec2::new(x, y);
        let body = match shape {
            BumperShape::Square => BumperBody::Outline(Outline::rectangle(origin, 1.0, 1.0)),
            BumperShape::Circle => BumperBody::Round(CircleDef {
                center: at(0.5, 0.5),
                radius: 0.5,
            }),
            BumperShape::Triangle(orientation) => {
                let corners = match orientation {
                    Orientation::Deg0 => [at(0.0, 0.0), at(1.0, 0.0), at(0.0, 1.0)],
                    Orientation::Deg90 => [at(0.0, 0.0), at(1.0, 0.0), at(1.0, 1.0)],
                    Orientation::Deg180 => [at(1.0, 0.0), at(1.0, 1.0), at(0.0, 1.0)],
                    Orientation::Deg270 => [at(0.0, 0.0), at(1.0, 1.0), at(0.0, 1.0)],
                };
                BumperBody::Outline(Outline::polygon(&corners))
            }
        };
        Self {
            shape,
            origin,
            body,
        }
    }

    pub fn shape(&self) -> BumperShape {
        self.shape
    }

    pub fn origin(&self) -> DVec2 {
        self.origin
    }

    pub fn time_until_collision(&self, ball: &Ball) -> f64 {
        match &self.body {
            BumperBody::Outline(outline) => outline.time_until_collision(ball),
            BumperBody::Round(circle) => {
                time_until_circle_collision(*circle, ball.shape(), ball.velocity())
            }
        }
    }

    pub fn reflect(&self, ball: &mut Ball) {
        match &self.body {
            BumperBody::Outline(outline) => outline.reflect(ball, BUMPER_COEFF),
            BumperBody::Round(circle) => {
                let vel =
                    reflect_circle(circle.center, ball.position(), ball.velocity(), BUMPER_COEFF);
                ball.set_velocity(vel);
                ball.set_position(push_out_of_circle(*circle, ball.shape()));
            }
        }
    }
}

#[derive(Clone, Debug)]
pub enum GadgetKind {
    Wall(OuterWall),
    Bumper(Bumper),
    Flipper(Flipper),
    Absorber(Absorber),
}

/// A named board element plus the gadgets it fires when hit.
#[derive(Clone, Debug)]
pub struct Gadget {
    name: String,
    kind: GadgetKind,
    targets: Vec<GadgetId>,
    self_trigger: bool,
}

impl Gadget {
    pub fn new(name: impl Into<String>, kind: GadgetKind) -> Self {
        Self {
            name: name.into(),
            kind,
            targets: Vec::new(),
            self_trigger: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &GadgetKind {
        &self.kind
    }

    pub fn targets(&self) -> &[GadgetId] {
        &self.targets
    }

    pub fn fires_itself(&self) -> bool {
        self.self_trigger
    }

    pub(crate) fn add_target(&mut self, target: GadgetId) {
        if !self.targets.contains(&target) {
            self.targets.push(target);
        }
    }

    pub(crate) fn set_self_trigger(&mut self) {
        self.self_trigger = true;
    }

    pub fn as_wall(&self) -> Option<&OuterWall> {
        match &self.kind {
            GadgetKind::Wall(wall) => Some(wall),
            _ => None,
        }
    }

    pub(crate) fn as_wall_mut(&mut self) -> Option<&mut OuterWall> {
        match &mut self.kind {
            GadgetKind::Wall(wall) => Some(wall),
            _ => None,
        }
    }

    pub fn time_until_collision(&self, ball: &Ball) -> f64 {
        match &self.kind {
            GadgetKind::Wall(wall) => wall.time_until_collision(ball),
            GadgetKind::Bumper(bumper) => bumper.time_until_collision(ball),
            GadgetKind::Flipper(flipper) => flipper.time_until_collision(ball),
            GadgetKind::Absorber(absorber) => absorber.time_until_collision(ball),
        }
    }

    /// Responds to `ball` touching this gadget. Invisible walls are handled
    /// by the board as hand-offs and never reach here.
    pub fn on_collision(&mut self, ball: &mut Ball, now: f64) {
        match &mut self.kind {
            GadgetKind::Wall(wall) => wall.reflect(ball),
            GadgetKind::Bumper(bumper) => bumper.reflect(ball),
            GadgetKind::Flipper(flipper) => {
                flipper.reflect(ball);
                if self.self_trigger {
                    flipper.trigger();
                }
            }
            GadgetKind::Absorber(absorber) => absorber.absorb(ball, now, self.self_trigger),
        }
    }

    pub fn on_trigger(&mut self, balls: &mut [Ball]) {
        match &mut self.kind {
            GadgetKind::Flipper(flipper) => flipper.trigger(),
            GadgetKind::Absorber(absorber) => {
                absorber.release(balls);
            }
            GadgetKind::Wall(_) | GadgetKind::Bumper(_) => {}
        }
    }

    pub fn advance(&mut self, dt: f64) {
        if let GadgetKind::Flipper(flipper) = &mut self.kind {
            flipper.advance(dt);
        }
    }

    pub fn settle(&mut self, now: f64) -> Result<(), SimulationError> {
        if let GadgetKind::Absorber(absorber) = &mut self.kind {
            absorber
                .settle(now)
                .map_err(|_| SimulationError::AbsorberOverflow {
                    name: self.name.clone(),
                    capacity: super::absorber::ABSORBER_CAPACITY,
                })?;
        }
        Ok(())
    }
}
