//! Per-board physics: a fixed set of gadgets, a changing set of balls, and a
//! tick that advances both and resolves at most one collision per ball.

pub mod absorber;
pub mod ball;
pub mod flipper_logic;
pub mod gadget;
pub mod geometry;
pub mod outline;

use std::collections::{BTreeMap, HashSet};

use glam::DVec2;
use pingball_shared::config::{is_valid_name, BOARD_SIZE};
use pingball_shared::protocol::{BallWire, Direction};
use tracing::debug;

use crate::error::{ConfigError, SimulationError};
use ball::{Ball, BallId, BALL_RADIUS};
use gadget::{Gadget, GadgetKind, OuterWall};
use geometry::{reflect_balls, separate_balls, time_until_ball_ball_collision, COLLISION_EPSILON};

pub use gadget::{GadgetId, Orientation};

/// Longest simulated step.
pub const MAX_TICK: f64 = 0.001;
/// Shortest simulated step. A ball wedged between surfaces can keep
/// reporting a contact at time zero; the clock still moves.
pub const MIN_TICK: f64 = COLLISION_EPSILON;
pub const DEFAULT_GRAVITY: f64 = 25.0;
pub const DEFAULT_FRICTION: f64 = 0.025;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Physics {
    pub gravity: f64,
    pub mu: f64,
    pub mu2: f64,
}

impl Default for Physics {
    fn default() -> Self {
        Self {
            gravity: DEFAULT_GRAVITY,
            mu: DEFAULT_FRICTION,
            mu2: DEFAULT_FRICTION,
        }
    }
}

/// What one tick produced for the outside world.
#[derive(Debug, Default)]
pub struct TickReport {
    pub dt: f64,
    /// Balls that crossed an invisible wall, already remapped into the
    /// neighbor's coordinates and removed from this board.
    pub handoffs: Vec<(Direction, Ball)>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Hit {
    Gadget(usize),
    Ball(usize),
}

#[derive(Debug)]
pub struct Board {
    name: String,
    physics: Physics,
    /// Walls occupy indices 0..4 in `Direction::ALL` order.
    gadgets: Vec<Gadget>,
    balls: Vec<Ball>,
    clock: f64,
    next_ball: u32,
}

impl Board {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn physics(&self) -> Physics {
        self.physics
    }

    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn gadgets(&self) -> &[Gadget] {
        &self.gadgets
    }

    pub fn balls(&self) -> &[Ball] {
        &self.balls
    }

    pub fn gadget_id(&self, name: &str) -> Option<GadgetId> {
        self.gadgets
            .iter()
            .position(|g| g.name() == name)
            .map(GadgetId)
    }

    pub fn gadget(&self, id: GadgetId) -> &Gadget {
        &self.gadgets[id.0]
    }

    pub fn wall(&self, direction: Direction) -> &OuterWall {
        match self.gadgets[direction.index()].kind() {
            GadgetKind::Wall(wall) => wall,
            _ => unreachable!("first four gadgets are the outer walls"),
        }
    }

    fn wall_mut(&mut self, direction: Direction) -> &mut OuterWall {
        match self.gadgets[direction.index()].as_wall_mut() {
            Some(wall) => wall,
            None => unreachable!("first four gadgets are the outer walls"),
        }
    }

    pub fn neighbor(&self, direction: Direction) -> Option<&str> {
        self.wall(direction).neighbor()
    }

    pub fn neighbors(&self) -> BTreeMap<Direction, &str> {
        Direction::ALL
            .into_iter()
            .filter_map(|d| self.neighbor(d).map(|n| (d, n)))
            .collect()
    }

    /// Makes `direction` invisible and records who lies beyond it.
    pub fn join(&mut self, direction: Direction, neighbor: impl Into<String>) {
        self.wall_mut(direction).join(neighbor);
    }

    /// Makes `direction` solid again.
    pub fn restore_wall(&mut self, direction: Direction) {
        self.wall_mut(direction).restore();
    }

    pub fn add_ball(&mut self, name: impl Into<String>, position: DVec2, velocity: DVec2) -> BallId {
        let id = BallId(self.next_ball);
        self.next_ball += 1;
        self.balls.push(Ball::new(id, name, position, velocity));
        id
    }

    pub fn add_wire_ball(&mut self, wire: &BallWire) -> BallId {
        let id = BallId(self.next_ball);
        self.next_ball += 1;
        self.balls.push(Ball::from_wire(id, wire));
        id
    }

    /// Fires `id` as if one of its trigger sources had been hit.
    pub fn trigger(&mut self, id: GadgetId) {
        self.gadgets[id.0].on_trigger(&mut self.balls);
    }

    /// Shortest time until any free ball touches a gadget or another ball.
    pub fn min_time_until_collision(&self) -> f64 {
        let mut best = f64::INFINITY;
        for (i, ball) in self.balls.iter().enumerate() {
            if ball.is_captured() {
                continue;
            }
            for gadget in &self.gadgets {
                best = best.min(gadget.time_until_collision(ball));
            }
            for other in self.balls.iter().skip(i + 1) {
                if other.is_captured() {
                    continue;
                }
                best = best.min(time_until_ball_ball_collision(
                    ball.shape(),
                    ball.velocity(),
                    other.shape(),
                    other.velocity(),
                ));
            }
        }
        best
    }

    pub fn tick(&mut self) -> Result<TickReport, SimulationError> {
        let dt = self.min_time_until_collision().clamp(MIN_TICK, MAX_TICK);
        let Physics { gravity, mu, mu2 } = self.physics;
        for ball in &mut self.balls {
            ball.integrate(dt, gravity, mu, mu2);
        }
        for gadget in &mut self.gadgets {
            gadget.advance(dt);
        }
        self.clock += dt;
        for gadget in &mut self.gadgets {
            gadget.settle(self.clock)?;
        }
        let handoffs = self.resolve_collisions();
        Ok(TickReport { dt, handoffs })
    }

    /// Earliest imminent contact for ball `i`. Walls come first, then other
    /// gadgets, then balls; the lowest index wins a tie.
    fn imminent_hit(&self, i: usize, skip: &[bool]) -> Option<Hit> {
        let ball = &self.balls[i];
        let mut best: Option<(f64, Hit)> = None;
        for (g, gadget) in self.gadgets.iter().enumerate() {
            let t = gadget.time_until_collision(ball);
            if t <= COLLISION_EPSILON && best.map_or(true, |(b, _)| t < b) {
                best = Some((t, Hit::Gadget(g)));
            }
        }
        for (j, other) in self.balls.iter().enumerate() {
            if j == i || skip[j] || other.is_captured() {
                continue;
            }
            let t = time_until_ball_ball_collision(
                ball.shape(),
                ball.velocity(),
                other.shape(),
                other.velocity(),
            );
            if t <= COLLISION_EPSILON && best.map_or(true, |(b, _)| t < b) {
                best = Some((t, Hit::Ball(j)));
            }
        }
        best.map(|(_, hit)| hit)
    }

    fn resolve_collisions(&mut self) -> Vec<(Direction, Ball)> {
        let count = self.balls.len();
        let mut done = vec![false; count];
        let mut departed = HashSet::new();
        let mut handoffs = Vec::new();

        for i in 0..count {
            if done[i] || self.balls[i].is_captured() {
                continue;
            }
            match self.imminent_hit(i, &done) {
                None => {}
                Some(Hit::Gadget(g)) => {
                    if let Some(wall) = self.gadgets[g].as_wall().filter(|w| w.is_invisible()) {
                        wall.hand_off(&mut self.balls[i]);
                        debug!(
                            ball = self.balls[i].name(),
                            wall = wall.direction().label(),
                            "ball leaving board"
                        );
                        handoffs.push((wall.direction(), self.balls[i].clone()));
                        departed.insert(i);
                    } else {
                        self.gadgets[g].on_collision(&mut self.balls[i], self.clock);
                        self.fire_targets(g);
                    }
                    done[i] = true;
                }
                Some(Hit::Ball(j)) => {
                    let (a, b) = (&self.balls[i], &self.balls[j]);
                    let (va, vb) =
                        reflect_balls(a.position(), a.velocity(), b.position(), b.velocity());
                    let (pa, pb) = separate_balls(a.shape(), b.shape());
                    self.balls[i].set_velocity(va);
                    self.balls[i].set_position(pa);
                    self.balls[j].set_velocity(vb);
                    self.balls[j].set_position(pb);
                    done[i] = true;
                    done[j] = true;
                }
            }
        }

        if !departed.is_empty() {
            let mut index = 0;
            self.balls.retain(|_| {
                let keep = !departed.contains(&index);
                index += 1;
                keep
            });
        }
        handoffs
    }

    fn fire_targets(&mut self, source: usize) {
        let targets = self.gadgets[source].targets().to_vec();
        for target in targets {
            self.gadgets[target.0].on_trigger(&mut self.balls);
        }
    }
}

struct PendingBall {
    name: String,
    position: DVec2,
    velocity: DVec2,
}

/// Collects a board description and checks it before building a [`Board`].
#[derive(Default)]
pub struct BoardBuilder {
    name: Option<String>,
    physics: Physics,
    gadgets: Vec<Gadget>,
    balls: Vec<PendingBall>,
    links: Vec<(String, String)>,
}

impl BoardBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = Some(name.into());
        self
    }

    pub fn physics(&mut self, physics: Physics) -> &mut Self {
        self.physics = physics;
        self
    }

    pub fn gadget(&mut self, name: impl Into<String>, kind: GadgetKind) -> &mut Self {
        self.gadgets.push(Gadget::new(name, kind));
        self
    }

    pub fn ball(&mut self, name: impl Into<String>, position: DVec2, velocity: DVec2) -> &mut Self {
        self.balls.push(PendingBall {
            name: name.into(),
            position,
            velocity,
        });
        self
    }

    /// Hitting `trigger` fires `action`. Links are resolved in `build`, so
    /// they may name gadgets declared later.
    pub fn fire(&mut self, trigger: impl Into<String>, action: impl Into<String>) -> &mut Self {
        self.links.push((trigger.into(), action.into()));
        self
    }

    pub fn build(self) -> Result<Board, ConfigError> {
        let name = self.name.ok_or(ConfigError::MissingBoard)?;

        let mut seen = HashSet::new();
        let names = self
            .gadgets
            .iter()
            .map(Gadget::name)
            .chain(self.balls.iter().map(|b| b.name.as_str()));
        for n in names {
            if !seen.insert(n) {
                return Err(ConfigError::DuplicateName(n.to_string()));
            }
        }

        for gadget in &self.gadgets {
            if !fits_on_board(gadget.kind()) {
                return Err(ConfigError::OutOfBounds(gadget.name().to_string()));
            }
        }
        // A ball must start clear of the outer walls.
        let inside = BALL_RADIUS..=f64::from(BOARD_SIZE) - BALL_RADIUS;
        for ball in &self.balls {
            let p = ball.position;
            if !inside.contains(&p.x) || !inside.contains(&p.y) {
                return Err(ConfigError::OutOfBounds(ball.name.clone()));
            }
        }

        let mut gadgets: Vec<Gadget> = Direction::ALL
            .into_iter()
            .map(|d| Gadget::new(format!("wall:{d}"), GadgetKind::Wall(OuterWall::new(d))))
            .collect();
        gadgets.extend(self.gadgets);

        let find = |gadgets: &[Gadget], n: &str| {
            gadgets
                .iter()
                .position(|g| g.name() == n && is_valid_name(n))
                .ok_or_else(|| ConfigError::UnknownGadget(n.to_string()))
        };
        for (trigger, action) in &self.links {
            let t = find(&gadgets, trigger)?;
            let a = find(&gadgets, action)?;
            if t == a {
                gadgets[t].set_self_trigger();
            } else {
                gadgets[t].add_target(GadgetId(a));
            }
        }

        let mut board = Board {
            name,
            physics: self.physics,
            gadgets,
            balls: Vec::new(),
            clock: 0.0,
            next_ball: 0,
        };
        for ball in self.balls {
            board.add_ball(ball.name, ball.position, ball.velocity);
        }
        Ok(board)
    }
}

fn fits_on_board(kind: &GadgetKind) -> bool {
    let (origin, width, height) = match kind {
        GadgetKind::Wall(_) => return true,
        GadgetKind::Bumper(b) => (b.origin(), 1.0, 1.0),
        GadgetKind::Flipper(f) => (f.origin(), 2.0, 2.0),
        GadgetKind::Absorber(a) => (a.origin(), f64::from(a.width()), f64::from(a.height())),
    };
    let size = f64::from(BOARD_SIZE);
    origin.x >= 0.0
        && origin.y >= 0.0
        && width >= 1.0
        && height >= 1.0
        && origin.x + width <= size
        && origin.y + height <= size
}
