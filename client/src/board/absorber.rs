use std::collections::VecDeque;

use glam::DVec2;

use super::ball::{Ball, BallId};
use super::outline::Outline;

pub const ABSORBER_CAPACITY: usize = 100;
pub const LAUNCH_VELOCITY: DVec2 = DVec2::new(0.0, -50.0);
pub const PARKING_SPOT: DVec2 = DVec2::new(22.0, 0.0);

/// Clearance between a launched ball and the absorber's top edge.
const LAUNCH_INSET: f64 = 0.26;

/// A settled ball found the launch queue already full.
#[derive(Debug, PartialEq, Eq)]
pub struct Overflow;

#[derive(Clone, Debug)]
pub struct Absorber {
    origin: DVec2,
    width: u32,
    height: u32,
    outline: Outline,
    /// Balls waiting to reach the launch corner, with their ready time.
    pending: VecDeque<(f64, BallId)>,
    queue: VecDeque<BallId>,
}

impl Absorber {
    pub fn new(origin: DVec2, width: u32, height: u32) -> Self {
        Self {
            origin,
            width,
            height,
            outline: Outline::rectangle(origin, f64::from(width), f64::from(height)),
            pending: VecDeque::new(),
            queue: VecDeque::new(),
        }
    }

    pub fn origin(&self) -> DVec2 {
        self.origin
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn launch_point(&self) -> DVec2 {
        self.origin + DVec2::new(f64::from(self.width) - LAUNCH_INSET, -LAUNCH_INSET)
    }

    /// Time a captured ball takes to reach the launch corner.
    pub fn settle_delay(&self) -> f64 {
        f64::from(self.height) / -LAUNCH_VELOCITY.y
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn time_until_collision(&self, ball: &Ball) -> f64 {
        self.outline.time_until_collision(ball)
    }

    /// Captures `ball`, or relaunches it at once when the absorber fires itself.
    pub fn absorb(&mut self, ball: &mut Ball, now: f64, self_trigger: bool) {
        if self_trigger {
            ball.launch(self.launch_point(), LAUNCH_VELOCITY);
            return;
        }
        ball.capture(PARKING_SPOT);
        self.pending.push_back((now + self.settle_delay(), ball.id()));
    }

    /// Moves captures whose delay has elapsed into the launch queue.
    pub fn settle(&mut self, now: f64) -> Result<(), Overflow> {
        while let Some(&(ready_at, id)) = self.pending.front() {
            if ready_at > now {
                break;
            }
            if self.queue.len() >= ABSORBER_CAPACITY {
                return Err(Overflow);
            }
            self.pending.pop_front();
            self.queue.push_back(id);
        }
        Ok(())
    }

    /// Launches the oldest settled ball, if any.
    pub fn release(&mut self, balls: &mut [Ball]) -> Option<BallId> {
        let id = self.queue.pop_front()?;
        let launch_point = self.launch_point();
        if let Some(ball) = balls.iter_mut().find(|b| b.id() == id) {
            ball.launch(launch_point, LAUNCH_VELOCITY);
        }
        Some(id)
    }
}
