use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use glam::DVec2;
use pingball_shared::protocol::Direction;

use super::ball::Ball;
use super::geometry::{
    push_out_of_circle, push_out_of_segment, quarter_turn, reflect_rotating_circle,
    reflect_rotating_segment, rotate_around, CircleDef,
};
use super::outline::{Contact, Outline};
use super::Orientation;

pub const ANGULAR_VELOCITY: f64 = 6.0 * std::f64::consts::PI;
pub const FLIPPER_COEFF: f64 = 0.95;
pub const SWEEP: f64 = FRAC_PI_2;
pub const FLIPPER_SIZE: f64 = 2.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlipperSide {
    Left,
    Right,
}

impl FlipperSide {
    /// Sign of the sweep from rest toward flipped.
    fn flip_sign(self) -> f64 {
        match self {
            FlipperSide::Left => -1.0,
            FlipperSide::Right => 1.0,
        }
    }
}

/// Pivot and rest-position arm end, relative to the bounding box corner.
fn rest_geometry(side: FlipperSide, orientation: Orientation) -> (DVec2, DVec2) {
    let p = |x: f64, y: f64| DVec2::new(x, y);
    match (side, orientation) {
        (FlipperSide::Left, Orientation::Deg0) => (p(0.0, 0.0), p(0.0, 2.0)),
        (FlipperSide::Left, Orientation::Deg90) => (p(2.0, 0.0), p(0.0, 0.0)),
        (FlipperSide::Left, Orientation::Deg180) => (p(2.0, 2.0), p(2.0, 0.0)),
        (FlipperSide::Left, Orientation::Deg270) => (p(0.0, 2.0), p(2.0, 2.0)),
        (FlipperSide::Right, Orientation::Deg0) => (p(2.0, 0.0), p(2.0, 2.0)),
        (FlipperSide::Right, Orientation::Deg90) => (p(2.0, 2.0), p(0.0, 2.0)),
        (FlipperSide::Right, Orientation::Deg180) => (p(0.0, 2.0), p(0.0, 0.0)),
        (FlipperSide::Right, Orientation::Deg270) => (p(0.0, 0.0), p(2.0, 0.0)),
    }
}

/// Box edge the arm lies along, at rest or flipped.
pub fn rendered_edge(side: FlipperSide, orientation: Orientation, flipped: bool) -> Direction {
    use Direction::*;
    if flipped {
        return match orientation {
            Orientation::Deg0 => Top,
            Orientation::Deg90 => Right,
            Orientation::Deg180 => Bottom,
            Orientation::Deg270 => Left,
        };
    }
    match (side, orientation) {
        (FlipperSide::Left, Orientation::Deg0) => Left,
        (FlipperSide::Left, Orientation::Deg90) => Top,
        (FlipperSide::Left, Orientation::Deg180) => Right,
        (FlipperSide::Left, Orientation::Deg270) => Bottom,
        (FlipperSide::Right, Orientation::Deg0) => Right,
        (FlipperSide::Right, Orientation::Deg90) => Bottom,
        (FlipperSide::Right, Orientation::Deg180) => Left,
        (FlipperSide::Right, Orientation::Deg270) => Top,
    }
}

/// A 2x2 flipper arm that sweeps a quarter turn about its pivot each time it
/// is triggered, alternating between rest and flipped.
#[derive(Clone, Debug)]
pub struct Flipper {
    side: FlipperSide,
    orientation: Orientation,
    origin: DVec2,
    pivot: DVec2,
    rest_end: DVec2,
    flipped_end: DVec2,
    end: DVec2,
    progress: f64,
    fully_flipped: bool,
    rotating: bool,
}

impl Flipper {
    pub fn new(side: FlipperSide, orientation: Orientation, origin: DVec2) -> Self {
        let (pivot, end) = rest_geometry(side, orientation);
        let pivot = origin + pivot;
        let rest_end = origin + end;
        let flipped_end = quarter_turn(rest_end, pivot, side == FlipperSide::Right);
        Self {
            side,
            orientation,
            origin,
            pivot,
            rest_end,
            flipped_end,
            end: rest_end,
            progress: 0.0,
            fully_flipped: false,
            rotating: false,
        }
    }

    pub fn side(&self) -> FlipperSide {
        self.side
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn origin(&self) -> DVec2 {
        self.origin
    }

    pub fn pivot(&self) -> DVec2 {
        self.pivot
    }

    pub fn end(&self) -> DVec2 {
        self.end
    }

    pub fn is_rotating(&self) -> bool {
        self.rotating
    }

    pub fn is_fully_flipped(&self) -> bool {
        self.fully_flipped
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Signed angular velocity of the sweep in progress, 0 at rest.
    pub fn angular_velocity(&self) -> f64 {
        if !self.rotating {
            return 0.0;
        }
        let sign = self.side.flip_sign();
        if self.fully_flipped {
            -sign * ANGULAR_VELOCITY
        } else {
            sign * ANGULAR_VELOCITY
        }
    }

    /// Starts a sweep; ignored while one is already running.
    pub fn trigger(&mut self) {
        self.rotating = true;
    }

    pub fn advance(&mut self, dt: f64) {
        if !self.rotating {
            return;
        }
        let remaining = SWEEP - self.progress;
        let step = (ANGULAR_VELOCITY * dt).min(remaining);
        if step >= remaining {
            self.fully_flipped = !self.fully_flipped;
            self.end = if self.fully_flipped {
                self.flipped_end
            } else {
                self.rest_end
            };
            self.progress = 0.0;
            self.rotating = false;
            return;
        }
        let direction = if self.angular_velocity() < 0.0 { -1.0 } else { 1.0 };
        self.end = rotate_around(self.end, self.pivot, direction * step);
        self.progress += step;
    }

    /// Whether the renderer should draw the arm in its flipped position.
    pub fn shows_flipped(&self) -> bool {
        if self.rotating {
            // Mid-sweep the arm is nearer whichever end it has passed halfway to.
            (self.progress >= FRAC_PI_4) != self.fully_flipped
        } else {
            self.fully_flipped
        }
    }

    pub fn rendered_edge(&self) -> Direction {
        rendered_edge(self.side, self.orientation, self.shows_flipped())
    }

    fn outline(&self) -> Outline {
        Outline::bar(self.pivot, self.end)
    }

    pub fn time_until_collision(&self, ball: &Ball) -> f64 {
        self.outline().time_until_collision(ball)
    }

    pub fn reflect(&self, ball: &mut Ball) {
        let Some((_, contact)) = self.outline().earliest(ball) else {
            return;
        };
        let omega = self.angular_velocity();
        let vel = match contact {
            Contact::Side(seg) => reflect_rotating_segment(
                seg,
                self.pivot,
                omega,
                ball.shape(),
                ball.velocity(),
                FLIPPER_COEFF,
            ),
            Contact::Corner(c) => reflect_rotating_circle(
                CircleDef::point(c),
                self.pivot,
                omega,
                ball.shape(),
                ball.velocity(),
                FLIPPER_COEFF,
            ),
        };
        let pos = match contact {
            Contact::Side(seg) => push_out_of_segment(seg, ball.shape()),
            Contact::Corner(c) => push_out_of_circle(CircleDef::point(c), ball.shape()),
        };
        ball.set_velocity(vel);
        ball.set_position(pos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f64 = 0.001;

    fn assert_near(a: DVec2, b: DVec2) {
        assert!((a - b).length() < 1e-9, "expected {b:?}, got {a:?}");
    }

    fn run_until_still(flipper: &mut Flipper) -> usize {
        let mut steps = 0;
        while flipper.is_rotating() && steps < 1000 {
            flipper.advance(DT);
            steps += 1;
        }
        steps
    }

    mod left_flipper {
        use super::*;

        #[test]
        fn rest_arm_hangs_down_from_top_left() {
            let f = Flipper::new(FlipperSide::Left, Orientation::Deg0, DVec2::new(4.0, 4.0));
            assert_eq!(f.pivot(), DVec2::new(4.0, 4.0));
            assert_eq!(f.end(), DVec2::new(4.0, 6.0));
            assert_eq!(f.rendered_edge(), Direction::Left);
        }

        #[test]
        fn sweeps_to_the_top_edge_and_back() {
            let mut f = Flipper::new(FlipperSide::Left, Orientation::Deg0, DVec2::new(4.0, 4.0));
            f.trigger();
            assert!(f.angular_velocity() < 0.0);
            run_until_still(&mut f);
            assert!(f.is_fully_flipped());
            assert_eq!(f.end(), DVec2::new(6.0, 4.0));
            assert_eq!(f.rendered_edge(), Direction::Top);

            f.trigger();
            assert!(f.angular_velocity() > 0.0);
            run_until_still(&mut f);
            assert!(!f.is_fully_flipped());
            assert_eq!(f.end(), DVec2::new(4.0, 6.0));
        }
    }

    mod right_flipper {
        use super::*;

        #[test]
        fn sweeps_toward_the_top_edge() {
            let mut f = Flipper::new(FlipperSide::Right, Orientation::Deg0, DVec2::new(4.0, 4.0));
            assert_eq!(f.rendered_edge(), Direction::Right);
            f.trigger();
            assert!(f.angular_velocity() > 0.0);
            run_until_still(&mut f);
            assert_eq!(f.end(), DVec2::new(4.0, 4.0));
            assert_eq!(f.rendered_edge(), Direction::Top);
        }
    }

    #[test]
    fn full_sweep_takes_a_twelfth_of_a_second() {
        let mut f = Flipper::new(FlipperSide::Left, Orientation::Deg90, DVec2::ZERO);
        f.trigger();
        let steps = run_until_still(&mut f);
        // pi/2 at 6*pi rad/s is 1/12 s.
        assert!((83..=84).contains(&steps), "took {steps} steps");
    }

    #[test]
    fn advance_never_overshoots() {
        let mut f = Flipper::new(FlipperSide::Right, Orientation::Deg180, DVec2::ZERO);
        f.trigger();
        f.advance(10.0);
        assert!(!f.is_rotating());
        assert_near(f.end(), quarter_turn(DVec2::new(0.0, 0.0), f.pivot(), true));
    }

    #[test]
    fn trigger_during_sweep_is_ignored() {
        let mut f = Flipper::new(FlipperSide::Left, Orientation::Deg0, DVec2::ZERO);
        f.trigger();
        f.advance(DT);
        let progress = f.progress();
        f.trigger();
        assert_eq!(f.progress(), progress);
        assert!(f.is_rotating());
    }

    #[test]
    fn advance_at_rest_changes_nothing() {
        let mut f = Flipper::new(FlipperSide::Left, Orientation::Deg270, DVec2::new(2.0, 2.0));
        let before = (f.end(), f.progress(), f.is_fully_flipped());
        f.advance(0.5);
        assert_eq!((f.end(), f.progress(), f.is_fully_flipped()), before);
        assert_eq!(f.angular_velocity(), 0.0);
    }

    #[test]
    fn render_switches_halfway_through_the_sweep() {
        let mut f = Flipper::new(FlipperSide::Left, Orientation::Deg0, DVec2::ZERO);
        f.trigger();
        f.advance(0.03);
        assert!(!f.shows_flipped());
        f.advance(0.02);
        assert!(f.shows_flipped());
    }

    #[test]
    fn arm_endpoints_stay_at_fixed_distance() {
        let mut f = Flipper::new(FlipperSide::Right, Orientation::Deg90, DVec2::new(7.0, 3.0));
        f.trigger();
        for _ in 0..40 {
            f.advance(DT);
            assert!(((f.end() - f.pivot()).length() - FLIPPER_SIZE).abs() < 1e-9);
        }
    }
}
