use glam::DVec2;

use super::ball::Ball;
use super::geometry::{
    push_out_of_circle, push_out_of_segment, reflect_circle, reflect_segment,
    time_until_circle_collision, time_until_segment_collision, CircleDef, Segment,
};

/// Which part of an outline a ball is about to touch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Contact {
    Side(Segment),
    Corner(DVec2),
}

/// Static collision shape made of line sides and zero-radius corners.
#[derive(Clone, Debug)]
pub struct Outline {
    sides: Vec<Segment>,
    corners: Vec<DVec2>,
}

impl Outline {
    /// Closed polygon through `points`, with a corner at each vertex. Sides
    /// are one-sided faces pointing away from the interior, whichever way
    /// the points wind.
    pub fn polygon(points: &[DVec2]) -> Self {
        let edges = || points.iter().zip(points.iter().cycle().skip(1));
        let area: f64 = edges().map(|(a, b)| a.perp_dot(*b)).sum();
        let sign = if area < 0.0 { 1.0 } else { -1.0 };
        let sides = edges()
            .map(|(&a, &b)| Segment::facing(a, b, (b - a).perp() * sign))
            .collect();
        Self {
            sides,
            corners: points.to_vec(),
        }
    }

    pub fn rectangle(origin: DVec2, width: f64, height: f64) -> Self {
        Self::polygon(&[
            origin,
            origin + DVec2::new(width, 0.0),
            origin + DVec2::new(width, height),
            origin + DVec2::new(0.0, height),
        ])
    }

    /// A single segment with both endpoints as corners.
    pub fn bar(from: DVec2, to: DVec2) -> Self {
        Self {
            sides: vec![Segment::new(from, to)],
            corners: vec![from, to],
        }
    }

    pub fn sides(&self) -> &[Segment] {
        &self.sides
    }

    /// Earliest contact; a corner wins an exact tie with a side.
    pub fn earliest(&self, ball: &Ball) -> Option<(f64, Contact)> {
        let shape = ball.shape();
        let vel = ball.velocity();
        let mut best: Option<(f64, Contact)> = None;
        for side in &self.sides {
            let t = time_until_segment_collision(*side, shape, vel);
            if t.is_finite() && best.map_or(true, |(b, _)| t < b) {
                best = Some((t, Contact::Side(*side)));
            }
        }
        for corner in &self.corners {
            let t = time_until_circle_collision(CircleDef::point(*corner), shape, vel);
            if t.is_finite() && best.map_or(true, |(b, _)| t <= b) {
                best = Some((t, Contact::Corner(*corner)));
            }
        }
        best
    }

    pub fn time_until_collision(&self, ball: &Ball) -> f64 {
        self.earliest(ball).map_or(f64::INFINITY, |(t, _)| t)
    }

    pub fn reflect(&self, ball: &mut Ball, coeff: f64) {
        let Some((_, contact)) = self.earliest(ball) else {
            return;
        };
        let (vel, pos) = match contact {
            Contact::Side(seg) => (
                reflect_segment(seg, ball.position(), ball.velocity(), coeff),
                push_out_of_segment(seg, ball.shape()),
            ),
            Contact::Corner(c) => (
                reflect_circle(c, ball.position(), ball.velocity(), coeff),
                push_out_of_circle(CircleDef::point(c), ball.shape()),
            ),
        };
        ball.set_velocity(vel);
        ball.set_position(pos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::ball::BallId;

    #[test]
    fn square_has_four_sides_and_corners() {
        let square = Outline::rectangle(DVec2::new(3.0, 3.0), 1.0, 1.0);
        assert_eq!(square.sides().len(), 4);
        assert_eq!(square.corners.len(), 4);
    }

    #[test]
    fn ball_aimed_at_a_corner_bounces_off_the_corner() {
        let square = Outline::rectangle(DVec2::new(3.0, 3.0), 1.0, 1.0);
        let mut ball = Ball::new(BallId(0), "b", DVec2::new(2.0, 2.0), DVec2::new(1.0, 1.0));
        let (_, contact) = square.earliest(&ball).expect("contact");
        assert_eq!(contact, Contact::Corner(DVec2::new(3.0, 3.0)));
        square.reflect(&mut ball, 1.0);
        assert!(ball.velocity().x < 0.0 && ball.velocity().y < 0.0);
    }

    #[test]
    fn corner_wins_an_exact_tie_with_a_side() {
        let square = Outline::rectangle(DVec2::new(3.0, 3.0), 1.0, 1.0);
        // Falling straight onto the top-left corner: the top side (at its
        // very end) and the corner are both 1.75 s away.
        let ball = Ball::new(BallId(0), "b", DVec2::new(3.0, 1.0), DVec2::new(0.0, 1.0));
        let side = time_until_segment_collision(square.sides()[0], ball.shape(), ball.velocity());
        let (t, contact) = square.earliest(&ball).expect("contact");
        assert_eq!(side, t);
        assert_eq!(t, 1.75);
        assert_eq!(contact, Contact::Corner(DVec2::new(3.0, 3.0)));
    }

    #[test]
    fn sides_face_outward_for_either_winding() {
        let cw = Outline::polygon(&[
            DVec2::new(0.0, 0.0),
            DVec2::new(1.0, 0.0),
            DVec2::new(0.0, 1.0),
        ]);
        let ccw = Outline::polygon(&[
            DVec2::new(0.0, 1.0),
            DVec2::new(1.0, 0.0),
            DVec2::new(0.0, 0.0),
        ]);
        for outline in [cw, ccw] {
            let centroid = DVec2::new(1.0 / 3.0, 1.0 / 3.0);
            for side in outline.sides() {
                let n = side.outward.expect("polygon sides are one-sided");
                assert!((centroid - side.from).dot(n) < 0.0, "{side:?}");
            }
        }
    }

    #[test]
    fn ball_sunk_into_a_side_is_pushed_back_out() {
        let square = Outline::rectangle(DVec2::new(3.0, 3.0), 1.0, 1.0);
        let mut ball = Ball::new(BallId(0), "b", DVec2::new(3.5, 2.8), DVec2::new(0.0, 1.0));
        assert_eq!(square.time_until_collision(&ball), 0.0);
        square.reflect(&mut ball, 1.0);
        assert!((ball.position().y - 2.75).abs() < 1e-12);
        assert!(ball.velocity().y < 0.0);
        assert!(square.time_until_collision(&ball).is_infinite());
    }

    #[test]
    fn ball_hitting_the_middle_of_a_side_uses_the_side() {
        let square = Outline::rectangle(DVec2::new(3.0, 3.0), 1.0, 1.0);
        let ball = Ball::new(BallId(0), "b", DVec2::new(3.5, 1.0), DVec2::new(0.0, 2.0));
        let (t, contact) = square.earliest(&ball).expect("contact");
        assert!(matches!(contact, Contact::Side(_)));
        assert!((t - 0.875).abs() < 1e-9);
    }
}
