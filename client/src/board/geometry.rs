use glam::DVec2;

/// Times below this are treated as "colliding now".
pub const COLLISION_EPSILON: f64 = 1e-6;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    pub from: DVec2,
    pub to: DVec2,
    /// Fixed unit normal for one-sided faces; `None` means the segment
    /// can be hit from either side.
    pub outward: Option<DVec2>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CircleDef {
    pub center: DVec2,
    pub radius: f64,
}

impl Segment {
    pub fn new(from: DVec2, to: DVec2) -> Self {
        Self {
            from,
            to,
            outward: None,
        }
    }

    /// A face that only collides from the side `outward` points to.
    pub fn facing(from: DVec2, to: DVec2, outward: DVec2) -> Self {
        Self {
            from,
            to,
            outward: Some(outward.normalize_or_zero()),
        }
    }

    /// Collision normal for a ball centred at `point`: the fixed outward
    /// normal of a face, otherwise the side `point` is on.
    pub fn normal_for(&self, point: DVec2) -> DVec2 {
        if let Some(outward) = self.outward {
            return outward;
        }
        let n = (self.to - self.from).perp().normalize_or_zero();
        if (point - self.from).dot(n) < 0.0 {
            -n
        } else {
            n
        }
    }

    pub fn closest_point(&self, point: DVec2) -> DVec2 {
        let d = self.to - self.from;
        let len2 = d.length_squared();
        if len2 == 0.0 {
            return self.from;
        }
        let s = ((point - self.from).dot(d) / len2).clamp(0.0, 1.0);
        self.from + d * s
    }
}

impl CircleDef {
    pub fn point(center: DVec2) -> Self {
        Self {
            center,
            radius: 0.0,
        }
    }
}

/// Time until `ball`, moving at `vel`, first touches the interior of `seg`.
/// Endpoint contacts are left to zero-radius corner circles.
pub fn time_until_segment_collision(seg: Segment, ball: CircleDef, vel: DVec2) -> f64 {
    let d = seg.to - seg.from;
    let len2 = d.length_squared();
    if len2 == 0.0 {
        return f64::INFINITY;
    }
    let n = seg.normal_for(ball.center);
    let dist = (ball.center - seg.from).dot(n);
    let approach = -vel.dot(n);
    // A centre more than a radius behind a face belongs to another side.
    if approach <= 0.0 || dist < -ball.radius {
        return f64::INFINITY;
    }
    let t = ((dist - ball.radius) / approach).max(0.0);
    let contact = ball.center + vel * t;
    let s = (contact - seg.from).dot(d) / len2;
    if (0.0..=1.0).contains(&s) {
        t
    } else {
        f64::INFINITY
    }
}

/// Time until two circles touch, given their relative motion.
fn time_until_contact(offset: DVec2, rel_vel: DVec2, reach: f64) -> f64 {
    let a = rel_vel.length_squared();
    let b = 2.0 * offset.dot(rel_vel);
    if a == 0.0 || b >= 0.0 {
        return f64::INFINITY;
    }
    let c = offset.length_squared() - reach * reach;
    if c <= 0.0 {
        return 0.0;
    }
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return f64::INFINITY;
    }
    ((-b - disc.sqrt()) / (2.0 * a)).max(0.0)
}

pub fn time_until_circle_collision(circle: CircleDef, ball: CircleDef, vel: DVec2) -> f64 {
    time_until_contact(ball.center - circle.center, vel, circle.radius + ball.radius)
}

pub fn time_until_ball_ball_collision(a: CircleDef, va: DVec2, b: CircleDef, vb: DVec2) -> f64 {
    time_until_contact(b.center - a.center, vb - va, a.radius + b.radius)
}

fn reflect_about(normal: DVec2, vel: DVec2, coeff: f64) -> DVec2 {
    let vn = normal * vel.dot(normal);
    (vel - vn) - vn * coeff
}

pub fn reflect_segment(seg: Segment, ball_center: DVec2, vel: DVec2, coeff: f64) -> DVec2 {
    reflect_about(seg.normal_for(ball_center), vel, coeff)
}

pub fn reflect_circle(center: DVec2, ball_center: DVec2, vel: DVec2, coeff: f64) -> DVec2 {
    let n = (ball_center - center).normalize_or_zero();
    if n == DVec2::ZERO {
        return vel;
    }
    reflect_about(n, vel, coeff)
}

/// Reflects off a surface point `contact` (outward normal `normal`) that is
/// rotating about `pivot` at `omega` rad/s. The reflection happens in the
/// surface's frame; if that leaves the ball still closing on the surface,
/// the plain static reflection is used so the contact always separates.
fn reflect_rotating(
    contact: DVec2,
    normal: DVec2,
    pivot: DVec2,
    omega: f64,
    vel: DVec2,
    coeff: f64,
) -> DVec2 {
    let surface = (contact - pivot).perp() * omega;
    let rel = vel - surface;
    let out = if rel.dot(normal) < 0.0 {
        reflect_about(normal, rel, coeff) + surface
    } else {
        vel
    };
    if out.dot(normal) <= 0.0 {
        reflect_about(normal, vel, coeff)
    } else {
        out
    }
}

pub fn reflect_rotating_segment(
    seg: Segment,
    pivot: DVec2,
    omega: f64,
    ball: CircleDef,
    vel: DVec2,
    coeff: f64,
) -> DVec2 {
    let contact = seg.closest_point(ball.center);
    reflect_rotating(contact, seg.normal_for(ball.center), pivot, omega, vel, coeff)
}

pub fn reflect_rotating_circle(
    circle: CircleDef,
    pivot: DVec2,
    omega: f64,
    ball: CircleDef,
    vel: DVec2,
    coeff: f64,
) -> DVec2 {
    let normal = (ball.center - circle.center).normalize_or_zero();
    if normal == DVec2::ZERO {
        return vel;
    }
    let contact = circle.center + normal * circle.radius;
    reflect_rotating(contact, normal, pivot, omega, vel, coeff)
}

/// Equal-mass elastic collision: the normal components are exchanged.
pub fn reflect_balls(pa: DVec2, va: DVec2, pb: DVec2, vb: DVec2) -> (DVec2, DVec2) {
    let n = (pb - pa).normalize_or_zero();
    let an = va.dot(n);
    let bn = vb.dot(n);
    (va + n * (bn - an), vb + n * (an - bn))
}

/// Centre that puts `ball` exactly in contact with `seg` if it overlaps.
pub fn push_out_of_segment(seg: Segment, ball: CircleDef) -> DVec2 {
    let n = seg.normal_for(ball.center);
    let dist = (ball.center - seg.from).dot(n);
    if dist < ball.radius {
        ball.center + n * (ball.radius - dist)
    } else {
        ball.center
    }
}

/// Centre that puts `ball` exactly in contact with `circle` if it overlaps.
pub fn push_out_of_circle(circle: CircleDef, ball: CircleDef) -> DVec2 {
    let offset = ball.center - circle.center;
    let reach = circle.radius + ball.radius;
    let len = offset.length();
    if len >= reach || len == 0.0 {
        return ball.center;
    }
    circle.center + offset / len * reach
}

/// Moves two overlapping balls apart along their centre line, each by half
/// the overlap.
pub fn separate_balls(a: CircleDef, b: CircleDef) -> (DVec2, DVec2) {
    let offset = b.center - a.center;
    let reach = a.radius + b.radius;
    let len = offset.length();
    if len >= reach || len == 0.0 {
        return (a.center, b.center);
    }
    let shift = offset / len * ((reach - len) / 2.0);
    (a.center - shift, b.center + shift)
}

/// Rotates `point` about `center` by `angle` radians (y grows downward).
pub fn rotate_around(point: DVec2, center: DVec2, angle: f64) -> DVec2 {
    let (sin, cos) = angle.sin_cos();
    let r = point - center;
    center + DVec2::new(r.x * cos - r.y * sin, r.x * sin + r.y * cos)
}

/// Exact quarter turn of `point` about `center`; `positive` matches a
/// `rotate_around` by +pi/2.
pub fn quarter_turn(point: DVec2, center: DVec2, positive: bool) -> DVec2 {
    let r = point - center;
    let turned = if positive {
        DVec2::new(-r.y, r.x)
    } else {
        DVec2::new(r.y, -r.x)
    };
    center + turned
}
