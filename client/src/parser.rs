//! Board file loader.
//!
//! One declaration per line, `#` starts a comment, attributes are
//! `key=value` pairs in any order:
//!
//! ```text
//! board name=Default gravity=25.0
//! ball name=b x=1.5 y=2.0 xVelocity=0 yVelocity=0
//! leftFlipper name=lf x=4 y=10 orientation=90
//! absorber name=abs x=0 y=19 width=20 height=1
//! fire trigger=abs action=abs
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use glam::DVec2;
use pingball_shared::config::is_valid_name;

use crate::board::absorber::Absorber;
use crate::board::flipper_logic::{Flipper, FlipperSide};
use crate::board::gadget::{Bumper, BumperShape, GadgetKind};
use crate::board::{Board, BoardBuilder, Orientation, Physics};
use crate::error::ConfigError;

pub fn load_board(path: &Path) -> Result<Board, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_board(&text)
}

pub fn parse_board(text: &str) -> Result<Board, ConfigError> {
    let mut builder = BoardBuilder::default();
    let mut board_line = None;

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let body = raw.split('#').next().unwrap_or("").trim();
        if body.is_empty() {
            continue;
        }
        let body = tighten_equals(body);
        let mut tokens = body.split_whitespace();
        let Some(keyword) = tokens.next() else {
            continue;
        };
        let mut attrs = Attributes::parse(line, tokens)?;

        match keyword {
            "board" => {
                if board_line.is_some() {
                    return Err(ConfigError::DuplicateBoard { line });
                }
                board_line = Some(line);
                let defaults = Physics::default();
                builder.name(attrs.name()?).physics(Physics {
                    gravity: attrs.opt_float("gravity")?.unwrap_or(defaults.gravity),
                    mu: attrs.opt_float("friction1")?.unwrap_or(defaults.mu),
                    mu2: attrs.opt_float("friction2")?.unwrap_or(defaults.mu2),
                });
            }
            "ball" => {
                let name = attrs.name()?;
                let position = DVec2::new(attrs.float("x")?, attrs.float("y")?);
                let velocity = DVec2::new(attrs.float("xVelocity")?, attrs.float("yVelocity")?);
                builder.ball(name, position, velocity);
            }
            "squareBumper" | "circleBumper" | "triangleBumper" => {
                let name = attrs.name()?;
                let origin = attrs.cell()?;
                let shape = match keyword {
                    "squareBumper" => BumperShape::Square,
                    "circleBumper" => BumperShape::Circle,
                    _ => BumperShape::Triangle(attrs.orientation()?),
                };
                builder.gadget(name, GadgetKind::Bumper(Bumper::new(shape, origin)));
            }
            "leftFlipper" | "rightFlipper" => {
                let side = if keyword == "leftFlipper" {
                    FlipperSide::Left
                } else {
                    FlipperSide::Right
                };
                let name = attrs.name()?;
                let origin = attrs.cell()?;
                let flipper = Flipper::new(side, attrs.orientation()?, origin);
                builder.gadget(name, GadgetKind::Flipper(flipper));
            }
            "absorber" => {
                let name = attrs.name()?;
                let origin = attrs.cell()?;
                let absorber = Absorber::new(origin, attrs.int("width")?, attrs.int("height")?);
                builder.gadget(name, GadgetKind::Absorber(absorber));
            }
            "fire" => {
                let trigger = attrs.identifier("trigger")?;
                let action = attrs.identifier("action")?;
                builder.fire(trigger, action);
            }
            other => {
                return Err(syntax(line, format!("unknown declaration `{other}`")));
            }
        }
        attrs.finish()?;
    }

    if board_line.is_none() {
        return Err(ConfigError::MissingBoard);
    }
    builder.build()
}

fn syntax(line: usize, message: impl Into<String>) -> ConfigError {
    ConfigError::Syntax {
        line,
        message: message.into(),
    }
}

/// Drops whitespace around `=` so `x = 3` reads like `x=3`.
fn tighten_equals(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '=' {
            while out.ends_with(char::is_whitespace) {
                out.pop();
            }
            out.push('=');
            while chars.peek().is_some_and(|c| c.is_whitespace()) {
                chars.next();
            }
        } else {
            out.push(c);
        }
    }
    out
}

struct Attributes<'a> {
    line: usize,
    values: HashMap<&'a str, &'a str>,
}

impl<'a> Attributes<'a> {
    fn parse(line: usize, tokens: impl Iterator<Item = &'a str>) -> Result<Self, ConfigError> {
        let mut values = HashMap::new();
        for token in tokens {
            let (key, value) = token
                .split_once('=')
                .filter(|(k, v)| !k.is_empty() && !v.is_empty())
                .ok_or_else(|| syntax(line, format!("expected key=value, found `{token}`")))?;
            if values.insert(key, value).is_some() {
                return Err(syntax(line, format!("attribute `{key}` given twice")));
            }
        }
        Ok(Self { line, values })
    }

    fn take(&mut self, key: &str) -> Result<&'a str, ConfigError> {
        self.values
            .remove(key)
            .ok_or_else(|| syntax(self.line, format!("missing attribute `{key}`")))
    }

    fn identifier(&mut self, key: &str) -> Result<String, ConfigError> {
        let value = self.take(key)?;
        if !is_valid_name(value) {
            return Err(syntax(self.line, format!("invalid name `{value}`")));
        }
        Ok(value.to_string())
    }

    fn name(&mut self) -> Result<String, ConfigError> {
        self.identifier("name")
    }

    fn float(&mut self, key: &str) -> Result<f64, ConfigError> {
        let value = self.take(key)?;
        value
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| syntax(self.line, format!("`{key}` is not a number: `{value}`")))
    }

    fn opt_float(&mut self, key: &str) -> Result<Option<f64>, ConfigError> {
        if self.values.contains_key(key) {
            self.float(key).map(Some)
        } else {
            Ok(None)
        }
    }

    fn int(&mut self, key: &str) -> Result<u32, ConfigError> {
        let value = self.take(key)?;
        value.parse::<u32>().map_err(|_| {
            syntax(
                self.line,
                format!("`{key}` is not a non-negative integer: `{value}`"),
            )
        })
    }

    /// Top-left corner from integer `x` and `y`.
    fn cell(&mut self) -> Result<DVec2, ConfigError> {
        let x = self.int("x")?;
        let y = self.int("y")?;
        Ok(DVec2::new(f64::from(x), f64::from(y)))
    }

    fn orientation(&mut self) -> Result<Orientation, ConfigError> {
        if !self.values.contains_key("orientation") {
            return Ok(Orientation::Deg0);
        }
        let degrees = self.int("orientation")?;
        Orientation::from_degrees(degrees).ok_or_else(|| {
            syntax(
                self.line,
                format!("orientation must be 0, 90, 180 or 270, not {degrees}"),
            )
        })
    }

    fn finish(self) -> Result<(), ConfigError> {
        let mut leftover: Vec<&str> = self.values.into_keys().collect();
        leftover.sort_unstable();
        match leftover.first() {
            Some(key) => Err(syntax(self.line, format!("unknown attribute `{key}`"))),
            None => Ok(()),
        }
    }
}
