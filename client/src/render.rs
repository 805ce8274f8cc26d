use pingball_shared::config::BOARD_SIZE;
use pingball_shared::protocol::Direction;

use crate::board::flipper_logic::FLIPPER_SIZE;
use crate::board::gadget::{BumperShape, GadgetKind};
use crate::board::{Board, Orientation};

const SIZE: usize = BOARD_SIZE as usize;
/// Playfield plus one wall character on each side.
pub const FRAME: usize = SIZE + 2;

/// Draws the board as 22 lines of 22 characters, each ending in `\n`.
///
/// Solid walls are `.`; an invisible wall shows its neighbor's name,
/// centered and padded with dots.
pub fn render(board: &Board) -> String {
    let mut cells = [[' '; SIZE]; SIZE];

    for gadget in board.gadgets() {
        match gadget.kind() {
            GadgetKind::Wall(_) => {}
            GadgetKind::Bumper(bumper) => {
                let (x, y) = cell(bumper.origin().x, bumper.origin().y);
                cells[y][x] = match bumper.shape() {
                    BumperShape::Square => '#',
                    BumperShape::Circle => '0',
                    BumperShape::Triangle(Orientation::Deg0 | Orientation::Deg180) => '/',
                    BumperShape::Triangle(_) => '\\',
                };
            }
            GadgetKind::Flipper(flipper) => {
                let (x, y) = cell(flipper.origin().x, flipper.origin().y);
                let far = FLIPPER_SIZE as usize - 1;
                let (glyph, spots) = match flipper.rendered_edge() {
                    Direction::Top => ('-', [(x, y), (x + far, y)]),
                    Direction::Bottom => ('-', [(x, y + far), (x + far, y + far)]),
                    Direction::Left => ('|', [(x, y), (x, y + far)]),
                    Direction::Right => ('|', [(x + far, y), (x + far, y + far)]),
                };
                for (cx, cy) in spots {
                    if cx < SIZE && cy < SIZE {
                        cells[cy][cx] = glyph;
                    }
                }
            }
            GadgetKind::Absorber(absorber) => {
                let (x, y) = cell(absorber.origin().x, absorber.origin().y);
                let right = (x + absorber.width() as usize).min(SIZE);
                let bottom = (y + absorber.height() as usize).min(SIZE);
                for row in &mut cells[y..bottom] {
                    for c in &mut row[x..right] {
                        *c = '=';
                    }
                }
            }
        }
    }

    for ball in board.balls().iter().filter(|b| !b.is_captured()) {
        let (x, y) = cell(ball.position().x, ball.position().y);
        cells[y][x] = '*';
    }

    let left = side_label(board.neighbor(Direction::Left));
    let right = side_label(board.neighbor(Direction::Right));

    let mut out = String::with_capacity(FRAME * (FRAME + 1));
    out.extend(edge_label(board.neighbor(Direction::Top)));
    out.push('\n');
    for (row, line) in cells.iter().enumerate() {
        out.push(left[row]);
        out.extend(line.iter());
        out.push(right[row]);
        out.push('\n');
    }
    out.extend(edge_label(board.neighbor(Direction::Bottom)));
    out.push('\n');
    out
}

/// Grid cell holding the point, clamped onto the playfield.
fn cell(x: f64, y: f64) -> (usize, usize) {
    let clamp = |v: f64| (v.floor().max(0.0) as usize).min(SIZE - 1);
    (clamp(x), clamp(y))
}

/// Top or bottom row: `FRAME` characters.
fn edge_label(neighbor: Option<&str>) -> Vec<char> {
    match neighbor {
        None => vec!['.'; FRAME],
        Some(name) => pad_centered(name, SIZE, FRAME),
    }
}

/// Left or right column: one character per playfield row.
fn side_label(neighbor: Option<&str>) -> Vec<char> {
    match neighbor {
        None => vec!['.'; SIZE],
        Some(name) => pad_centered(name, SIZE, SIZE),
    }
}

/// At most `max` characters of `name`, centered in `width` dots. Odd
/// padding puts the extra dot after the name.
fn pad_centered(name: &str, max: usize, width: usize) -> Vec<char> {
    let text: Vec<char> = name.chars().take(max).collect();
    let spare = width - text.len();
    let before = spare / 2;
    let mut out = vec!['.'; before];
    out.extend(text);
    out.resize(width, '.');
    out
}
