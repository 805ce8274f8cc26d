use glam::DVec2;
use pingball_client::board::absorber::LAUNCH_VELOCITY;
use pingball_client::board::gadget::GadgetKind;
use pingball_client::board::Board;
use pingball_client::error::SimulationError;
use pingball_client::parser::parse_board;
use pingball_client::render::render;
use pingball_shared::protocol::Direction;

fn assert_close(a: f64, b: f64) {
    assert!((a - b).abs() < 1e-9, "expected {b}, got {a}");
}

fn run_for(board: &mut Board, seconds: f64) {
    let mut elapsed = 0.0;
    while elapsed < seconds {
        elapsed += board.tick().unwrap().dt;
    }
}

fn flipper_board() -> Board {
    parse_board("board name=Flip\nleftFlipper name=f x=8 y=8 orientation=0\n").unwrap()
}

fn flipper_state(board: &Board) -> (bool, bool) {
    let f = board.gadget_id("f").unwrap();
    match board.gadget(f).kind() {
        GadgetKind::Flipper(flipper) => (flipper.is_fully_flipped(), flipper.shows_flipped()),
        other => panic!("expected a flipper, got {other:?}"),
    }
}

#[test]
fn triggered_flipper_finishes_its_sweep_within_a_second() {
    let mut board = flipper_board();
    let f = board.gadget_id("f").unwrap();
    board.trigger(f);
    run_for(&mut board, 1.0);
    assert_eq!(flipper_state(&board), (true, true));
    let rows: Vec<String> = render(&board).lines().map(str::to_string).collect();
    assert_eq!(&rows[9][9..11], "--");
}

#[test]
fn flipper_barely_started_still_renders_at_rest() {
    let mut board = flipper_board();
    let f = board.gadget_id("f").unwrap();
    board.trigger(f);
    run_for(&mut board, 0.002);
    assert_eq!(flipper_state(&board), (false, false));
    let rows: Vec<String> = render(&board).lines().map(str::to_string).collect();
    assert_eq!(&rows[9][9..10], "|");
    assert_eq!(&rows[10][9..10], "|");
}

#[test]
fn ball_crossing_a_merged_bottom_wall_is_handed_off_once() {
    let mut upper = parse_board(
        "board name=Upper gravity=0 friction1=0 friction2=0
ball name=drop x=7.0 y=18.0 xVelocity=0 yVelocity=10
",
    )
    .unwrap();
    upper.join(Direction::Bottom, "Lower");

    let mut handoffs = Vec::new();
    for _ in 0..1000 {
        handoffs.extend(upper.tick().unwrap().handoffs);
    }
    assert_eq!(handoffs.len(), 1);
    let (wall, ball) = &handoffs[0];
    assert_eq!(*wall, Direction::Bottom);
    assert_close(ball.position().y, 1.0);
    assert_close(ball.position().x, 7.0);
    assert_eq!(ball.velocity(), DVec2::new(0.0, 10.0));
    assert!(upper.balls().is_empty());

    let mut lower = parse_board("board name=Lower\n").unwrap();
    lower.join(Direction::Top, "Upper");
    lower.add_wire_ball(&ball.to_wire());
    assert_eq!(lower.balls().len(), 1);
}

#[test]
fn absorber_holds_a_ball_until_triggered_after_settling() {
    let mut board = parse_board(
        "board name=Abs gravity=0 friction1=0 friction2=0
absorber name=abs x=0 y=18 width=20 height=2
ball name=b x=5.5 y=15.0 xVelocity=0 yVelocity=10
",
    )
    .unwrap();

    run_for(&mut board, 0.5);
    assert!(board.balls()[0].is_captured());
    assert_eq!(board.balls()[0].position(), DVec2::new(22.0, 0.0));

    run_for(&mut board, 0.05);
    let abs = board.gadget_id("abs").unwrap();
    board.trigger(abs);
    let ball = &board.balls()[0];
    assert!(!ball.is_captured());
    assert_close(ball.position().x, 19.74);
    assert_close(ball.position().y, 17.74);
    assert_eq!(ball.velocity(), LAUNCH_VELOCITY);
}

#[test]
fn trigger_before_settling_launches_nothing() {
    let mut board = parse_board(
        "board name=Abs gravity=0 friction1=0 friction2=0
absorber name=abs x=0 y=10 width=20 height=10
ball name=b x=5.5 y=8.0 xVelocity=0 yVelocity=50
",
    )
    .unwrap();
    // Reaches the absorber after 35 ms; settling takes another 200 ms.
    run_for(&mut board, 0.05);
    assert!(board.balls()[0].is_captured());
    let abs = board.gadget_id("abs").unwrap();
    board.trigger(abs);
    assert!(board.balls()[0].is_captured());
}

#[test]
fn overflowing_an_absorber_is_fatal() {
    let mut text = String::from(
        "board name=Full gravity=0 friction1=0 friction2=0\nabsorber name=abs x=0 y=19 width=20 height=1\n",
    );
    for i in 0..101 {
        let x = 0.3 + (i % 50) as f64 * 0.39;
        let y = 17.0 - (i / 50) as f64 * 2.0;
        text.push_str(&format!("ball name=b{i} x={x} y={y} xVelocity=0 yVelocity=5\n"));
    }
    let mut board = parse_board(&text).unwrap();
    let mut result = Ok(());
    for _ in 0..5000 {
        if let Err(e) = board.tick() {
            result = Err(e);
            break;
        }
    }
    assert!(matches!(
        result,
        Err(SimulationError::AbsorberOverflow { ref name, capacity: 100 }) if name == "abs"
    ));
}

#[test]
fn ball_radius_never_changes() {
    let mut board = parse_board(
        "board name=R
squareBumper name=s x=5 y=10
ball name=b x=5.5 y=2.0 xVelocity=0.5 yVelocity=0
",
    )
    .unwrap();
    for _ in 0..2000 {
        board.tick().unwrap();
        assert!(board.balls().iter().all(|b| b.radius() == 0.25));
    }
}

#[test]
fn bumper_hit_fires_its_target() {
    let mut board = parse_board(
        "board name=T gravity=0 friction1=0 friction2=0
squareBumper name=s x=5 y=10
leftFlipper name=f x=12 y=12
ball name=b x=5.5 y=5.0 xVelocity=0 yVelocity=10
fire trigger=s action=f
",
    )
    .unwrap();
    run_for(&mut board, 0.6);
    assert!(board.balls()[0].velocity().y < 0.0);
    assert!(flipper_state_named(&board, "f"));
}

fn flipper_state_named(board: &Board, name: &str) -> bool {
    let id = board.gadget_id(name).unwrap();
    match board.gadget(id).kind() {
        GadgetKind::Flipper(flipper) => flipper.is_rotating() || flipper.is_fully_flipped(),
        _ => false,
    }
}
