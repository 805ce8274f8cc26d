/// Default TCP port shared by client and server.
pub const DEFAULT_PORT: u16 = 10987;

/// Capacity of every inbound message queue (server router, client inbound).
pub const QUEUE_CAPACITY: usize = 100;

/// Board edge length in board units.
pub const BOARD_SIZE: u32 = 20;

/// Returns true if `name` is a legal board/ball/gadget identifier:
/// `[A-Za-z_][A-Za-z_0-9]*`.
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
