//! Hand-made 3×3 integer kernels for stroke directions and junctions of
//! handwritten digits.

pub type Kernel3 = [[i64; 3]; 3];

/// ─
pub const HORIZONTAL: Kernel3 = [[1, 1, 1], [0, 0, 0], [-1, -1, -1]];
/// │
pub const VERTICAL: Kernel3 = [[1, 0, -1], [1, 0, -1], [1, 0, -1]];
/// ╱
pub const SLASH: Kernel3 = [[-1, 1, 2], [1, 2, -1], [2, -1, -1]];
/// ╲
pub const BACKSLASH: Kernel3 = [[2, 1, -1], [-1, 2, 1], [-1, -1, 2]];
/// ┼
pub const CROSS: Kernel3 = [[-1, 1, -1], [1, 4, 1], [-1, 1, -1]];
/// ├
pub const VERTICAL_RIGHT: Kernel3 = [[2, -1, -2], [4, 2, 1], [2, -1, -2]];
/// ┤
pub const VERTICAL_LEFT: Kernel3 = [[-2, -1, 2], [1, 2, 4], [-2, -1, 2]];
/// ┌
pub const LEFT_TOP: Kernel3 = [[2, 1, 1], [1, -1, -1], [1, -1, -2]];
/// ┐
pub const RIGHT_TOP: Kernel3 = [[1, 1, 2], [-1, -1, 1], [-2, -1, 1]];
/// └
pub const LEFT_BOTTOM: Kernel3 = [[1, -1, -2], [1, -1, -1], [2, 1, 1]];
/// ┘
pub const RIGHT_BOTTOM: Kernel3 = [[-2, -1, 1], [-1, -1, 1], [1, 1, 2]];
/// <
pub const LESS: Kernel3 = [[-1, 1, -1], [2, -1, -2], [-1, 1, -1]];
/// ∠
pub const ANGLE: Kernel3 = [[-2, -1, 1], [-1, 1, -1], [2, 1, 1]];

/// Every predefined kernel with its name, in a stable order.
pub fn all() -> Vec<(&'static str, Kernel3)> {
    vec![
        ("horizontal", HORIZONTAL),
        ("vertical", VERTICAL),
        ("slash", SLASH),
        ("backslash", BACKSLASH),
        ("cross", CROSS),
        ("vertical_right", VERTICAL_RIGHT),
        ("vertical_left", VERTICAL_LEFT),
        ("left_top", LEFT_TOP),
        ("right_top", RIGHT_TOP),
        ("left_bottom", LEFT_BOTTOM),
        ("right_bottom", RIGHT_BOTTOM),
        ("less", LESS),
        ("angle", ANGLE),
    ]
}

pub fn to_kernel(kernel: &Kernel3) -> Vec<Vec<i64>> {
    kernel.iter().map(|row| row.to_vec()).collect()
}
