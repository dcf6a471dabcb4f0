//! Geometry primitives - poses, colors and screen points
//!
//! These mirror what the tracking engine hands us. The core never does
//! camera math; it only carries values and rejects ones that cannot be
//! rendered (non-finite numbers, degenerate transforms).

/// Tolerance for the affine row check on a pose
const AFFINE_EPSILON: f32 = 1e-4;

/// 4×4 rigid transform in map coordinates, column-major
///
/// Column 3 holds the translation, matching the layout tracking engines
/// use for anchor transforms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub columns: [[f32; 4]; 4],
}

impl Pose {
    pub const IDENTITY: Pose = Pose {
        columns: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    pub fn from_columns(columns: [[f32; 4]; 4]) -> Self {
        Pose { columns }
    }

    /// Pure translation
    pub fn from_translation(x: f32, y: f32, z: f32) -> Self {
        let mut pose = Pose::IDENTITY;
        pose.columns[3] = [x, y, z, 1.0];
        pose
    }

    /// Translation component
    #[inline]
    pub fn translation(&self) -> [f32; 3] {
        let c = self.columns[3];
        [c[0], c[1], c[2]]
    }

    /// Flatten column by column
    pub fn to_array(&self) -> [f32; 16] {
        let mut out = [0.0f32; 16];
        for (i, col) in self.columns.iter().enumerate() {
            out[i * 4..i * 4 + 4].copy_from_slice(col);
        }
        out
    }

    pub fn from_array(values: [f32; 16]) -> Self {
        let mut columns = [[0.0f32; 4]; 4];
        for (i, col) in columns.iter_mut().enumerate() {
            col.copy_from_slice(&values[i * 4..i * 4 + 4]);
        }
        Pose { columns }
    }

    /// All components finite and the bottom row is (0, 0, 0, 1)
    pub fn is_valid(&self) -> bool {
        let finite = self.columns.iter().flatten().all(|v| v.is_finite());
        if !finite {
            return false;
        }
        let expected = [0.0, 0.0, 0.0, 1.0];
        self.columns
            .iter()
            .zip(expected)
            .all(|(col, e)| (col[3] - e).abs() <= AFFINE_EPSILON)
    }

    /// Distance between the translation components of two poses
    pub fn distance(&self, other: &Pose) -> f32 {
        let [ax, ay, az] = self.translation();
        let [bx, by, bz] = other.translation();
        let (dx, dy, dz) = (ax - bx, ay - by, az - bz);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

impl Default for Pose {
    fn default() -> Self {
        Pose::IDENTITY
    }
}

/// RGBA color, components in 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const RED: Color = Color::rgb(1.0, 0.0, 0.0);
    pub const GREEN: Color = Color::rgb(0.0, 1.0, 0.0);
    pub const BLUE: Color = Color::rgb(0.0, 0.0, 1.0);
    pub const YELLOW: Color = Color::rgb(1.0, 1.0, 0.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Color { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Color { r, g, b, a: 1.0 }
    }

    #[inline]
    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    #[inline]
    pub fn from_array(c: [f32; 4]) -> Self {
        Color::rgba(c[0], c[1], c[2], c[3])
    }

    pub fn is_valid(&self) -> bool {
        self.to_array()
            .iter()
            .all(|c| c.is_finite() && (0.0..=1.0).contains(c))
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

/// Point on the device screen, in view coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
}

impl ScreenPoint {
    pub fn new(x: f32, y: f32) -> Self {
        ScreenPoint { x, y }
    }
}
