//! Geometric primitives for layout reconstruction.
//!
//! Provides the 2D transformation matrix used to track the CTM while
//! replaying a page's operator list, plus the vertical-extent helper the
//! block gatherer uses to re-interleave images with text.

/// A 2D affine transformation matrix in PDF form.
///
/// Represents the matrix:
/// ```text
/// | a  b  0 |
/// | c  d  0 |
/// | e  f  1 |
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    /// Horizontal scaling / rotation component
    pub a: f32,
    /// Vertical shear / rotation component
    pub b: f32,
    /// Horizontal shear / rotation component
    pub c: f32,
    /// Vertical scaling / rotation component
    pub d: f32,
    /// Horizontal translation
    pub e: f32,
    /// Vertical translation
    pub f: f32,
}

impl Matrix {
    /// Create the identity matrix.
    pub fn identity() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
        }
    }

    /// Create a matrix from the 6-element array form used by PDF libraries.
    pub fn from_array(m: [f32; 6]) -> Self {
        Self {
            a: m[0],
            b: m[1],
            c: m[2],
            d: m[3],
            e: m[4],
            f: m[5],
        }
    }

    /// Multiply this matrix by another (self × other).
    ///
    /// Matrix concatenation per the PDF `cm` operator: the new matrix is
    /// applied before the existing transformation.
    pub fn multiply(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    /// Magnitude of the (a, c) column vector.
    pub fn x_magnitude(&self) -> f32 {
        (self.a * self.a + self.c * self.c).sqrt()
    }

    /// Magnitude of the (b, d) column vector.
    pub fn y_magnitude(&self) -> f32 {
        (self.b * self.b + self.d * self.d).sqrt()
    }

    /// Magnitude of the (a, b) row vector, used to undo font-scaled heights.
    pub fn ab_magnitude(&self) -> f32 {
        (self.a * self.a + self.b * self.b).sqrt()
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::identity()
    }
}

/// Stack of transformation matrices for save/restore tracking.
///
/// The PDF `q` and `Q` operators push and pop the graphics state; only the
/// CTM matters for image placement, so this stack tracks matrices alone.
#[derive(Debug, Clone)]
pub struct MatrixStack {
    stack: Vec<Matrix>,
    current: Matrix,
}

impl MatrixStack {
    /// Create a stack with the identity matrix as the current CTM.
    pub fn new() -> Self {
        Self {
            stack: Vec::new(),
            current: Matrix::identity(),
        }
    }

    /// Push the current CTM (the `q` operator).
    pub fn save(&mut self) {
        self.stack.push(self.current);
    }

    /// Pop the most recently saved CTM (the `Q` operator).
    ///
    /// An unbalanced restore leaves the current matrix unchanged, matching
    /// viewer behavior on malformed content streams.
    pub fn restore(&mut self) {
        if let Some(m) = self.stack.pop() {
            self.current = m;
        }
    }

    /// Concatenate a matrix onto the current CTM (the `cm` operator).
    pub fn concat(&mut self, m: [f32; 6]) {
        self.current = Matrix::from_array(m).multiply(&self.current);
    }

    /// The current CTM.
    pub fn current(&self) -> &Matrix {
        &self.current
    }
}

impl Default for MatrixStack {
    fn default() -> Self {
        Self::new()
    }
}

/// A vertical extent on the page, `top >= bottom` in PDF-up coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VSpan {
    /// Upper edge (larger Y)
    pub top: f32,
    /// Lower edge (smaller Y)
    pub bottom: f32,
}

impl VSpan {
    /// Create a vertical span, normalizing edge order.
    pub fn new(top: f32, bottom: f32) -> Self {
        if top >= bottom {
            Self { top, bottom }
        } else {
            Self {
                top: bottom,
                bottom: top,
            }
        }
    }

    /// Height of this span.
    pub fn height(&self) -> f32 {
        self.top - self.bottom
    }

    /// Vertical center of this span.
    pub fn center(&self) -> f32 {
        (self.top + self.bottom) / 2.0
    }

    /// Length of the overlap with another span, zero when disjoint.
    pub fn overlap(&self, other: &VSpan) -> f32 {
        (self.top.min(other.top) - self.bottom.max(other.bottom)).max(0.0)
    }

    /// Whether the overlap with `other` exceeds `fraction` of the average
    /// of the two heights.
    pub fn overlaps_by(&self, other: &VSpan, fraction: f32) -> bool {
        let avg_height = (self.height() + other.height()) / 2.0;
        avg_height > 0.0 && self.overlap(other) > avg_height * fraction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_multiply() {
        let id = Matrix::identity();
        let m = Matrix::from_array([2.0, 0.0, 0.0, 3.0, 5.0, 7.0]);
        assert_eq!(m.multiply(&id), m);
        assert_eq!(id.multiply(&m), m);
    }

    #[test]
    fn test_concat_scaling() {
        let mut stack = MatrixStack::new();
        stack.concat([2.0, 0.0, 0.0, 2.0, 0.0, 0.0]);
        stack.concat([3.0, 0.0, 0.0, 3.0, 0.0, 0.0]);
        assert_eq!(stack.current().a, 6.0);
        assert_eq!(stack.current().d, 6.0);
    }

    #[test]
    fn test_save_restore() {
        let mut stack = MatrixStack::new();
        stack.concat([2.0, 0.0, 0.0, 2.0, 0.0, 0.0]);
        stack.save();
        stack.concat([1.0, 0.0, 0.0, 1.0, 10.0, 20.0]);
        assert_eq!(stack.current().e, 10.0);
        stack.restore();
        assert_eq!(stack.current().e, 0.0);
        assert_eq!(stack.current().a, 2.0);
    }

    #[test]
    fn test_unbalanced_restore_is_ignored() {
        let mut stack = MatrixStack::new();
        stack.concat([2.0, 0.0, 0.0, 2.0, 0.0, 0.0]);
        stack.restore();
        assert_eq!(stack.current().a, 2.0);
    }

    #[test]
    fn test_magnitudes() {
        let m = Matrix::from_array([3.0, 4.0, 0.0, 5.0, 0.0, 0.0]);
        assert!((m.ab_magnitude() - 5.0).abs() < 1e-6);
        assert!((m.x_magnitude() - 3.0).abs() < 1e-6);
        assert!((m.y_magnitude() - (16.0f32 + 25.0).sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_vspan_overlap() {
        let a = VSpan::new(100.0, 80.0);
        let b = VSpan::new(90.0, 70.0);
        assert!((a.overlap(&b) - 10.0).abs() < 1e-6);
        assert!(a.overlaps_by(&b, 0.2));

        let c = VSpan::new(60.0, 40.0);
        assert_eq!(a.overlap(&c), 0.0);
        assert!(!a.overlaps_by(&c, 0.2));
    }

    #[test]
    fn test_vspan_normalizes_order() {
        let s = VSpan::new(10.0, 30.0);
        assert_eq!(s.top, 30.0);
        assert_eq!(s.bottom, 10.0);
        assert_eq!(s.height(), 20.0);
        assert_eq!(s.center(), 20.0);
    }
}
