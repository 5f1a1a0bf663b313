pub const PI_D: f32 = std::f32::consts::PI * 2.0;
pub const PI_H: f32 = std::f32::consts::PI * 0.5;
pub const PI_Q: f32 = std::f32::consts::PI * 0.25;
pub const RAD_DEG: f32 = 180.0 / std::f32::consts::PI;
pub const DEG_RAD: f32 = std::f32::consts::PI / 180.0;

/// Maps any angle to the (-PI, PI] range.
pub fn normalize_radian(value: f32) -> f32 {
    let mut value = (value + std::f32::consts::PI) % PI_D;
    value += if value > 0.0 {
        -std::f32::consts::PI
    } else {
        std::f32::consts::PI
    };
    value
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn clear(&mut self) {
        self.x = 0.0;
        self.y = 0.0;
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Rectangle {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rectangle {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// 2D affine matrix, column basis `[a c tx; b d ty]`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub tx: f32,
    pub ty: f32,
}

impl Default for Matrix {
    fn default() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            tx: 0.0,
            ty: 0.0,
        }
    }
}

impl Matrix {
    pub fn identity(&mut self) {
        *self = Self::default();
    }

    pub fn copy_from(&mut self, value: &Matrix) {
        *self = *value;
    }

    pub fn copy_from_array(&mut self, value: &[f32], offset: usize) {
        self.a = value[offset];
        self.b = value[offset + 1];
        self.c = value[offset + 2];
        self.d = value[offset + 3];
        self.tx = value[offset + 4];
        self.ty = value[offset + 5];
    }

    /// Multiplies in place: `self = self * value`.
    pub fn concat(&mut self, value: &Matrix) {
        let mut a = self.a * value.a;
        let mut b = 0.0;
        let mut c = 0.0;
        let mut d = self.d * value.d;
        let mut tx = self.tx * value.a + value.tx;
        let mut ty = self.ty * value.d + value.ty;

        if self.b != 0.0 || self.c != 0.0 {
            a += self.b * value.c;
            b += self.b * value.d;
            c += self.c * value.a;
            d += self.c * value.b;
        }

        if value.b != 0.0 || value.c != 0.0 {
            b += self.a * value.b;
            c += self.d * value.c;
            tx += self.ty * value.c;
            ty += self.tx * value.b;
        }

        self.a = a;
        self.b = b;
        self.c = c;
        self.d = d;
        self.tx = tx;
        self.ty = ty;
    }

    pub fn invert(&mut self) {
        let a = self.a;
        let b = self.b;
        let c = self.c;
        let d = self.d;
        let tx = self.tx;
        let ty = self.ty;

        if b == 0.0 && c == 0.0 {
            self.b = 0.0;
            self.c = 0.0;
            if a == 0.0 || d == 0.0 {
                self.a = 0.0;
                self.b = 0.0;
                self.tx = 0.0;
                self.ty = 0.0;
            } else {
                self.a = 1.0 / a;
                self.d = 1.0 / d;
                self.tx = -self.a * tx;
                self.ty = -self.d * ty;
            }
            return;
        }

        let determinant = a * d - b * c;
        if determinant == 0.0 {
            self.a = 1.0;
            self.d = 1.0;
            self.b = 0.0;
            self.c = 0.0;
            self.tx = 0.0;
            self.ty = 0.0;
            return;
        }

        let determinant = 1.0 / determinant;
        self.a = d * determinant;
        self.b = -b * determinant;
        self.c = -c * determinant;
        self.d = a * determinant;
        self.tx = -(self.a * tx + self.c * ty);
        self.ty = -(self.b * tx + self.d * ty);
    }

    pub fn transform_point(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.tx,
            self.b * x + self.d * y + self.ty,
        )
    }

    /// Like [`Matrix::transform_point`] but ignores translation.
    pub fn transform_delta(&self, x: f32, y: f32) -> (f32, f32) {
        (self.a * x + self.c * y, self.b * x + self.d * y)
    }

    pub fn determinant(&self) -> f32 {
        self.a * self.d - self.b * self.c
    }

    /// Replaces `rectangle` with the integer AABB of its transformed corners.
    pub fn transform_rectangle(&self, rectangle: &mut Rectangle) {
        let a = self.a;
        let b = self.b;
        let c = self.c;
        let d = self.d;
        let tx = self.tx;
        let ty = self.ty;

        let x = rectangle.x;
        let y = rectangle.y;
        let x_max = x + rectangle.width;
        let y_max = y + rectangle.height;

        let mut x0 = a * x + c * y + tx;
        let mut y0 = b * x + d * y + ty;
        let mut x1 = a * x_max + c * y + tx;
        let mut y1 = b * x_max + d * y + ty;
        let mut x2 = a * x_max + c * y_max + tx;
        let mut y2 = b * x_max + d * y_max + ty;
        let mut x3 = a * x + c * y_max + tx;
        let mut y3 = b * x + d * y_max + ty;

        if x0 > x1 {
            std::mem::swap(&mut x0, &mut x1);
        }
        if x2 > x3 {
            std::mem::swap(&mut x2, &mut x3);
        }

        rectangle.x = (if x0 < x2 { x0 } else { x2 }).floor();
        rectangle.width = ((if x1 > x3 { x1 } else { x3 }) - rectangle.x).ceil();

        if y0 > y1 {
            std::mem::swap(&mut y0, &mut y1);
        }
        if y2 > y3 {
            std::mem::swap(&mut y2, &mut y3);
        }

        rectangle.y = (if y0 < y2 { y0 } else { y2 }).floor();
        rectangle.height = ((if y1 > y3 { y1 } else { y3 }) - rectangle.y).ceil();
    }
}

/// Decomposed 2D transform. Angles in radians.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Transform {
    pub x: f32,
    pub y: f32,
    pub skew: f32,
    pub rotation: f32,
    pub scale_x: f32,
    pub scale_y: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            skew: 0.0,
            rotation: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }
}

impl Transform {
    pub fn identity(&mut self) {
        *self = Self::default();
    }

    pub fn copy_from(&mut self, value: &Transform) {
        *self = *value;
    }

    pub fn add(&mut self, value: &Transform) {
        self.x += value.x;
        self.y += value.y;
        self.skew += value.skew;
        self.rotation += value.rotation;
        self.scale_x *= value.scale_x;
        self.scale_y *= value.scale_y;
    }

    pub fn minus(&mut self, value: &Transform) {
        self.x -= value.x;
        self.y -= value.y;
        self.skew -= value.skew;
        self.rotation -= value.rotation;
        self.scale_x /= value.scale_x;
        self.scale_y /= value.scale_y;
    }

    /// Decomposes `matrix` into this transform. The previous scale signs
    /// disambiguate the two equivalent (scale, rotation) solutions.
    pub fn from_matrix(&mut self, matrix: &Matrix) {
        let backup_scale_x = self.scale_x;
        let backup_scale_y = self.scale_y;

        self.x = matrix.tx;
        self.y = matrix.ty;
        self.rotation = (matrix.b / matrix.a).atan();
        let mut skew_x = (-matrix.c / matrix.d).atan();

        self.scale_x = if self.rotation > -PI_Q && self.rotation < PI_Q {
            matrix.a / self.rotation.cos()
        } else {
            matrix.b / self.rotation.sin()
        };
        self.scale_y = if skew_x > -PI_Q && skew_x < PI_Q {
            matrix.d / skew_x.cos()
        } else {
            -matrix.c / skew_x.sin()
        };

        if backup_scale_x >= 0.0 && self.scale_x < 0.0 {
            self.scale_x = -self.scale_x;
            self.rotation -= std::f32::consts::PI;
        }

        if backup_scale_y >= 0.0 && self.scale_y < 0.0 {
            self.scale_y = -self.scale_y;
            skew_x -= std::f32::consts::PI;
        }

        self.skew = skew_x - self.rotation;
    }

    pub fn to_matrix(&self, matrix: &mut Matrix) {
        if self.rotation == 0.0 {
            matrix.a = 1.0;
            matrix.b = 0.0;
        } else {
            matrix.a = self.rotation.cos();
            matrix.b = self.rotation.sin();
        }

        if self.skew == 0.0 {
            matrix.c = -matrix.b;
            matrix.d = matrix.a;
        } else {
            matrix.c = -(self.skew + self.rotation).sin();
            matrix.d = (self.skew + self.rotation).cos();
        }

        if self.scale_x != 1.0 {
            matrix.a *= self.scale_x;
            matrix.b *= self.scale_x;
        }

        if self.scale_y != 1.0 {
            matrix.c *= self.scale_y;
            matrix.d *= self.scale_y;
        }

        matrix.tx = self.x;
        matrix.ty = self.y;
    }
}

/// Per-channel color multipliers and offsets, RGBA.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ColorTransform {
    pub alpha_multiplier: f32,
    pub red_multiplier: f32,
    pub green_multiplier: f32,
    pub blue_multiplier: f32,
    pub alpha_offset: f32,
    pub red_offset: f32,
    pub green_offset: f32,
    pub blue_offset: f32,
}

impl Default for ColorTransform {
    fn default() -> Self {
        Self {
            alpha_multiplier: 1.0,
            red_multiplier: 1.0,
            green_multiplier: 1.0,
            blue_multiplier: 1.0,
            alpha_offset: 0.0,
            red_offset: 0.0,
            green_offset: 0.0,
            blue_offset: 0.0,
        }
    }
}

impl ColorTransform {
    pub fn identity(&mut self) {
        *self = Self::default();
    }

    pub fn copy_from(&mut self, value: &ColorTransform) {
        *self = *value;
    }
}

// Segment/shape intersection helpers below share one return contract:
// -1 means the segment lies fully inside, 0 disjoint, 1 only the end point
// inside, 2 only the start point inside, 3+ crossing with both end points
// outside. Out-params receive the nearest (A) and farthest (B) intersection
// measured from the segment start, and the boundary tangent normals.

const OUT_CODE_LEFT: u32 = 1;
const OUT_CODE_RIGHT: u32 = 2;
const OUT_CODE_TOP: u32 = 4;
const OUT_CODE_BOTTOM: u32 = 8;

fn compute_out_code(x: f32, y: f32, x_min: f32, y_min: f32, x_max: f32, y_max: f32) -> u32 {
    let mut code = 0;

    if x < x_min {
        code |= OUT_CODE_LEFT;
    } else if x > x_max {
        code |= OUT_CODE_RIGHT;
    }

    if y < y_min {
        code |= OUT_CODE_TOP;
    } else if y > y_max {
        code |= OUT_CODE_BOTTOM;
    }

    code
}

pub fn rectangle_contains_point(x: f32, y: f32, width: f32, height: f32) -> bool {
    let width_h = width * 0.5;
    if x >= -width_h && x <= width_h {
        let height_h = height * 0.5;
        if y >= -height_h && y <= height_h {
            return true;
        }
    }
    false
}

pub fn ellipse_contains_point(x: f32, y: f32, width: f32, height: f32) -> bool {
    let width_h = width * 0.5;
    if x >= -width_h && x <= width_h {
        let height_h = height * 0.5;
        if y >= -height_h && y <= height_h {
            let y = y * (width_h / height_h);
            return (x * x + y * y).sqrt() <= width_h;
        }
    }
    false
}

pub fn polygon_contains_point(x: f32, y: f32, vertices: &[f32]) -> bool {
    let mut is_in_side = false;
    let count = vertices.len();
    if count < 6 {
        return false;
    }

    let mut i_p = count - 2;
    let mut i = 0;
    while i < count {
        let y_a = vertices[i_p + 1];
        let y_b = vertices[i + 1];
        if (y_b < y && y_a >= y) || (y_a < y && y_b >= y) {
            let x_a = vertices[i_p];
            let x_b = vertices[i];
            if (y - y_b) * (x_a - x_b) / (y_a - y_b) + x_b < x {
                is_in_side = !is_in_side;
            }
        }
        i_p = i;
        i += 2;
    }

    is_in_side
}

#[allow(clippy::too_many_arguments)]
pub fn segment_intersects_rectangle(
    mut x_a: f32,
    mut y_a: f32,
    mut x_b: f32,
    mut y_b: f32,
    x_min: f32,
    y_min: f32,
    x_max: f32,
    y_max: f32,
    mut intersection_point_a: Option<&mut Point>,
    mut intersection_point_b: Option<&mut Point>,
    mut normal_radians: Option<&mut Point>,
) -> i32 {
    let in_side_a = x_a > x_min && x_a < x_max && y_a > y_min && y_a < y_max;
    let in_side_b = x_b > x_min && x_b < x_max && y_b > y_min && y_b < y_max;

    if in_side_a && in_side_b {
        return -1;
    }

    let mut intersection_count = 0;
    let mut out_code_a = compute_out_code(x_a, y_a, x_min, y_min, x_max, y_max);
    let mut out_code_b = compute_out_code(x_b, y_b, x_min, y_min, x_max, y_max);

    loop {
        if (out_code_a | out_code_b) == 0 {
            intersection_count = 2;
            break;
        }
        if (out_code_a & out_code_b) != 0 {
            break;
        }

        let mut x = 0.0;
        let mut y = 0.0;
        let mut normal_radian = 0.0;
        let out_code_out = if out_code_a != 0 { out_code_a } else { out_code_b };

        if (out_code_out & OUT_CODE_TOP) != 0 {
            x = x_a + (x_b - x_a) * (y_min - y_a) / (y_b - y_a);
            y = y_min;
            if normal_radians.is_some() {
                normal_radian = -PI_H;
            }
        } else if (out_code_out & OUT_CODE_BOTTOM) != 0 {
            x = x_a + (x_b - x_a) * (y_max - y_a) / (y_b - y_a);
            y = y_max;
            if normal_radians.is_some() {
                normal_radian = PI_H;
            }
        } else if (out_code_out & OUT_CODE_RIGHT) != 0 {
            y = y_a + (y_b - y_a) * (x_max - x_a) / (x_b - x_a);
            x = x_max;
            if normal_radians.is_some() {
                normal_radian = 0.0;
            }
        } else if (out_code_out & OUT_CODE_LEFT) != 0 {
            y = y_a + (y_b - y_a) * (x_min - x_a) / (x_b - x_a);
            x = x_min;
            if normal_radians.is_some() {
                normal_radian = std::f32::consts::PI;
            }
        }

        if out_code_out == out_code_a {
            x_a = x;
            y_a = y;
            out_code_a = compute_out_code(x_a, y_a, x_min, y_min, x_max, y_max);
            if let Some(normals) = normal_radians.as_deref_mut() {
                normals.x = normal_radian;
            }
        } else {
            x_b = x;
            y_b = y;
            out_code_b = compute_out_code(x_b, y_b, x_min, y_min, x_max, y_max);
            if let Some(normals) = normal_radians.as_deref_mut() {
                normals.y = normal_radian;
            }
        }
    }

    if intersection_count != 0 {
        if in_side_a {
            intersection_count = 2;
            if let Some(point) = intersection_point_a.as_deref_mut() {
                point.x = x_b;
                point.y = y_b;
            }
            if let Some(point) = intersection_point_b.as_deref_mut() {
                point.x = x_b;
                point.y = y_b;
            }
            if let Some(normals) = normal_radians.as_deref_mut() {
                normals.x = normals.y + std::f32::consts::PI;
            }
        } else if in_side_b {
            intersection_count = 1;
            if let Some(point) = intersection_point_a.as_deref_mut() {
                point.x = x_a;
                point.y = y_a;
            }
            if let Some(point) = intersection_point_b.as_deref_mut() {
                point.x = x_a;
                point.y = y_a;
            }
            if let Some(normals) = normal_radians.as_deref_mut() {
                normals.y = normals.x + std::f32::consts::PI;
            }
        } else {
            intersection_count = 3;
            if let Some(point) = intersection_point_a.as_deref_mut() {
                point.x = x_a;
                point.y = y_a;
            }
            if let Some(point) = intersection_point_b.as_deref_mut() {
                point.x = x_b;
                point.y = y_b;
            }
        }
    }

    intersection_count
}

#[allow(clippy::too_many_arguments)]
pub fn segment_intersects_ellipse(
    x_a: f32,
    y_a: f32,
    x_b: f32,
    y_b: f32,
    x_c: f32,
    y_c: f32,
    width_h: f32,
    height_h: f32,
    mut intersection_point_a: Option<&mut Point>,
    mut intersection_point_b: Option<&mut Point>,
    mut normal_radians: Option<&mut Point>,
) -> i32 {
    let d = width_h / height_h;
    let dd = d * d;

    let y_a = y_a * d;
    let y_b = y_b * d;

    let d_x = x_b - x_a;
    let d_y = y_b - y_a;
    let l_ab = (d_x * d_x + d_y * d_y).sqrt();
    let x_d = d_x / l_ab;
    let y_d = d_y / l_ab;
    let a = (x_c - x_a) * x_d + (y_c - y_a) * y_d;
    let aa = a * a;
    let ee = x_a * x_a + y_a * y_a;
    let rr = width_h * width_h;
    let d_r = rr - ee + aa;
    let mut intersection_count = 0;

    if d_r >= 0.0 {
        let d_t = d_r.sqrt();
        let s_a = a - d_t;
        let s_b = a + d_t;
        let in_side_a: i32 = if s_a < 0.0 {
            -1
        } else if s_a <= l_ab {
            0
        } else {
            1
        };
        let in_side_b: i32 = if s_b < 0.0 {
            -1
        } else if s_b <= l_ab {
            0
        } else {
            1
        };
        let side_ab = in_side_a * in_side_b;

        if side_ab < 0 {
            return -1;
        }

        if side_ab == 0 {
            if in_side_a == -1 {
                intersection_count = 2;
                let x = x_a + s_b * x_d;
                let y = (y_a + s_b * y_d) / d;
                if let Some(point) = intersection_point_a.as_deref_mut() {
                    point.x = x;
                    point.y = y;
                }
                if let Some(point) = intersection_point_b.as_deref_mut() {
                    point.x = x;
                    point.y = y;
                }
                if let Some(normals) = normal_radians.as_deref_mut() {
                    normals.x = (y / rr * dd).atan2(x / rr);
                    normals.y = normals.x + std::f32::consts::PI;
                }
            } else if in_side_b == 1 {
                intersection_count = 1;
                let x = x_a + s_a * x_d;
                let y = (y_a + s_a * y_d) / d;
                if let Some(point) = intersection_point_a.as_deref_mut() {
                    point.x = x;
                    point.y = y;
                }
                if let Some(point) = intersection_point_b.as_deref_mut() {
                    point.x = x;
                    point.y = y;
                }
                if let Some(normals) = normal_radians.as_deref_mut() {
                    normals.x = (y / rr * dd).atan2(x / rr);
                    normals.y = normals.x + std::f32::consts::PI;
                }
            } else {
                intersection_count = 3;
                if let Some(point) = intersection_point_a.as_deref_mut() {
                    point.x = x_a + s_a * x_d;
                    point.y = (y_a + s_a * y_d) / d;
                    if let Some(normals) = normal_radians.as_deref_mut() {
                        normals.x = (point.y / rr * dd).atan2(point.x / rr);
                    }
                }
                if let Some(point) = intersection_point_b.as_deref_mut() {
                    point.x = x_a + s_b * x_d;
                    point.y = (y_a + s_b * y_d) / d;
                    if let Some(normals) = normal_radians.as_deref_mut() {
                        normals.y = (point.y / rr * dd).atan2(point.x / rr);
                    }
                }
            }
        }
    }

    intersection_count
}

#[allow(clippy::too_many_arguments)]
pub fn segment_intersects_polygon(
    mut x_a: f32,
    mut y_a: f32,
    x_b: f32,
    y_b: f32,
    vertices: &[f32],
    mut intersection_point_a: Option<&mut Point>,
    mut intersection_point_b: Option<&mut Point>,
    mut normal_radians: Option<&mut Point>,
) -> i32 {
    if x_a == x_b {
        x_a = x_b + 0.000001;
    }
    if y_a == y_b {
        y_a = y_b + 0.000001;
    }

    let count = vertices.len();
    let d_x_ab = x_a - x_b;
    let d_y_ab = y_a - y_b;
    let ll_ab = x_a * y_b - y_a * x_b;
    let mut intersection_count = 0;
    let mut x_c = vertices[count - 2];
    let mut y_c = vertices[count - 1];
    let mut d_min = 0.0;
    let mut d_max = 0.0;
    let mut x_min = 0.0;
    let mut y_min = 0.0;
    let mut x_max = 0.0;
    let mut y_max = 0.0;

    let mut i = 0;
    while i < count {
        let x_d = vertices[i];
        let y_d = vertices[i + 1];

        if x_c == x_d {
            x_c = x_d + 0.000001;
        }
        if y_c == y_d {
            y_c = y_d + 0.000001;
        }

        let d_x_cd = x_c - x_d;
        let d_y_cd = y_c - y_d;
        let ll_cd = x_c * y_d - y_c * x_d;
        let ll = d_x_ab * d_y_cd - d_y_ab * d_x_cd;
        let x = (ll_ab * d_x_cd - d_x_ab * ll_cd) / ll;

        if ((x >= x_c && x <= x_d) || (x >= x_d && x <= x_c))
            && (d_x_ab == 0.0 || (x >= x_a && x <= x_b) || (x >= x_b && x <= x_a))
        {
            let y = (ll_ab * d_y_cd - d_y_ab * ll_cd) / ll;
            if ((y >= y_c && y <= y_d) || (y >= y_d && y <= y_c))
                && (d_y_ab == 0.0 || (y >= y_a && y <= y_b) || (y >= y_b && y <= y_a))
            {
                if intersection_point_b.is_some() {
                    let mut d = x - x_a;
                    if d < 0.0 {
                        d = -d;
                    }

                    if intersection_count == 0 {
                        d_min = d;
                        d_max = d;
                        x_min = x;
                        y_min = y;
                        x_max = x;
                        y_max = y;
                        if let Some(normals) = normal_radians.as_deref_mut() {
                            normals.x = (y_d - y_c).atan2(x_d - x_c) - PI_H;
                            normals.y = normals.x;
                        }
                    } else {
                        if d < d_min {
                            d_min = d;
                            x_min = x;
                            y_min = y;
                            if let Some(normals) = normal_radians.as_deref_mut() {
                                normals.x = (y_d - y_c).atan2(x_d - x_c) - PI_H;
                            }
                        }

                        if d > d_max {
                            d_max = d;
                            x_max = x;
                            y_max = y;
                            if let Some(normals) = normal_radians.as_deref_mut() {
                                normals.y = (y_d - y_c).atan2(x_d - x_c) - PI_H;
                            }
                        }
                    }

                    intersection_count += 1;
                } else {
                    x_min = x;
                    y_min = y;
                    x_max = x;
                    y_max = y;
                    intersection_count += 1;
                    if let Some(normals) = normal_radians.as_deref_mut() {
                        normals.x = (y_d - y_c).atan2(x_d - x_c) - PI_H;
                        normals.y = normals.x;
                    }
                    break;
                }
            }
        }

        x_c = x_d;
        y_c = y_d;
        i += 2;
    }

    if intersection_count == 1 {
        if let Some(point) = intersection_point_a.as_deref_mut() {
            point.x = x_min;
            point.y = y_min;
        }
        if let Some(point) = intersection_point_b.as_deref_mut() {
            point.x = x_min;
            point.y = y_min;
        }
        if let Some(normals) = normal_radians.as_deref_mut() {
            normals.y = normals.x + std::f32::consts::PI;
        }
    } else if intersection_count > 1 {
        intersection_count += 1;
        if let Some(point) = intersection_point_a.as_deref_mut() {
            point.x = x_min;
            point.y = y_min;
        }
        if let Some(point) = intersection_point_b.as_deref_mut() {
            point.x = x_max;
            point.y = y_max;
        }
    }

    intersection_count
}

#[cfg(feature = "glam")]
impl From<Point> for glam::Vec2 {
    fn from(value: Point) -> Self {
        glam::Vec2::new(value.x, value.y)
    }
}

#[cfg(feature = "glam")]
impl From<glam::Vec2> for Point {
    fn from(value: glam::Vec2) -> Self {
        Point::new(value.x, value.y)
    }
}

#[cfg(feature = "glam")]
impl From<Matrix> for glam::Affine2 {
    fn from(value: Matrix) -> Self {
        glam::Affine2::from_cols_array(&[
            value.a, value.b, value.c, value.d, value.tx, value.ty,
        ])
    }
}

#[cfg(feature = "glam")]
impl From<glam::Affine2> for Matrix {
    fn from(value: glam::Affine2) -> Self {
        let cols = value.to_cols_array();
        Matrix {
            a: cols[0],
            b: cols[1],
            c: cols[2],
            d: cols[3],
            tx: cols[4],
            ty: cols[5],
        }
    }
}
