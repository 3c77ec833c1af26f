//! Geometric primitives for page placement.
//!
//! Rectangles are expressed in PDF user space: the origin is the lower-left
//! corner of the page and `y` grows upwards.

use crate::object::Object;

/// A rectangle in PDF user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    /// X coordinate of the lower-left corner
    pub x: f32,
    /// Y coordinate of the lower-left corner
    pub y: f32,
    /// Width of rectangle
    pub width: f32,
    /// Height of rectangle
    pub height: f32,
}

impl Rect {
    /// Create a new rectangle from position and dimensions.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdf_inplace_sign::geometry::Rect;
    ///
    /// let rect = Rect::new(72.0, 72.0, 200.0, 50.0);
    /// assert_eq!(rect.width, 200.0);
    /// assert_eq!(rect.right(), 272.0);
    /// ```
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The zero rectangle used for invisible signature widgets.
    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }

    /// Right edge.
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Top edge.
    pub fn top(&self) -> f32 {
        self.y + self.height
    }

    /// Whether the rectangle encloses no area.
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Convert to a PDF rectangle array `[llx lly urx ury]`.
    pub fn to_pdf_array(&self) -> Object {
        Object::Array(vec![
            Object::Real(self.x as f64),
            Object::Real(self.y as f64),
            Object::Real(self.right() as f64),
            Object::Real(self.top() as f64),
        ])
    }

    /// Bounding box of the same size anchored at the origin, `[0 0 w h]`.
    pub fn to_bbox_array(&self) -> Object {
        Object::Array(vec![
            Object::Real(0.0),
            Object::Real(0.0),
            Object::Real(self.width as f64),
            Object::Real(self.height as f64),
        ])
    }
}
