/// Horizontal or vertical screen axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenSize {
    pub width: i32,
    pub height: i32,
}

impl ScreenSize {
    pub fn along(&self, axis: Axis) -> i32 {
        match axis {
            Axis::Horizontal => self.width,
            Axis::Vertical => self.height,
        }
    }
}

/// Absolute pixel rectangle in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// A configured `(x, y)` or `(width, height)` pair. Each component is either a
/// fraction of the screen (`< 1`) or an absolute pixel count (`>= 1`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisPair {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TupleError {
    #[error("expected two components, found {0}")]
    Arity(usize),
    #[error("component {0} is empty")]
    EmptyComponent(usize),
    #[error("component {index} ({text:?}) is not a number")]
    NotANumber { index: usize, text: String },
    #[error("component {0} is not finite")]
    NotFinite(usize),
}

/// Parses `"(a, b)"`, `"[a, b]"` or a bare `"a, b"` into an [`AxisPair`].
pub fn parse_tuple(text: &str) -> Result<AxisPair, TupleError> {
    let inner = text.trim_matches(|c: char| c.is_whitespace() || "()[]".contains(c));
    let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
    if parts.len() != 2 {
        return Err(TupleError::Arity(parts.len()));
    }

    let mut values = [0.0; 2];
    for (index, (part, slot)) in parts.iter().zip(values.iter_mut()).enumerate() {
        if part.is_empty() {
            return Err(TupleError::EmptyComponent(index));
        }
        let value: f64 = part.parse().map_err(|_| TupleError::NotANumber {
            index,
            text: part.to_string(),
        })?;
        if !value.is_finite() {
            return Err(TupleError::NotFinite(index));
        }
        *slot = value;
    }

    Ok(AxisPair {
        x: values[0],
        y: values[1],
    })
}

/// Converts one configured component into pixels along `axis`.
///
/// Values below 1 are a fraction of the screen, everything else is taken as
/// pixels. The result is floored and never clamped to the screen.
pub fn resolve_axis(value: f64, axis: Axis, screen: ScreenSize) -> i32 {
    let pixels = if value < 1.0 {
        value * f64::from(screen.along(axis))
    } else {
        value
    };
    pixels.floor() as i32
}

pub fn resolve_rect(position: AxisPair, size: AxisPair, screen: ScreenSize) -> Rect {
    Rect {
        x: resolve_axis(position.x, Axis::Horizontal, screen),
        y: resolve_axis(position.y, Axis::Vertical, screen),
        width: resolve_axis(size.x, Axis::Horizontal, screen),
        height: resolve_axis(size.y, Axis::Vertical, screen),
    }
}
