//! Plot layout snapshot: surface margins, axes and the subplots built from them.

use plotsel_geom::{Axis, Surface};

/// A cartesian subplot, one x axis paired with one y axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Subplot {
    /// Subplot id such as `xy` or `x2y2`.
    pub id: String,
    pub xaxis: String,
    pub yaxis: String,
}

impl Subplot {
    pub fn new(xaxis: impl Into<String>, yaxis: impl Into<String>) -> Self {
        let xaxis = xaxis.into();
        let yaxis = yaxis.into();
        Self {
            id: format!("{}{}", xaxis, yaxis),
            xaxis,
            yaxis,
        }
    }
}

/// Axes and subplots as laid out on the surface.
#[derive(Debug, Clone)]
pub struct Layout {
    pub surface: Surface,
    pub axes: Vec<Axis>,
    pub subplots: Vec<Subplot>,
}

impl Layout {
    pub fn new(surface: Surface) -> Self {
        Self {
            surface,
            axes: Vec::new(),
            subplots: Vec::new(),
        }
    }

    /// Single subplot filling the whole surface with linear `x` and `y` axes.
    pub fn single(surface: Surface, xrange: [f64; 2], yrange: [f64; 2]) -> Self {
        Self::new(surface).with_subplot(
            Axis::linear("x", xrange, surface.l, surface.w),
            Axis::linear("y", yrange, surface.t, surface.h),
        )
    }

    /// Add a subplot and its two axes. Axes already present are replaced.
    pub fn with_subplot(mut self, xaxis: Axis, yaxis: Axis) -> Self {
        let subplot = Subplot::new(xaxis.id.clone(), yaxis.id.clone());
        for axis in [xaxis, yaxis] {
            match self.axes.iter_mut().find(|a| a.id == axis.id) {
                Some(existing) => *existing = axis,
                None => self.axes.push(axis),
            }
        }
        if self.subplot(&subplot.id).is_none() {
            self.subplots.push(subplot);
        }
        self
    }

    pub fn axis(&self, id: &str) -> Option<&Axis> {
        self.axes.iter().find(|a| a.id == id)
    }

    pub fn axis_mut(&mut self, id: &str) -> Option<&mut Axis> {
        self.axes.iter_mut().find(|a| a.id == id)
    }

    pub fn subplot(&self, id: &str) -> Option<&Subplot> {
        self.subplots.iter().find(|s| s.id == id)
    }

    /// Subplot for a pair of axis ids.
    pub fn subplot_for(&self, xaxis: &str, yaxis: &str) -> Option<&Subplot> {
        self.subplots
            .iter()
            .find(|s| s.xaxis == xaxis && s.yaxis == yaxis)
    }

    /// Both axes of a subplot.
    pub fn subplot_axes(&self, id: &str) -> Option<(&Axis, &Axis)> {
        let subplot = self.subplot(id)?;
        Some((self.axis(&subplot.xaxis)?, self.axis(&subplot.yaxis)?))
    }

    /// Subplot whose plot area contains an absolute surface pixel.
    pub fn subplot_at(&self, x: f64, y: f64) -> Option<&Subplot> {
        self.subplots.iter().find(|s| {
            let (Some(xa), Some(ya)) = (self.axis(&s.xaxis), self.axis(&s.yaxis)) else {
                return false;
            };
            x >= xa.offset && x <= xa.offset + xa.length && y >= ya.offset && y <= ya.offset + ya.length
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_subplot_layout() {
        let layout = Layout::single(Surface::new(80.0, 100.0, 200.0, 200.0), [0.0, 10.0], [0.0, 10.0]);
        assert_eq!(layout.subplots.len(), 1);
        assert_eq!(layout.subplots[0].id, "xy");
        let (xa, ya) = layout.subplot_axes("xy").unwrap();
        assert_eq!(xa.offset, 80.0);
        assert_eq!(ya.offset, 100.0);
        assert!(layout.subplot_at(90.0, 150.0).is_some());
        assert!(layout.subplot_at(10.0, 150.0).is_none());
    }

    #[test]
    fn test_shared_axis_replaced() {
        let surface = Surface::new(0.0, 0.0, 400.0, 200.0);
        let layout = Layout::new(surface)
            .with_subplot(Axis::linear("x", [0.0, 1.0], 0.0, 180.0), Axis::linear("y", [0.0, 1.0], 0.0, 200.0))
            .with_subplot(Axis::linear("x2", [0.0, 5.0], 220.0, 180.0), Axis::linear("y", [0.0, 2.0], 0.0, 200.0));
        assert_eq!(layout.axes.len(), 3);
        assert_eq!(layout.axis("y").unwrap().range, [0.0, 2.0]);
        assert_eq!(layout.subplot_for("x2", "y").unwrap().id, "x2y");
    }
}
