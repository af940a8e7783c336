use nalgebra::{Point3, Vector3};

/// Axis aligned bounding box in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox3 {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl BoundingBox3 {
    pub fn new(min: Point3<f64>, max: Point3<f64>) -> Self {
        Self { min, max }
    }

    /// Smallest box holding every point, `None` for an empty iterator.
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Point3<f64>>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bbox = Self::new(*first, *first);
        for p in iter {
            bbox.include(p);
        }
        Some(bbox)
    }

    pub fn include(&mut self, p: &Point3<f64>) {
        self.min = Point3::new(self.min.x.min(p.x), self.min.y.min(p.y), self.min.z.min(p.z));
        self.max = Point3::new(self.max.x.max(p.x), self.max.y.max(p.y), self.max.z.max(p.z));
    }

    pub fn union(&self, other: &BoundingBox3) -> BoundingBox3 {
        let mut out = *self;
        out.include(&other.min);
        out.include(&other.max);
        out
    }

    pub fn translated(&self, offset: &Vector3<f64>) -> BoundingBox3 {
        Self::new(self.min + *offset, self.max + *offset)
    }

    pub fn x_length(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn y_length(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn z_length(&self) -> f64 {
        self.max.z - self.min.z
    }

    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Area of the XY footprint.
    pub fn planar_area(&self) -> f64 {
        self.x_length() * self.y_length()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_points() {
        let pts = [
            Point3::new(1.0, 5.0, -2.0),
            Point3::new(-3.0, 2.0, 4.0),
            Point3::new(0.0, 0.0, 0.0),
        ];
        let bbox = BoundingBox3::from_points(&pts).unwrap();
        assert_eq!(bbox.min, Point3::new(-3.0, 0.0, -2.0));
        assert_eq!(bbox.max, Point3::new(1.0, 5.0, 4.0));
        assert_eq!(bbox.x_length(), 4.0);
        assert_eq!(bbox.z_length(), 6.0);
        assert_eq!(bbox.center(), Point3::new(-1.0, 2.5, 1.0));
    }

    #[test]
    fn test_empty_points() {
        let pts: Vec<Point3<f64>> = Vec::new();
        assert!(BoundingBox3::from_points(&pts).is_none());
    }

    #[test]
    fn test_translate_and_union() {
        let a = BoundingBox3::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
        let b = a.translated(&Vector3::new(2.0, 0.0, 0.0));
        assert_eq!(b.min.x, 2.0);
        let u = a.union(&b);
        assert_eq!(u.x_length(), 3.0);
        assert_eq!(u.planar_area(), 3.0);
    }
}
