/// Inclusive pixel extents of foreground content.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundingBox {
    pub xmin: u32,
    pub ymin: u32,
    pub xmax: u32,
    pub ymax: u32,
}

impl BoundingBox {
    pub fn new(xmin: u32, ymin: u32, xmax: u32, ymax: u32) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    /// Smallest box enclosing both boxes.
    pub fn union(self, other: Self) -> Self {
        Self {
            xmin: self.xmin.min(other.xmin),
            ymin: self.ymin.min(other.ymin),
            xmax: self.xmax.max(other.xmax),
            ymax: self.ymax.max(other.ymax),
        }
    }

    pub fn contains(&self, other: &Self) -> bool {
        self.xmin <= other.xmin
            && self.ymin <= other.ymin
            && self.xmax >= other.xmax
            && self.ymax >= other.ymax
    }

    /// Box around every `(x, y)` in `points`, or `None` for no points.
    pub fn enclosing(points: impl IntoIterator<Item = (u32, u32)>) -> Option<Self> {
        points
            .into_iter()
            .map(|(x, y)| Self::new(x, y, x, y))
            .reduce(Self::union)
    }
}

/// Running union of optional extents. Starts empty; absent extents are
/// ignored, so the result only ever reflects real data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BoundingBoxFold {
    extent: Option<BoundingBox>,
}

impl BoundingBoxFold {
    pub fn push(&mut self, local: Option<BoundingBox>) {
        self.extent = match (self.extent, local) {
            (Some(global), Some(local)) => Some(global.union(local)),
            (global, local) => global.or(local),
        };
    }

    pub fn finish(self) -> Option<BoundingBox> {
        self.extent
    }
}

impl FromIterator<Option<BoundingBox>> for BoundingBoxFold {
    fn from_iter<I: IntoIterator<Item = Option<BoundingBox>>>(iter: I) -> Self {
        let mut fold = Self::default();
        for local in iter {
            fold.push(local);
        }
        fold
    }
}
