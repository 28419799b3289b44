/// Pixel-space bounding box.
///
/// Stored as top-left corner plus size (TLWH). Coordinates may be negative or
/// extend past the image after a motion projection; use [`Rect::clip`] before
/// indexing pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    /// Top-left x coordinate
    pub x: i32,
    /// Top-left y coordinate
    pub y: i32,
    /// Width of the bounding box
    pub width: u32,
    /// Height of the bounding box
    pub height: u32,
}

/// Half-open pixel ranges of a rect clipped to an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelSpan {
    pub x0: usize,
    pub y0: usize,
    pub x1: usize,
    pub y1: usize,
}

impl PixelSpan {
    pub fn is_empty(&self) -> bool {
        self.x0 >= self.x1 || self.y0 >= self.y1
    }

    pub fn width(&self) -> usize {
        self.x1.saturating_sub(self.x0)
    }

    pub fn height(&self) -> usize {
        self.y1.saturating_sub(self.y0)
    }
}

impl Rect {
    /// Create a new Rect from top-left coordinates and dimensions (TLWH format).
    #[inline]
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a Rect from TLBR format. The bottom-right corner is exclusive.
    #[inline]
    pub fn from_tlbr(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self {
            x: x1,
            y: y1,
            width: (x2 - x1).max(0) as u32,
            height: (y2 - y1).max(0) as u32,
        }
    }

    /// Convert to TLBR format: (x1, y1, x2, y2), bottom-right exclusive.
    #[inline]
    pub fn to_tlbr(&self) -> [i32; 4] {
        [self.x, self.y, self.right(), self.bottom()]
    }

    /// Convert to TLWH format: (x, y, width, height).
    #[inline]
    pub fn to_tlwh(&self) -> [i32; 4] {
        [self.x, self.y, self.width as i32, self.height as i32]
    }

    #[inline]
    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    #[inline]
    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    /// Get the area of the bounding box.
    #[inline]
    pub fn area(&self) -> f32 {
        self.width as f32 * self.height as f32
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Same box moved by a whole number of pixels.
    #[inline]
    pub fn translate(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    /// Pixel ranges covered by this box inside a `width` x `height` image.
    pub fn clip(&self, width: u32, height: u32) -> PixelSpan {
        let clamp_x = |v: i32| v.clamp(0, width as i32) as usize;
        let clamp_y = |v: i32| v.clamp(0, height as i32) as usize;
        PixelSpan {
            x0: clamp_x(self.x),
            y0: clamp_y(self.y),
            x1: clamp_x(self.right()),
            y1: clamp_y(self.bottom()),
        }
    }

    /// Calculate Intersection over Union (IoU) with another bounding box.
    pub fn iou(&self, other: &Rect) -> f32 {
        let [ax1, ay1, ax2, ay2] = self.to_tlbr();
        let [bx1, by1, bx2, by2] = other.to_tlbr();
        let x1 = ax1.max(bx1);
        let y1 = ay1.max(by1);
        let x2 = ax2.min(bx2);
        let y2 = ay2.min(by2);

        let inter_width = (x2 - x1).max(0) as f32;
        let inter_height = (y2 - y1).max(0) as f32;
        let inter_area = inter_width * inter_height;

        let union_area = self.area() + other.area() - inter_area;

        if union_area > 0.0 {
            inter_area / union_area
        } else {
            0.0
        }
    }
}
