/// Integer axis-aligned rectangles.
///
/// Bodies keep a float position; their rectangle is the position truncated
/// to whole units. Overlap is strict: rectangles that only share an edge do
/// not collide, so a player resting exactly on a floor is not "inside" it.

/// Side length of every block-shaped body.
pub const BLOCK_SIZE: i32 = 28;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Rect { x, y, w, h }
    }

    /// A block-sized rectangle at a float position (truncated toward zero).
    pub fn block_at(x: f64, y: f64) -> Self {
        Rect::new(x as i32, y as i32, BLOCK_SIZE, BLOCK_SIZE)
    }

    #[inline]
    pub fn left(&self) -> i32 { self.x }
    #[inline]
    pub fn right(&self) -> i32 { self.x + self.w }
    #[inline]
    pub fn top(&self) -> i32 { self.y }
    #[inline]
    pub fn bottom(&self) -> i32 { self.y + self.h }

    pub fn set_right(&mut self, right: i32) { self.x = right - self.w; }
    pub fn set_left(&mut self, left: i32) { self.x = left; }
    pub fn set_top(&mut self, top: i32) { self.y = top; }
    pub fn set_bottom(&mut self, bottom: i32) { self.y = bottom - self.h; }

    /// Do the interiors of the two rectangles intersect?
    #[inline]
    pub fn collides(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}
