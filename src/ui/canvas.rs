/// Software framebuffer for the fixed 660×390 playfield.
///
/// Sprites are composited with straight alpha blending. Rotated sprites
/// turn counter-clockwise about their own centre and are inverse-mapped
/// with nearest sampling, so transparent corners stay transparent.

use image::{Rgba, RgbaImage};

use crate::sim::world::{WorldState, SCREEN_H, SCREEN_W};
use super::assets::Sprites;

/// Player sprite is drawn this far left of its body.
const PLAYER_DRAW_OFFSET_X: i32 = -5;
/// And lifted this much while tilted.
const PLAYER_TILT_LIFT: i32 = 2;

pub struct Canvas {
    pixels: RgbaImage,
}

impl Canvas {
    pub fn new() -> Self {
        Canvas { pixels: RgbaImage::new(SCREEN_W as u32, SCREEN_H as u32) }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn clear(&mut self, color: Rgba<u8>) {
        for px in self.pixels.pixels_mut() {
            *px = color;
        }
    }

    /// Unrotated, unmirrored copy with clipping.
    pub fn blit(&mut self, sprite: &RgbaImage, x: i32, y: i32) {
        let (cw, ch) = (self.pixels.width() as i32, self.pixels.height() as i32);
        for (sx, sy, src) in sprite.enumerate_pixels() {
            let (dx, dy) = (x + sx as i32, y + sy as i32);
            if dx >= 0 && dy >= 0 && dx < cw && dy < ch {
                blend(self.pixels.get_pixel_mut(dx as u32, dy as u32), *src);
            }
        }
    }

    /// Draw `sprite` with its top-left corner at (x, y), mirrored
    /// horizontally if asked, then turned `degrees` counter-clockwise.
    pub fn draw(&mut self, sprite: &RgbaImage, x: i32, y: i32, degrees: f64, mirror: bool) {
        if degrees == 0.0 && !mirror {
            self.blit(sprite, x, y);
            return;
        }

        let (w, h) = (sprite.width() as f64, sprite.height() as f64);
        let (cx, cy) = (x as f64 + w / 2.0, y as f64 + h / 2.0);
        let (s, c) = degrees.to_radians().sin_cos();
        let half_w = (w * c.abs() + h * s.abs()) / 2.0;
        let half_h = (w * s.abs() + h * c.abs()) / 2.0;

        let x0 = ((cx - half_w).floor() as i32).max(0);
        let x1 = ((cx + half_w).ceil() as i32).min(self.pixels.width() as i32);
        let y0 = ((cy - half_h).floor() as i32).max(0);
        let y1 = ((cy + half_h).ceil() as i32).min(self.pixels.height() as i32);

        for py in y0..y1 {
            for px in x0..x1 {
                let u = px as f64 + 0.5 - cx;
                let v = py as f64 + 0.5 - cy;
                let sx = c * u - s * v + w / 2.0;
                let sy = s * u + c * v + h / 2.0;
                if sx < 0.0 || sy < 0.0 || sx >= w || sy >= h {
                    continue;
                }
                let mut sx = sx as u32;
                if mirror {
                    sx = sprite.width() - 1 - sx;
                }
                let src = *sprite.get_pixel(sx, sy as u32);
                blend(self.pixels.get_pixel_mut(px as u32, py as u32), src);
            }
        }
    }
}

fn blend(dst: &mut Rgba<u8>, src: Rgba<u8>) {
    let a = src.0[3] as u32;
    match a {
        0 => {}
        255 => *dst = src,
        _ => {
            for i in 0..3 {
                dst.0[i] = ((src.0[i] as u32 * a + dst.0[i] as u32 * (255 - a)) / 255) as u8;
            }
            dst.0[3] = dst.0[3].max(src.0[3]);
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Scene composition
// ══════════════════════════════════════════════════════════════

/// Paint one playing frame: backdrop, walls, feathers, hazards, player.
/// Borders are invisible.
pub fn paint_world(canvas: &mut Canvas, world: &WorldState, sprites: &Sprites) {
    canvas.clear(Rgba([0, 0, 0, 255]));
    canvas.blit(&sprites.backdrop, world.backdrop.x, world.backdrop.y);

    for wall in &world.walls {
        canvas.blit(sprites.barrier(wall.kind), wall.body.x as i32, wall.body.y as i32);
    }
    for f in &world.feathers {
        canvas.draw(&sprites.feather, f.body.x as i32, f.body.y as i32, f.body.degrees, false);
    }
    for h in &world.hazards {
        canvas.draw(sprites.hazard(h), h.body.x as i32, h.body.y as i32, h.body.degrees, false);
    }

    let p = &world.player;
    let lift = if p.body.degrees != 0.0 { PLAYER_TILT_LIFT } else { 0 };
    canvas.draw(
        sprites.player(p),
        p.body.x as i32 + PLAYER_DRAW_OFFSET_X,
        p.body.y as i32 - lift,
        p.body.degrees,
        p.facing == crate::domain::entity::Facing::Left,
    );
}

/// Paint the menu: intro picture, or the finish picture after a win.
pub fn paint_menu(canvas: &mut Canvas, world: &WorldState, sprites: &Sprites) {
    canvas.clear(Rgba([0, 0, 0, 255]));
    let picture = if world.won { &sprites.finish } else { &sprites.intro };
    canvas.blit(picture, 0, 0);
}
