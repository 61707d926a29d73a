use glam::{Mat4, Vec3, Vec4};

/// Borrowed color+depth target for one frame's rasterization. Coordinates
/// are pixels with the origin at the top left; depth is NDC z in [0, 1],
/// smaller is nearer.
pub struct RasterTarget<'a> {
    pub width: u32,
    pub height: u32,
    pub color: &'a mut [u8],
    pub depth: &'a mut [f32],
}

impl<'a> RasterTarget<'a> {
    pub fn clear(&mut self, background: Vec3) {
        let rgba = [
            to_channel(background.x),
            to_channel(background.y),
            to_channel(background.z),
            255,
        ];
        for pixel in self.color.chunks_exact_mut(4) {
            pixel.copy_from_slice(&rgba);
        }
        self.depth.fill(1.0);
    }

    /// Depth-tested triangle fill with one flat RGBA color. Translucent
    /// fills blend over the frame and leave the depth buffer untouched so
    /// glass panes behind glass panes stay visible.
    pub fn fill_triangle(&mut self, a: Vec3, b: Vec3, c: Vec3, rgba: [f32; 4]) {
        let area = edge(a, b, c);
        if area.abs() < 1e-8 {
            return;
        }

        let min_x = a.x.min(b.x).min(c.x).floor().max(0.0) as i64;
        let max_x = (a.x.max(b.x).max(c.x).ceil() as i64).min(self.width as i64 - 1);
        let min_y = a.y.min(b.y).min(c.y).floor().max(0.0) as i64;
        let max_y = (a.y.max(b.y).max(c.y).ceil() as i64).min(self.height as i64 - 1);
        if min_x > max_x || min_y > max_y {
            return;
        }

        let translucent = rgba[3] < 1.0;
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let sample = Vec3::new(x as f32 + 0.5, y as f32 + 0.5, 0.0);
                let w0 = edge(b, c, sample) / area;
                let w1 = edge(c, a, sample) / area;
                let w2 = edge(a, b, sample) / area;
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }
                let depth = w0 * a.z + w1 * b.z + w2 * c.z;
                if !(0.0..=1.0).contains(&depth) {
                    continue;
                }
                let index = (y as usize * self.width as usize) + x as usize;
                if depth > self.depth[index] {
                    continue;
                }
                self.blend_pixel(index, rgba);
                if !translucent {
                    self.depth[index] = depth;
                }
            }
        }
    }

    /// Square splat for particles; depth-tested but never depth-written.
    pub fn draw_point(&mut self, center: Vec3, size: u32, rgba: [f32; 4]) {
        let half = (size / 2) as i64;
        let cx = center.x.round() as i64;
        let cy = center.y.round() as i64;
        if !(0.0..=1.0).contains(&center.z) {
            return;
        }
        for y in cy - half..=cy + half {
            if y < 0 || y >= self.height as i64 {
                continue;
            }
            for x in cx - half..=cx + half {
                if x < 0 || x >= self.width as i64 {
                    continue;
                }
                let index = (y as usize * self.width as usize) + x as usize;
                if center.z > self.depth[index] {
                    continue;
                }
                self.blend_pixel(index, rgba);
            }
        }
    }

    fn blend_pixel(&mut self, index: usize, rgba: [f32; 4]) {
        let offset = index * 4;
        let alpha = rgba[3].clamp(0.0, 1.0);
        for channel in 0..3 {
            let dst = self.color[offset + channel] as f32 / 255.0;
            let out = rgba[channel] * alpha + dst * (1.0 - alpha);
            self.color[offset + channel] = to_channel(out);
        }
        self.color[offset + 3] = 255;
    }
}

/// Clip-space transform to screen coordinates; `None` when the point sits
/// behind the camera.
pub fn project(point: Vec3, matrix: &Mat4, width: u32, height: u32) -> Option<Vec3> {
    let clip: Vec4 = *matrix * point.extend(1.0);
    if clip.w <= 1e-6 {
        return None;
    }
    let ndc = Vec3::new(clip.x / clip.w, clip.y / clip.w, clip.z / clip.w);
    Some(Vec3::new(
        (ndc.x * 0.5 + 0.5) * width as f32,
        (1.0 - (ndc.y * 0.5 + 0.5)) * height as f32,
        ndc.z,
    ))
}

fn edge(a: Vec3, b: Vec3, p: Vec3) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

fn to_channel(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(width: u32, height: u32) -> (Vec<u8>, Vec<f32>) {
        (
            vec![0u8; (width * height * 4) as usize],
            vec![1.0f32; (width * height) as usize],
        )
    }

    fn pixel(color: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
        let offset = ((y * width + x) * 4) as usize;
        [
            color[offset],
            color[offset + 1],
            color[offset + 2],
            color[offset + 3],
        ]
    }

    #[test]
    fn opaque_triangle_covers_its_interior_and_writes_depth() {
        let (mut color, mut depth) = target(16, 16);
        let mut raster = RasterTarget {
            width: 16,
            height: 16,
            color: &mut color,
            depth: &mut depth,
        };
        raster.clear(Vec3::ZERO);
        raster.fill_triangle(
            Vec3::new(1.0, 1.0, 0.5),
            Vec3::new(14.0, 1.0, 0.5),
            Vec3::new(1.0, 14.0, 0.5),
            [1.0, 0.0, 0.0, 1.0],
        );
        assert_eq!(pixel(&color, 16, 3, 3), [255, 0, 0, 255]);
        assert_eq!(pixel(&color, 16, 15, 15), [0, 0, 0, 255]);
        assert!((depth[3 * 16 + 3] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn nearer_opaque_geometry_wins_the_depth_test() {
        let (mut color, mut depth) = target(8, 8);
        let mut raster = RasterTarget {
            width: 8,
            height: 8,
            color: &mut color,
            depth: &mut depth,
        };
        raster.clear(Vec3::ZERO);
        let full = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(8.0, 0.0, 0.0),
            Vec3::new(0.0, 8.0, 0.0),
        ];
        raster.fill_triangle(
            full[0].with_z(0.3),
            full[1].with_z(0.3),
            full[2].with_z(0.3),
            [0.0, 1.0, 0.0, 1.0],
        );
        raster.fill_triangle(
            full[0].with_z(0.7),
            full[1].with_z(0.7),
            full[2].with_z(0.7),
            [1.0, 0.0, 0.0, 1.0],
        );
        assert_eq!(pixel(&color, 8, 1, 1), [0, 255, 0, 255]);
    }

    #[test]
    fn translucent_fill_blends_and_leaves_depth_open() {
        let (mut color, mut depth) = target(8, 8);
        let mut raster = RasterTarget {
            width: 8,
            height: 8,
            color: &mut color,
            depth: &mut depth,
        };
        raster.clear(Vec3::ONE);
        raster.fill_triangle(
            Vec3::new(0.0, 0.0, 0.5),
            Vec3::new(8.0, 0.0, 0.5),
            Vec3::new(0.0, 8.0, 0.5),
            [0.0, 0.0, 0.0, 0.5],
        );
        let blended = pixel(&color, 8, 1, 1);
        assert!(blended[0] > 100 && blended[0] < 155);
        assert_eq!(depth[8 + 1], 1.0);
    }

    #[test]
    fn points_behind_the_camera_are_rejected() {
        let matrix = Mat4::perspective_rh(1.0, 1.0, 0.1, 100.0);
        assert!(project(Vec3::new(0.0, 0.0, 5.0), &matrix, 64, 64).is_none());
        assert!(project(Vec3::new(0.0, 0.0, -5.0), &matrix, 64, 64).is_some());
    }

    #[test]
    fn projected_origin_lands_mid_frame() {
        let matrix = Mat4::perspective_rh(1.0, 1.0, 0.1, 100.0)
            * Mat4::look_at_rh(Vec3::new(0.0, 0.0, 4.0), Vec3::ZERO, Vec3::Y);
        let screen = project(Vec3::ZERO, &matrix, 64, 64).unwrap();
        assert!((screen.x - 32.0).abs() < 1e-3);
        assert!((screen.y - 32.0).abs() < 1e-3);
    }
}
