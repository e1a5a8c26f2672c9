use crate::types::{FaceLandmarks, Frame, HandLandmarks, LandmarkPoint};

pub const CONNECTIONS: &[(usize, usize)] = &[
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 4),
    (0, 5),
    (5, 6),
    (6, 7),
    (7, 8),
    (0, 9),
    (9, 10),
    (10, 11),
    (11, 12),
    (0, 13),
    (13, 14),
    (14, 15),
    (15, 16),
    (0, 17),
    (17, 18),
    (18, 19),
    (19, 20),
    (5, 9),
    (9, 13),
    (13, 17),
];

pub const SKELETON_LINE_THICKNESS: i32 = 3;
const MOUTH_POINT_RADIUS: i32 = 3;

const LINE_COLOR: [u8; 4] = [56, 189, 248, 255];
const JOINT_COLOR: [u8; 4] = [248, 113, 113, 255];
const MOUTH_COLOR: [u8; 4] = [16, 185, 129, 255];

fn to_pixel(point: &LandmarkPoint, width: u32, height: u32) -> (f32, f32) {
    (point.x * width as f32, point.y * height as f32)
}

/// Draws every hand skeleton and the tracked mouth points onto the frame.
pub fn draw_landmarks(frame: &mut Frame, hands: &[HandLandmarks], face: Option<&FaceLandmarks>) {
    for hand in hands {
        draw_hand(frame, hand);
    }
    if let Some(face) = face {
        draw_mouth(frame, face);
    }
}

pub fn draw_hand(frame: &mut Frame, hand: &HandLandmarks) {
    let (width, height) = (frame.width, frame.height);
    let points: Vec<(f32, f32)> = hand
        .points
        .iter()
        .map(|p| to_pixel(p, width, height))
        .collect();

    for &(a, b) in CONNECTIONS {
        if let (Some(pa), Some(pb)) = (points.get(a), points.get(b)) {
            draw_line(
                &mut frame.rgba,
                width,
                height,
                pa,
                pb,
                LINE_COLOR,
                SKELETON_LINE_THICKNESS,
            );
        }
    }

    let point_radius = (SKELETON_LINE_THICKNESS / 2).max(2) + 1;
    for &(x, y) in &points {
        draw_circle(
            &mut frame.rgba,
            width,
            height,
            (x as i32, y as i32),
            point_radius,
            JOINT_COLOR,
        );
    }
}

pub fn draw_mouth(frame: &mut Frame, face: &FaceLandmarks) {
    let (width, height) = (frame.width, frame.height);
    for point in face.mouth_points() {
        let (x, y) = to_pixel(&point, width, height);
        draw_circle(
            &mut frame.rgba,
            width,
            height,
            (x as i32, y as i32),
            MOUTH_POINT_RADIUS,
            MOUTH_COLOR,
        );
    }
}

fn draw_line(
    buffer: &mut [u8],
    width: u32,
    height: u32,
    p0: &(f32, f32),
    p1: &(f32, f32),
    color: [u8; 4],
    thickness: i32,
) {
    let (mut x0, mut y0) = (p0.0 as i32, p0.1 as i32);
    let (x1, y1) = (p1.0 as i32, p1.1 as i32);
    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let radius = (thickness.max(1) - 1) / 2;

    loop {
        put_pixel_safe(buffer, width, height, x0, y0, color);
        for ox in -radius..=radius {
            for oy in -radius..=radius {
                if (ox != 0 || oy != 0) && ox.abs() + oy.abs() <= radius {
                    put_pixel_safe(buffer, width, height, x0 + ox, y0 + oy, color);
                }
            }
        }
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

fn draw_circle(
    buffer: &mut [u8],
    width: u32,
    height: u32,
    center: (i32, i32),
    radius: i32,
    color: [u8; 4],
) {
    let (cx, cy) = center;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                put_pixel_safe(buffer, width, height, cx + dx, cy + dy, color);
            }
        }
    }
}

fn put_pixel_safe(buffer: &mut [u8], width: u32, height: u32, x: i32, y: i32, color: [u8; 4]) {
    if x < 0 || y < 0 {
        return;
    }
    let (ux, uy) = (x as u32, y as u32);
    if ux >= width || uy >= height {
        return;
    }
    let idx = ((uy * width + ux) as usize) * 4;
    if idx + 3 < buffer.len() {
        buffer[idx..idx + 4].copy_from_slice(&color);
    }
}
