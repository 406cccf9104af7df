use image::{Rgba, RgbaImage};

/// Pixel multiplier for the countdown digits; 5x7 glyphs at 10x read
/// across the room.
const DIGIT_SCALE: u32 = 10;
const DIGIT_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// 5x7 digit glyphs. Each u8 is a row; the low 5 bits are the pixels
/// (bit 4 = leftmost).
fn digit_rows(digit: u32) -> [u8; 7] {
    match digit {
        0 => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        1 => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        2 => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
        3 => [0b11110, 0b00001, 0b00001, 0b01110, 0b00001, 0b00001, 0b11110],
        4 => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        5 => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        6 => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        7 => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        8 => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        _ => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
    }
}

/// Dim the whole buffer and draw `value` centered in large digits: the
/// countdown overlay shown between shutter press and capture.
pub fn draw_countdown(buffer: &mut RgbaImage, value: u32) {
    for pixel in buffer.pixels_mut() {
        pixel[0] /= 2;
        pixel[1] /= 2;
        pixel[2] /= 2;
    }

    let digits: Vec<u32> = value
        .to_string()
        .chars()
        .filter_map(|c| c.to_digit(10))
        .collect();
    let glyph_width = 6 * DIGIT_SCALE;
    let total_width = glyph_width * digits.len() as u32;
    let origin_x = buffer.width().saturating_sub(total_width) / 2;
    let origin_y = buffer.height().saturating_sub(7 * DIGIT_SCALE) / 2;

    for (i, digit) in digits.iter().enumerate() {
        draw_digit(
            buffer,
            origin_x + glyph_width * i as u32,
            origin_y,
            *digit,
        );
    }
}

fn draw_digit(buffer: &mut RgbaImage, origin_x: u32, origin_y: u32, digit: u32) {
    let rows = digit_rows(digit);
    for (row, bits) in rows.iter().enumerate() {
        for col in 0..5u32 {
            if bits & (1 << (4 - col)) == 0 {
                continue;
            }
            for dy in 0..DIGIT_SCALE {
                for dx in 0..DIGIT_SCALE {
                    let x = origin_x + col * DIGIT_SCALE + dx;
                    let y = origin_y + row as u32 * DIGIT_SCALE + dy;
                    if x < buffer.width() && y < buffer.height() {
                        buffer.put_pixel(x, y, DIGIT_COLOR);
                    }
                }
            }
        }
    }
}
