use image::RgbaImage;

/// Gaussian sigma for the blur filter, matching the booth's fixed 4 px
/// blur strength.
const BLUR_SIGMA: f32 = 4.0;

/// Uniform color transform applied to the finished composite.
///
/// The set mirrors the booth's fixed filter menu; each variant matches the
/// corresponding CSS filter function at the strength the menu used
/// (grayscale 100%, sepia 100%, brightness 1.3, contrast 1.5, invert 100%,
/// saturate 2, hue-rotate 90deg).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PhotoFilter {
    #[default]
    None,
    Grayscale,
    Sepia,
    Blur,
    Brighten,
    Contrast,
    Invert,
    Saturate,
    HueRotate,
}

impl PhotoFilter {
    pub fn label(self) -> &'static str {
        match self {
            PhotoFilter::None => "none",
            PhotoFilter::Grayscale => "grayscale",
            PhotoFilter::Sepia => "sepia",
            PhotoFilter::Blur => "blur",
            PhotoFilter::Brighten => "brighten",
            PhotoFilter::Contrast => "contrast",
            PhotoFilter::Invert => "invert",
            PhotoFilter::Saturate => "saturate",
            PhotoFilter::HueRotate => "hue-rotate",
        }
    }

    pub fn next(self) -> Self {
        match self {
            PhotoFilter::None => PhotoFilter::Grayscale,
            PhotoFilter::Grayscale => PhotoFilter::Sepia,
            PhotoFilter::Sepia => PhotoFilter::Blur,
            PhotoFilter::Blur => PhotoFilter::Brighten,
            PhotoFilter::Brighten => PhotoFilter::Contrast,
            PhotoFilter::Contrast => PhotoFilter::Invert,
            PhotoFilter::Invert => PhotoFilter::Saturate,
            PhotoFilter::Saturate => PhotoFilter::HueRotate,
            PhotoFilter::HueRotate => PhotoFilter::None,
        }
    }

    /// Apply the transform over the whole buffer. Alpha is untouched.
    pub fn apply(self, buffer: &mut RgbaImage) {
        match self {
            PhotoFilter::None => {}
            PhotoFilter::Blur => {
                *buffer = image::imageops::blur(buffer, BLUR_SIGMA);
            }
            PhotoFilter::Grayscale => color_matrix(buffer, GRAYSCALE),
            PhotoFilter::Sepia => color_matrix(buffer, SEPIA),
            PhotoFilter::Brighten => per_channel(buffer, |v| scale_channel(v, 1.3)),
            PhotoFilter::Contrast => per_channel(buffer, |v| contrast_channel(v, 1.5)),
            PhotoFilter::Invert => per_channel(buffer, |v| 255 - v),
            PhotoFilter::Saturate => color_matrix(buffer, saturate_matrix(2.0)),
            PhotoFilter::HueRotate => color_matrix(buffer, hue_rotate_matrix(90.0)),
        }
    }
}

// Rec. 709 luminance weights, as the CSS filter matrices use.
const LUMA_R: f32 = 0.2126;
const LUMA_G: f32 = 0.7152;
const LUMA_B: f32 = 0.0722;

const GRAYSCALE: [f32; 9] = [
    LUMA_R, LUMA_G, LUMA_B, //
    LUMA_R, LUMA_G, LUMA_B, //
    LUMA_R, LUMA_G, LUMA_B,
];

const SEPIA: [f32; 9] = [
    0.393, 0.769, 0.189, //
    0.349, 0.686, 0.168, //
    0.272, 0.534, 0.131,
];

fn saturate_matrix(s: f32) -> [f32; 9] {
    [
        LUMA_R + (1.0 - LUMA_R) * s,
        LUMA_G * (1.0 - s),
        LUMA_B * (1.0 - s),
        LUMA_R * (1.0 - s),
        LUMA_G + (1.0 - LUMA_G) * s,
        LUMA_B * (1.0 - s),
        LUMA_R * (1.0 - s),
        LUMA_G * (1.0 - s),
        LUMA_B + (1.0 - LUMA_B) * s,
    ]
}

fn hue_rotate_matrix(degrees: f32) -> [f32; 9] {
    let (sin, cos) = degrees.to_radians().sin_cos();
    [
        0.213 + cos * 0.787 - sin * 0.213,
        0.715 - cos * 0.715 - sin * 0.715,
        0.072 - cos * 0.072 + sin * 0.928,
        0.213 - cos * 0.213 + sin * 0.143,
        0.715 + cos * 0.285 + sin * 0.140,
        0.072 - cos * 0.072 - sin * 0.283,
        0.213 - cos * 0.213 - sin * 0.787,
        0.715 - cos * 0.715 + sin * 0.715,
        0.072 + cos * 0.928 + sin * 0.072,
    ]
}

fn color_matrix(buffer: &mut RgbaImage, m: [f32; 9]) {
    for pixel in buffer.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        let (rf, gf, bf) = (r as f32, g as f32, b as f32);
        pixel.0 = [
            clamp_channel(m[0] * rf + m[1] * gf + m[2] * bf),
            clamp_channel(m[3] * rf + m[4] * gf + m[5] * bf),
            clamp_channel(m[6] * rf + m[7] * gf + m[8] * bf),
            a,
        ];
    }
}

fn per_channel(buffer: &mut RgbaImage, f: impl Fn(u8) -> u8) {
    for pixel in buffer.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        pixel.0 = [f(r), f(g), f(b), a];
    }
}

fn scale_channel(v: u8, factor: f32) -> u8 {
    clamp_channel(v as f32 * factor)
}

fn contrast_channel(v: u8, slope: f32) -> u8 {
    clamp_channel((v as f32 - 127.5) * slope + 127.5)
}

fn clamp_channel(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn single(pixel: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(1, 1, Rgba(pixel))
    }

    fn apply_to(filter: PhotoFilter, pixel: [u8; 4]) -> [u8; 4] {
        let mut img = single(pixel);
        filter.apply(&mut img);
        img.get_pixel(0, 0).0
    }

    #[test]
    fn none_is_identity() {
        assert_eq!(apply_to(PhotoFilter::None, [12, 34, 56, 255]), [12, 34, 56, 255]);
    }

    #[test]
    fn grayscale_equalizes_channels() {
        let [r, g, b, a] = apply_to(PhotoFilter::Grayscale, [200, 40, 90, 255]);
        assert_eq!(r, g);
        assert_eq!(g, b);
        assert_eq!(a, 255);
        // Luminance of (200, 40, 90): 0.2126*200 + 0.7152*40 + 0.0722*90 ~ 77.6
        assert_eq!(r, 78);
    }

    #[test]
    fn sepia_maps_white_to_reference_tone() {
        assert_eq!(apply_to(PhotoFilter::Sepia, [255, 255, 255, 255]), [255, 255, 239, 255]);
    }

    #[test]
    fn invert_is_its_own_inverse() {
        let once = apply_to(PhotoFilter::Invert, [10, 128, 250, 7]);
        assert_eq!(once, [245, 127, 5, 7]);
        let mut img = single(once);
        PhotoFilter::Invert.apply(&mut img);
        assert_eq!(img.get_pixel(0, 0).0, [10, 128, 250, 7]);
    }

    #[test]
    fn brighten_clamps_at_white() {
        assert_eq!(apply_to(PhotoFilter::Brighten, [100, 200, 255, 255]), [130, 255, 255, 255]);
    }

    #[test]
    fn contrast_pivots_around_mid_gray() {
        // Exactly mid-gray is a fixed point of the contrast ramp.
        let [r, ..] = apply_to(PhotoFilter::Contrast, [128, 128, 128, 255]);
        assert!((r as i32 - 128).abs() <= 1);
        // Darks get darker, brights get brighter.
        assert_eq!(apply_to(PhotoFilter::Contrast, [40, 40, 40, 255])[0], 0);
        assert_eq!(apply_to(PhotoFilter::Contrast, [220, 220, 220, 255])[0], 255);
    }

    #[test]
    fn saturate_and_hue_rotate_leave_grays_alone() {
        for filter in [PhotoFilter::Saturate, PhotoFilter::HueRotate] {
            let [r, g, b, _] = apply_to(filter, [120, 120, 120, 255]);
            assert!((r as i32 - 120).abs() <= 1, "{filter:?} moved gray to {r}");
            assert!((g as i32 - 120).abs() <= 1);
            assert!((b as i32 - 120).abs() <= 1);
        }
    }

    #[test]
    fn hue_rotate_quarter_turn_sends_blue_into_red() {
        // At 90 degrees the red row of the matrix collapses to the blue
        // channel.
        let [r, _, _, _] = apply_to(PhotoFilter::HueRotate, [0, 0, 255, 255]);
        assert_eq!(r, 255);
        let [r2, _, _, _] = apply_to(PhotoFilter::HueRotate, [255, 0, 0, 255]);
        assert_eq!(r2, 0);
    }

    #[test]
    fn filters_preserve_alpha() {
        for filter in [
            PhotoFilter::Grayscale,
            PhotoFilter::Sepia,
            PhotoFilter::Brighten,
            PhotoFilter::Contrast,
            PhotoFilter::Invert,
            PhotoFilter::Saturate,
            PhotoFilter::HueRotate,
        ] {
            assert_eq!(apply_to(filter, [50, 60, 70, 33])[3], 33, "{filter:?}");
        }
    }

    #[test]
    fn filter_cycle_visits_every_variant_once() {
        let mut filter = PhotoFilter::None;
        let mut count = 0;
        loop {
            filter = filter.next();
            count += 1;
            if filter == PhotoFilter::None {
                break;
            }
        }
        assert_eq!(count, 9);
    }
}
