use plotters::style::RGBColor;

pub const TRAINING_RED: RGBColor = RGBColor(0xFF, 0x1D, 0x25);
pub const TEST_TEAL: RGBColor = RGBColor(0x14, 0xDF, 0xB4);
pub const ORANGE: RGBColor = RGBColor(0xFF, 0x93, 0x1E);
pub const EMPTY_CELL: RGBColor = RGBColor(0xEE, 0xEE, 0xEE);

/// Line colours for the scalability panels, cycled per tag.
pub const SERIES: [RGBColor; 3] = [TEST_TEAL, ORANGE, TRAINING_RED];

const GRADIENT: [RGBColor; 3] = [TEST_TEAL, ORANGE, TRAINING_RED];

fn lerp(a: u8, b: u8, t: f64) -> u8 {
    (f64::from(a) + (f64::from(b) - f64::from(a)) * t).round() as u8
}

fn mix(a: RGBColor, b: RGBColor, t: f64) -> RGBColor {
    RGBColor(lerp(a.0, b.0, t), lerp(a.1, b.1, t), lerp(a.2, b.2, t))
}

/// Teal at `lo`, orange halfway, red at `hi`.
pub fn gradient(value: f64, lo: f64, hi: f64) -> RGBColor {
    let t = if hi > lo {
        ((value - lo) / (hi - lo)).clamp(0.0, 1.0)
    } else {
        0.5
    };
    let scaled = t * (GRADIENT.len() - 1) as f64;
    let idx = (scaled.floor() as usize).min(GRADIENT.len() - 2);
    mix(GRADIENT[idx], GRADIENT[idx + 1], scaled - idx as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gradient_hits_its_stops() {
        assert_eq!(gradient(0.0, 0.0, 10.0), TEST_TEAL);
        assert_eq!(gradient(5.0, 0.0, 10.0), ORANGE);
        assert_eq!(gradient(10.0, 0.0, 10.0), TRAINING_RED);
        assert_eq!(gradient(99.0, 0.0, 10.0), TRAINING_RED);
        assert_eq!(gradient(3.0, 3.0, 3.0), ORANGE);
    }
}
