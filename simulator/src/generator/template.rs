/// Radial flat-field response: 1 at the centre of a `width` x `height` field, falling
/// quadratically to `1 - strength` at the corners.
pub fn vignetting(x: usize, y: usize, width: usize, height: usize, strength: f64) -> f64 {
    let cx = (width as f64 - 1.0) / 2.0;
    let cy = (height as f64 - 1.0) / 2.0;
    let r_max2 = cx * cx + cy * cy;
    if r_max2 == 0.0 {
        return 1.0;
    }
    let dx = x as f64 - cx;
    let dy = y as f64 - cy;
    1.0 - strength * (dx * dx + dy * dy) / r_max2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vignetting_is_unity_at_centre_and_drops_at_corners() {
        assert!((vignetting(5, 5, 11, 11, 0.2) - 1.0).abs() < 1e-12);
        assert!((vignetting(0, 0, 11, 11, 0.2) - 0.8).abs() < 1e-12);
        assert_eq!(vignetting(0, 0, 1, 1, 0.2), 1.0);
    }
}
