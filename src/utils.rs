use crate::geometry::Fp;

/// Clamps a linear channel value to [0, 1] and scales it to a byte.
pub fn color_to_byte(x: Fp) -> u8 {
    (x.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_channels_are_clamped() {
        assert_eq!(color_to_byte(-0.3), 0);
        assert_eq!(color_to_byte(1.7), 255);
        assert_eq!(color_to_byte(0.2), 51);
    }

    #[test]
    fn nan_channel_is_black() {
        assert_eq!(color_to_byte(Fp::NAN), 0);
    }
}
