use super::error::InfeasibleWindow;
use rand::Rng;

/// Inclusive range of clip lengths in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipLengthRange {
    pub min: u32,
    pub max: u32,
}

/// The subrange of the source video to extract.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipWindow {
    /// Start offset in seconds
    pub start: f64,
    /// Clip length in seconds
    pub length: u32,
}

impl ClipWindow {
    pub fn end(&self) -> f64 {
        self.start + self.length as f64
    }
}

/// Pick a random window of `range` length that fits inside `total_duration`.
///
/// The length is drawn once from the lengths that leave a strictly positive
/// start range, so a window is feasible exactly when `total_duration` is finite
/// and greater than `range.min`.
pub fn select_window<R: Rng + ?Sized>(
    total_duration: f64,
    range: ClipLengthRange,
    rng: &mut R,
) -> Result<ClipWindow, InfeasibleWindow> {
    let infeasible = InfeasibleWindow {
        duration: total_duration,
        min_len: range.min,
        max_len: range.max,
    };

    if !total_duration.is_finite() || total_duration <= 0.0 || range.min > range.max {
        return Err(infeasible);
    }

    // Largest whole length strictly shorter than the video.
    let longest_fit = total_duration.ceil() - 1.0;
    if longest_fit < range.min as f64 {
        return Err(infeasible);
    }
    let upper = range.max.min(longest_fit.min(u32::MAX as f64) as u32);

    let length = rng.gen_range(range.min..=upper);
    let max_start = total_duration - length as f64;
    if max_start <= 0.0 {
        return Err(infeasible);
    }

    let start = rng.gen_range(0.0..=max_start);
    Ok(ClipWindow { start, length })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const RANGE: ClipLengthRange = ClipLengthRange { min: 30, max: 60 };

    #[test]
    fn test_window_fits_long_video() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let window = select_window(600.0, RANGE, &mut rng).unwrap();
            assert!((30..=60).contains(&window.length));
            assert!(window.start >= 0.0);
            assert!(window.start <= 600.0 - window.length as f64);
            assert!(window.end() <= 600.0);
        }
    }

    #[test]
    fn test_window_invariants_across_durations() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut duration = 30.25;
        while duration < 400.0 {
            for _ in 0..50 {
                let window = select_window(duration, RANGE, &mut rng).unwrap();
                assert!(window.length >= RANGE.min && window.length <= RANGE.max);
                assert!(window.start >= 0.0);
                assert!(window.end() <= duration, "{:?} overruns {}", window, duration);
            }
            duration += 7.75;
        }
    }

    #[test]
    fn test_short_video_is_infeasible() {
        let mut rng = StdRng::seed_from_u64(1);
        for duration in [0.5, 10.0, 29.99, 30.0] {
            let err = select_window(duration, RANGE, &mut rng).unwrap_err();
            assert_eq!(err.duration, duration);
            assert_eq!(err.min_len, 30);
        }
    }

    #[test]
    fn test_infeasibility_does_not_depend_on_the_draw() {
        // 45s fits every length between 30 and 44; the draw never exceeds that.
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let window = select_window(45.0, RANGE, &mut rng).unwrap();
            assert!(window.length <= 44);
            assert!(window.end() <= 45.0);
        }
    }

    #[test]
    fn test_fractional_duration_just_above_minimum() {
        let mut rng = StdRng::seed_from_u64(3);
        let window = select_window(30.5, RANGE, &mut rng).unwrap();
        assert_eq!(window.length, 30);
        assert!(window.start <= 0.5);
    }

    #[test]
    fn test_non_finite_duration_is_infeasible() {
        let mut rng = StdRng::seed_from_u64(9);
        assert!(select_window(f64::NAN, RANGE, &mut rng).is_err());
        assert!(select_window(f64::INFINITY, RANGE, &mut rng).is_err());
        assert!(select_window(-5.0, RANGE, &mut rng).is_err());
    }
}
