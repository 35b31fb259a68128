//! Baseband FIR profiles for the AD936x sample-rate path.
//!
//! The AD936x runs a programmable 128-tap FIR between the data converters and
//! the baseband interface, used for decimation on RX and interpolation on TX.
//! Which kernel the part can run depends on the requested sample rate: lower
//! rates leave enough converter clock headroom for longer kernels and a
//! deeper decimation, higher rates force shorter kernels.
//!
//! The four kernels below are fixed hardware designs (signed 16-bit
//! coefficients, symmetric low-pass); they are selected, never derived.

/// 128-tap decimate/interpolate-by-4 kernel, rates up to 20 MS/s.
const FIR_128_DEC4: [i16; 128] = [
    -15, -27, -23, -6, 17, 33, 31, 9, -23, -47, -45, -13, 34, 69,
    67, 21, -49, -102, -99, -32, 69, 146, 143, 48, -96, -204, -200,
    -69, 129, 278, 275, 97, -170, -372, -371, -135, 222, 494, 497,
    187, -288, -654, -665, -258, 376, 875, 902, 363, -500, -1201,
    -1265, -530, 699, 1748, 1906, 845, -1089, -2922, -3424, -1697,
    2326, 7714, 12821, 15921, 15921, 12821, 7714, 2326, -1697,
    -3424, -2922, -1089, 845, 1906, 1748, 699, -530, -1265, -1201,
    -500, 363, 902, 875, 376, -258, -665, -654, -288, 187, 497,
    494, 222, -135, -371, -372, -170, 97, 275, 278, 129, -69, -200,
    -204, -96, 48, 143, 146, 69, -32, -99, -102, -49, 21, 67, 69,
    34, -13, -45, -47, -23, 9, 31, 33, 17, -6, -23, -27, -15,
];

/// 128-tap half-band decimate/interpolate-by-2 kernel, 20–40 MS/s.
const FIR_128_DEC2: [i16; 128] = [
    0, 0, 1, 0, -2, 0, 3, 0, -5, 0, 8, 0, -11, 0, 17, 0, -24,
    0, 33, 0, -45, 0, 61, 0, -80, 0, 104, 0, -134, 0, 169, 0,
    -213, 0, 264, 0, -327, 0, 401, 0, -489, 0, 595, 0, -724, 0,
    880, 0, -1075, 0, 1323, 0, -1652, 0, 2114, 0, -2819, 0,
    4056, 0, -6883, 0, 20837, 32767, 20837, 0, -6883, 0, 4056, 0,
    -2819, 0, 2114, 0, -1652, 0, 1323, 0, -1075, 0, 880, 0,
    -724, 0, 595, 0, -489, 0, 401, 0, -327, 0, 264, 0, -213, 0,
    169, 0, -134, 0, 104, 0, -80, 0, 61, 0, -45, 0, 33, 0, -24,
    0, 17, 0, -11, 0, 8, 0, -5, 0, 3, 0, -2, 0, 1, 0, 0, 0,
];

/// 96-tap half-band decimate/interpolate-by-2 kernel, 40–53.33 MS/s.
const FIR_96_DEC2: [i16; 96] = [
    -4, 0, 8, 0, -14, 0, 23, 0, -36, 0, 52, 0, -75, 0, 104, 0,
    -140, 0, 186, 0, -243, 0, 314, 0, -400, 0, 505, 0, -634, 0,
    793, 0, -993, 0, 1247, 0, -1585, 0, 2056, 0, -2773, 0, 4022,
    0, -6862, 0, 20830, 32767, 20830, 0, -6862, 0, 4022, 0,
    -2773, 0, 2056, 0, -1585, 0, 1247, 0, -993, 0, 793, 0, -634,
    0, 505, 0, -400, 0, 314, 0, -243, 0, 186, 0, -140, 0, 104,
    0, -75, 0, 52, 0, -36, 0, 23, 0, -14, 0, 8, 0, -4, 0,
];

/// 64-tap half-band decimate/interpolate-by-2 kernel, above 53.33 MS/s.
const FIR_64_DEC2: [i16; 64] = [
    -58, 0, 83, 0, -127, 0, 185, 0, -262, 0, 361, 0, -488, 0,
    648, 0, -853, 0, 1117, 0, -1466, 0, 1954, 0, -2689, 0, 3960,
    0, -6825, 0, 20818, 32767, 20818, 0, -6825, 0, 3960, 0,
    -2689, 0, 1954, 0, -1466, 0, 1117, 0, -853, 0, 648, 0, -488,
    0, 361, 0, -262, 0, 185, 0, -127, 0, 83, 0, -58, 0,
];

/// A fixed FIR configuration for one sample-rate bracket.
///
/// Profiles are process-wide immutable data; [`FirProfile::for_rate`] hands
/// out a reference to one of the four static instances, so concurrent reads
/// need no synchronization.
#[derive(Debug, PartialEq, Eq)]
pub struct FirProfile {
    /// RX decimation factor, also used as the TX interpolation factor.
    pub decimation: i64,
    /// Coefficient sequence, applied identically to the I and Q columns.
    pub taps: &'static [i16],
}

static PROFILE_LOW: FirProfile = FirProfile {
    decimation: 4,
    taps: &FIR_128_DEC4,
};

static PROFILE_MID: FirProfile = FirProfile {
    decimation: 2,
    taps: &FIR_128_DEC2,
};

static PROFILE_HIGH: FirProfile = FirProfile {
    decimation: 2,
    taps: &FIR_96_DEC2,
};

static PROFILE_MAX: FirProfile = FirProfile {
    decimation: 2,
    taps: &FIR_64_DEC2,
};

impl FirProfile {
    /// Select the FIR profile for a requested sample rate.
    ///
    /// Brackets are evaluated in ascending order, first match wins; lower
    /// bounds are exclusive, upper bounds inclusive, so there is no gap and
    /// no overlap between them.
    ///
    /// # Example
    ///
    /// ```
    /// use rs_pluto::fir::FirProfile;
    ///
    /// let profile = FirProfile::for_rate(10_000_000);
    /// assert_eq!(profile.decimation, 4);
    /// assert_eq!(profile.tap_count(), 128);
    /// ```
    pub fn for_rate(rate: i64) -> &'static FirProfile {
        if rate <= 20_000_000 {
            &PROFILE_LOW
        } else if rate <= 40_000_000 {
            &PROFILE_MID
        } else if rate <= 53_333_333 {
            &PROFILE_HIGH
        } else {
            &PROFILE_MAX
        }
    }

    /// Number of coefficients in this profile.
    pub fn tap_count(&self) -> usize {
        self.taps.len()
    }

    /// Assemble the textual `filter_fir_config` payload for this profile.
    ///
    /// The format is the one the AD936x firmware parses: two header lines
    /// binding the decimation/interpolation factor for both paths, one
    /// `<coef>,<coef>` line per tap (the value is duplicated because the
    /// complex path uses an identical I/Q response), and a terminating
    /// blank line.
    pub fn config_payload(&self) -> String {
        let mut config = String::with_capacity(8 * self.taps.len() + 64);
        config.push_str(&format!("RX 3 GAIN -6 DEC {}\n", self.decimation));
        config.push_str(&format!("TX 3 GAIN 0 INT {}\n", self.decimation));
        for tap in self.taps {
            config.push_str(&format!("{},{}\n", tap, tap));
        }
        config.push('\n');
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bracket_low() {
        for rate in [521_000, 1_000_000, 10_000_000, 20_000_000] {
            let p = FirProfile::for_rate(rate);
            assert_eq!(p.decimation, 4, "rate {}", rate);
            assert_eq!(p.tap_count(), 128, "rate {}", rate);
        }
    }

    #[test]
    fn test_bracket_mid() {
        for rate in [20_000_001, 30_000_000, 40_000_000] {
            let p = FirProfile::for_rate(rate);
            assert_eq!(p.decimation, 2, "rate {}", rate);
            assert_eq!(p.tap_count(), 128, "rate {}", rate);
        }
    }

    #[test]
    fn test_bracket_high() {
        for rate in [40_000_001, 50_000_000, 53_333_333] {
            let p = FirProfile::for_rate(rate);
            assert_eq!(p.decimation, 2, "rate {}", rate);
            assert_eq!(p.tap_count(), 96, "rate {}", rate);
        }
    }

    #[test]
    fn test_bracket_max() {
        for rate in [53_333_334, 61_440_000] {
            let p = FirProfile::for_rate(rate);
            assert_eq!(p.decimation, 2, "rate {}", rate);
            assert_eq!(p.tap_count(), 64, "rate {}", rate);
        }
    }

    #[test]
    fn test_brackets_contiguous() {
        // Adjacent rates on each boundary select different profiles.
        assert_ne!(
            FirProfile::for_rate(20_000_000).taps,
            FirProfile::for_rate(20_000_001).taps
        );
        assert_ne!(
            FirProfile::for_rate(40_000_000).taps,
            FirProfile::for_rate(40_000_001).taps
        );
        assert_ne!(
            FirProfile::for_rate(53_333_333).taps,
            FirProfile::for_rate(53_333_334).taps
        );
    }

    #[test]
    fn test_kernels_symmetric() {
        for taps in [
            &FIR_128_DEC4[..],
            &FIR_128_DEC2[..],
            &FIR_96_DEC2[..],
            &FIR_64_DEC2[..],
        ] {
            for i in 0..taps.len() / 2 {
                assert_eq!(taps[i], taps[taps.len() - 1 - i], "tap {}", i);
            }
        }
    }

    #[test]
    fn test_halfband_peaks() {
        // The decimate-by-2 kernels carry a full-scale center tap.
        assert_eq!(FIR_128_DEC2[63], 32767);
        assert_eq!(FIR_96_DEC2[47], 32767);
        assert_eq!(FIR_64_DEC2[31], 32767);
        // The decimate-by-4 kernel peaks at its repeated center pair.
        assert_eq!(FIR_128_DEC4[63], 15921);
        assert_eq!(FIR_128_DEC4[64], 15921);
    }

    #[test]
    fn test_payload_headers() {
        let payload = FirProfile::for_rate(10_000_000).config_payload();
        let mut lines = payload.lines();
        assert_eq!(lines.next(), Some("RX 3 GAIN -6 DEC 4"));
        assert_eq!(lines.next(), Some("TX 3 GAIN 0 INT 4"));

        let payload = FirProfile::for_rate(30_000_000).config_payload();
        let mut lines = payload.lines();
        assert_eq!(lines.next(), Some("RX 3 GAIN -6 DEC 2"));
        assert_eq!(lines.next(), Some("TX 3 GAIN 0 INT 2"));
    }

    #[test]
    fn test_payload_coefficient_lines() {
        for rate in [10_000_000, 30_000_000, 50_000_000, 61_440_000] {
            let profile = FirProfile::for_rate(rate);
            let payload = profile.config_payload();
            let coef_lines: Vec<&str> = payload
                .lines()
                .skip(2)
                .take_while(|l| !l.is_empty())
                .collect();
            assert_eq!(coef_lines.len(), profile.tap_count());
            for (line, tap) in coef_lines.iter().zip(profile.taps) {
                let (left, right) = line.split_once(',').unwrap();
                assert_eq!(left, right);
                assert_eq!(left.parse::<i16>().unwrap(), *tap);
            }
        }
    }

    #[test]
    fn test_payload_trailing_blank_line() {
        let payload = FirProfile::for_rate(10_000_000).config_payload();
        assert!(payload.ends_with("\n\n"));
        // Exactly headers + taps + one blank, nothing after.
        assert_eq!(payload.lines().count(), 2 + 128 + 1);
        assert_eq!(payload.lines().last(), Some(""));
    }
}
