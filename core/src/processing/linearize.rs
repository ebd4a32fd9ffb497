use crate::camera::{Detector, LinearityCorrection, LinearityType};
use crate::image::exposure::Exposure;
use crate::image::mask::SUSPECT;
use crate::isr::footprint::find_footprints;
use crate::prelude::{IsrError, IsrResult, Task};
use crate::telemetry::log::LogManager;

/// Applies `PROPORTIONAL` non-linearity correction amp by amp:
///
/// `corr = uncorr * (1 + c0 * uncorr)`, with pixels above `c2` flagged `SUSPECT`
/// when `c2 > 0`. `c1` is reserved and must be zero.
pub struct ProportionalLinearizeTask {
    logger: LogManager,
}

impl ProportionalLinearizeTask {
    pub fn new() -> Self {
        Self {
            logger: LogManager::new("correctNonLinearity"),
        }
    }

    /// Whether `detector` asks for correction; only the first amplifier's type is consulted.
    pub fn do_correct(&self, detector: &Detector) -> IsrResult<bool> {
        let amp = detector.first_amp()?;
        match &amp.linearity_type {
            LinearityType::None => Ok(false),
            LinearityType::Proportional if amp.linearity_coeffs.len() < 3 => Err(
                IsrError::TooFewLinearityCoeffs(amp.linearity_coeffs.len()),
            ),
            LinearityType::Proportional => Ok(true),
            LinearityType::Unsupported(kind) => Err(IsrError::UnsupportedLinearity {
                kind: kind.clone(),
                detector: detector.id.clone(),
                amp: amp.name.clone(),
            }),
        }
    }

    /// Validates every amplifier's coefficients before any pixel is modified.
    ///
    /// Each amp's own `linearity_type` is not consulted: once the first amp selects
    /// `PROPORTIONAL`, every amp is corrected from its coefficients.
    pub fn resolve(&self, detector: &Detector) -> IsrResult<Vec<LinearityCorrection>> {
        detector
            .amps
            .iter()
            .map(|amp| {
                let coeffs = &amp.linearity_coeffs;
                if coeffs.len() < 3 {
                    return Err(IsrError::TooFewLinearityCoeffs(coeffs.len()));
                }
                let (square_coeff, reserved, max_uncorr) = (coeffs[0], coeffs[1], coeffs[2]);
                if reserved != 0.0 {
                    return Err(IsrError::NonZeroSecondCoeff {
                        detector: detector.id.clone(),
                        amp: amp.name.clone(),
                        value: reserved,
                    });
                }
                if !(square_coeff.is_finite() && max_uncorr.is_finite()) {
                    return Err(IsrError::NonFiniteCoeffs {
                        amp: amp.name.clone(),
                        coeffs: coeffs[..3].to_vec(),
                    });
                }
                Ok(LinearityCorrection::Proportional {
                    square_coeff,
                    max_uncorr,
                })
            })
            .collect()
    }

    /// Corrects `exposure` in place; returns whether any amplifier was touched.
    pub fn correct(&self, exposure: &mut Exposure) -> IsrResult<bool> {
        let Exposure {
            masked_image,
            detector,
            ..
        } = exposure;
        let detector = detector.as_ref().ok_or(IsrError::MissingDetector)?;
        if !self.do_correct(detector)? {
            self.logger.detail(&format!(
                "non-linearity correction not wanted for detector {}",
                detector.id
            ));
            return Ok(false);
        }
        let corrections = self.resolve(detector)?;
        let suspect = masked_image.planes().plane_bit_mask(SUSPECT)?;

        let mut corrected = false;
        for (amp, correction) in detector.amps.iter().zip(&corrections) {
            let (square_coeff, max_uncorr) = match *correction {
                LinearityCorrection::Proportional {
                    square_coeff,
                    max_uncorr,
                } if !correction.is_noop() => (square_coeff, max_uncorr),
                _ => continue,
            };
            let mut view = masked_image.view_mut(&amp.bbox)?;
            if max_uncorr > 0.0 {
                for footprint in find_footprints(view.image.view(), |v| f64::from(v) > max_uncorr)
                {
                    footprint.set_mask(&mut view.mask, suspect);
                }
            }
            if square_coeff != 0.0 {
                let c0 = square_coeff as f32;
                view.image.mapv_inplace(|v| v * (1.0 + c0 * v));
            }
            corrected = true;
        }

        if corrected {
            self.logger.record(&format!(
                "applied linearity corrections to detector {}",
                detector.id
            ));
        }
        Ok(corrected)
    }
}

impl Default for ProportionalLinearizeTask {
    fn default() -> Self {
        Self::new()
    }
}

impl Task for ProportionalLinearizeTask {
    type Input<'a> = &'a mut Exposure;
    type Output = bool;

    fn name(&self) -> &str {
        self.logger.task()
    }

    fn run(&mut self, input: Self::Input<'_>) -> IsrResult<Self::Output> {
        self.correct(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{Amplifier, ElectronicParams};
    use crate::image::geom::BBox;
    use crate::image::masked_image::MaskedImage;
    use ndarray::Array2;

    const WIDTH: usize = 1000;
    const HEIGHT: usize = 600;

    /// 2x2 grid of amps; amp `i` gets `coeffs[i]`.
    fn ramp_exposure(kind: LinearityType, coeffs: &[[f64; 3]; 4]) -> Exposure {
        let (aw, ah) = (WIDTH / 2, HEIGHT / 2);
        let amps = (0..4)
            .map(|i| {
                let bbox = BBox::new((i % 2) * aw, (i / 2) * ah, aw, ah);
                Amplifier::new(format!("A{i}"), bbox, ElectronicParams::default())
                    .with_linearity(kind.clone(), coeffs[i].to_vec())
            })
            .collect();
        let ccd = Detector::new(
            "ramp",
            BBox::with_dims(WIDTH, HEIGHT),
            amps,
            ElectronicParams::default(),
        );
        let image = Array2::from_shape_fn((HEIGHT, WIDTH), |(y, x)| {
            (y * WIDTH + x) as f32 * 0.1
        });
        Exposure::new(MaskedImage::from_image(image)).with_detector(ccd)
    }

    const COEFFS: [[f64; 3]; 4] = [
        [0.0, 0.0, 0.0],
        [1.0e-6, 0.0, 30_000.0],
        [-2.0e-7, 0.0, 0.0],
        [0.0, 0.0, 45_000.0],
    ];

    #[test]
    fn proportional_correction_matches_formula() {
        let mut exposure = ramp_exposure(LinearityType::Proportional, &COEFFS);
        let before = exposure.masked_image.image().clone();
        let task = ProportionalLinearizeTask::new();
        assert!(task.correct(&mut exposure).unwrap());

        let detector = exposure.detector().unwrap().clone();
        let suspect = exposure
            .masked_image
            .planes()
            .plane_bit_mask(SUSPECT)
            .unwrap();
        for (amp, coeffs) in detector.amps.iter().zip(COEFFS.iter()) {
            let c0 = coeffs[0] as f32;
            let orig = before.slice(ndarray::s![amp.bbox.rows(), amp.bbox.cols()]);
            let got = exposure.masked_image.image_in(&amp.bbox).unwrap();
            for (&o, &g) in orig.iter().zip(got.iter()) {
                let want = o * (1.0 + c0 * o);
                assert!((g - want).abs() <= want.abs() * 1e-6 + 1e-3, "{g} != {want}");
            }

            let mask = exposure
                .masked_image
                .mask()
                .slice(ndarray::s![amp.bbox.rows(), amp.bbox.cols()]);
            for (&o, &m) in orig.iter().zip(mask.iter()) {
                let should_flag = coeffs[2] > 0.0 && f64::from(o) > coeffs[2];
                assert_eq!(m & suspect != 0, should_flag);
            }
        }
    }

    #[test]
    fn none_type_leaves_image_unchanged() {
        let mut exposure = ramp_exposure(LinearityType::None, &COEFFS);
        let before = exposure.masked_image.clone();
        let mut task = ProportionalLinearizeTask::new();
        assert!(!task.run(&mut exposure).unwrap());
        assert_eq!(exposure.masked_image, before);
    }

    #[test]
    fn zero_coefficients_leave_a_corrected_image_alone() {
        let mut exposure = ramp_exposure(LinearityType::Proportional, &COEFFS);
        let task = ProportionalLinearizeTask::new();
        assert!(task.correct(&mut exposure).unwrap());
        let first = exposure.masked_image.clone();

        if let Some(detector) = exposure.detector.as_mut() {
            for amp in &mut detector.amps {
                amp.linearity_coeffs = vec![0.0, 0.0, 0.0];
            }
        }
        assert!(!task.correct(&mut exposure).unwrap());
        assert_eq!(exposure.masked_image.image(), first.image());
        assert_eq!(exposure.masked_image.mask(), first.mask());
        assert_eq!(exposure.masked_image.variance(), first.variance());
    }

    fn single_amp_detector(kind: LinearityType, coeffs: Vec<f64>) -> Detector {
        let params = ElectronicParams::default();
        let amp = Amplifier::new("A0", BBox::with_dims(4, 4), params).with_linearity(kind, coeffs);
        Detector::new("one", BBox::with_dims(4, 4), vec![amp], params)
    }

    #[test]
    fn do_correct_follows_the_first_amplifier() {
        let task = ProportionalLinearizeTask::new();
        let none = single_amp_detector(LinearityType::None, Vec::new());
        assert!(!task.do_correct(&none).unwrap());

        let proportional = single_amp_detector(LinearityType::Proportional, vec![1.0e-6, 0.0, 0.0]);
        assert!(task.do_correct(&proportional).unwrap());

        let short = single_amp_detector(LinearityType::Proportional, vec![1.0e-6, 0.0]);
        assert!(matches!(
            task.do_correct(&short),
            Err(IsrError::TooFewLinearityCoeffs(2))
        ));

        let lookup = single_amp_detector(LinearityType::from("LOOKUP"), vec![0.0; 3]);
        assert!(matches!(
            task.do_correct(&lookup),
            Err(IsrError::UnsupportedLinearity { kind, amp, .. }) if kind == "LOOKUP" && amp == "A0"
        ));
    }

    #[test]
    fn unsupported_type_is_rejected() {
        let mut exposure = ramp_exposure(LinearityType::from("LOOKUP"), &COEFFS);
        let task = ProportionalLinearizeTask::new();
        assert!(matches!(
            task.correct(&mut exposure),
            Err(IsrError::UnsupportedLinearity { kind, .. }) if kind == "LOOKUP"
        ));
    }

    #[test]
    fn bad_coefficients_abort_before_any_pixel_changes() {
        let mut coeffs = COEFFS;
        coeffs[3][1] = 0.5;
        let mut exposure = ramp_exposure(LinearityType::Proportional, &coeffs);
        let before = exposure.masked_image.clone();
        let task = ProportionalLinearizeTask::new();
        assert!(matches!(
            task.correct(&mut exposure),
            Err(IsrError::NonZeroSecondCoeff { value, .. }) if value == 0.5
        ));
        assert_eq!(exposure.masked_image, before);

        let mut coeffs = COEFFS;
        coeffs[2][0] = f64::NAN;
        let mut exposure = ramp_exposure(LinearityType::Proportional, &coeffs);
        assert!(matches!(
            task.correct(&mut exposure),
            Err(IsrError::NonFiniteCoeffs { .. })
        ));
    }

    #[test]
    fn too_few_coefficients_are_rejected() {
        let mut exposure = ramp_exposure(LinearityType::Proportional, &COEFFS);
        if let Some(detector) = exposure.detector.as_mut() {
            detector.amps[1].linearity_coeffs.truncate(2);
        }
        let task = ProportionalLinearizeTask::new();
        assert!(matches!(
            task.correct(&mut exposure),
            Err(IsrError::TooFewLinearityCoeffs(2))
        ));
    }
}
