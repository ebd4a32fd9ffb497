use crate::camera::{Amplifier, Detector};
use crate::image::exposure::Exposure;
use crate::image::geom::BBox;
use crate::image::masked_image::MaskedImage;
use crate::prelude::{IsrError, IsrResult, Task};
use crate::processing::config::AssembleCcdConfig;
use crate::telemetry::log::LogManager;
use ndarray::{Array2, ArrayView2, Axis};

/// Stitches the data sections of every amplifier into one trimmed CCD image.
pub struct AssembleCcdTask {
    config: AssembleCcdConfig,
    logger: LogManager,
}

impl AssembleCcdTask {
    pub fn new(config: AssembleCcdConfig) -> Self {
        Self {
            config,
            logger: LogManager::new("assembleCcd"),
        }
    }

    pub fn config(&self) -> &AssembleCcdConfig {
        &self.config
    }

    /// Builds the assembled exposure; the input is left untouched.
    pub fn assemble(&self, exposure: &Exposure) -> IsrResult<Exposure> {
        let detector = exposure.detector()?;
        let re_norm = self.config.effective_re_norm();
        if self.config.re_norm && !re_norm {
            self.logger
                .warning("re_norm requested without set_gain; amplifiers keep their native gain");
        }

        let mut assembled = MaskedImage::new(detector.bbox.width, detector.bbox.height);
        *assembled.planes_mut() = exposure.masked_image.planes().clone();

        for amp in &detector.amps {
            if amp.bbox.dims() != amp.raw_data_bbox.dims() {
                let (w, h) = amp.bbox.dims();
                let (rw, rh) = amp.raw_data_bbox.dims();
                return Err(IsrError::DimensionMismatch {
                    expected: (h, w),
                    found: (rh, rw),
                });
            }
            let segment = exposure.masked_image.sub_image(&amp.raw_data_bbox)?;
            let (fx, fy) = (amp.raw_flip_x, amp.raw_flip_y);
            let mut image = flipped(segment.image().view(), fx, fy);
            let mut variance = flipped(segment.variance().view(), fx, fy);
            let mask = flipped(segment.mask().view(), fx, fy);
            if re_norm {
                let gain = amp.electronic.gain as f32;
                image.mapv_inplace(|v| v * gain);
                variance.mapv_inplace(|v| v * gain * gain);
            }

            let mut dst = assembled.view_mut(&amp.bbox)?;
            dst.image.assign(&image);
            dst.mask.assign(&mask);
            dst.variance.assign(&variance);
        }

        let mut metadata = exposure.metadata.clone();
        if self.config.set_gain {
            let gain = if re_norm {
                1.0
            } else {
                mean_gain(&detector.amps)
            };
            metadata.insert("GAIN".to_string(), gain.into());
        }
        for key in &self.config.keys_to_remove {
            metadata.remove(key);
        }

        self.logger.detail(&format!(
            "assembled {} amplifiers into {}x{} image",
            detector.amps.len(),
            detector.bbox.width,
            detector.bbox.height
        ));

        Ok(Exposure {
            masked_image: assembled,
            detector: Some(assembled_detector(detector, re_norm)),
            calib: exposure.calib,
            metadata,
        })
    }
}

impl Task for AssembleCcdTask {
    type Input<'a> = &'a Exposure;
    type Output = Exposure;

    fn name(&self) -> &str {
        self.logger.task()
    }

    fn run(&mut self, input: Self::Input<'_>) -> IsrResult<Self::Output> {
        self.assemble(input)
    }
}

fn flipped<T: Clone>(plane: ArrayView2<'_, T>, flip_x: bool, flip_y: bool) -> Array2<T> {
    let mut view = plane;
    if flip_x {
        view.invert_axis(Axis(1));
    }
    if flip_y {
        view.invert_axis(Axis(0));
    }
    view.to_owned()
}

fn mean_gain(amps: &[Amplifier]) -> f64 {
    if amps.is_empty() {
        return 1.0;
    }
    amps.iter().map(|amp| amp.electronic.gain).sum::<f64>() / amps.len() as f64
}

/// Detector describing the trimmed image: every amp reads out exactly its data region.
fn assembled_detector(detector: &Detector, re_norm: bool) -> Detector {
    let mut assembled = detector.clone();
    for amp in &mut assembled.amps {
        amp.raw_bbox = amp.bbox;
        amp.raw_data_bbox = amp.bbox;
        amp.raw_bias_bbox = BBox::default();
        amp.raw_flip_x = false;
        amp.raw_flip_y = false;
        if re_norm {
            let gain = amp.electronic.gain;
            amp.electronic.gain = 1.0;
            amp.electronic.read_noise *= gain;
            amp.electronic.saturation_level *= gain;
        }
    }
    if re_norm {
        assembled.electronic.read_noise *= assembled.electronic.gain;
        assembled.electronic.gain = 1.0;
    }
    assembled
}
