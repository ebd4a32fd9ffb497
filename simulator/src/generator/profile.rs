use crate::generator::template::vignetting;
use anyhow::{ensure, Context};
use isrcore::camera::{Amplifier, Defect, Detector, ElectronicParams, LinearityType};
use isrcore::data_ref::{DataId, DatasetType, DirectoryDataRef, InMemoryDataRef, SensorDataRef};
use isrcore::image::{BBox, Calib, Exposure, MaskedImage, PropertySet, RawExposure};
use ndarray::Array2;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Layout and signal levels of a synthetic sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    pub visit: u32,
    pub ccd: u32,
    pub amps_x: usize,
    pub amps_y: usize,
    pub amp_width: usize,
    pub amp_height: usize,
    /// Overscan columns per amp; odd amp columns are read out mirrored with the
    /// overscan on their left.
    pub overscan: usize,
    pub gain: f64,
    pub read_noise: f64,
    /// ADC ceiling in ADU.
    pub saturation: f64,
    pub bias_level: f64,
    /// Sky level in electrons.
    pub sky: f64,
    /// Half-width of the uniform pixel noise in ADU.
    pub noise: f64,
    pub exp_time: f64,
    /// Dark current in ADU per second.
    pub dark_current: f64,
    pub dark_exp_time: f64,
    pub vignetting: f64,
    /// Dead column segments.
    pub defects: usize,
    /// Saturated stars with a vertical bleed trail.
    pub stars: usize,
    /// `PROPORTIONAL` coefficients for every amp; empty means `NONE`.
    pub linearity_coeffs: Vec<f64>,
    pub seed: u64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            visit: 1,
            ccd: 0,
            amps_x: 2,
            amps_y: 2,
            amp_width: 64,
            amp_height: 48,
            overscan: 8,
            gain: 2.0,
            read_noise: 4.0,
            saturation: 30_000.0,
            bias_level: 1_000.0,
            sky: 400.0,
            noise: 5.0,
            exp_time: 30.0,
            dark_current: 0.2,
            dark_exp_time: 60.0,
            vignetting: 0.15,
            defects: 2,
            stars: 2,
            linearity_coeffs: Vec::new(),
            seed: 0,
        }
    }
}

impl SensorConfig {
    pub fn data_id(&self) -> DataId {
        DataId::new().with("visit", self.visit).with("ccd", self.ccd)
    }

    fn width(&self) -> usize {
        self.amps_x * self.amp_width
    }

    fn height(&self) -> usize {
        self.amps_y * self.amp_height
    }
}

/// Raw frame plus the calibrations needed to process it.
pub struct SensorDatasets {
    pub raw: RawExposure,
    pub calibs: Vec<(DatasetType, Exposure)>,
}

impl SensorDatasets {
    pub fn into_memory(self, data_id: DataId) -> InMemoryDataRef {
        self.calibs.into_iter().fold(
            InMemoryDataRef::new(data_id).with_raw(self.raw),
            |data_ref, (dataset, exposure)| data_ref.with_dataset(dataset, exposure),
        )
    }

    pub fn write_to(&self, data_ref: &mut DirectoryDataRef) -> anyhow::Result<()> {
        data_ref
            .put_raw(&self.raw)
            .with_context(|| format!("writing raw frame under {}", data_ref.root().display()))?;
        for (dataset, exposure) in &self.calibs {
            data_ref
                .put(exposure, *dataset)
                .with_context(|| format!("writing {dataset} calibration"))?;
        }
        Ok(())
    }
}

pub fn build_detector(config: &SensorConfig) -> anyhow::Result<Detector> {
    ensure!(
        config.amps_x > 0 && config.amps_y > 0,
        "sensor needs at least one amplifier"
    );
    ensure!(
        config.amp_width > 0 && config.amp_height > 0 && config.overscan > 0,
        "amplifier and overscan dimensions must be non-zero"
    );
    ensure!(config.gain > 0.0, "gain must be positive");

    let electronic = ElectronicParams {
        gain: config.gain,
        read_noise: config.read_noise,
        saturation_level: config.saturation,
    };
    let (aw, ah, ow) = (config.amp_width, config.amp_height, config.overscan);
    let linearity = if config.linearity_coeffs.is_empty() {
        LinearityType::None
    } else {
        LinearityType::Proportional
    };

    let mut amps = Vec::with_capacity(config.amps_x * config.amps_y);
    for iy in 0..config.amps_y {
        for ix in 0..config.amps_x {
            let raw_bbox = BBox::new(ix * (aw + ow), iy * ah, aw + ow, ah);
            let flip_x = ix % 2 == 1;
            let (data_x0, bias_x0) = if flip_x {
                (raw_bbox.x0 + ow, raw_bbox.x0)
            } else {
                (raw_bbox.x0, raw_bbox.x0 + aw)
            };
            let amp = Amplifier::new(
                format!("{ix}{iy}"),
                BBox::new(ix * aw, iy * ah, aw, ah),
                electronic,
            )
            .with_raw_layout(
                raw_bbox,
                BBox::new(data_x0, iy * ah, aw, ah),
                BBox::new(bias_x0, iy * ah, ow, ah),
            )
            .with_flips(flip_x, false)
            .with_linearity(linearity.clone(), config.linearity_coeffs.clone());
            amps.push(amp);
        }
    }

    Ok(Detector::new(
        format!("ccd{}", config.ccd),
        BBox::with_dims(config.width(), config.height()),
        amps,
        electronic,
    ))
}

/// Generates a raw frame with bias, dark current, vignetted sky, dead columns and
/// saturated stars, plus matching noise-free bias, dark, flat and illumination frames.
pub fn generate(config: &SensorConfig) -> anyhow::Result<SensorDatasets> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let (width, height) = (config.width(), config.height());

    let defects: Vec<Defect> = (0..config.defects)
        .map(|_| {
            let length = (height / 4).max(1);
            let x = rng.gen_range(0..width);
            let y0 = rng.gen_range(0..=height - length);
            Defect::new(BBox::new(x, y0, 1, length))
        })
        .collect();
    let detector = build_detector(config)?.with_defects(defects.clone());

    // Electrons in assembled coordinates.
    let mut signal = Array2::from_shape_fn((height, width), |(y, x)| {
        config.sky * vignetting(x, y, width, height, config.vignetting)
    });
    let star_level = config.saturation * config.gain * 2.0;
    for _ in 0..config.stars {
        let cx = rng.gen_range(0..width);
        let cy = rng.gen_range(0..height);
        for y in cy.saturating_sub(4)..(cy + 5).min(height) {
            signal[[y, cx]] = star_level;
        }
        for y in cy.saturating_sub(1)..(cy + 2).min(height) {
            for x in cx.saturating_sub(1)..(cx + 2).min(width) {
                signal[[y, x]] = star_level;
            }
        }
    }
    for defect in &defects {
        for y in defect.bbox.rows() {
            for x in defect.bbox.cols() {
                signal[[y, x]] = 0.0;
            }
        }
    }

    let raw_extent = detector.raw_extent();
    let shape = (raw_extent.height, raw_extent.width);
    let mut raw = Array2::<i32>::zeros(shape);
    let mut dark = Array2::<f32>::zeros(shape);
    let mut flat = Array2::<f32>::ones(shape);
    let dark_level = config.dark_current * config.exp_time;

    let jitter = |rng: &mut StdRng| {
        if config.noise > 0.0 {
            rng.gen_range(-config.noise..config.noise)
        } else {
            0.0
        }
    };
    let to_adu = |value: f64| value.clamp(0.0, config.saturation).round() as i32;

    for amp in &detector.amps {
        for y in amp.raw_bias_bbox.rows() {
            for x in amp.raw_bias_bbox.cols() {
                raw[[y, x]] = to_adu(config.bias_level + jitter(&mut rng));
            }
        }
        for ly in 0..amp.bbox.height {
            for lx in 0..amp.bbox.width {
                let (ax, ay) = (amp.bbox.x0 + lx, amp.bbox.y0 + ly);
                let rx = if amp.raw_flip_x {
                    amp.raw_data_bbox.x0 + amp.bbox.width - 1 - lx
                } else {
                    amp.raw_data_bbox.x0 + lx
                };
                let ry = amp.raw_data_bbox.y0 + ly;
                let adu = signal[[ay, ax]] / config.gain
                    + config.bias_level
                    + dark_level
                    + jitter(&mut rng);
                raw[[ry, rx]] = to_adu(adu);
                dark[[ry, rx]] = (config.dark_current * config.dark_exp_time) as f32;
                flat[[ry, rx]] = vignetting(ax, ay, width, height, config.vignetting) as f32;
            }
        }
    }

    let mut metadata = PropertySet::new();
    metadata.insert("EXPTIME".into(), config.exp_time.into());
    metadata.insert("OBSTYPE".into(), "science".into());

    let calib = |image: Array2<f32>, exp_time: f64| Exposure {
        masked_image: MaskedImage::from_image(image),
        detector: Some(detector.clone()),
        calib: Calib { exp_time },
        metadata: PropertySet::new(),
    };
    let calibs = vec![
        (DatasetType::Bias, calib(Array2::zeros(shape), 0.0)),
        (DatasetType::Dark, calib(dark, config.dark_exp_time)),
        (DatasetType::Flat, calib(flat, 0.0)),
        (DatasetType::Illum, calib(Array2::ones(shape), 0.0)),
    ];

    Ok(SensorDatasets {
        raw: RawExposure {
            image: raw,
            detector: detector.clone(),
            calib: Calib {
                exp_time: config.exp_time,
            },
            metadata,
        },
        calibs,
    })
}
