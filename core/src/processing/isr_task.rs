use crate::camera::{DefectList, Detector, DetectorComponent};
use crate::data_ref::{DatasetType, SensorDataRef};
use crate::image::exposure::{float_image_from_int, Exposure};
use crate::image::mask::{BAD, UNMASKEDNAN};
use crate::image::masked_image::MaskedImageViewMut;
use crate::isr::{self, UnmaskedNanCounter};
use crate::prelude::{IsrError, IsrResult, Task};
use crate::processing::assemble::AssembleCcdTask;
use crate::processing::config::IsrTaskConfig;
use crate::telemetry::log::LogManager;
use crate::telemetry::metrics::TaskMetadata;

/// Instrument signature removal for one sensor.
///
/// Per amplifier: saturation detection and overscan subtraction. Per CCD: bias, dark,
/// variance, flat and (optionally) illumination correction, followed by assembly and
/// interpolation over defects, saturated pixels and NaNs.
pub struct IsrTask {
    config: IsrTaskConfig,
    assemble_ccd: AssembleCcdTask,
    transpose_for_interpolation: bool,
    logger: LogManager,
    metadata: TaskMetadata,
}

impl IsrTask {
    pub fn new(config: IsrTaskConfig) -> IsrResult<Self> {
        config.validate()?;
        Ok(Self {
            assemble_ccd: AssembleCcdTask::new(config.assemble_ccd.clone()),
            config,
            transpose_for_interpolation: false,
            logger: LogManager::new("isr"),
            metadata: TaskMetadata::new(),
        })
    }

    /// Interpolate along columns instead of rows.
    pub fn with_transpose_for_interpolation(mut self, transpose: bool) -> Self {
        self.transpose_for_interpolation = transpose;
        self
    }

    pub fn config(&self) -> &IsrTaskConfig {
        &self.config
    }

    pub fn metadata(&self) -> &TaskMetadata {
        &self.metadata
    }

    fn process(&self, sensor_ref: &mut dyn SensorDataRef) -> IsrResult<Exposure> {
        self.logger
            .record(&format!("performing ISR on sensor {}", sensor_ref.data_id()));
        let mut ccd_exposure = float_image_from_int(sensor_ref.get_raw()?);
        let ccd = ccd_exposure.detector()?.clone();

        for amp in &ccd.amps {
            let component = DetectorComponent::Amp(amp);
            let mut amp_view = ccd_exposure.masked_image.view_mut(&amp.raw_bbox)?;
            self.saturation_detection(&mut amp_view, component)?;
            self.overscan_correction(&mut amp_view, component)?;
        }

        self.bias_correction(&mut ccd_exposure, &*sensor_ref)?;
        self.dark_correction(&mut ccd_exposure, &*sensor_ref)?;
        self.update_variance(&mut ccd_exposure, &ccd)?;
        self.flat_correction(&mut ccd_exposure, &*sensor_ref)?;
        if self.config.do_illumination {
            self.illumination_correction(&mut ccd_exposure, &*sensor_ref)?;
        }

        let mut ccd_exposure = self.assemble_ccd.assemble(&ccd_exposure)?;
        let ccd = ccd_exposure.detector()?.clone();

        self.mask_and_interp_defect(&mut ccd_exposure, &ccd)?;
        self.saturation_interpolation(&mut ccd_exposure)?;
        self.mask_and_interp_nan(&mut ccd_exposure)?;

        if self.config.do_write {
            sensor_ref.put(&ccd_exposure, DatasetType::VisitCcd)?;
        }
        Ok(ccd_exposure)
    }

    /// Flags pixels at or above the amp's saturation level. Amplifier only.
    pub fn saturation_detection(
        &self,
        amp_view: &mut MaskedImageViewMut<'_>,
        component: DetectorComponent<'_>,
    ) -> IsrResult<()> {
        let amp = component.as_amp()?;
        isr::make_threshold_mask(
            amp_view,
            amp.electronic.saturation_level,
            0,
            &self.config.saturated_mask_name,
        )?;
        Ok(())
    }

    /// Detects and interpolates saturated pixels in one pass. Amplifier only.
    ///
    /// Bleed trails crossing into neighbouring amps are not followed.
    pub fn saturation_correction(
        &self,
        amp_view: &mut MaskedImageViewMut<'_>,
        component: DetectorComponent<'_>,
    ) -> IsrResult<()> {
        let amp = component.as_amp()?;
        let flagged = isr::saturation_correction(
            amp_view,
            amp.electronic.saturation_level,
            self.config.fwhm,
            self.config.grow_saturation_footprint_size,
            &self.config.saturated_mask_name,
        )?;
        self.logger
            .detail(&format!("interpolated {flagged} saturated pixels on {}", amp.name));
        Ok(())
    }

    /// Subtracts the bias level measured in the amp's overscan. Amplifier only.
    ///
    /// `amp_view` must cover the amplifier's full raw extent.
    pub fn overscan_correction(
        &self,
        amp_view: &mut MaskedImageViewMut<'_>,
        component: DetectorComponent<'_>,
    ) -> IsrResult<()> {
        let amp = component.as_amp()?;
        let overscan = amp
            .raw_bias_bbox
            .relative_to(&amp.raw_bbox)
            .ok_or_else(|| IsrError::OutOfBounds(amp.raw_bias_bbox.to_string()))?;
        isr::overscan_correction(
            amp_view,
            &overscan,
            self.config.overscan_fit_type,
            self.config.overscan_poly_order,
        )
    }

    pub fn bias_correction(
        &self,
        exposure: &mut Exposure,
        sensor_ref: &dyn SensorDataRef,
    ) -> IsrResult<()> {
        let bias = sensor_ref.get(DatasetType::Bias)?;
        isr::bias_correction(&mut exposure.masked_image.full_view_mut(), &bias.masked_image)
    }

    pub fn dark_correction(
        &self,
        exposure: &mut Exposure,
        sensor_ref: &dyn SensorDataRef,
    ) -> IsrResult<()> {
        let dark = sensor_ref.get(DatasetType::Dark)?;
        let exp_time = exposure.calib.exp_time;
        isr::dark_correction(
            &mut exposure.masked_image.full_view_mut(),
            &dark.masked_image,
            exp_time,
            dark.calib.exp_time,
        )
    }

    /// Sets the variance plane from the CCD-wide gain and read noise.
    pub fn update_variance(&self, exposure: &mut Exposure, ccd: &Detector) -> IsrResult<()> {
        isr::update_variance(
            &mut exposure.masked_image.full_view_mut(),
            ccd.electronic.gain,
            ccd.electronic.read_noise,
        )
    }

    pub fn flat_correction(
        &self,
        exposure: &mut Exposure,
        sensor_ref: &dyn SensorDataRef,
    ) -> IsrResult<()> {
        let flat = sensor_ref.get(DatasetType::Flat)?;
        isr::flat_correction(
            &mut exposure.masked_image.full_view_mut(),
            &flat.masked_image,
            self.config.flat_scaling_type,
            self.config.flat_user_scale,
        )
    }

    pub fn illumination_correction(
        &self,
        exposure: &mut Exposure,
        sensor_ref: &dyn SensorDataRef,
    ) -> IsrResult<()> {
        let illum = sensor_ref.get(DatasetType::Illum)?;
        isr::illumination_correction(
            &mut exposure.masked_image.full_view_mut(),
            &illum.masked_image,
            self.config.illum_user_scale,
        )
    }

    /// Masks the detector's static defects as `BAD` and interpolates over them.
    pub fn mask_and_interp_defect(&self, exposure: &mut Exposure, ccd: &Detector) -> IsrResult<()> {
        let defects = {
            let mut view = exposure.masked_image.full_view_mut();
            isr::mask_pixels_from_defect_list(&mut view, &ccd.defects, BAD)?;
            isr::get_defect_list_from_mask(&view, BAD, self.config.grow_defect_footprint_size)?
        };
        self.interpolate(exposure, &defects)
    }

    /// Interpolates over pixels flagged with the saturation mask plane.
    pub fn saturation_interpolation(&self, exposure: &mut Exposure) -> IsrResult<()> {
        let defects = isr::get_defect_list_from_mask(
            &exposure.masked_image.full_view_mut(),
            &self.config.saturated_mask_name,
            self.config.grow_saturation_footprint_size,
        )?;
        self.interpolate(exposure, &defects)
    }

    /// Flags NaNs no other plane explains as `UNMASKEDNAN` and records the count as
    /// `NUMNANS`; any such pixel aborts the run.
    pub fn mask_and_interp_nan(&self, exposure: &mut Exposure) -> IsrResult<()> {
        exposure
            .masked_image
            .planes_mut()
            .add_plane(UNMASKEDNAN)?;
        let mut counter = UnmaskedNanCounter::new();
        counter.apply(&mut exposure.masked_image.full_view_mut())?;
        let nans = counter.npix();
        self.metadata.set("NUMNANS", nans);
        if nans > 0 {
            self.logger
                .warning(&format!("{nans} unmasked NaN pixels remain after correction"));
            return Err(IsrError::UnmaskedNans(nans));
        }
        Ok(())
    }

    fn interpolate(&self, exposure: &mut Exposure, defects: &DefectList) -> IsrResult<()> {
        if defects.is_empty() {
            return Ok(());
        }
        let fwhm = self.config.fwhm;
        if self.transpose_for_interpolation {
            let mut transposed = exposure.masked_image.transposed();
            isr::interpolate_defect_list(
                &mut transposed.full_view_mut(),
                &isr::transpose_defect_list(defects),
                fwhm,
            )?;
            exposure.masked_image = transposed.transposed();
            Ok(())
        } else {
            isr::interpolate_defect_list(&mut exposure.masked_image.full_view_mut(), defects, fwhm)
        }
    }
}

impl Task for IsrTask {
    type Input<'a> = &'a mut dyn SensorDataRef;
    type Output = Exposure;

    fn name(&self) -> &str {
        self.logger.task()
    }

    fn run(&mut self, sensor_ref: Self::Input<'_>) -> IsrResult<Self::Output> {
        let result = self.metadata.time("isr", || self.process(sensor_ref));
        match &result {
            Ok(_) => self.metadata.record_processed(),
            Err(err) => {
                self.metadata.record_error();
                self.logger.warning(&format!("ISR failed: {err}"));
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{Amplifier, Defect, ElectronicParams};
    use crate::data_ref::{DataId, InMemoryDataRef};
    use crate::image::exposure::{MetadataValue, RawExposure};
    use crate::image::geom::BBox;
    use crate::image::mask::{INTRP, SAT};
    use crate::image::masked_image::MaskedImage;
    use ndarray::Array2;

    const BIAS_LEVEL: i32 = 500;
    const SKY: f32 = 200.0;
    const SATURATION: f64 = 10_000.0;

    /// Two 20x10 amps side by side in raw space, each followed by a 4-column overscan.
    fn detector() -> Detector {
        let params = ElectronicParams {
            gain: 1.0,
            read_noise: 5.0,
            saturation_level: SATURATION,
        };
        let amps = (0..2)
            .map(|i| {
                let raw_x0 = i * 24;
                Amplifier::new(format!("A{i}"), BBox::new(i * 20, 0, 20, 10), params)
                    .with_raw_layout(
                        BBox::new(raw_x0, 0, 24, 10),
                        BBox::new(raw_x0, 0, 20, 10),
                        BBox::new(raw_x0 + 20, 0, 4, 10),
                    )
            })
            .collect();
        Detector::new("det", BBox::with_dims(40, 10), amps, params)
            .with_defects(vec![Defect::new(BBox::new(30, 2, 1, 5))])
    }

    fn calib(value: f32) -> Exposure {
        let mut mi = MaskedImage::new(48, 10);
        mi.image_mut().fill(value);
        Exposure::new(mi).with_detector(detector())
    }

    fn sensor(raw_image: Array2<i32>) -> InMemoryDataRef {
        let raw = RawExposure {
            image: raw_image,
            detector: detector(),
            calib: Default::default(),
            metadata: Default::default(),
        };
        InMemoryDataRef::new(DataId::new().with("ccd", 0))
            .with_raw(raw)
            .with_dataset(DatasetType::Bias, calib(0.0))
            .with_dataset(DatasetType::Dark, calib(0.0))
            .with_dataset(DatasetType::Flat, calib(1.0))
            .with_dataset(DatasetType::Illum, calib(1.0))
    }

    fn flat_raw() -> Array2<i32> {
        Array2::from_shape_fn((10, 48), |(_, x)| {
            if x % 24 >= 20 {
                BIAS_LEVEL
            } else {
                BIAS_LEVEL + SKY as i32
            }
        })
    }

    #[test]
    fn full_run_removes_bias_and_interpolates_defects() {
        let mut raw = flat_raw();
        raw[[5, 3]] = 20_000;
        let mut data_ref = sensor(raw);
        let mut task = IsrTask::new(IsrTaskConfig::default()).unwrap();
        let out = task.run(&mut data_ref).unwrap();

        assert_eq!(out.width(), 40);
        assert_eq!(out.height(), 10);
        let mi = &out.masked_image;
        assert!(mi.image().iter().all(|&v| (v - SKY).abs() < 1e-3));

        let sat = mi.planes().plane_bit_mask(SAT).unwrap();
        let bad = mi.planes().plane_bit_mask(BAD).unwrap();
        let intrp = mi.planes().plane_bit_mask(INTRP).unwrap();
        assert_ne!(mi.mask()[[5, 3]] & sat, 0);
        assert_ne!(mi.mask()[[5, 3]] & intrp, 0);
        assert_ne!(mi.mask()[[4, 30]] & bad, 0);
        assert_ne!(mi.mask()[[4, 30]] & intrp, 0);
        assert_eq!(mi.mask()[[0, 0]], 0);
        assert!((mi.variance()[[0, 0]] - (SKY + 25.0)).abs() < 1e-3);

        assert_eq!(task.metadata().get("NUMNANS"), Some(MetadataValue::Int(0)));
        assert!(task.metadata().get("isrDuration").is_some());
        assert_eq!(task.metadata().snapshot(), (1, 0));
        assert!(data_ref.dataset(DatasetType::VisitCcd).is_some());
    }

    #[test]
    fn transposed_interpolation_agrees_on_flat_fields() {
        let mut data_ref = sensor(flat_raw());
        let mut task = IsrTask::new(IsrTaskConfig {
            do_write: false,
            ..Default::default()
        })
        .unwrap()
        .with_transpose_for_interpolation(true);
        let out = task.run(&mut data_ref).unwrap();
        assert!(out.masked_image.image().iter().all(|&v| (v - SKY).abs() < 1e-3));
        assert!(data_ref.dataset(DatasetType::VisitCcd).is_none());
    }

    #[test]
    fn unmasked_nans_abort_the_run() {
        let mut data_ref = sensor(flat_raw());
        let mut flat = calib(1.0);
        flat.masked_image.image_mut()[[3, 5]] = f32::NAN;
        data_ref = data_ref.with_dataset(DatasetType::Flat, flat);

        let mut task = IsrTask::new(IsrTaskConfig::default()).unwrap();
        let result = task.run(&mut data_ref);
        assert!(matches!(result, Err(IsrError::UnmaskedNans(1))));
        assert_eq!(task.metadata().get("NUMNANS"), Some(MetadataValue::Int(1)));
        assert_eq!(task.metadata().snapshot(), (0, 1));
    }

    #[test]
    fn missing_calibration_is_reported() {
        let raw = RawExposure {
            image: flat_raw(),
            detector: detector(),
            calib: Default::default(),
            metadata: Default::default(),
        };
        let mut data_ref = InMemoryDataRef::new(DataId::new()).with_raw(raw);
        let mut task = IsrTask::new(IsrTaskConfig::default()).unwrap();
        assert!(matches!(
            task.run(&mut data_ref),
            Err(IsrError::MissingDataset(name)) if name == "bias"
        ));
    }

    #[test]
    fn illumination_is_applied_when_enabled() {
        let mut data_ref = sensor(flat_raw());
        let mut task = IsrTask::new(IsrTaskConfig {
            do_illumination: true,
            illum_user_scale: 2.0,
            ..Default::default()
        })
        .unwrap();
        let out = task.run(&mut data_ref).unwrap();
        assert!(out
            .masked_image
            .image()
            .iter()
            .all(|&v| (v - 2.0 * SKY).abs() < 1e-3));
    }

    #[test]
    fn amp_only_steps_reject_a_whole_ccd() {
        let ccd = detector();
        let task = IsrTask::new(IsrTaskConfig::default()).unwrap();
        let mut mi = MaskedImage::new(48, 10);
        let mut view = mi.full_view_mut();
        let component = DetectorComponent::Ccd(&ccd);
        assert!(matches!(
            task.saturation_detection(&mut view, component),
            Err(IsrError::NotAnAmplifier(id)) if id == "det"
        ));
        assert!(task.overscan_correction(&mut view, component).is_err());
        assert!(task.saturation_correction(&mut view, component).is_err());
    }

    #[test]
    fn saturation_correction_on_a_single_amp() {
        let ccd = detector();
        let amp = &ccd.amps[0];
        let task = IsrTask::new(IsrTaskConfig::default()).unwrap();
        let mut mi = MaskedImage::new(24, 10);
        mi.set(SKY, 0, 1.0);
        mi.image_mut()[[5, 8]] = 2.0 * SATURATION as f32;
        task.saturation_correction(&mut mi.full_view_mut(), DetectorComponent::Amp(amp))
            .unwrap();
        assert!((mi.image()[[5, 8]] - SKY).abs() < 1e-3);
    }
}
