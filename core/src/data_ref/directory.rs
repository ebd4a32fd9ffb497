use super::{DataId, DatasetType, SensorDataRef};
use crate::image::exposure::{Exposure, RawExposure};
use crate::prelude::{IsrError, IsrResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

/// Sensor handle over a directory of JSON files named `<dataset>-<data id slug>.json`.
///
/// JSON has no encoding for NaN or infinity, so `put` refuses exposures with non-finite
/// image or variance pixels instead of silently writing `null`.
#[derive(Debug, Clone)]
pub struct DirectoryDataRef {
    root: PathBuf,
    data_id: DataId,
}

impl DirectoryDataRef {
    pub fn new(root: impl Into<PathBuf>, data_id: DataId) -> Self {
        Self {
            root: root.into(),
            data_id,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, dataset: DatasetType) -> PathBuf {
        self.root
            .join(format!("{}-{}.json", dataset.as_str(), self.data_id.slug()))
    }

    pub fn put_raw(&self, raw: &RawExposure) -> IsrResult<()> {
        self.write_json(DatasetType::Raw, raw)
    }

    fn read_json<T: DeserializeOwned>(&self, dataset: DatasetType) -> IsrResult<T> {
        let path = self.path_for(dataset);
        if !path.exists() {
            return Err(IsrError::MissingDataset(format!(
                "{} ({})",
                dataset,
                path.display()
            )));
        }
        let reader = BufReader::new(File::open(&path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    fn write_json<T: Serialize>(&self, dataset: DatasetType, value: &T) -> IsrResult<()> {
        fs::create_dir_all(&self.root)?;
        let writer = BufWriter::new(File::create(self.path_for(dataset))?);
        serde_json::to_writer(writer, value)?;
        Ok(())
    }
}

impl SensorDataRef for DirectoryDataRef {
    fn data_id(&self) -> &DataId {
        &self.data_id
    }

    fn get_raw(&self) -> IsrResult<RawExposure> {
        self.read_json(DatasetType::Raw)
    }

    fn get(&self, dataset: DatasetType) -> IsrResult<Exposure> {
        self.read_json(dataset)
    }

    fn put(&mut self, exposure: &Exposure, dataset: DatasetType) -> IsrResult<()> {
        if dataset == DatasetType::Raw {
            return Err(IsrError::InvalidInput(
                "use put_raw for integer raw frames".into(),
            ));
        }
        let mi = &exposure.masked_image;
        let non_finite = mi
            .image()
            .iter()
            .chain(mi.variance().iter())
            .filter(|v| !v.is_finite())
            .count();
        if non_finite > 0 {
            return Err(IsrError::InvalidInput(format!(
                "{non_finite} non-finite values cannot be stored as {dataset}"
            )));
        }
        self.write_json(dataset, exposure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{Amplifier, Detector, ElectronicParams};
    use crate::image::geom::BBox;
    use crate::image::masked_image::MaskedImage;
    use ndarray::Array2;
    use tempfile::tempdir;

    fn detector() -> Detector {
        let amp = Amplifier::new("A", BBox::with_dims(3, 2), ElectronicParams::default());
        Detector::new("d0", BBox::with_dims(3, 2), vec![amp], ElectronicParams::default())
    }

    #[test]
    fn stores_and_loads_datasets() {
        let dir = tempdir().unwrap();
        let mut data_ref = DirectoryDataRef::new(dir.path(), DataId::new().with("visit", 7));

        let raw = RawExposure {
            image: Array2::from_elem((2, 3), 42),
            detector: detector(),
            calib: Default::default(),
            metadata: Default::default(),
        };
        data_ref.put_raw(&raw).unwrap();
        assert_eq!(data_ref.get_raw().unwrap(), raw);

        let mut mi = MaskedImage::new(3, 2);
        mi.set(1.5, 4, 0.25);
        let flat = Exposure::new(mi).with_detector(detector());
        data_ref.put(&flat, DatasetType::Flat).unwrap();
        assert_eq!(data_ref.get(DatasetType::Flat).unwrap(), flat);
        assert!(data_ref.path_for(DatasetType::Flat).ends_with("flat-visit=7.json"));
    }

    #[test]
    fn missing_and_non_finite_datasets_fail() {
        let dir = tempdir().unwrap();
        let mut data_ref = DirectoryDataRef::new(dir.path(), DataId::new());
        assert!(matches!(
            data_ref.get(DatasetType::Dark),
            Err(IsrError::MissingDataset(_))
        ));

        let mut mi = MaskedImage::new(2, 2);
        mi.image_mut()[[0, 0]] = f32::NAN;
        let result = data_ref.put(&Exposure::new(mi), DatasetType::VisitCcd);
        assert!(matches!(result, Err(IsrError::InvalidInput(_))));
    }
}
