use super::{DataId, DatasetType, SensorDataRef};
use crate::image::exposure::{Exposure, RawExposure};
use crate::prelude::{IsrError, IsrResult};
use std::collections::HashMap;

/// Sensor handle backed by in-memory datasets; written outputs stay readable through `get`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDataRef {
    data_id: DataId,
    raw: Option<RawExposure>,
    datasets: HashMap<DatasetType, Exposure>,
}

impl InMemoryDataRef {
    pub fn new(data_id: DataId) -> Self {
        Self {
            data_id,
            ..Default::default()
        }
    }

    pub fn with_raw(mut self, raw: RawExposure) -> Self {
        self.raw = Some(raw);
        self
    }

    pub fn with_dataset(mut self, dataset: DatasetType, exposure: Exposure) -> Self {
        self.datasets.insert(dataset, exposure);
        self
    }

    pub fn dataset(&self, dataset: DatasetType) -> Option<&Exposure> {
        self.datasets.get(&dataset)
    }
}

impl SensorDataRef for InMemoryDataRef {
    fn data_id(&self) -> &DataId {
        &self.data_id
    }

    fn get_raw(&self) -> IsrResult<RawExposure> {
        self.raw
            .clone()
            .ok_or_else(|| IsrError::MissingDataset(DatasetType::Raw.to_string()))
    }

    fn get(&self, dataset: DatasetType) -> IsrResult<Exposure> {
        self.datasets
            .get(&dataset)
            .cloned()
            .ok_or_else(|| IsrError::MissingDataset(dataset.to_string()))
    }

    fn put(&mut self, exposure: &Exposure, dataset: DatasetType) -> IsrResult<()> {
        if dataset == DatasetType::Raw {
            return Err(IsrError::InvalidInput(
                "raw frames are integer images and cannot be written as exposures".into(),
            ));
        }
        self.datasets.insert(dataset, exposure.clone());
        Ok(())
    }
}
