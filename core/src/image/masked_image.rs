use crate::image::geom::BBox;
use crate::image::mask::{MaskPixel, MaskPlaneDict};
use crate::prelude::{IsrError, IsrResult};
use ndarray::{s, Array2, ArrayView2, ArrayViewMut2};
use serde::{Deserialize, Serialize};

/// Image, mask and variance planes sharing one shape, stored row-major as `[y, x]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskedImage {
    image: Array2<f32>,
    mask: Array2<MaskPixel>,
    variance: Array2<f32>,
    planes: MaskPlaneDict,
}

impl MaskedImage {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            image: Array2::zeros((height, width)),
            mask: Array2::zeros((height, width)),
            variance: Array2::zeros((height, width)),
            planes: MaskPlaneDict::new(),
        }
    }

    pub fn from_image(image: Array2<f32>) -> Self {
        let shape = image.dim();
        Self {
            image,
            mask: Array2::zeros(shape),
            variance: Array2::zeros(shape),
            planes: MaskPlaneDict::new(),
        }
    }

    pub fn from_planes(
        image: Array2<f32>,
        mask: Array2<MaskPixel>,
        variance: Array2<f32>,
    ) -> IsrResult<Self> {
        let expected = image.dim();
        for found in [mask.dim(), variance.dim()] {
            if found != expected {
                return Err(IsrError::DimensionMismatch { expected, found });
            }
        }
        Ok(Self {
            image,
            mask,
            variance,
            planes: MaskPlaneDict::new(),
        })
    }

    pub fn width(&self) -> usize {
        self.image.ncols()
    }

    pub fn height(&self) -> usize {
        self.image.nrows()
    }

    pub fn bbox(&self) -> BBox {
        BBox::with_dims(self.width(), self.height())
    }

    pub fn image(&self) -> &Array2<f32> {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut Array2<f32> {
        &mut self.image
    }

    pub fn mask(&self) -> &Array2<MaskPixel> {
        &self.mask
    }

    pub fn mask_mut(&mut self) -> &mut Array2<MaskPixel> {
        &mut self.mask
    }

    pub fn variance(&self) -> &Array2<f32> {
        &self.variance
    }

    pub fn variance_mut(&mut self) -> &mut Array2<f32> {
        &mut self.variance
    }

    pub fn planes(&self) -> &MaskPlaneDict {
        &self.planes
    }

    pub fn planes_mut(&mut self) -> &mut MaskPlaneDict {
        &mut self.planes
    }

    /// Fills all three planes with constants.
    pub fn set(&mut self, value: f32, mask: MaskPixel, variance: f32) {
        self.image.fill(value);
        self.mask.fill(mask);
        self.variance.fill(variance);
    }

    fn check_bbox(&self, bbox: &BBox) -> IsrResult<()> {
        if self.bbox().contains_box(bbox) {
            Ok(())
        } else {
            Err(IsrError::OutOfBounds(bbox.to_string()))
        }
    }

    /// Read-only image pixels within `bbox`.
    pub fn image_in(&self, bbox: &BBox) -> IsrResult<ArrayView2<'_, f32>> {
        self.check_bbox(bbox)?;
        Ok(self.image.slice(s![bbox.rows(), bbox.cols()]))
    }

    /// Exclusive window over `bbox` spanning all three planes.
    pub fn view_mut(&mut self, bbox: &BBox) -> IsrResult<MaskedImageViewMut<'_>> {
        self.check_bbox(bbox)?;
        Ok(MaskedImageViewMut {
            image: self.image.slice_mut(s![bbox.rows(), bbox.cols()]),
            mask: self.mask.slice_mut(s![bbox.rows(), bbox.cols()]),
            variance: self.variance.slice_mut(s![bbox.rows(), bbox.cols()]),
            planes: &self.planes,
            origin: *bbox,
        })
    }

    pub fn full_view_mut(&mut self) -> MaskedImageViewMut<'_> {
        let origin = self.bbox();
        MaskedImageViewMut {
            image: self.image.view_mut(),
            mask: self.mask.view_mut(),
            variance: self.variance.view_mut(),
            planes: &self.planes,
            origin,
        }
    }

    /// Deep copy of the pixels inside `bbox`.
    pub fn sub_image(&self, bbox: &BBox) -> IsrResult<MaskedImage> {
        self.check_bbox(bbox)?;
        Ok(MaskedImage {
            image: self.image.slice(s![bbox.rows(), bbox.cols()]).to_owned(),
            mask: self.mask.slice(s![bbox.rows(), bbox.cols()]).to_owned(),
            variance: self.variance.slice(s![bbox.rows(), bbox.cols()]).to_owned(),
            planes: self.planes.clone(),
        })
    }

    /// Copy with rows and columns swapped.
    pub fn transposed(&self) -> MaskedImage {
        MaskedImage {
            image: self.image.t().to_owned(),
            mask: self.mask.t().to_owned(),
            variance: self.variance.t().to_owned(),
            planes: self.planes.clone(),
        }
    }
}

/// Mutable window into a [`MaskedImage`]; coordinates are local to the window.
pub struct MaskedImageViewMut<'a> {
    pub image: ArrayViewMut2<'a, f32>,
    pub mask: ArrayViewMut2<'a, MaskPixel>,
    pub variance: ArrayViewMut2<'a, f32>,
    pub planes: &'a MaskPlaneDict,
    origin: BBox,
}

impl<'a> MaskedImageViewMut<'a> {
    pub fn width(&self) -> usize {
        self.image.ncols()
    }

    pub fn height(&self) -> usize {
        self.image.nrows()
    }

    /// Local bounds, always anchored at (0, 0).
    pub fn bbox(&self) -> BBox {
        BBox::with_dims(self.width(), self.height())
    }

    /// Where this window sits in the parent image.
    pub fn origin(&self) -> BBox {
        self.origin
    }

    /// Narrower window; `bbox` is local to this view.
    pub fn sub_view(&mut self, bbox: &BBox) -> IsrResult<MaskedImageViewMut<'_>> {
        if !self.bbox().contains_box(bbox) {
            return Err(IsrError::OutOfBounds(bbox.to_string()));
        }
        Ok(MaskedImageViewMut {
            image: self.image.slice_mut(s![bbox.rows(), bbox.cols()]),
            mask: self.mask.slice_mut(s![bbox.rows(), bbox.cols()]),
            variance: self.variance.slice_mut(s![bbox.rows(), bbox.cols()]),
            planes: self.planes,
            origin: bbox.shifted(self.origin.x0, self.origin.y0),
        })
    }

    pub fn check_same_shape(&self, other: &MaskedImage) -> IsrResult<()> {
        let expected = self.image.dim();
        let found = other.image().dim();
        if expected != found {
            return Err(IsrError::DimensionMismatch { expected, found });
        }
        Ok(())
    }
}
