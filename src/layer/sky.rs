use crate::config::layer::linspace;
use crate::errors::{Error, Result};
use nalgebra::DMatrix;

/// Elevation, azimuth or a value derived from them: a single direction or
/// a matrix of directions.
#[derive(Debug, Clone, PartialEq)]
pub enum SkyArray {
    Scalar(f64),
    Array(DMatrix<f64>),
}

impl SkyArray {
    /// `None` for scalars
    pub fn shape(&self) -> Option<(usize, usize)> {
        match self {
            SkyArray::Scalar(_) => None,
            SkyArray::Array(values) => Some(values.shape()),
        }
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            SkyArray::Scalar(value) => Some(*value),
            SkyArray::Array(_) => None,
        }
    }

    pub fn as_array(&self) -> Option<&DMatrix<f64>> {
        match self {
            SkyArray::Scalar(_) => None,
            SkyArray::Array(values) => Some(values),
        }
    }

    pub fn map<F: FnMut(f64) -> f64>(&self, mut f: F) -> SkyArray {
        match self {
            SkyArray::Scalar(value) => SkyArray::Scalar(f(*value)),
            SkyArray::Array(values) => SkyArray::Array(values.map(f)),
        }
    }
}

impl From<f64> for SkyArray {
    fn from(value: f64) -> Self {
        SkyArray::Scalar(value)
    }
}

impl From<DMatrix<f64>> for SkyArray {
    fn from(values: DMatrix<f64>) -> Self {
        SkyArray::Array(values)
    }
}

/// A one-dimensional array becomes a column
impl From<Vec<f64>> for SkyArray {
    fn from(values: Vec<f64>) -> Self {
        SkyArray::Array(DMatrix::from_vec(values.len(), 1, values))
    }
}

impl From<&[f64]> for SkyArray {
    fn from(values: &[f64]) -> Self {
        SkyArray::Array(DMatrix::from_column_slice(values.len(), 1, values))
    }
}

/// Elevation and azimuth must both be scalars or both arrays of one shape.
pub fn check_elaz_shape(el: &SkyArray, az: &SkyArray) -> Result<()> {
    match (el, az) {
        (SkyArray::Scalar(_), SkyArray::Scalar(_)) => Ok(()),
        (SkyArray::Array(el), SkyArray::Array(az)) if el.shape() == az.shape() => Ok(()),
        (SkyArray::Array(el), SkyArray::Array(az)) => Err(Error::Validation(format!(
            "elevation {:?} and azimuth {:?} must have the same shape",
            el.shape(),
            az.shape()
        ))),
        _ => Err(Error::Validation(
            "elevation and azimuth must be either both scalars or both arrays".to_string(),
        )),
    }
}

/// Apply `f(el, az)` element-wise after checking the shapes.
pub fn zip_map<F>(el: &SkyArray, az: &SkyArray, mut f: F) -> Result<SkyArray>
where
    F: FnMut(f64, f64) -> f64,
{
    check_elaz_shape(el, az)?;
    Ok(match (el, az) {
        (SkyArray::Array(el), SkyArray::Array(az)) => SkyArray::Array(el.zip_map(az, f)),
        (SkyArray::Scalar(el), SkyArray::Scalar(az)) => SkyArray::Scalar(f(*el, *az)),
        _ => unreachable!("shapes checked above"),
    })
}

/// Elevation and azimuth meshes covering the visible sky.
///
/// Rows follow azimuth from 0 to 360 deg, columns elevation from 0 to 90 deg.
pub fn elaz_mesh(gridsize: usize) -> (SkyArray, SkyArray) {
    let el = linspace(0.0, 90.0, gridsize);
    let az = linspace(0.0, 360.0, gridsize);
    (
        SkyArray::Array(DMatrix::from_fn(gridsize, gridsize, |_, j| el[j])),
        SkyArray::Array(DMatrix::from_fn(gridsize, gridsize, |i, _| az[i])),
    )
}
