//! Optional upstream quantities passed into the engine.

use ndarray::{Array2, Array3, Array4};

/// Already-computed intermediates for one policy.
///
/// Every engine operation computes whatever it needs and is missing here;
/// anything present is used as-is. The caller is responsible for supplying
/// values that belong to the same policy.
///
/// ```
/// use crld::dynamics::Precomputed;
/// use ndarray::Array3;
///
/// let bios = Array3::<f64>::zeros((1, 2, 2));
/// let hints = Precomputed::none().with_bios(&bios);
/// assert!(hints.bios.is_some() && hints.xisa.is_none());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Precomputed<'a> {
    pub xisa: Option<&'a Array3<f64>>,
    pub bios: Option<&'a Array3<f64>>,
    pub tioo: Option<&'a Array3<f64>>,
    pub tioao: Option<&'a Array4<f64>>,
    pub rio: Option<&'a Array2<f64>>,
    pub rioa: Option<&'a Array3<f64>>,
    pub vio: Option<&'a Array2<f64>>,
}

impl<'a> Precomputed<'a> {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_xisa(mut self, xisa: &'a Array3<f64>) -> Self {
        self.xisa = Some(xisa);
        self
    }

    pub fn with_bios(mut self, bios: &'a Array3<f64>) -> Self {
        self.bios = Some(bios);
        self
    }

    pub fn with_tioo(mut self, tioo: &'a Array3<f64>) -> Self {
        self.tioo = Some(tioo);
        self
    }

    pub fn with_tioao(mut self, tioao: &'a Array4<f64>) -> Self {
        self.tioao = Some(tioao);
        self
    }

    pub fn with_rio(mut self, rio: &'a Array2<f64>) -> Self {
        self.rio = Some(rio);
        self
    }

    pub fn with_rioa(mut self, rioa: &'a Array3<f64>) -> Self {
        self.rioa = Some(rioa);
        self
    }

    pub fn with_vio(mut self, vio: &'a Array2<f64>) -> Self {
        self.vio = Some(vio);
        self
    }
}
