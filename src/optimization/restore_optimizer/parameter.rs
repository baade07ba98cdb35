//! restore_optimizer::parameter — the differentiable latent parameter.
//!
//! Purpose
//! -------
//! Wrap a raw latent image batch so that it can accumulate gradients, be
//! updated in place by an optimizer, and expose its raw content for
//! projection without losing its identity.
//!
//! Key behaviors
//! -------------
//! - [`LatentParam::wrap`] marks the content as requiring gradients and
//!   assigns a fresh [`ParamId`].
//! - [`LatentParam::read_raw`] / [`LatentParam::write_raw`] copy content out
//!   and back in; writes happen in place and keep the identity, so optimizer
//!   state keyed on the id stays valid.
//! - Gradients accumulate ([`LatentParam::accumulate_grad`]) until cleared
//!   with [`LatentParam::zero_grad`].
//! - [`flatten`] / [`unflatten`] convert between [`Image`] and the flat
//!   vectors used by Argmin and finite differences.
//!
//! Invariants & assumptions
//! ------------------------
//! - The latent shape never changes after `wrap`.
//! - A stored gradient always has the latent shape and finite entries.
//! - `LatentParam` is not `Clone`: exactly one instance exists
//!   per restore call.
use std::sync::atomic::{AtomicU64, Ordering};

use ndarray::{Array1, Ix4};

use crate::optimization::{
    errors::{OptError, OptResult},
    restore_optimizer::{
        types::{Flat, Grad, Image},
        validation::{validate_grad, validate_latent_shape},
    },
};

static NEXT_PARAM_ID: AtomicU64 = AtomicU64::new(0);

/// Process-unique identity of a wrapped latent parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParamId(u64);

impl ParamId {
    fn fresh() -> Self {
        ParamId(NEXT_PARAM_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// Latent estimate under optimization, with gradient bookkeeping.
#[derive(Debug)]
pub struct LatentParam {
    id: ParamId,
    data: Image,
    grad: Option<Grad>,
    requires_grad: bool,
}

impl LatentParam {
    /// Wrap raw content; the result requires gradients and has no gradient yet.
    pub fn wrap(raw: Image) -> Self {
        Self { id: ParamId::fresh(), data: raw, grad: None, requires_grad: true }
    }

    pub fn id(&self) -> ParamId {
        self.id
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Number of latent elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn requires_grad(&self) -> bool {
        self.requires_grad
    }

    /// Borrow the current content.
    pub fn data(&self) -> &Image {
        &self.data
    }

    /// Current content as an owned array, without gradient metadata.
    pub fn read_raw(&self) -> Image {
        self.data.clone()
    }

    /// Replace the content in place.
    ///
    /// # Errors
    /// [`OptError::LatentShapeMismatch`] if `raw` has a different shape; the
    /// parameter is left untouched in that case.
    pub fn write_raw(&mut self, raw: Image) -> OptResult<()> {
        validate_latent_shape(self.data.shape(), raw.shape())?;
        self.data.assign(&raw);
        Ok(())
    }

    /// Content flattened in logical order.
    pub fn to_flat(&self) -> Flat {
        flatten(&self.data)
    }

    /// Overwrite the content from a flat vector in logical order.
    ///
    /// # Errors
    /// [`OptError::FlatLengthMismatch`] if `flat.len() != self.len()`.
    pub fn write_flat(&mut self, flat: &Flat) -> OptResult<()> {
        if flat.len() != self.data.len() {
            return Err(OptError::FlatLengthMismatch {
                expected: self.data.len(),
                found: flat.len(),
            });
        }
        for (dst, &src) in self.data.iter_mut().zip(flat.iter()) {
            *dst = src;
        }
        Ok(())
    }

    pub fn grad(&self) -> Option<&Grad> {
        self.grad.as_ref()
    }

    /// Accumulated gradient flattened in logical order; zeros if none.
    pub fn flat_grad(&self) -> Flat {
        match &self.grad {
            Some(g) => flatten(g),
            None => Array1::zeros(self.data.len()),
        }
    }

    /// Drop any accumulated gradient.
    pub fn zero_grad(&mut self) {
        self.grad = None;
    }

    /// Add `grad` to the accumulated gradient.
    ///
    /// # Errors
    /// Propagates [`validate_grad`] failures (shape or finiteness).
    pub fn accumulate_grad(&mut self, grad: Grad) -> OptResult<()> {
        validate_grad(&grad, self.data.shape())?;
        match self.grad.as_mut() {
            Some(existing) => *existing += &grad,
            None => self.grad = Some(grad),
        }
        Ok(())
    }

    /// Unwrap into the raw content.
    pub fn into_raw(self) -> Image {
        self.data
    }
}

/// Flatten an image batch in logical (row-major) order.
pub fn flatten(image: &Image) -> Flat {
    image.iter().copied().collect()
}

/// Rebuild an image batch of shape `dim` from a flat vector.
///
/// # Errors
/// [`OptError::InvalidShape`] if the element count does not match.
pub fn unflatten(flat: &Flat, dim: Ix4) -> OptResult<Image> {
    Ok(Image::from_shape_vec(dim, flat.to_vec())?)
}
