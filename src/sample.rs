use crate::{
    bounding::{Real, TVec3},
    checker::check_positive,
    TreeError,
};

/// Surface point observed by one camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample<R: Real> {
    pub position: TVec3<R>,
    /// Surface normal; a zero vector when unknown.
    pub normal: TVec3<R>,
    /// Footprint size of the sample, its positional uncertainty.
    pub scale: R,
    /// Trust in the position, `1` by default. Cone radii grow as it drops.
    pub confidence: R,
    /// [`CameraData::view_id`](crate::camera::CameraData::view_id) of the observing camera.
    pub view_id: u32,
}

impl<R: Real> Sample<R> {
    /// Fails with [`TreeError::InvalidGeometry`] for a non positive scale or a
    /// non finite position.
    pub fn new(
        position: TVec3<R>,
        normal: TVec3<R>,
        scale: R,
        view_id: u32,
    ) -> Result<Self, TreeError> {
        if !position.is_finite() {
            return Err(TreeError::InvalidGeometry(format!(
                "Sample position should be finite: {position}"
            )));
        }
        check_positive("Sample scale", scale)?;

        Ok(Sample {
            position,
            normal,
            scale,
            confidence: R::one(),
            view_id,
        })
    }

    pub fn with_confidence(mut self, confidence: R) -> Result<Self, TreeError> {
        self.confidence = check_positive("Sample confidence", confidence)?;
        Ok(self)
    }

    /// Unit normal, if one is known.
    pub fn unit_normal(&self) -> Option<TVec3<R>> {
        if self.normal.is_finite() {
            self.normal.normalize()
        } else {
            None
        }
    }
}
