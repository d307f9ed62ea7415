//! Physical cameras via `nokhwa` (feature `camera`).
//!
//! Each read decodes to RGB, resizes to the configured resolution when the
//! device delivered something else, and mirrors if asked.

use image::imageops::{self, FilterType};
use image::RgbImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
};
use nokhwa::Camera;

use air_keys::{Frame, FrameSource};

pub struct NokhwaCamera {
    name:   String,
    camera: Option<Camera>,
    width:  u32,
    height: u32,
    mirror: bool,
}

impl NokhwaCamera {
    /// Open device `index`, asking for the closest mode to `width × height`.
    pub fn open(label: &str, index: u32, width: u32, height: u32, mirror: bool) -> anyhow::Result<Self> {
        use anyhow::Context;

        let wanted = CameraFormat::new(Resolution::new(width, height), FrameFormat::MJPEG, 30);
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(wanted));
        let mut camera = Camera::new(CameraIndex::Index(index), requested)
            .with_context(|| format!("failed to open {} camera (index {})", label, index))?;
        camera.open_stream()
            .with_context(|| format!("failed to start {} camera stream", label))?;

        let name = format!("{} ({})", label, camera.info().human_name());
        let res = camera.resolution();
        log::info!("opened {} at {}x{}", name, res.width(), res.height());

        Ok(NokhwaCamera { name, camera: Some(camera), width, height, mirror })
    }

    fn grab(&mut self) -> anyhow::Result<Frame> {
        let camera = self.camera.as_mut()
            .ok_or_else(|| anyhow::anyhow!("camera released"))?;
        let decoded = camera.frame()?.decode_image::<RgbFormat>()?;
        let (w, h) = (decoded.width(), decoded.height());

        let mut img = RgbImage::from_raw(w, h, decoded.into_raw())
            .ok_or_else(|| anyhow::anyhow!("decoded buffer does not match {}x{}", w, h))?;
        if (w, h) != (self.width, self.height) {
            img = imageops::resize(&img, self.width, self.height, FilterType::Triangle);
        }
        if self.mirror {
            imageops::flip_horizontal_in_place(&mut img);
        }
        Ok(Frame::new(self.width, self.height, img.into_raw())?)
    }
}

impl FrameSource for NokhwaCamera {
    fn name(&self) -> &str { &self.name }

    fn read(&mut self) -> Option<Frame> {
        match self.grab() {
            Ok(f)  => Some(f),
            Err(e) => {
                log::error!("{}: capture failed: {:#}", self.name, e);
                None
            }
        }
    }

    fn release(&mut self) {
        if let Some(mut camera) = self.camera.take() {
            if let Err(e) = camera.stop_stream() {
                log::warn!("{}: failed to stop stream: {}", self.name, e);
            }
            log::info!("released {}", self.name);
        }
    }
}
