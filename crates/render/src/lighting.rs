use std::sync::Arc;

use lumen_common::{LightingBindings, Texture};

use crate::RenderError;

/// Image-based lighting inputs held by the server.
///
/// The maps themselves are produced elsewhere (prefiltering is not done
/// here); this only validates and shares them.
#[derive(Debug, Clone)]
pub struct LightingEnvironment {
    environment: Option<Arc<Texture>>,
    irradiance: Option<Arc<Texture>>,
    specular: Option<Arc<Texture>>,
    brdf_lut: Option<Arc<Texture>>,
    pub exposure: f32,
}

impl Default for LightingEnvironment {
    fn default() -> Self {
        Self {
            environment: None,
            irradiance: None,
            specular: None,
            brdf_lut: None,
            exposure: 1.0,
        }
    }
}

fn require_cubemap(texture: &Texture) -> Result<(), RenderError> {
    if texture.is_cubemap() {
        Ok(())
    } else {
        Err(RenderError::NotACubemap(texture.name.clone()))
    }
}

impl LightingEnvironment {
    /// Environment cubemap, also drawn as the skybox.
    pub fn environment(&self) -> Option<&Arc<Texture>> {
        self.environment.as_ref()
    }

    pub fn set_environment(&mut self, cubemap: Arc<Texture>) -> Result<(), RenderError> {
        require_cubemap(&cubemap)?;
        tracing::debug!(name = %cubemap.name, "environment cubemap set");
        self.environment = Some(cubemap);
        Ok(())
    }

    pub fn clear_environment(&mut self) {
        self.environment = None;
    }

    pub fn irradiance(&self) -> Option<&Arc<Texture>> {
        self.irradiance.as_ref()
    }

    pub fn set_irradiance(&mut self, cubemap: Arc<Texture>) -> Result<(), RenderError> {
        require_cubemap(&cubemap)?;
        self.irradiance = Some(cubemap);
        Ok(())
    }

    pub fn specular(&self) -> Option<&Arc<Texture>> {
        self.specular.as_ref()
    }

    pub fn set_specular(&mut self, cubemap: Arc<Texture>) -> Result<(), RenderError> {
        require_cubemap(&cubemap)?;
        self.specular = Some(cubemap);
        Ok(())
    }

    pub fn brdf_lut(&self) -> Option<&Arc<Texture>> {
        self.brdf_lut.as_ref()
    }

    pub fn set_brdf_lut(&mut self, lut: Arc<Texture>) {
        self.brdf_lut = Some(lut);
    }

    /// Snapshot handed to the device at the start of each frame.
    pub fn bindings(&self) -> LightingBindings {
        LightingBindings {
            environment: self.environment.clone(),
            irradiance: self.irradiance.clone(),
            specular: self.specular.clone(),
            brdf_lut: self.brdf_lut.clone(),
            exposure: self.exposure,
        }
    }

    /// True when every map needed for image-based lighting is present.
    pub fn is_complete(&self) -> bool {
        self.environment.is_some()
            && self.irradiance.is_some()
            && self.specular.is_some()
            && self.brdf_lut.is_some()
    }
}
