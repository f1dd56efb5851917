//! Composition point: one instance of every controller, sharing one backend
//! client and one page surface.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::api::ApiClient;
use crate::auth::{AuthController, TokenStore};
use crate::blog::BlogController;
use crate::config::AppConfig;
use crate::error::{SiteError, SiteResult};
use crate::forms::{ContactController, RegistrationController};
use crate::geo::CountryDetector;
use crate::media::MediaLibrary;
use crate::page::Page;
use crate::payment::{CardWidget, PaymentController};

pub struct Site {
    api: ApiClient,
    payments: Option<Arc<PaymentController>>,
    auth: Arc<AuthController>,
    blog: BlogController,
    contact: ContactController,
    registration: RegistrationController,
    geo: CountryDetector,
    media: MediaLibrary,
}

impl Site {
    /// Build every controller. Donations stay disabled (with the banner
    /// already shown) when payment configuration is incomplete or no widget
    /// is available; the rest of the site still works.
    pub fn new(
        config: &AppConfig,
        page: Arc<dyn Page>,
        widget: Option<Arc<dyn CardWidget>>,
        tokens: Arc<dyn TokenStore>,
    ) -> SiteResult<Self> {
        let api = ApiClient::from_config(&config.api)
            .map_err(|err| SiteError::ConfigError(err.to_string()))?;

        let payments = match widget {
            Some(widget) => match PaymentController::new(
                &api,
                widget,
                Arc::clone(&page),
                &config.site,
                config.payments.clone(),
            ) {
                Ok(controller) => Some(Arc::new(controller)),
                Err(err) => {
                    warn!("donations disabled: {err}");
                    None
                }
            },
            None => {
                debug!("no card widget supplied, donations disabled");
                None
            }
        };

        let auth = Arc::new(AuthController::new(&api, Arc::clone(&page), tokens));

        Ok(Self {
            blog: BlogController::new(&api, Arc::clone(&page), Arc::clone(&auth), &config.blog),
            auth,
            contact: ContactController::new(
                &api,
                Arc::clone(&page),
                config.forms.contact_debounce(),
            ),
            registration: RegistrationController::new(
                &api,
                Arc::clone(&page),
                config.forms.registration_reset_delay(),
            ),
            geo: CountryDetector::new(&config.geo)?,
            media: MediaLibrary::new(&config.media)?,
            payments,
            api,
        })
    }

    /// Page-load work: bring up the card widget and restore the session.
    pub async fn start(&self) -> SiteResult<()> {
        if let Some(payments) = &self.payments {
            if let Err(err) = payments.initialize().await {
                warn!("{err}");
            }
        }
        self.auth.init().await
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn payments(&self) -> Option<Arc<PaymentController>> {
        self.payments.clone()
    }

    pub fn auth(&self) -> &AuthController {
        &self.auth
    }

    pub fn blog(&self) -> &BlogController {
        &self.blog
    }

    pub fn contact(&self) -> &ContactController {
        &self.contact
    }

    pub fn registration(&self) -> &RegistrationController {
        &self.registration
    }

    pub fn geo(&self) -> &CountryDetector {
        &self.geo
    }

    pub fn media(&self) -> &MediaLibrary {
        &self.media
    }
}
