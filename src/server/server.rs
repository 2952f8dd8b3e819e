//! HTTP server core implementation

use crate::config::{Config, ServerConfig};
use crate::monitoring::ResilientMonitor;
use crate::server::routes;
use crate::server::state::AppState;
use crate::utils::error::{MonitorError, Result};
use actix_web::{middleware::DefaultHeaders, web, App, HttpServer as ActixHttpServer};
use std::sync::Arc;
use tracing::info;
use tracing_actix_web::TracingLogger;

/// HTTP server hosting the monitoring control surface
pub struct HttpServer {
    config: ServerConfig,
    state: AppState,
}

impl HttpServer {
    pub fn new(config: &Config, monitor: Option<Arc<ResilientMonitor>>) -> Self {
        Self {
            config: config.server.clone(),
            state: AppState::new(config.clone(), monitor),
        }
    }

    fn create_app(
        state: web::Data<AppState>,
    ) -> App<
        impl actix_web::dev::ServiceFactory<
            actix_web::dev::ServiceRequest,
            Config = (),
            Response = actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        App::new()
            .app_data(state)
            .wrap(TracingLogger::default())
            .wrap(DefaultHeaders::new().add(("Server", "MailSentry")))
            .configure(routes::health::configure_routes)
            .configure(routes::security::configure_routes)
    }

    /// Bind and run until shutdown
    pub async fn start(self) -> Result<()> {
        let bind_addr = format!("{}:{}", self.config.host, self.config.port);
        info!("Starting HTTP server on {}", bind_addr);

        let state = web::Data::new(self.state);

        let mut server = ActixHttpServer::new(move || Self::create_app(state.clone()));
        if let Some(workers) = self.config.workers {
            server = server.workers(workers);
        }
        let server = server
            .bind(&bind_addr)
            .map_err(|e| {
                MonitorError::Internal(format!("failed to bind {}: {}", bind_addr, e))
            })?
            .run();

        info!("HTTP server listening on {}", bind_addr);

        server
            .await
            .map_err(|e| MonitorError::Internal(format!("server error: {}", e)))?;

        info!("HTTP server stopped");
        Ok(())
    }
}
