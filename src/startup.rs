use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::AuthService;
use crate::configuration::AuthSettings;
use crate::logger::RequestLogger;
use crate::middleware::AuthMiddleware;
use crate::routes::{get_current_user, health_check, login, logout, refresh, register};
use crate::store::UserStore;

pub fn run(
    listener: TcpListener,
    store: Arc<UserStore>,
    settings: AuthSettings,
) -> Result<Server, std::io::Error> {
    let service = AuthService::new(store.clone(), settings.clone()).map_err(|e| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;
    let service = web::Data::new(service);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(RequestLogger)
            .app_data(service.clone())
            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/auth")
                    // Public routes
                    .route("/register", web::post().to(register))
                    .route("/login", web::post().to(login))
                    .route("/refresh", web::post().to(refresh))
                    .route("/logout", web::post().to(logout))
                    // Protected routes
                    .service(
                        web::resource("/me")
                            .wrap(AuthMiddleware::new(settings.clone(), store.clone()))
                            .route(web::get().to(get_current_user)),
                    ),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
