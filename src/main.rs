use actix_cors::Cors;
use actix_governor::{Governor, GovernorConfigBuilder};
use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel::pg::PgConnection;
use diesel::r2d2::ConnectionManager;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use embernote::config::AppConfig;
use embernote::rate_limit::RateLimiter;
use embernote::store::{OneTimeStore, PgBackend};
use embernote::{handlers, AppState};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    let config = AppConfig::from_env().expect("incomplete environment configuration");

    let manager = ConnectionManager::<PgConnection>::new(&config.database_url);
    let pool = r2d2::Pool::builder()
        .build(manager)
        .expect("failed to create a pg pool");

    {
        let mut connection = pool.get().expect("failed to check out a connection");
        connection
            .run_pending_migrations(MIGRATIONS)
            .expect("failed to run migrations");
    }

    let state = web::Data::new(AppState {
        store: OneTimeStore::new(PgBackend::new(pool.clone())),
        limiter: RateLimiter::new(),
    });

    // passive expiry sweep; retrieval never depends on it, it only keeps
    // dead rows from piling up
    let sweeper = PgBackend::new(pool.clone());
    let sweep_state = state.clone();
    let interval = config.cleanup_interval;
    std::thread::spawn(move || loop {
        std::thread::sleep(interval);
        match sweeper.sweep_expired() {
            Ok(0) => {}
            Ok(count) => log::info!("swept {} expired notes", count),
            Err(err) => log::warn!("expiry sweep failed: {}", err),
        }
        sweep_state.limiter.cleanup();
    });

    let governor_conf = GovernorConfigBuilder::default()
        .per_second(2)
        .burst_size(60)
        .finish()
        .expect("invalid governor configuration");

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Governor::new(&governor_conf))
            .wrap(Logger::default())
            .route("/", web::get().to(handlers::index))
            .service(
                web::scope("/notes")
                    .route("", web::post().to(handlers::note::new))
                    .route("/{id}", web::get().to(handlers::note::consume)),
            )
    })
    .bind(format!("0.0.0.0:{}", config.port))?
    .run()
    .await
}
