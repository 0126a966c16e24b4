use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use sqlx::PgPool;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod codec;
mod config;
mod error;
mod gateway;
mod middleware;
mod models;
mod routes;
mod services;
mod types;

pub use config::AppConfig;

use gateway::AiGateway;
use middleware::auth::Authentication;

pub struct AppState {
    pub pool: PgPool,
    pub gateway: AiGateway,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let app_config = Arc::new(AppConfig::from_env().context("Failed to load configuration")?);

    let pool = PgPool::connect(&app_config.database_url)
        .await
        .context("Failed to connect to database")?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database connection established and migrations are up-to-date");

    let gateway = AiGateway::new(&app_config);
    let app_state = Arc::new(AppState { pool, gateway });

    let bind_address = app_config.bind_address.clone();
    info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(cors)
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::Data::new(app_config.clone()))
            .service(
                web::scope("/api/chat")
                    .wrap(Authentication {
                        app_config: app_config.clone(),
                    })
                    .service(routes::chat::list_conversations)
                    .service(routes::chat::create_conversation)
                    .service(routes::chat::get_messages)
                    .service(routes::chat::send_message)
                    .service(routes::chat::delete_conversation),
            )
            .service(
                web::scope("/api/lesson-plans")
                    .wrap(Authentication {
                        app_config: app_config.clone(),
                    })
                    .service(routes::lesson_plans::generate_lesson_plan)
                    .service(routes::lesson_plans::list_lesson_plans)
                    .service(routes::lesson_plans::save_lesson_plan)
                    .service(routes::lesson_plans::get_lesson_plan)
                    .service(routes::lesson_plans::update_lesson_plan)
                    .service(routes::lesson_plans::delete_lesson_plan),
            )
    })
    .bind(&bind_address)?
    .run()
    .await?;

    Ok(())
}
