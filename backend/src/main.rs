use actix_web::{web, App, HttpServer};
use redis::aio::ConnectionManager;
use std::io;
use tokio::signal;
use tracing::{info, warn};

use valtourney_backend::auth::{JwtConfig, JwtService};
use valtourney_backend::config::Config;
use valtourney_backend::db::{create_pool, run_migrations};
use valtourney_backend::discord::{DiscordBot, SignatureVerifier};
use valtourney_backend::middleware::cors_middleware;
use valtourney_backend::realtime::{run_veto_listener, VetoHub};
use valtourney_backend::service::{
    AiChatService, AtlasService, BracketService, EmailService, NotificationService, PlayerService,
    QuickMatchService, TournamentService, VetoService,
};
use valtourney_backend::telemetry::init_telemetry;

async fn connect_redis(url: &str) -> Option<ConnectionManager> {
    let client = match redis::Client::open(url) {
        Ok(client) => client,
        Err(e) => {
            warn!(error = %e, "Invalid Redis URL, quick match disabled");
            return None;
        }
    };
    match ConnectionManager::new(client).await {
        Ok(manager) => Some(manager),
        Err(e) => {
            warn!(error = %e, "Redis unavailable, quick match disabled");
            None
        }
    }
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let config = Config::from_env().map_err(|e| io::Error::other(format!("Failed to load configuration: {}", e)))?;

    init_telemetry();

    let db_pool = create_pool(&config)
        .await
        .map_err(|e| io::Error::other(format!("Failed to create database pool: {}", e)))?;
    run_migrations(&db_pool)
        .await
        .map_err(|e| io::Error::other(format!("Failed to run migrations: {}", e)))?;

    let verifier = SignatureVerifier::from_hex(&config.discord.public_key)
        .map_err(|e| io::Error::other(format!("Invalid DISCORD_PUBLIC_KEY: {}", e)))?;

    let redis = connect_redis(&config.redis.url).await;
    let jwt_service = JwtService::new(JwtConfig::new(config.auth.jwt_secret.clone()));

    let player_service = PlayerService::new(db_pool.clone());
    let tournament_service = TournamentService::new(db_pool.clone());
    let quick_match_service = redis.clone().map(|manager| {
        QuickMatchService::new(
            manager,
            player_service.clone(),
            config.balancing.confidence_threshold,
        )
    });
    let discord_bot = DiscordBot::new(
        player_service.clone(),
        tournament_service.clone(),
        quick_match_service,
        config.discord.admin_ids.clone(),
        config.balancing.confidence_threshold,
    );

    let tournament_service = web::Data::new(tournament_service);
    let discord_bot = web::Data::new(discord_bot);
    let verifier = web::Data::new(verifier);
    let balancing = web::Data::new(config.balancing.clone());
    let atlas_service = web::Data::new(AtlasService::new(
        db_pool.clone(),
        config.balancing.elite_threshold,
        config.balancing.spread_threshold,
    ));
    let bracket_service = web::Data::new(BracketService::new(db_pool.clone()));
    let veto_service = web::Data::new(VetoService::new(db_pool.clone()));
    let notification_service = web::Data::new(NotificationService::new(
        db_pool.clone(),
        EmailService::new(config.email.clone()),
    ));
    let ai_chat_service = web::Data::new(AiChatService::new(config.ai.clone()));
    let redis = redis.map(web::Data::new);

    let hub = VetoHub::new();
    let listener = tokio::spawn(run_veto_listener(
        db_pool.clone(),
        hub.clone(),
        config.realtime.clone(),
    ));
    let hub = web::Data::new(hub);

    info!(
        "Starting Valtourney backend server on {}:{}",
        config.server.host, config.server.port
    );

    let server = HttpServer::new(move || {
        let mut app = App::new()
            .app_data(web::Data::new(db_pool.clone()))
            .app_data(tournament_service.clone())
            .app_data(atlas_service.clone())
            .app_data(bracket_service.clone())
            .app_data(veto_service.clone())
            .app_data(notification_service.clone())
            .app_data(ai_chat_service.clone())
            .app_data(discord_bot.clone())
            .app_data(verifier.clone())
            .app_data(balancing.clone())
            .app_data(hub.clone());
        if let Some(redis) = &redis {
            app = app.app_data(redis.clone());
        }
        app.wrap(cors_middleware())
            .wrap(actix_web::middleware::Logger::default())
            .configure(|cfg| valtourney_backend::http::configure_routes(cfg, &jwt_service))
    })
    .bind((config.server.host.clone(), config.server.port))?
    .run();

    let server_handle = server.handle();
    tokio::spawn(async move {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for shutdown signal");
            return;
        }
        info!("Shutdown signal received, stopping server...");
        server_handle.stop(true).await;
    });

    let result = server.await;
    listener.abort();
    result
}
