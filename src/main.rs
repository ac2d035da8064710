//src/main.rs

use axum::{
    routing::{get, post, put},
    Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use reservas_backend::{config::AppState, docs::ApiDoc, handlers};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // Se a configuração falhar, a aplicação não deve iniciar.
    let app_state = AppState::new().await?;

    // Faz o app rodar as migrações do SQLx na inicialização
    sqlx::migrate!().run(&app_state.db_pool).await?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    let boat_routes = Router::new()
        .route("/", post(handlers::boats::create_boat))
        .route("/{boat_id}"
               ,get(handlers::boats::get_boat)
               .delete(handlers::boats::delete_boat)
        )
        .route("/{boat_id}/groups", get(handlers::boats::list_boat_groups));

    let reservation_routes = Router::new()
        .route("/", post(handlers::reservations::book))
        .route("/groups", post(handlers::reservations::book_group))
        .route("/{reservation_id}", get(handlers::reservations::get_reservation))
        // Ciclo de vida
        .route("/{reservation_id}/approve", post(handlers::reservations::approve))
        .route("/{reservation_id}/reject", post(handlers::reservations::reject))
        .route("/{reservation_id}/no-show", post(handlers::reservations::mark_no_show))
        .route("/{reservation_id}/reallocate", post(handlers::reservations::reallocate))
        // Check-in
        .route("/{reservation_id}/check-in", post(handlers::reservations::check_in))
        .route("/{reservation_id}/check-in/settle", post(handlers::reservations::settle_check_in))
        .route("/{reservation_id}/check-in/undo", post(handlers::reservations::undo_check_in))
        // Pagamentos
        .route("/{reservation_id}/payments", get(handlers::reservations::list_payments))
        .route("/{reservation_id}/reconciliation", get(handlers::reservations::reconcile));

    let tour_routes = Router::new()
        .route("/{tour_id}/current-price", get(handlers::tours::get_current_price))
        .route("/{tour_id}/current-tier", put(handlers::tours::set_current_tier));

    let bind_addr = app_state.bind_addr.clone();

    // Combina tudo no router principal
    let app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/boats", boat_routes)
        .nest("/api/reservations", reservation_routes)
        .nest("/api/tours", tour_routes)
        .with_state(app_state);

    // Inicia o servidor
    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
