// src/docs.rs

use utoipa::OpenApi;
use crate::handlers;
use crate::models;
use crate::services;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Boats ---
        handlers::boats::create_boat,
        handlers::boats::get_boat,
        handlers::boats::list_boat_groups,
        handlers::boats::delete_boat,

        // --- Reservations ---
        handlers::reservations::book,
        handlers::reservations::book_group,
        handlers::reservations::get_reservation,
        handlers::reservations::approve,
        handlers::reservations::reject,
        handlers::reservations::mark_no_show,
        handlers::reservations::reallocate,
        handlers::reservations::check_in,
        handlers::reservations::settle_check_in,
        handlers::reservations::undo_check_in,
        handlers::reservations::list_payments,
        handlers::reservations::reconcile,

        // --- Tours ---
        handlers::tours::get_current_price,
        handlers::tours::set_current_tier,
    ),
    components(
        schemas(
            // --- Boats ---
            models::boat::ServiceType,
            models::boat::ServiceSubType,
            models::boat::BoatStatus,
            models::boat::Boat,
            models::boat::NewBoat,

            // --- Reservations ---
            models::reservation::ReservationStatus,
            models::reservation::PaymentMethod,
            models::reservation::PaymentSource,
            models::reservation::Reservation,
            models::reservation::Payment,
            models::reservation::NewReservation,
            models::group::Group,

            // --- Pricing ---
            models::pricing::PricingTier,
            models::pricing::Tour,
            models::pricing::CurrentPrice,

            // --- Check-in ---
            services::checkin_service::ApprovalRequest,
            services::checkin_service::ReallocationRequest,
            services::checkin_service::CheckInOutcome,
            services::checkin_service::SettlementResult,
            services::group_payment::PaymentChoice,
            services::group_payment::PaymentEntry,
            services::group_payment::Discount,
            services::booking_service::Reconciliation,

            // --- Payloads ---
            handlers::reservations::BookGroupPayload,
            handlers::reservations::NoShowPayload,
            handlers::tours::SetCurrentTierPayload,
        )
    ),
    tags(
        (name = "Boats", description = "Saídas e lotação"),
        (name = "Reservations", description = "Ciclo de vida, check-in e pagamentos de grupo"),
        (name = "Tours", description = "Faixas de preço dos passeios")
    )
)]
pub struct ApiDoc;
