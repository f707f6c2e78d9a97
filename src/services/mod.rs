// Identifier issuance
pub mod identifier_source;

// Reservation lifecycle
pub mod checkout;
pub mod expiration;
pub mod reservations;

// Post-checkout
pub mod payment_confirmation;
pub mod reminders;

// Runtime settings
pub mod settings;

use std::sync::Arc;

use crate::notifications::{LogMailer, Mailer};
use crate::repositories::{
    CartStore, InMemoryCartStore, InMemoryOrderRepository, InMemorySessionStore, OrderRepository,
    SessionStore,
};

use self::checkout::CheckoutFinalizer;
use self::expiration::ExpirationSweeper;
use self::identifier_source::{IdentifierApi, IdentifierSource};
use self::payment_confirmation::PaymentConfirmationService;
use self::reminders::ReminderService;
use self::reservations::ReservationManager;
use self::settings::GatewaySettings;

/// Platform collaborators the gateway is wired against.
#[derive(Clone)]
pub struct PlatformPorts {
    pub orders: Arc<dyn OrderRepository>,
    pub sessions: Arc<dyn SessionStore>,
    pub carts: Arc<dyn CartStore>,
    pub mailer: Arc<dyn Mailer>,
}

impl PlatformPorts {
    /// In-memory stores and a logging mailer.
    pub fn in_memory() -> Self {
        Self {
            orders: Arc::new(InMemoryOrderRepository::new()),
            sessions: Arc::new(InMemorySessionStore::new()),
            carts: Arc::new(InMemoryCartStore::new()),
            mailer: Arc::new(LogMailer),
        }
    }
}

/// Services layer used by HTTP handlers and the background sweeper
#[derive(Clone)]
pub struct GatewayServices {
    pub reservations: ReservationManager,
    pub checkout: CheckoutFinalizer,
    pub confirmations: PaymentConfirmationService,
    pub reminders: ReminderService,
    pub sweeper: ExpirationSweeper,
    pub orders: Arc<dyn OrderRepository>,
    pub carts: Arc<dyn CartStore>,
}

impl GatewayServices {
    pub fn new(
        ports: PlatformPorts,
        identifier_api: Arc<dyn IdentifierApi>,
        settings: GatewaySettings,
        store_name: &str,
    ) -> Self {
        let source = IdentifierSource::new(identifier_api);
        let reminders = ReminderService::new(
            ports.orders.clone(),
            ports.mailer.clone(),
            settings.clone(),
            store_name,
        );

        Self {
            reservations: ReservationManager::new(
                ports.orders.clone(),
                ports.sessions.clone(),
                source,
                settings.clone(),
            ),
            checkout: CheckoutFinalizer::new(
                ports.orders.clone(),
                ports.sessions.clone(),
                ports.carts.clone(),
                reminders.clone(),
                settings,
            ),
            confirmations: PaymentConfirmationService::new(ports.orders.clone()),
            reminders,
            sweeper: ExpirationSweeper::new(ports.orders.clone()),
            orders: ports.orders,
            carts: ports.carts,
        }
    }
}
